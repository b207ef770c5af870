use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn trak_help_works() {
    Command::cargo_bin("trak")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Line-record task tracking"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "init", "add", "list", "show", "update", "complete", "reopen", "delete", "blocked",
    ];

    for cmd in subcommands {
        Command::cargo_bin("trak")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}
