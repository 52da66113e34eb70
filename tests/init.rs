use assert_cmd::Command;
use predicates::prelude::predicate;
use assert_fs::TempDir;
use common::command::{repository_dir, run_bit_command, run_git_command};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

#[test]
fn init_repository_successfully() -> Result<(), Box<dyn std::error::Error>> {
    common::redirect_temp_dir();
    let dir = assert_fs::TempDir::new()?;
    let dir_absolute_path = dir.path().canonicalize()?.display().to_string();
    let mut sut = Command::cargo_bin("bit-stage")?;

    sut.arg("init").arg(dir.path());

    sut.assert()
        .success()
        .stdout(predicate::str::is_match(
            r"^Initialized empty Git repository in .+\n$",
        )?)
        .stdout(predicate::str::contains(dir_absolute_path));

    let git_dir = dir.path().join(".git");
    assert!(git_dir.join("objects").is_dir());
    assert!(git_dir.join("refs").join("heads").is_dir());
    assert_eq!(
        std::fs::read_to_string(git_dir.join("HEAD"))?,
        "ref: refs/heads/master\n"
    );

    Ok(())
}

#[rstest]
fn git_recognizes_the_initialized_repository(
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = repository_dir;
    run_bit_command(dir.path(), &["init"]).assert().success();

    run_git_command(dir.path(), &["rev-parse", "--git-dir"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".git"));

    Ok(())
}
