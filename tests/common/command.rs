use crate::common::redirect_temp_dir;
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_NAME: &str = "A U Thor";
pub const AUTHOR_EMAIL: &str = "author@example.com";
pub const AUTHOR_DATE: &str = "2024-05-01 12:00:00 +0200";

#[fixture]
pub fn repository_dir() -> TempDir {
    redirect_temp_dir();
    TempDir::new().expect("Failed to create temp dir")
}

/// A directory initialized by `git init`, so git can read what bit-stage writes
#[fixture]
pub fn git_repository_dir(repository_dir: TempDir) -> TempDir {
    run_git_command(repository_dir.path(), &["init", "--quiet"])
        .assert()
        .success();

    repository_dir
}

pub fn run_bit_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bit-stage").expect("Failed to find bit-stage binary");
    cmd.current_dir(dir);
    for var in [
        "GIT_AUTHOR_NAME",
        "GIT_AUTHOR_EMAIL",
        "GIT_AUTHOR_DATE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// `bit-stage commit` with a fixed author and date
pub fn bit_commit(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = run_bit_command(dir, &["commit"]);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", AUTHOR_NAME),
        ("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("GIT_AUTHOR_DATE", AUTHOR_DATE),
    ]);
    cmd.args(args);
    cmd
}

/// Trimmed stdout of a successful command
pub fn stdout_of(mut cmd: Command) -> Result<String, Box<dyn std::error::Error>> {
    let output = cmd.assert().success().get_output().stdout.trim_ascii().to_vec();
    Ok(String::from_utf8(output)?)
}

pub fn read_ref(dir: &Path, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    Ok(std::fs::read_to_string(dir.join(".git").join(name))?
        .trim()
        .to_string())
}
