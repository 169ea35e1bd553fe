use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_repo() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path().join("packages");
    for version in ["2.5.2", "2.6.0", "2.6.8", "2.7.0"] {
        write(
            &root.join("python").join(version).join("package.yaml"),
            &format!("name: python\nversion: '{}'\n", version),
        );
    }
    write(
        &root.join("multi.json"),
        r#"{"name": "multi", "versions": ["1.0", "1.1"]}"#,
    );
    write(
        &dir.path().join("dev").join("package.yaml"),
        "name: foo\nversion: 1.0.0\nvariants:\n  - [python-2.7]\n  - [python-2.6]\n",
    );
    dir
}

/// The binary with an isolated home and no settings from the environment.
fn pkgrepo(home: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("pkgrepo"));
    cmd.env("HOME", home)
        .env_remove("PKGREPO_SETTINGS_FILE")
        .env_remove("PKGREPO_PACKAGES_PATH")
        .env_remove("PKGREPO_LOCAL_PACKAGES_PATH")
        .env_remove("PKGREPO_WARN_UNTIMESTAMPED");
    cmd
}

#[test]
fn test_families_and_packages() {
    let dir = create_repo();
    let root = dir.path().join("packages");

    pkgrepo(dir.path())
        .arg("families")
        .arg("-p")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("multi"))
        .stdout(predicate::str::contains("python"));

    pkgrepo(dir.path())
        .args(["packages", "python", "-p"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("python-2.5.2"))
        .stdout(predicate::str::contains("python-2.7.0"));
}

#[test]
fn test_packages_from_env_search_path() {
    let dir = create_repo();

    pkgrepo(dir.path())
        .env("PKGREPO_PACKAGES_PATH", dir.path().join("packages"))
        .args(["packages", "multi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("multi-1.0"))
        .stdout(predicate::str::contains("multi-1.1"));
}

#[test]
fn test_expand() {
    let dir = create_repo();

    pkgrepo(dir.path())
        .args(["expand", "python-2.6.*+<**", "-p"])
        .arg(dir.path().join("packages"))
        .assert()
        .success()
        .stdout("python-2.6.8+<2.7.0\n");
}

#[test]
fn test_expand_rejects_malformed_wildcard() {
    let dir = create_repo();

    pkgrepo(dir.path())
        .args(["expand", "python-1.**.1", "-p"])
        .arg(dir.path().join("packages"))
        .assert()
        .failure();
}

#[test]
fn test_order_with_settings_file() {
    let dir = create_repo();
    write(
        &dir.path().join(".pkgreporc"),
        &format!(
            "packages_path: [{}]\npackage_orderers:\n  - type: version_split\n    packages: [python]\n    first_version: 2.6.0\n",
            dir.path().join("packages").display()
        ),
    );

    pkgrepo(dir.path())
        .args(["order", "python"])
        .assert()
        .success()
        .stdout("2.6.0\n2.5.2\n2.7.0\n2.6.8\n");
}

#[test]
fn test_install_then_dry_run() {
    let dir = create_repo();
    let repo = dir.path().join("installed");

    pkgrepo(dir.path())
        .arg("install")
        .arg(dir.path().join("dev"))
        .arg("--repo")
        .arg(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("foo-1.0.0[0]: installed"))
        .stdout(predicate::str::contains("foo-1.0.0[1]: installed"));

    assert!(repo.join("foo/1.0.0/package.json").is_file());
    assert!(repo.join("foo/1.0.0/python-2.7").is_dir());

    pkgrepo(dir.path())
        .arg("install")
        .arg(dir.path().join("dev"))
        .arg("--repo")
        .arg(&repo)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo-1.0.0[0]: unchanged"));
}

#[test]
fn test_version_flag() {
    let dir = tempdir().unwrap();
    pkgrepo(dir.path()).arg("--version").assert().success();
}
