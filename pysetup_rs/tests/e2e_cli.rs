//! End-to-end CLI tests for pysetup.
//!
//! Nothing here talks to the package index or runs pip: index checks are
//! covered by unit tests, installs run with `--dry-run`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Scans run from here with a relative root, so exclusion substrings only
/// see paths inside the fixture.
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn pysetup() -> Command {
    let mut cmd = cargo_bin_cmd!("pysetup");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_manifest(content: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("requirements.txt");
    std::fs::write(&path, content).unwrap();
    (temp, path)
}

// ============================================
// Basic CLI Tests
// ============================================

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        pysetup()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("scan"))
            .stdout(predicate::str::contains("update-manifest"))
            .stdout(predicate::str::contains("install-requirements"));
    }

    #[test]
    fn shows_version() {
        pysetup()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn unknown_subcommand_fails() {
        pysetup().arg("frobnicate").assert().failure();
    }

    #[test]
    fn bad_log_level_fails_early() {
        pysetup()
            .args(["--log-level", "pysetup=loud", "scan"])
            .current_dir(fixtures_path())
            .arg("simple_py")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid log level"));
    }
}

// ============================================
// Scan Tests
// ============================================

mod scan {
    use super::*;

    #[test]
    fn lists_third_party_packages() {
        pysetup()
            .arg("scan")
            .current_dir(fixtures_path())
            .arg("simple_py")
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 4 packages"))
            .stdout(predicate::str::contains("  numpy"))
            .stdout(predicate::str::contains("  requests"))
            .stdout(predicate::str::contains("  yaml"))
            .stdout(predicate::str::contains("  helpers"))
            .stdout(predicate::str::contains("django").not())
            .stdout(predicate::str::contains("Excluded packages: collections, json, os, sys"));
    }

    #[test]
    fn reports_broken_file_and_keeps_going() {
        pysetup()
            .arg("scan")
            .current_dir(fixtures_path())
            .arg("simple_py")
            .assert()
            .success()
            .stdout(predicate::str::contains("broken.py"))
            .stdout(predicate::str::contains("Error analyzing file: "));
    }

    #[test]
    fn json_output() {
        let output = pysetup()
            .args(["scan", "--json"])
            .current_dir(fixtures_path())
            .arg("simple_py")
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(
            json["packages"],
            serde_json::json!(["helpers", "numpy", "requests", "yaml"])
        );
        assert_eq!(json["excluded"], serde_json::json!(["collections", "json", "os", "sys"]));
        let files = json["files"].as_object().unwrap();
        assert_eq!(files.len(), 5);
        let broken = files
            .iter()
            .find(|(path, _)| path.ends_with("broken.py"))
            .map(|(_, entry)| entry)
            .unwrap();
        assert_eq!(broken["status"], "error");
        assert!(json.get("classified").is_none());
    }

    #[test]
    fn no_default_excludes_and_custom_folders() {
        pysetup()
            .args(["scan", "--no-default-excludes", "--exclude-folder", "pkg"])
            .current_dir(fixtures_path())
            .arg("simple_py")
            .assert()
            .success()
            .stdout(predicate::str::contains("  django"))
            .stdout(predicate::str::contains("  os"))
            .stdout(predicate::str::contains("yaml").not());
    }

    #[test]
    fn extra_package_exclusions() {
        pysetup()
            .args(["scan", "--exclude-package", "helpers"])
            .current_dir(fixtures_path())
            .arg("simple_py")
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 3 packages"))
            .stdout(predicate::str::contains("  helpers").not());
    }

    #[test]
    fn config_file_supplies_exclusions() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("pysetup.toml");
        std::fs::write(&config, "exclude_packages = [\"yaml\", \"helpers\"]\n").unwrap();

        pysetup()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .current_dir(fixtures_path())
            .arg("simple_py")
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 2 packages"));
    }

    #[test]
    fn missing_root_fails() {
        let temp = TempDir::new().unwrap();
        pysetup()
            .arg("scan")
            .arg(temp.path().join("nope"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to locate source files"));
    }
}

// ============================================
// Manifest Tests
// ============================================

mod manifest {
    use super::*;

    #[test]
    fn yes_appends_missing_names() {
        let (_temp, path) = write_manifest("numpy==1.0\nrequests==2.0\n");
        pysetup()
            .arg("update-manifest")
            .arg(&path)
            .args(["numpy", "os", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("numpy, os"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "numpy==1.0\nrequests==2.0\nnumpy\nos\n"
        );
    }

    #[test]
    fn answer_from_stdin() {
        let (_temp, path) = write_manifest("requests\n");
        pysetup()
            .arg("update-manifest")
            .arg(&path)
            .arg("flask")
            .write_stdin("y\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Do you want to add them to requirements.txt? (y/n):"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "requests\nflask\n");
    }

    #[test]
    fn declining_leaves_file_alone() {
        let (_temp, path) = write_manifest("requests\n");
        pysetup()
            .arg("update-manifest")
            .arg(&path)
            .arg("flask")
            .write_stdin("nope\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("left unchanged"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "requests\n");
    }

    #[test]
    fn name_mode_accepts_pinned_lines() {
        let (_temp, path) = write_manifest("numpy==1.0\n");
        pysetup()
            .arg("update-manifest")
            .arg(&path)
            .args(["numpy", "--match-mode", "name"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No packages listed are missing"));
    }

    #[test]
    fn missing_manifest_fails() {
        let temp = TempDir::new().unwrap();
        pysetup()
            .arg("update-manifest")
            .arg(temp.path().join("requirements.txt"))
            .args(["numpy", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("manifest not found"));
    }
}

// ============================================
// Install Tests (dry run)
// ============================================

mod install {
    use super::*;

    #[test]
    fn install_prints_pip_command() {
        pysetup()
            .args(["--dry-run", "install", "-e", "./pkg", "--", "--no-deps"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-m pip install -e ./pkg --no-deps"));
    }

    #[test]
    fn missing_requirements_file_fails() {
        let temp = TempDir::new().unwrap();
        pysetup()
            .arg("install-requirements")
            .arg(temp.path().join("requirements.txt"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("requirements file not found"));
    }

    #[test]
    fn one_at_a_time_dry_run() {
        let (_temp, path) = write_manifest("numpy==1.26\n\nrequests\n");
        pysetup()
            .args(["--dry-run", "install-requirements", "--one-at-a-time"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed 2 packages"))
            .stdout(predicate::str::contains("-m pip install numpy==1.26"))
            .stdout(predicate::str::contains("-m pip install requests"));
    }

    #[test]
    fn clone_with_branch_dry_run() {
        let temp = TempDir::new().unwrap();
        pysetup()
            .args(["--dry-run", "clone", "https://example.com/org/tool.git@dev", "--dev"])
            .arg("--dest")
            .arg(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "git clone https://example.com/org/tool.git --branch dev",
            ))
            .stdout(predicate::str::contains("-m pip install -e"));
    }

    #[test]
    fn python_comes_from_config() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("pysetup.toml");
        std::fs::write(&config, "[install]\npython = \"python3.12\"\n").unwrap();
        pysetup()
            .arg("--config")
            .arg(&config)
            .args(["--dry-run", "install", "attrs"])
            .assert()
            .success()
            .stdout(predicate::str::contains("python3.12 -m pip install attrs"));
    }
}
