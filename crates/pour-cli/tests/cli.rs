//! End-to-end tests for the `pour` CLI binary.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pour_core::PackageLock;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Isolated pour home, applications dir, user home and artifact mirror.
struct TestEnv {
    temp_dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        for dir in ["home", "Applications", "manifests"] {
            std::fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        Self { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    fn bundle(&self) -> PathBuf {
        self.root().join("Applications/Xamrock.app")
    }

    fn cache(&self) -> PathBuf {
        self.home().join("Library/Caches/com.example.xamrock")
    }

    fn artifact(&self, version: &str) -> PathBuf {
        self.root()
            .join("artifacts")
            .join(version)
            .join("Xamrock.zip")
    }

    /// Write the release zip for `version` and a manifest pointing at it.
    fn publish(&self, version: &str) -> PathBuf {
        let bytes = app_zip(version);
        let artifact = self.artifact(version);
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, &bytes).unwrap();
        self.write_manifest(version, &hex::encode(Sha256::digest(&bytes)))
    }

    fn write_manifest(&self, version: &str, checksum: &str) -> PathBuf {
        let manifest = format!(
            r#"name = "Xamrock"
version = "{version}"
checksum = "{checksum}"
url_template = "file://{root}/artifacts/{{{{version}}}}/Xamrock.zip"
os_constraint = ">= :sonoma"
artifact_kind = "archive"
install_target = "Xamrock.app"
cleanup_paths = ["~/Library/Caches/com.example.xamrock"]
"#,
            root = self.root().display()
        );
        let path = self
            .root()
            .join("manifests")
            .join(format!("xamrock-{version}-{}.toml", &checksum[..8]));
        std::fs::write(&path, manifest).unwrap();
        path
    }

    fn pour_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pour"));
        cmd.env("HOME", self.home())
            .env("POUR_HOME", self.root().join(".pour"))
            .env("POUR_APPLICATIONS_DIR", self.root().join("Applications"))
            .env("POUR_HOST_OS", "15.1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn pour(&self, args: &[&str]) -> Output {
        self.pour_cmd().args(args).output().expect("failed to run pour")
    }

    fn ingest(&self, manifest: &Path) -> Output {
        self.pour(&["ingest", manifest.to_str().unwrap()])
    }

    fn plist(&self) -> String {
        std::fs::read_to_string(self.bundle().join("Contents/Info.plist")).unwrap()
    }
}

fn app_zip(marker: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o755);
    writer
        .start_file("Xamrock.app/Contents/Info.plist", options)
        .unwrap();
    writer.write_all(marker.as_bytes()).unwrap();
    writer
        .start_file("Xamrock.app/Contents/MacOS/Xamrock", options)
        .unwrap();
    writer.write_all(b"#!/bin/sh\n").unwrap();
    writer.finish().unwrap().into_inner()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "status {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        stdout(output),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_help_command() {
    let env = TestEnv::new();
    let output = env.pour(&["--help"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_full_lifecycle() {
    let env = TestEnv::new();
    assert_success(&env.ingest(&env.publish("0.1.14")));

    assert_success(&env.pour(&["install", "xamrock"]));
    assert_eq!(env.plist(), "0.1.14");

    let list = env.pour(&["list"]);
    assert_success(&list);
    assert!(stdout(&list).contains("xamrock 0.1.14"));

    assert_success(&env.ingest(&env.publish("0.1.15")));
    let check = env.pour(&["check-update", "xamrock"]);
    assert_success(&check);
    assert!(stdout(&check).contains("update available: 0.1.14 -> 0.1.15"));

    std::fs::create_dir_all(env.cache()).unwrap();
    assert_success(&env.pour(&["upgrade", "xamrock"]));
    assert_eq!(env.plist(), "0.1.15");
    assert!(env.cache().exists(), "upgrade must not touch user data");

    let check = env.pour(&["check-update", "xamrock"]);
    assert!(stdout(&check).contains("up to date"));

    // plain uninstall keeps user data
    assert_success(&env.pour(&["uninstall", "xamrock"]));
    assert!(!env.bundle().exists());
    assert!(env.cache().exists());

    // full zap removes it
    assert_success(&env.pour(&["install", "xamrock"]));
    assert_success(&env.pour(&["uninstall", "xamrock", "--full-zap"]));
    assert!(!env.bundle().exists());
    assert!(!env.cache().exists());
    assert!(env.home().exists());

    let info = env.pour(&["info", "xamrock"]);
    assert_success(&info);
    let text = stdout(&info);
    assert!(text.contains("0.1.14") && text.contains("0.1.15"));
    assert!(text.contains("uninstall"));
}

#[test]
fn test_pinned_install() {
    let env = TestEnv::new();
    assert_success(&env.ingest(&env.publish("0.1.13")));
    assert_success(&env.ingest(&env.publish("0.1.14")));

    assert_success(&env.pour(&["install", "xamrock", "--version", "0.1.13"]));
    assert_eq!(env.plist(), "0.1.13");
}

#[test]
fn test_checksum_drift_is_rejected() {
    let env = TestEnv::new();
    let original = env.publish("0.1.14");
    assert_success(&env.ingest(&original));
    // identical re-ingest is a no-op
    assert_success(&env.ingest(&original));

    let drifted = env.write_manifest("0.1.14", &"ab".repeat(32));
    assert_eq!(env.ingest(&drifted).status.code(), Some(10));
}

#[test]
fn test_invalid_manifest() {
    let env = TestEnv::new();
    let path = env.root().join("manifests/broken.toml");
    std::fs::write(&path, "name = \"Xamrock\"\nversion = \"0.1.14\"\n").unwrap();
    assert_eq!(env.ingest(&path).status.code(), Some(2));
}

#[test]
fn test_corrupted_artifact_is_not_installed() {
    let env = TestEnv::new();
    assert_success(&env.ingest(&env.publish("0.1.14")));
    std::fs::write(env.artifact("0.1.14"), b"tampered").unwrap();

    let output = env.pour(&["install", "xamrock"]);
    assert_eq!(output.status.code(), Some(12));
    assert!(!env.bundle().exists());

    let list = env.pour(&["list"]);
    assert!(stdout(&list).contains("No packages installed"));
}

#[test]
fn test_old_host_is_rejected() {
    let env = TestEnv::new();
    assert_success(&env.ingest(&env.publish("0.1.14")));

    let output = env
        .pour_cmd()
        .env("POUR_HOST_OS", "13.6")
        .args(["install", "xamrock"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(13));
    assert!(!env.bundle().exists());
}

#[test]
fn test_state_errors() {
    let env = TestEnv::new();
    assert_eq!(env.pour(&["install", "ghost"]).status.code(), Some(11));
    assert_eq!(env.pour(&["uninstall", "xamrock"]).status.code(), Some(16));
    assert_eq!(env.pour(&["upgrade", "xamrock"]).status.code(), Some(16));

    assert_success(&env.ingest(&env.publish("0.1.14")));
    assert_success(&env.pour(&["install", "xamrock"]));
    assert_eq!(env.pour(&["install", "xamrock"]).status.code(), Some(15));
}

#[test]
fn test_missing_artifact_is_a_fetch_error() {
    let env = TestEnv::new();
    assert_success(&env.ingest(&env.publish("0.1.14")));
    std::fs::remove_file(env.artifact("0.1.14")).unwrap();
    assert_eq!(env.pour(&["install", "xamrock"]).status.code(), Some(17));
}

#[test]
fn test_install_waits_for_another_process() {
    let env = TestEnv::new();
    assert_success(&env.ingest(&env.publish("0.1.14")));

    let lock_path = env.root().join(".pour/locks/xamrock.lock");
    let held = PackageLock::acquire(&lock_path).unwrap();

    let mut child = env
        .pour_cmd()
        .args(["install", "xamrock"])
        .spawn()
        .expect("failed to spawn pour");
    std::thread::sleep(std::time::Duration::from_millis(500));
    assert!(child.try_wait().unwrap().is_none(), "install ran while locked");
    assert!(!env.bundle().exists());

    drop(held);
    assert!(child.wait().unwrap().success());
    assert_eq!(env.plist(), "0.1.14");
}

#[test]
fn test_path_like_names_are_rejected() {
    let env = TestEnv::new();
    let manifest = env.publish("0.1.14");
    let text = std::fs::read_to_string(&manifest)
        .unwrap()
        .replace("name = \"Xamrock\"", "name = \"acme/../../escaped\"");
    std::fs::write(&manifest, text).unwrap();

    assert_eq!(env.ingest(&manifest).status.code(), Some(2));
    assert!(!env.root().join(".pour/escaped").exists());
    assert_eq!(env.pour(&["install", "../escaped"]).status.code(), Some(11));
}
