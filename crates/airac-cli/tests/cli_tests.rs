//! Integration tests that run the compiled `airac` binary

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use airac_core::settings::{LoginSettings, OptionSettings, PathSettings, VccsSettings};
use airac_core::{Rating, Settings};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const PROFILE: &str = "LastSession\trealname\tPackage Default\r\nLastSession\tserver\tEDWW_CTR\r\n";

/// Get a Command for the airac binary
fn airac_cmd() -> Command {
    let mut cmd = Command::cargo_bin("airac").expect("Failed to find airac binary");
    cmd.env_remove("AIRAC_CONFIG").env_remove("RUST_LOG");
    cmd
}

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp.path().join(rel)
    }

    /// Write a valid settings file and return its path.
    fn settings(&self) -> PathBuf {
        let settings = Settings {
            paths: PathSettings {
                download_dir: self.path("dl"),
                install_dir: self.path("es"),
                backup_dir: self.path("bk"),
                navdata_dir: None,
                custom_files_dir: None,
            },
            login: LoginSettings {
                cid: "1234567".into(),
                password: "secret".into(),
                name: "Jane Doe".into(),
                rating: Rating::S1,
                initials: None,
                hoppie: None,
            },
            vccs: VccsSettings::default(),
            options: OptionSettings::default(),
        };
        let path = self.path("airac.toml");
        airac_fs::ConfigStore::new().save(&path, &settings).unwrap();
        path
    }

    fn archive(&self, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = self.path(name);
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        for (entry, content) in entries {
            writer.start_file(*entry, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn install(&self, rel: &str, content: &str) {
        let path = self.path("es").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_options() {
    airac_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--no-backup"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_package_argument_is_required() {
    airac_cmd().assert().failure().code(2);
}

#[test]
fn test_missing_settings_writes_template() {
    let ws = Workspace::new();
    let config = ws.path("conf/airac.toml");

    airac_cmd()
        .args(["EDGG", "--config", arg(&config)])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("template was written"));

    let template = fs::read_to_string(&config).unwrap();
    assert!(template.contains("YOUR_VATSIM_ID"));
}

#[test]
fn test_untouched_template_is_rejected() {
    let ws = Workspace::new();
    let config = ws.path("airac.toml");
    fs::write(&config, airac_core::Settings::template()).unwrap();

    airac_cmd()
        .args(["EDGG", "--config", arg(&config)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("template value"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let ws = Workspace::new();
    let config = ws.settings();
    ws.install("EDWW FIR.prf", PROFILE);
    let archive = ws.archive("EDWW_2410.zip", &[("EDWW FIR.prf", PROFILE.as_bytes())]);

    airac_cmd()
        .args([arg(&archive), "--config", arg(&config), "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"))
        .stdout(predicate::str::contains("EDWW FIR.prf"));

    assert_eq!(
        fs::read_to_string(ws.path("es/EDWW FIR.prf")).unwrap(),
        PROFILE
    );
    assert!(!ws.path("bk").exists());
}

#[test]
fn test_archive_run_commits() {
    let ws = Workspace::new();
    let config = ws.settings();
    let archive = ws.archive("EDWW_2410.zip", &[("EDWW FIR.prf", PROFILE.as_bytes())]);

    airac_cmd()
        .args([arg(&archive), "--config", arg(&config)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update committed"));

    let profile = fs::read_to_string(ws.path("es/EDWW FIR.prf")).unwrap();
    assert!(profile.contains("LastSession\trealname\tJane Doe"));
    assert!(profile.contains("LastSession\tserver\tAUTOMATIC"));
}

#[test]
fn test_archive_name_resolves_in_download_dir() {
    let ws = Workspace::new();
    let config = ws.settings();
    let archive = ws.archive("EDWW_2410.zip", &[("EDWW FIR.prf", PROFILE.as_bytes())]);
    fs::create_dir_all(ws.path("dl")).unwrap();
    fs::rename(&archive, ws.path("dl/EDWW_2410.zip")).unwrap();

    airac_cmd()
        .current_dir(ws.temp.path())
        .args(["EDWW_2410", "--config", arg(&config), "--dry-run"])
        .assert()
        .success();
}

#[test]
fn test_failed_transform_exits_nonzero_after_rollback() {
    let ws = Workspace::new();
    let config = ws.settings();
    ws.install("EDWW FIR.prf", PROFILE);
    let archive = ws.archive(
        "EDWW_2410.zip",
        &[("EDWW FIR.prf", PROFILE.as_bytes()), ("EDWW Bad.prf", b"\x00\x01")],
    );

    airac_cmd()
        .args([arg(&archive), "--config", arg(&config)])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("ROLLED BACK"))
        .stdout(predicate::str::contains("Not a text file"));

    assert_eq!(
        fs::read_to_string(ws.path("es/EDWW FIR.prf")).unwrap(),
        PROFILE
    );
    assert!(!ws.path("es/EDWW Bad.prf").exists());
}

#[test]
fn test_json_output() {
    let ws = Workspace::new();
    let config = ws.settings();
    let archive = ws.archive("EDWW_2410.zip", &[("EDWW FIR.prf", PROFILE.as_bytes())]);

    let output = airac_cmd()
        .args([arg(&archive), "--config", arg(&config), "--dry-run", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "dry_run_only");
    assert_eq!(json["region"], "EDWW");
    assert_eq!(json["airac"], "2410");
}

#[test]
fn test_missing_archive_fails_resolution() {
    let ws = Workspace::new();
    let config = ws.settings();

    airac_cmd()
        .args([arg(&ws.path("nowhere/EDWW_2410.zip")), "--config", arg(&config)])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Archive not found"));
}
