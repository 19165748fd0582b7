use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn proptrans_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("proptrans"));
    cmd.current_dir(dir).env_remove("OPENAI_API_KEY").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path) {
    let config = format!(
        "input_folder: {root}\nledger_path: {root}/translation_ledger.json\nskipped_report_path: {root}/logs/skipped.md\nsupported_locales:\n  - code: de\n    name: German\n  - code: fr\n    name: French\nlogging:\n  log_level: warn\n  log_file_path: {root}/logs/run.log\n  log_to_console: false\n",
        root = dir.display()
    );
    fs::write(dir.join("config.yaml"), config).unwrap();
}

#[test]
fn test_sync_adds_and_removes_keys() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("app.properties");
    let target = temp_dir.path().join("app_de.properties");
    fs::write(&source, "# Header\na=Hello\nb=World\nc=Again\n").unwrap();
    fs::write(&target, "# Header\na=Hallo\nc=Nochmal\nstale=x\n").unwrap();

    let out = proptrans_cmd(temp_dir.path())
        .args([
            "sync",
            "--source",
            source.to_str().unwrap(),
            "--target",
            target.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("  + b"));
    assert!(stdout.contains("  - stale"));
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# Header\na=Hallo\nb=World\nc=Nochmal\n"
    );
}

#[test]
fn test_sync_dry_run_json_does_not_write_target() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("app.properties");
    let target = temp_dir.path().join("app_de.properties");
    fs::write(&source, "a=Hello\nb=World\n").unwrap();
    fs::write(&target, "a=Hallo\n").unwrap();

    let out = proptrans_cmd(temp_dir.path())
        .args([
            "sync",
            "--source",
            source.to_str().unwrap(),
            "--target",
            target.to_str().unwrap(),
            "--dry-run",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["missing"], serde_json::json!(["b"]));
    assert_eq!(report["extra"], serde_json::json!([]));
    assert_eq!(fs::read_to_string(&target).unwrap(), "a=Hallo\n");
}

#[test]
fn test_sync_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let out = proptrans_cmd(temp_dir.path())
        .args(["sync", "--source", "nope.properties", "--target", "nope_de.properties"])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("File does not exist"));
}

#[test]
fn test_validate_reports_errors_and_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("app.properties");
    let good = temp_dir.path().join("app_de.properties");
    let bad = temp_dir.path().join("app_fr.properties");
    fs::write(&source, "greeting=Hello {0}\n").unwrap();
    fs::write(&good, "greeting=Hallo {0}\n").unwrap();
    fs::write(&bad, "greeting=Bonjour\n").unwrap();

    let ok = proptrans_cmd(temp_dir.path())
        .args(["validate", "--source", source.to_str().unwrap(), good.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(
        ok.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&ok.stderr)
    );

    let failed = proptrans_cmd(temp_dir.path())
        .args([
            "validate",
            "--source",
            source.to_str().unwrap(),
            good.to_str().unwrap(),
            bad.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(!failed.status.success());
    let stdout = String::from_utf8_lossy(&failed.stdout);
    assert!(stdout.contains("Placeholder mismatch for key `greeting`."));
    assert!(String::from_utf8_lossy(&failed.stderr).contains("1 of 2 file(s) failed validation"));
    assert_eq!(fs::read_to_string(&bad).unwrap(), "greeting=Bonjour\n");
}

#[test]
fn test_translate_dry_run_without_api_key() {
    let temp_dir = TempDir::new().unwrap();
    write_config(temp_dir.path());
    fs::write(temp_dir.path().join("app.properties"), "a=Hello\nb=Bye\n").unwrap();
    fs::write(temp_dir.path().join("app_de.properties"), "a=Hallo\n").unwrap();
    fs::write(temp_dir.path().join("app_fr.properties"), "a=Bonjour {0}\n").unwrap();

    let out = proptrans_cmd(temp_dir.path())
        .args(["translate", "--dry-run"])
        .output()
        .unwrap();

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1 processed, 0 unchanged, 1 skipped, 0 keys reverted"));
    assert!(!temp_dir.path().join("translation_ledger.json").exists());

    let report = fs::read_to_string(temp_dir.path().join("logs/skipped.md")).unwrap();
    assert!(report.contains("### 📄 `app_fr.properties`"));
    assert!(report.contains("- Placeholder mismatch for key `a`."));
}

#[test]
fn test_translate_requires_api_key() {
    let temp_dir = TempDir::new().unwrap();
    write_config(temp_dir.path());
    fs::write(temp_dir.path().join("app.properties"), "a=Hello\n").unwrap();
    fs::write(temp_dir.path().join("app_de.properties"), "").unwrap();

    let out = proptrans_cmd(temp_dir.path())
        .args(["translate"])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("OPENAI_API_KEY"));
}

#[test]
fn test_completions() {
    let temp_dir = TempDir::new().unwrap();
    let out = proptrans_cmd(temp_dir.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let script = String::from_utf8_lossy(&out.stdout);
    assert!(script.contains("proptrans"));
    assert!(script.contains("translate"));
}
