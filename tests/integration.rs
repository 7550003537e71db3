use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn atlas_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("atlas");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Create a small source tree to analyze
    let repo = root.join("repo");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::write(
        repo.join("src/lib.rs"),
        "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\npub fn sub(a: i32, b: i32) -> i32 {\n    a - b\n}\n",
    )
    .unwrap();
    fs::write(
        repo.join("main.py"),
        "def main():\n    print('hello from the test repo')\n\nif __name__ == '__main__':\n    main()\n",
    )
    .unwrap();
    fs::write(repo.join("README.md"), "# Test Repo\n\nA tiny fixture.\n").unwrap();

    let config_content = format!(
        r#"[source]
root = "{root}/repo"

[chunking]
chunk_size_chars = 200
overlap_chars = 20

[oracle]
api_key_env = "ATLAS_TEST_KEY_UNSET"

[analysis]
concurrency = 2

[output]
path = "{root}/out/report.json"
"#,
        root = root.display()
    );

    let config_path = root.join("atlas.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_atlas(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = atlas_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("ATLAS_TEST_KEY_UNSET")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run atlas binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_chunks_command_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_atlas(&config_path, &["chunks"]);
    assert!(success, "chunks failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files scanned: 2"));
    assert!(stdout.contains("chunks:"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_analyze_dry_run_counts_without_oracle() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_atlas(&config_path, &["analyze", "--dry-run"]);
    assert!(success, "dry-run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("analyze (dry-run)"));
    assert!(stdout.contains("files scanned: 2"));
}

#[test]
fn test_analyze_dry_run_respects_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_atlas(&config_path, &["analyze", "--dry-run", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("chunks: 1"));
}

#[test]
fn test_analyze_without_api_key_fails_before_pipeline() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_atlas(&config_path, &["analyze", "--progress", "off"]);
    assert!(!success, "analyze should fail without the API key");
    assert!(stderr.contains("ATLAS_TEST_KEY_UNSET"));

    // The failure happened before any report was written.
    assert!(!tmp.path().join("out/report.json").exists());
}

#[test]
fn test_invalid_overlap_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        format!(
            "[source]\nroot = \"{}\"\n\n[chunking]\nchunk_size_chars = 100\noverlap_chars = 100\n",
            tmp.path().join("repo").display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_atlas(&config_path, &["chunks"]);
    assert!(!success);
    assert!(stderr.contains("overlap_chars"));
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_atlas(&config_path, &["chunks"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}

#[test]
fn test_fetch_without_repo_url_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_atlas(&config_path, &["fetch"]);
    assert!(!success);
    assert!(stderr.contains("repo_url"));
}

#[test]
fn test_unknown_progress_mode_is_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_atlas(&config_path, &["analyze", "--progress", "loud"]);
    assert!(!success);
    assert!(stderr.contains("progress"));
}
