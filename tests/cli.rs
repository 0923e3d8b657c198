use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn reqforge_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_reqforge"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Memory backend without embeddings: no network needed.
    let config_content = format!(
        r#"[db]
path = "{root}/data/reqforge.sqlite"

[images]
root = "{root}/data/images"

[vector]
backend = "memory"

[retrieval]
k = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("reqforge.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_reqforge(config: &Path, args: &[&str]) -> Output {
    Command::new(reqforge_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("REQFORGE_LOG")
        .output()
        .expect("failed to run reqforge")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let output = run_reqforge(&config, &["init"]);
    assert!(output.status.success(), "init failed: {:?}", output);
    assert!(tmp.path().join("data/reqforge.sqlite").exists());

    // Idempotent
    let output = run_reqforge(&config, &["init"]);
    assert!(output.status.success());
}

#[test]
fn test_project_create_list_show() {
    let (_tmp, config) = setup_test_env();
    run_reqforge(&config, &["init"]);

    let output = run_reqforge(
        &config,
        &[
            "project",
            "create",
            "--name",
            "Banking",
            "--description",
            "Retail banking app",
        ],
    );
    assert!(output.status.success(), "create failed: {:?}", output);
    let id = stdout(&output).trim().to_string();
    assert_eq!(id.len(), 36);

    let output = run_reqforge(&config, &["project", "list"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert!(listing.contains(&id));
    assert!(listing.contains("Banking"));
    assert!(listing.contains("0 screen(s)"));

    let output = run_reqforge(&config, &["project", "show", &id]);
    assert!(output.status.success());
    let project: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(project["name"], "Banking");
    assert_eq!(project["screens"].as_array().unwrap().len(), 0);
}

#[test]
fn test_show_unknown_project_fails() {
    let (_tmp, config) = setup_test_env();
    let output = run_reqforge(&config, &["project", "show", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("project not found"));
}

#[test]
fn test_context_for_fresh_project_is_empty() {
    let (_tmp, config) = setup_test_env();
    let output = run_reqforge(&config, &["context", "p1", "--query", "login"]);
    assert!(output.status.success(), "context failed: {:?}", output);
    assert!(stdout(&output).contains("No context documents for project p1."));
}

#[test]
fn test_analyze_requires_readable_image() {
    let (tmp, config) = setup_test_env();
    let missing = tmp.path().join("missing.png");
    let output = run_reqforge(
        &config,
        &[
            "analyze",
            "--project",
            "p1",
            "--image",
            missing.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read image"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _config) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(
        &bad,
        "[db]\npath = \"x.sqlite\"\n[images]\nroot = \"img\"\n[retrieval]\nk = 0\n",
    )
    .unwrap();
    let output = run_reqforge(&bad, &["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("retrieval.k"));
}
