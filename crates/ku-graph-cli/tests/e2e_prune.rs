//! E2E tests for `kugraph prune`.

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn kugraph(format: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kugraph"));
    cmd.env("KUGRAPH_LOG", "error");
    cmd.env("FORMAT", format);
    cmd
}

fn write_manifest(dir: &Path) -> PathBuf {
    let path = dir.join("graph.toml");
    std::fs::write(&path, WORKSPACE).expect("write manifest");
    path
}

// `extra` shares a component with `main` but `main` never depends on it.
const WORKSPACE: &str = r#"
[[entity]]
id = "main"
deps = ["util", "fmt"]
public = true

[[entity]]
id = "util"
deps = ["fmt"]

[[entity]]
id = "fmt"

[[entity]]
id = "extra"
deps = ["fmt"]

[[entity]]
id = "dead_a"
deps = ["dead_b"]

[[entity]]
id = "dead_b"
deps = ["dead_a"]

[[entity]]
id = "orphan"
"#;

#[test]
fn private_pruning_drops_components_without_public_entities() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_manifest(dir.path());

    kugraph("text")
        .arg("prune")
        .arg(&path)
        .assert()
        .success()
        .stdout("dead_a\ndead_b\norphan\n");
}

#[test]
fn reachable_pruning_follows_dependencies() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_manifest(dir.path());

    kugraph("text")
        .args(["prune", "--reachable"])
        .arg(&path)
        .assert()
        .success()
        .stdout("dead_a\ndead_b\nextra\norphan\n");
}

#[test]
fn public_flag_adds_roots() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_manifest(dir.path());

    let output = kugraph("json")
        .args(["prune", "--reachable", "--public", "dead_a"])
        .arg(&path)
        .output()
        .expect("prune should not crash");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["strategy"], "reachable");
    assert_eq!(json["public"], serde_json::json!(["dead_a", "main"]));
    assert_eq!(json["prunable"]["entities"], serde_json::json!(["extra", "orphan"]));
}
