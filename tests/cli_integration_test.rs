//! Integration tests for the report and graph commands.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn get_binary_path() -> String {
    std::env::var("CARGO_BIN_EXE_schema-atlas")
        .unwrap_or_else(|_| "target/debug/schema-atlas".to_string())
}

fn create_test_dump(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("test.sql");
    fs::write(
        &path,
        r#"
CREATE TABLE customers (
  id INT PRIMARY KEY,
  email VARCHAR(255) NOT NULL
);

CREATE TABLE orders (
  id INT PRIMARY KEY,
  customer_id INT NOT NULL,
  FOREIGN KEY (customer_id) REFERENCES customers(id)
);

CREATE TABLE categories (
  id INT PRIMARY KEY,
  name VARCHAR(100),
  parent_id INT,
  FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE products (
  id INT PRIMARY KEY,
  category_id INT,
  name VARCHAR(255)
);
"#,
    )
    .unwrap();
    path
}

#[test]
fn test_graph_prints_description_to_stdout() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);

    let output = Command::new(get_binary_path())
        .args(["graph", dump.to_str().unwrap(), "--table", "orders"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph oneDegreeRelationshipsDiagram {"));
    assert!(stdout.contains("orders:customer_id -> customers:id"));
    assert!(stdout.contains("<B><U>id</U></B>"));
}

#[test]
fn test_graph_implied_variant_follows_detected_edges() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);

    let output = Command::new(get_binary_path())
        .args([
            "graph",
            dump.to_str().unwrap(),
            "--table",
            "products",
            "--degrees",
            "implied",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph impliedTwoDegreesRelationshipsDiagram {"));
    assert!(stdout.contains("products:category_id -> categories:id"));
    assert!(stdout.contains("style=dashed"));
}

#[test]
fn test_graph_self_reference_terminates() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);

    let output = Command::new(get_binary_path())
        .args(["graph", dump.to_str().unwrap(), "--table", "categories"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("categories:parent_id -> categories:id"));
}

#[test]
fn test_graph_unknown_table_fails() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);

    let output = Command::new(get_binary_path())
        .args(["graph", dump.to_str().unwrap(), "--table", "nonexistent"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("table not found"));
}

#[test]
fn test_report_with_unavailable_renderer_warns_once_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);
    let out = dir.path().join("atlas");

    let output = Command::new(get_binary_path())
        .args([
            "report",
            dump.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--renderer",
            "graphviz-dot-that-does-not-exist",
        ])
        .output()
        .unwrap();

    // missing layout tool is not fatal; the report simply has no diagrams
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("layout tool not found").count(), 1);

    let diagram_entries = fs::read_dir(out.join("diagrams")).unwrap().count();
    let fragment_entries = fs::read_dir(out.join("tables")).unwrap().count();
    assert_eq!(diagram_entries, 0);
    assert_eq!(fragment_entries, 0);
}

#[test]
fn test_report_json_summary() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);
    let out = dir.path().join("atlas");

    let output = Command::new(get_binary_path())
        .args([
            "report",
            dump.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--renderer",
            "graphviz-dot-that-does-not-exist",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["tables"], 4);
    assert_eq!(summary["renderer_available"], false);
    assert_eq!(summary["implied_relationships"], 1);
    assert_eq!(summary["one_degree_diagrams"], 0);
}

#[test]
fn test_report_missing_input_fails() {
    let output = Command::new(get_binary_path())
        .args(["report", "no-such-file.sql"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_report_exclude_patterns() {
    let dir = TempDir::new().unwrap();
    let dump = create_test_dump(&dir);
    let out = dir.path().join("atlas");

    let output = Command::new(get_binary_path())
        .args([
            "report",
            dump.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--renderer",
            "graphviz-dot-that-does-not-exist",
            "-x",
            "cat*,prod*",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["tables"], 2);
}
