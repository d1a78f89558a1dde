//! Integration tests for CLI wiring.
//!
//! These tests validate that the CLI is a thin adapter over existing APIs
//! with proper output payloads and exit codes.

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use std::path::Path;
    use std::process::{Command, Output};
    use tempfile::TempDir;

    fn run(root: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_oracle-tables"))
            .args(args)
            .arg("--root")
            .arg(root)
            .output()
            .expect("Failed to run oracle-tables")
    }

    fn json_stdout(output: &Output) -> Value {
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
    }

    #[test]
    fn test_check_clean_folder() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("tables");

        let output = run(&root, &["check", "--json"]);

        assert!(output.status.success());
        let payload = json_stdout(&output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["errors"], Value::Array(vec![]));
        assert!(root.is_dir(), "check should create the table folder");
    }

    #[test]
    fn test_check_reports_errors_with_exit_code() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("tables");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join("bad.json"),
            r#"{"id":"t1","name":"T","category":"C","type":"Standard","diceType":"d6",
                "entries":[{"range":[1,3],"result":"lo"},{"range":[4,7],"result":"hi"}]}"#,
        )
        .unwrap();

        let output = run(&root, &["check"]);
        assert_eq!(output.status.code(), Some(1));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("must end at 6, but ends at 7"), "{}", stdout);

        let output = run(&root, &["check", "--json"]);
        let payload = json_stdout(&output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error"]["kind"], "Validation");
        assert_eq!(payload["error"]["data"]["errors"][0]["kind"], "RangeCoverage");
    }

    #[test]
    fn test_lookup_builtin_and_custom() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("tables");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join("coin.json"),
            r#"[{"id":"coin","name":"Coin","category":"Misc","type":"Tool","diceType":"custom",
                 "entries":[{"range":[1,1],"result":"Heads"},{"range":[2,2],"result":"Tails"}]}]"#,
        )
        .unwrap();

        let output = run(&root, &["lookup", "--id", "coin", "--value", "2"]);
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Tails");

        let output = run(&root, &["lookup", "--id", "mythic-event-focus", "--value", "90"]);
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Current Context");
    }

    #[test]
    fn test_show_unknown_table() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("tables");

        let output = run(&root, &["show", "--id", "nope", "--json"]);

        assert_eq!(output.status.code(), Some(1));
        let payload = json_stdout(&output);
        assert_eq!(payload["error"]["kind"], "TableNotFound");
    }
}
