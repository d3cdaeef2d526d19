//! Test helpers for running commands against a scratch database.

use super::*;
use std::fs;
use tempfile::TempDir;

/// A temporary directory holding a dispatch database and seed files.
#[derive(Debug)]
pub(super) struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub(super) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub(super) fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp path should be UTF-8: {path:?}"))
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root().join("state").join(DEFAULT_DATABASE)
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root().join(name);
        fs::write(&path, contents).expect("write scratch file");
        path
    }
}

/// Three locations joined by a cheap road through the middle and one driver.
pub(super) const DEMO_CITY: &str = r#"{
  "locations": [
    {"id": 1, "name": "Kitchen", "x": 0.0, "y": 0.0},
    {"id": 2, "name": "Bridge", "x": 3.0, "y": 1.0},
    {"id": 3, "name": "Harbour", "x": 6.0, "y": 0.0}
  ],
  "edges": [
    {"source": 1, "destination": 2, "distance": 3.0},
    {"source": 2, "destination": 3, "distance": 2.0, "trafficFactor": 1.0}
  ],
  "drivers": [
    {"speed": 2.0, "location": 1}
  ]
}"#;

/// Parse `words` as a `dispatch` invocation bound to `database` and run it.
pub(super) fn run_words(
    words: &str,
    database: &Utf8Path,
) -> Result<serde_json::Value, CliError> {
    let mut argv = vec!["dispatch".to_owned()];
    argv.extend(words.split_whitespace().map(str::to_owned));
    argv.push(format!("--{ARG_DATABASE}"));
    argv.push(database.to_string());
    let cli = Cli::try_parse_from(argv)?;
    let mut buffer = Vec::new();
    run_command(cli.command, &mut buffer)?;
    Ok(parse_output(&buffer))
}

/// Decode a single line of command output.
pub(super) fn parse_output(buffer: &[u8]) -> serde_json::Value {
    let text = std::str::from_utf8(buffer).expect("output should be UTF-8");
    assert!(text.ends_with('\n'), "output should end with a newline");
    assert_eq!(text.lines().count(), 1, "output should be one line: {text}");
    serde_json::from_str(text).expect("output should be JSON")
}
