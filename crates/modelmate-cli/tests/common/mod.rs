#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::Command;

/// An isolated home directory with its own token file.
pub struct Sandbox {
    dir: TempDir,
    api: String,
}

impl Sandbox {
    pub fn new(api: &str) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            api: api.to_string(),
        }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    pub fn token_file(&self) -> PathBuf {
        self.home().join("data").join("modelmate").join("tokens.json")
    }

    pub fn write_tokens(&self, access: &str, refresh: Option<&str>) {
        let path = self.token_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, json!({"access": access, "refresh": refresh}).to_string()).unwrap();
    }

    pub fn read_tokens(&self) -> Option<Value> {
        let contents = std::fs::read_to_string(self.token_file()).ok()?;
        Some(serde_json::from_str(&contents).unwrap())
    }

    /// Run the CLI binary with this sandbox's environment.
    pub async fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_modelmate"));
        cmd.args(args);
        cmd.env("HOME", self.home());
        cmd.env("XDG_DATA_HOME", self.home().join("data"));
        cmd.env("MODELMATE_API_BASE", &self.api);
        cmd.env("MODELMATE_TOKEN_FILE", self.token_file());
        cmd.env("NO_COLOR", "1");
        cmd.env("CLICOLOR", "0");
        cmd.env_remove("RUST_LOG");
        cmd.env_remove("MODELMATE_ALLOW_HTTP");
        cmd.output().await.expect("Failed to execute CLI")
    }

    /// Run the CLI and expect success, returning stdout.
    pub async fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Mint an unsigned JWT expiring `seconds` from now.
pub fn jwt_expiring_in(seconds: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"token_type": "access", "exp": now + seconds, "user_id": 7}).to_string(),
    );
    format!("{}.{}.sig", header, payload)
}
