//! Discovery and driving of the external `b2` command-line tool.
//!
//! The tool's update surface has shifted across releases (modern `bucket
//! update`, deprecated `update-bucket`, different argument orders), so the
//! CORS application is an ordered list of invocation shapes tried until one
//! exits successfully. The list itself is plain data so tests can check the
//! shapes and their order without spawning anything.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[cfg(windows)]
const BINARY_NAME: &str = "b2.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "b2";

/// Handle to a discovered b2 executable.
pub struct B2Cli {
    path: PathBuf,
}

/// One invocation shape in the update cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliAttempt {
    pub label: &'static str,
    pub args: Vec<String>,
}

/// The ordered update shapes: two modern `bucket update` orderings and the
/// deprecated name form when the bucket name is known, then the deprecated
/// form addressing the bucket by id. The run stops at the first success.
pub fn cors_attempts(
    bucket_name: Option<&str>,
    bucket_id: &str,
    cors_payload: &str,
) -> Vec<CliAttempt> {
    let mut attempts = Vec::new();
    if let Some(name) = bucket_name {
        attempts.push(CliAttempt {
            label: "bucket update",
            args: vec![
                "bucket".to_string(),
                "update".to_string(),
                "--cors-rules".to_string(),
                cors_payload.to_string(),
                name.to_string(),
            ],
        });
        attempts.push(CliAttempt {
            label: "bucket update (alternate order)",
            args: vec![
                "bucket".to_string(),
                "update".to_string(),
                name.to_string(),
                "--cors-rules".to_string(),
                cors_payload.to_string(),
            ],
        });
        attempts.push(CliAttempt {
            label: "update-bucket (deprecated form)",
            args: vec![
                "update-bucket".to_string(),
                name.to_string(),
                "--cors-rules".to_string(),
                cors_payload.to_string(),
            ],
        });
    }
    attempts.push(CliAttempt {
        label: "update-bucket (with --bucketId)",
        args: vec![
            "update-bucket".to_string(),
            "--bucketId".to_string(),
            bucket_id.to_string(),
            "--cors-rules".to_string(),
            cors_payload.to_string(),
        ],
    });
    attempts
}

struct ToolOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl B2Cli {
    /// Locates the b2 executable: explicit override first, then the default
    /// install location, then a PATH search. Returns None when nothing turns
    /// up, which sends the run straight to the HTTP path.
    pub fn discover(explicit: Option<&str>) -> Option<Self> {
        if let Some(path) = explicit {
            return Some(B2Cli {
                path: PathBuf::from(path),
            });
        }
        if let Some(path) = default_install_path().filter(|p| p.exists()) {
            return Some(B2Cli { path });
        }
        find_in_path(BINARY_NAME).map(|path| B2Cli { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the tool once. A spawn error counts the same as a non-zero exit
    /// so a broken install falls through the cascade instead of aborting it.
    async fn run(&self, args: &[&str]) -> ToolOutput {
        debug!("Running: {} {}", self.path.display(), args.join(" "));
        match Command::new(&self.path).args(args).output().await {
            Ok(output) => ToolOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                warn!("Error running b2 CLI at {}: {}", self.path.display(), e);
                ToolOutput {
                    success: false,
                    stdout: String::new(),
                    stderr: e.to_string(),
                }
            }
        }
    }

    /// Authorizes the CLI with the key pair when both halves are present,
    /// else relying on cached credentials; retries with the deprecated
    /// `authorize-account` spelling. Failure here is not fatal: the CLI may
    /// still hold working cached credentials, so the caller proceeds either
    /// way.
    pub async fn authorize(&self, key_id: Option<&str>, application_key: &str) -> bool {
        let mut out = match key_id {
            Some(id) => {
                self.run(&["account", "authorize", id, application_key])
                    .await
            }
            None => self.run(&["account", "authorize"]).await,
        };
        if !out.success {
            out = match key_id {
                Some(id) => self.run(&["authorize-account", id, application_key]).await,
                None => self.run(&["authorize-account"]).await,
            };
        }

        if out.success {
            info!("CLI authorize OK");
        } else {
            warn!(
                "CLI authorize failed (or skipped): {}",
                out.stderr.trim()
            );
        }
        out.success
    }

    /// Best-effort lookup of the bucket's name from its id via
    /// `bucket list --json`. The modern update commands address buckets by
    /// name; no match just narrows the cascade to the by-id shape.
    pub async fn resolve_bucket_name(&self, bucket_id: &str) -> Option<String> {
        let out = self.run(&["bucket", "list", "--json"]).await;
        if !out.success {
            return None;
        }
        match_bucket_name(&out.stdout, bucket_id)
    }

    /// Walks the update cascade, stopping at the first shape that exits
    /// successfully.
    pub async fn apply_cors(
        &self,
        bucket_name: Option<&str>,
        bucket_id: &str,
        cors_payload: &str,
    ) -> bool {
        let attempts = cors_attempts(bucket_name, bucket_id, cors_payload);
        let mut last_stderr = String::new();

        for attempt in &attempts {
            let args: Vec<&str> = attempt.args.iter().map(String::as_str).collect();
            let out = self.run(&args).await;
            if out.success {
                info!("CLI {} succeeded", attempt.label);
                let stdout = out.stdout.trim();
                if !stdout.is_empty() {
                    info!("{}", stdout);
                }
                return true;
            }
            debug!("CLI {} failed: {}", attempt.label, out.stderr.trim());
            last_stderr = out.stderr;
        }

        warn!("CLI update attempts failed, will fall back to HTTP API. Commands tried:");
        for attempt in &attempts {
            warn!("  {} {}", self.path.display(), attempt.args.join(" "));
        }
        if !last_stderr.trim().is_empty() {
            warn!("Last CLI stderr: {}", last_stderr.trim());
        }
        false
    }

    /// Recovers the full account id from `account get`, preferring the
    /// structured output. Older CLI versions reject `--json`, so the
    /// plain-text report is parsed as a fallback.
    pub async fn account_id(&self) -> Option<String> {
        let out = self.run(&["account", "get", "--json"]).await;
        if out.success {
            if let Ok(value) = serde_json::from_str::<Value>(&out.stdout) {
                if let Some(id) = value["accountId"]
                    .as_str()
                    .or_else(|| value["account_id"].as_str())
                {
                    return Some(id.to_string());
                }
            }
        }

        let out = self.run(&["account", "get"]).await;
        if !out.success {
            return None;
        }
        parse_account_id_text(&format!("{}\n{}", out.stdout, out.stderr))
    }
}

/// Finds the bucket name for `bucket_id` in `bucket list --json` output.
fn match_bucket_name(listing: &str, bucket_id: &str) -> Option<String> {
    let buckets: Vec<Value> = serde_json::from_str(listing).ok()?;
    buckets
        .iter()
        .find(|bucket| bucket["bucketId"].as_str() == Some(bucket_id))
        .and_then(|bucket| bucket["bucketName"].as_str().map(str::to_string))
}

/// Pulls an account id out of the plain-text `account get` report. B2 account
/// ids carry a `00` prefix; anything else is not worth forwarding.
fn parse_account_id_text(text: &str) -> Option<String> {
    let pattern = Regex::new(r"(?i)account[_ ]?id[:\s]+(00[0-9a-zA-Z]+)").ok()?;
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(windows)]
fn default_install_path() -> Option<PathBuf> {
    // The py-launcher install location the ops runbook assumes.
    std::env::var_os("APPDATA").map(|appdata| {
        Path::new(&appdata)
            .join("Python")
            .join("Python313")
            .join("Scripts")
            .join("b2.exe")
    })
}

#[cfg(not(windows))]
fn default_install_path() -> Option<PathBuf> {
    None
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
