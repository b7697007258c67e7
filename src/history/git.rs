use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Read-only access to the version-control executable.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Runs git with `args` inside `repo` and returns stdout.
    ///
    /// Returns `None` when git cannot be spawned or exits non-zero.
    async fn run(&self, repo: &Path, args: &[&str]) -> Option<String>;
}

/// Shells out to the `git` binary.
pub struct GitCli {
    binary: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRunner for GitCli {
    async fn run(&self, repo: &Path, args: &[&str]) -> Option<String> {
        let output = match Command::new(&self.binary)
            .args(args)
            .current_dir(repo)
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!("Failed to spawn git {}: {e}", args.join(" "));
                return None;
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("git {} exited with {}: {}", args.join(" "), output.status, stderr.trim());
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
