//! Pid file handling for the `start` / `stop` commands
//!
//! A running side records its pid in a file under the home directory; `stop`
//! reads it back and asks the system `kill` to send SIGTERM.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::process::Command;

/// Write the current process id to `path`
pub fn record_pid(path: &Path) -> Result<()> {
    let pid = std::process::id();
    std::fs::write(path, pid.to_string())
        .with_context(|| format!("Record pid {} to {:?} failed", pid, path))
}

/// Read a pid previously written by [`record_pid`]
///
/// Returns `Ok(None)` when there is no pid file.
pub fn read_pid(path: &Path) -> Result<Option<u32>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read pid file {:?}", path)),
    };

    let pid = content
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid pid file {:?}: {:?}", path, content))?;
    Ok(Some(pid))
}

/// Remove the pid file, ignoring a file that is already gone
pub fn remove_pid(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove pid file {:?}", path)),
    }
}

/// Send SIGTERM to the process recorded in `path`
///
/// A missing pid file means nothing is running and is not an error.
pub async fn signal_stop(path: &Path) -> Result<()> {
    let pid = match read_pid(path)? {
        Some(pid) => pid,
        None => {
            tracing::debug!("No pid file at {:?}, nothing to stop", path);
            return Ok(());
        }
    };

    let status = Command::new("kill")
        .arg(pid.to_string())
        .status()
        .await
        .context("Failed to run kill")?;

    if !status.success() {
        bail!("kill {} exited with {}", pid, status);
    }

    tracing::info!("Sent SIGTERM to process {}", pid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_read_pid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("side.pid");

        record_pid(&path).unwrap();
        assert_eq!(read_pid(&path).unwrap(), Some(std::process::id()));

        remove_pid(&path).unwrap();
        assert_eq!(read_pid(&path).unwrap(), None);

        // Removing twice is fine
        remove_pid(&path).unwrap();
    }

    #[test]
    fn test_read_pid_tolerates_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("side.pid");
        std::fs::write(&path, "4242\n").unwrap();

        assert_eq!(read_pid(&path).unwrap(), Some(4242));
    }

    #[test]
    fn test_read_pid_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("side.pid");
        std::fs::write(&path, "not-a-pid").unwrap();

        assert!(read_pid(&path).is_err());
    }

    #[tokio::test]
    async fn test_signal_stop_without_pid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.pid");

        signal_stop(&path).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_stop_terminates_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sleep.pid");
        std::fs::write(&path, pid.to_string()).unwrap();

        signal_stop(&path).await.unwrap();

        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}
