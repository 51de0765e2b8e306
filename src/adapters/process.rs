//! Shared plumbing for adapters that talk to an external command over
//! stdin/stdout.

use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};

/// Run `program args...`, write `input` to stdin and return stdout.
///
/// A non-zero exit or a timeout is a `DomainError::Process`. The limit
/// covers the whole exchange, stdin included; the child is killed when it
/// expires.
pub async fn run_command(
    program: &str,
    args: &[String],
    input: &[u8],
    limit: Duration,
) -> DomainResult<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DomainError::Process(format!("failed to spawn {program}: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| DomainError::Process(format!("{program}: no stdin handle")))?;

    // stdin is fed while stdout drains, so a child that stops reading can
    // still be timed out.
    let write = async move {
        match stdin.write_all(input).await {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
            _ => Ok(()),
        }
    };
    let exchange = async move { tokio::join!(write, child.wait_with_output()) };

    let (written, output) = timeout(limit, exchange)
        .await
        .map_err(|_| DomainError::Process(format!("{program} timed out after {limit:?}")))?;
    let output = output.map_err(|e| DomainError::Process(format!("{program}: {e}")))?;
    written.map_err(|e| DomainError::Process(format!("{program}: failed to write stdin: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DomainError::Process(format!(
            "{program} exited with code {:?}: {}",
            output.status.code(),
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!(program, bytes = stdout.len(), "command finished");
    Ok(stdout)
}

/// Split a configured `[program, args...]` vector.
pub fn split_command(command: &[String]) -> Option<(&str, &[String])> {
    command
        .split_first()
        .map(|(program, args)| (program.as_str(), args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_echoes_stdin() {
        let out = run_command("sh", &sh("cat"), b"{\"ok\":true}", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_limit_covers_unread_stdin() {
        let input = vec![b'x'; 1 << 20];
        let started = Instant::now();

        let err = run_command("sh", &sh("sleep 30"), &input, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_child_exiting_without_reading_reports_its_status() {
        let input = vec![b'x'; 1 << 20];
        let err = run_command("sh", &sh("exit 3"), &input, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with code Some(3)"), "{err}");
    }

    #[test]
    fn test_split_command() {
        let command = vec!["judge".to_string(), "--fast".to_string()];
        let (program, args) = split_command(&command).unwrap();
        assert_eq!(program, "judge");
        assert_eq!(args, ["--fast".to_string()]);
        assert!(split_command(&[]).is_none());
    }
}
