// src/orchestrator/process.rs

//! Child scraper process supervision.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Output lines kept for the final report.
pub const TAIL_LINES: usize = 50;

/// How a supervised child ended.
#[derive(Debug)]
pub struct ChildReport {
    pub status: ExitStatus,
    /// Last output lines, oldest first
    pub tail: Vec<String>,
    /// The child was killed after Ctrl-C
    pub interrupted: bool,
}

impl ChildReport {
    pub fn success(&self) -> bool {
        self.status.success() && !self.interrupted
    }
}

/// Launches a scraper child and relays its console output.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    program: PathBuf,
    args: Vec<String>,
}

impl Orchestrator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run this executable's `interactive` command as the child.
    pub fn current_exe(config: Option<&std::path::Path>) -> Result<Self> {
        let mut orchestrator = Self::new(std::env::current_exe()?);
        if let Some(path) = config {
            orchestrator = orchestrator.arg("--config").arg(path.to_string_lossy());
        }
        Ok(orchestrator.arg("interactive"))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Spawn the child, feed it `script`, and pass every output line to
    /// `on_line` until it exits.
    ///
    /// Ctrl-C kills the child; the report then has `interrupted` set.
    pub async fn run(&self, script: &str, mut on_line: impl FnMut(&str)) -> Result<ChildReport> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::process(format!("failed to start {}: {e}", self.program.display()))
            })?;

        log::debug!("Started child process {:?}", child.id());

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::process("child stdin unavailable"))?;
        if let Err(e) = stdin.write_all(script.as_bytes()).await {
            log::warn!("Child stopped reading its input script: {}", e);
        }
        // Closing stdin marks the end of the script.
        drop(stdin);

        let (tx, mut rx) = mpsc::channel::<String>(256);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut tail = VecDeque::with_capacity(TAIL_LINES);
        let mut interrupted = false;

        loop {
            tokio::select! {
                line = rx.recv() => {
                    let Some(line) = line else { break };
                    on_line(&line);
                    if tail.len() == TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                signal = tokio::signal::ctrl_c(), if !interrupted => {
                    if let Err(e) = signal {
                        log::warn!("Ctrl-C handler unavailable: {}", e);
                    }
                    log::warn!("Interrupted; stopping child process");
                    interrupted = true;
                    child.start_kill()?;
                }
            }
        }

        let status = child.wait().await?;
        log::debug!("Child process exited with {}", status);

        Ok(ChildReport {
            status,
            tail: tail.into(),
            interrupted,
        })
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Orchestrator {
        Orchestrator::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_relays_stdout_and_stderr() {
        let mut seen = Vec::new();
        let report = shell("cat; echo oops >&2; exit 3")
            .run("4\ny\n", |line| seen.push(line.to_string()))
            .await
            .unwrap();

        assert_eq!(report.status.code(), Some(3));
        assert!(!report.success());
        assert!(!report.interrupted);
        for expected in ["4", "y", "oops"] {
            assert!(seen.iter().any(|l| l == expected), "missing {expected}");
        }
        assert_eq!(report.tail.len(), 3);
    }

    #[tokio::test]
    async fn test_tail_keeps_last_lines() {
        let report = shell("i=1; while [ $i -le 60 ]; do echo line $i; i=$((i+1)); done")
            .run("", |_| {})
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(report.tail.len(), TAIL_LINES);
        assert_eq!(report.tail.first().map(String::as_str), Some("line 11"));
        assert_eq!(report.tail.last().map(String::as_str), Some("line 60"));
    }

    #[tokio::test]
    async fn test_missing_program_is_process_error() {
        let result = Orchestrator::new("/nonexistent/scraper").run("", |_| {}).await;
        assert!(matches!(result, Err(AppError::Process(_))));
    }
}
