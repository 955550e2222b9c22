//! Optional child process hosting the correction service.
//!
//! When `service.launch_command` is configured the service is started next
//! to the key listener and killed when the app exits.  Its stdout/stderr are
//! forwarded to the log under the `service:` prefix.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

pub struct BackendProcess {
    child: Child,
    program: String,
}

impl BackendProcess {
    /// Spawn `command[0]` with the remaining elements as arguments.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(command: &[String]) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("service launch command is empty");
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start correction service: {program}"))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, false);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, true);
        }

        log::info!(
            "service: started '{}' (pid {})",
            program,
            child.id().map_or_else(|| "?".to_string(), |p| p.to_string())
        );

        Ok(Self {
            child,
            program: program.clone(),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// `true` once the child has exited.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Kill the child and reap it.
    pub async fn stop(mut self) -> Result<()> {
        if self.has_exited() {
            log::info!("service: '{}' already exited", self.program);
            return Ok(());
        }
        self.child
            .kill()
            .await
            .with_context(|| format!("failed to stop correction service: {}", self.program))?;
        log::info!("service: stopped '{}'", self.program);
        Ok(())
    }
}

fn forward_lines<R>(stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                log::warn!("service: {line}");
            } else {
                log::info!("service: {line}");
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
