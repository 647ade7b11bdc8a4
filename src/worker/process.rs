//! Real worker process with tee'd output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Worker, WorkerOutput};
use crate::config::WorkerConfig;
use crate::error::{BatonError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
struct Chunk {
    stream: Stream,
    bytes: Vec<u8>,
}

/// Spawns the configured program, writes the payload to its stdin, and
/// captures stdout and stderr into one buffer while echoing them live.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    echo: bool,
}

impl ProcessWorker {
    /// Create a worker running `program` in `working_dir`.
    #[must_use]
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            echo: true,
        }
    }

    /// Create a worker from configuration.
    #[must_use]
    pub fn from_config(config: &WorkerConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self::new(config.command.clone(), working_dir).with_args(config.args.clone())
    }

    /// Set the arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Enable or disable forwarding output to this process's stdout/stderr.
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Resolve the program the way the spawned process will see it: bare
    /// names on `PATH`, relative paths against the working directory.
    fn resolve(&self) -> std::result::Result<PathBuf, which::Error> {
        which::which_in(&self.program, std::env::var_os("PATH"), &self.working_dir)
    }

    fn forward(&self, chunk: &Chunk) {
        if !self.echo {
            return;
        }
        let result = match chunk.stream {
            Stream::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(&chunk.bytes).and_then(|()| out.flush())
            }
            Stream::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(&chunk.bytes).and_then(|()| err.flush())
            }
        };
        if let Err(e) = result {
            debug!("Could not forward worker output: {}", e);
        }
    }
}

/// Anchor a program given as a relative path (`./agent.sh`, `bin/agent`)
/// to `base`. Bare names are left for `PATH` lookup.
#[must_use]
pub fn anchor_program(program: &str, base: &Path) -> String {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        base.join(path).to_string_lossy().into_owned()
    } else {
        program.to_string()
    }
}

/// Read `reader` line by line and send each line (with its newline) to `tx`.
async fn pump<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<Chunk>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut bytes = Vec::new();
        if reader.read_until(b'\n', &mut bytes).await? == 0 {
            return Ok(());
        }
        if tx.send(Chunk { stream, bytes }).is_err() {
            return Ok(());
        }
    }
}

#[async_trait]
impl Worker for ProcessWorker {
    fn name(&self) -> &str {
        &self.program
    }

    fn check_available(&self) -> Result<()> {
        self.resolve()
            .map(|path| debug!("Worker resolved to {}", path.display()))
            .map_err(|_| BatonError::MissingTool {
                tool: self.program.clone(),
            })
    }

    async fn invoke(&self, prompt: &str) -> Result<WorkerOutput> {
        let program = self
            .resolve()
            .map_err(|e| BatonError::worker_spawn(&self.program, e.to_string()))?;
        let mut child = Command::new(&program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BatonError::worker_spawn(&self.program, e.to_string()))?;

        debug!(
            "Spawned {} (pid {:?}) with {} byte payload",
            self.program,
            child.id(),
            prompt.len()
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BatonError::worker_spawn(&self.program, "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BatonError::worker_spawn(&self.program, "stderr not captured"))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(pump(stdout, Stream::Stdout, tx.clone()));
        let stderr_task = tokio::spawn(pump(stderr, Stream::Stderr, tx));

        // Feed stdin concurrently so a chatty worker cannot deadlock on a full pipe.
        let stdin = child.stdin.take();
        let payload = prompt.to_owned();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(payload.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut captured = String::new();
        while let Some(chunk) = rx.recv().await {
            self.forward(&chunk);
            captured.push_str(&String::from_utf8_lossy(&chunk.bytes));
        }

        for (label, task) in [("stdout", stdout_task), ("stderr", stderr_task)] {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Error reading worker {}: {}", label, e),
                Err(e) => warn!("Worker {} reader panicked: {}", label, e),
            }
        }

        match stdin_task.await {
            Ok(Ok(())) => {}
            // worker exited without reading everything
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                warn!("Worker closed stdin before reading the full payload");
            }
            Ok(Err(e)) => return Err(BatonError::worker_spawn(&self.program, e.to_string())),
            Err(e) => return Err(BatonError::worker_spawn(&self.program, e.to_string())),
        }

        let status = child
            .wait()
            .await
            .map_err(|e| BatonError::worker_spawn(&self.program, e.to_string()))?;

        Ok(WorkerOutput {
            text: captured,
            exit_code: status.code(),
        })
    }
}
