//! Process-backed evidence queries
//!
//! Probes describe *what* to ask (a PowerShell script); this module decides
//! *how* it runs: spawn the interpreter, wait with a timeout, and hand back
//! stdout. Non-Windows hosts get [`UnsupportedQuery`], which fails every
//! query so probes degrade instead of running Windows tooling.

use super::{ProbeError, ProbeResult, SystemQuery};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default per-query timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runs scripts through an interpreter such as `powershell.exe`
#[derive(Debug, Clone)]
pub struct CommandQuery {
    program: String,
    /// Arguments placed before the script text
    prefix_args: Vec<String>,
    timeout: Duration,
}

impl CommandQuery {
    pub fn new(program: impl Into<String>, prefix_args: &[&str]) -> Self {
        Self {
            program: program.into(),
            prefix_args: prefix_args.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Hidden, profile-less PowerShell
    pub fn powershell() -> Self {
        Self::new(
            "powershell.exe",
            &[
                "-NoLogo",
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
            ],
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn wait(&self, mut child: Child) -> ProbeResult<String> {
        // Drain both pipes on their own threads so a chatty command cannot
        // fill the pipe buffer and stall before exiting.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!("{} timed out after {:?}", self.program, self.timeout);
                        return Err(ProbeError::Timeout {
                            secs: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Err(source) => {
                    return Err(ProbeError::Spawn {
                        program: self.program.clone(),
                        source,
                    })
                }
            }
        };

        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();

        if !status.success() {
            let output = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(ProbeError::NonZeroExit {
                code: status.code().unwrap_or(-1),
                output: output.trim().to_string(),
            });
        }

        Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl SystemQuery for CommandQuery {
    fn run(&self, script: &str) -> ProbeResult<String> {
        debug!("Running {} query: {}", self.program, script);
        let child = Command::new(&self.program)
            .args(&self.prefix_args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        self.wait(child)
    }
}

/// Query source for hosts the probes cannot inspect
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedQuery {
    platform: &'static str,
}

impl UnsupportedQuery {
    pub fn new(platform: &'static str) -> Self {
        Self { platform }
    }
}

impl SystemQuery for UnsupportedQuery {
    fn run(&self, _script: &str) -> ProbeResult<String> {
        Err(ProbeError::Unsupported {
            platform: self.platform,
        })
    }
}

/// Query source for the current host
pub fn default_query() -> Arc<dyn SystemQuery> {
    if cfg!(windows) {
        Arc::new(CommandQuery::powershell())
    } else {
        debug!("Non-Windows host; probes will report degraded outcomes");
        Arc::new(UnsupportedQuery::new(std::env::consts::OS))
    }
}
