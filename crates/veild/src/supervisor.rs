//! Ollama lifecycle - probe the backend and start it when it is down.
//!
//! A spawned `ollama serve` gets its own process group so that it and the
//! runners it forks can be terminated together. The handle stops the group when
//! dropped, so cleanup is tied to the spawn itself.
//!
//! Concurrent callers may both see the backend down. Only one process is ever
//! held: while a spawned backend is still alive, later start attempts reuse it
//! and just poll.

use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use veil_common::OllamaConfig;

/// How long a stopped backend gets to exit before it is killed outright
const STOP_GRACE: Duration = Duration::from_secs(3);

/// Outcome of a reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Backend answered (any HTTP status)
    Reachable,
    /// Nothing is listening
    Refused,
    /// Timeout, DNS, or any other failure
    Failed(String),
}

/// A spawned backend process
#[derive(Debug)]
pub struct OllamaProcess {
    child: Child,
}

impl OllamaProcess {
    fn spawn(binary: &str) -> std::io::Result<Self> {
        let mut cmd = Command::new(binary);
        cmd.arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        Ok(Self { child: cmd.spawn()? })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate the whole process group and reap the child. Blocks up to `STOP_GRACE`.
    fn terminate(&mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!("Ollama process {} already exited: {}", self.pid(), status);
            return;
        }

        info!("Stopping Ollama server (pid {})", self.pid());
        self.signal_group();

        let deadline = std::time::Instant::now() + STOP_GRACE;
        while std::time::Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => std::thread::sleep(Duration::from_millis(100)),
                Err(e) => {
                    warn!("Failed to wait for Ollama process: {}", e);
                    break;
                }
            }
        }

        warn!("Ollama did not exit in {:?}, killing it", STOP_GRACE);
        if let Err(e) = self.child.kill() {
            warn!("Failed to kill Ollama process: {}", e);
        }
        let _ = self.child.wait();
    }

    #[cfg(unix)]
    fn signal_group(&mut self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // process_group(0) made the child its own group leader
        let pgid = Pid::from_raw(self.child.id() as i32);
        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            warn!("Error stopping Ollama server group {}: {}", pgid, e);
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Error stopping Ollama server: {}", e);
        }
    }
}

impl Drop for OllamaProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Owns the backend subprocess and answers "is the backend up?"
#[derive(Debug)]
pub struct OllamaSupervisor {
    config: OllamaConfig,
    http: reqwest::Client,
    process: Mutex<Option<OllamaProcess>>,
}

impl OllamaSupervisor {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .build()
            .context("Failed to create probe HTTP client")?;

        Ok(Self {
            config,
            http,
            process: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Single reachability probe against the model listing endpoint
    pub async fn probe(&self) -> Probe {
        match self.http.get(self.config.tags_url()).send().await {
            Ok(_) => Probe::Reachable,
            Err(e) if e.is_connect() && !e.is_timeout() => Probe::Refused,
            Err(e) => Probe::Failed(e.to_string()),
        }
    }

    pub async fn is_reachable(&self) -> bool {
        self.probe().await == Probe::Reachable
    }

    /// Make sure the backend answers, starting it if nothing is listening.
    pub async fn ensure_running(&self) -> bool {
        match self.probe().await {
            Probe::Reachable => {
                debug!("Ollama server already running");
                true
            }
            Probe::Failed(reason) => {
                warn!("Ollama probe failed, not starting a server: {}", reason);
                false
            }
            Probe::Refused => self.start().await,
        }
    }

    async fn start(&self) -> bool {
        info!("Ollama not reachable, starting `{} serve`", self.config.binary);

        if let Err(e) = self.spawn() {
            error!("Failed to start Ollama server: {}", e);
            return false;
        }

        let attempts = self.config.startup_attempts;
        for attempt in 1..=attempts {
            if self.is_reachable().await {
                info!("Ollama server is ready");
                return true;
            }
            info!("Waiting for Ollama server... ({}/{})", attempt, attempts);
            tokio::time::sleep(self.config.startup_interval()).await;
        }

        error!("Ollama server did not become ready after {} attempts", attempts);
        self.stop().await;
        false
    }

    /// Spawn a backend unless a live one is already held.
    fn spawn(&self) -> std::io::Result<()> {
        let mut held = self.process.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(process) = held.as_mut() {
            if process.is_alive() {
                debug!("Ollama server (pid {}) already starting", process.pid());
                return Ok(());
            }
        }

        let process = OllamaProcess::spawn(&self.config.binary)?;
        info!("Spawned Ollama server (pid {})", process.pid());

        // The replaced handle has exited, so dropping it does not wait
        *held = Some(process);
        Ok(())
    }

    /// Stop the backend if this supervisor started it. Idempotent.
    pub async fn stop(&self) {
        let process = self
            .process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(mut process) = process else {
            return;
        };

        if let Err(e) = tokio::task::spawn_blocking(move || process.terminate()).await {
            warn!("Ollama stop task failed: {}", e);
        }
    }

    /// Whether a spawned backend is currently held
    pub fn owns_process(&self) -> bool {
        self.process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
