// Recording session supervision: launch ffmpeg, wait, finalize

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use thiserror::Error;
use uuid::Uuid;

use super::core::{CapturePlan, SessionLog, build_capture_cmd, format_ffmpeg_cmd, plan_summary};
use super::signals::{IsolationScope, SignalIsolation, take_pending_signal};

/// Outputs at or below this size almost always mean ffmpeg died at startup
pub const SMALL_OUTPUT_THRESHOLD: u64 = 4096;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to open session log: {0}")]
    LogUnavailable(String),

    #[error("Failed to intercept termination signals: {0}")]
    Signals(#[source] io::Error),

    #[error("Failed to start ffmpeg: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Building,
    CountingDown,
    Running,
    Finalizing,
    Succeeded,
    SmallOutput,
    NoOutput,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::SmallOutput | Self::NoOutput)
    }
}

/// Result of post-run validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Succeeded { bytes: u64 },
    SmallOutput { bytes: u64 },
    NoOutput,
}

impl OutputStatus {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Self::Succeeded { .. })
    }

    fn state(&self) -> SessionState {
        match self {
            Self::Succeeded { .. } => SessionState::Succeeded,
            Self::SmallOutput { .. } => SessionState::SmallOutput,
            Self::NoOutput => SessionState::NoOutput,
        }
    }
}

/// How the forced-cleanup path ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// No live child; nothing was signaled
    NotRunning,
    /// Child stopped within the grace period after SIGINT
    Interrupted,
    /// Child ignored SIGINT and was killed
    Killed,
}

/// Inspect the output file once the encoder is gone
pub fn validate_output(path: &Path) -> OutputStatus {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > SMALL_OUTPUT_THRESHOLD => OutputStatus::Succeeded {
            bytes: meta.len(),
        },
        Ok(meta) => OutputStatus::SmallOutput { bytes: meta.len() },
        Err(_) => OutputStatus::NoOutput,
    }
}

/// A running encoder process
pub trait ChildProcess {
    fn id(&self) -> u32;

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;

    fn wait(&mut self) -> io::Result<ExitStatus>;

    /// Ask for a graceful stop (SIGINT)
    fn interrupt(&mut self) -> io::Result<()>;

    /// SIGKILL
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts encoder processes
pub trait Launcher {
    /// Spawn `cmd` with its stdout and stderr appended to `log`
    fn spawn(&self, cmd: Command, log: File) -> io::Result<Box<dyn ChildProcess>>;
}

pub struct OsChild(Child);

impl ChildProcess for OsChild {
    fn id(&self) -> u32 {
        self.0.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.0.try_wait()
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        self.0.wait()
    }

    fn interrupt(&mut self) -> io::Result<()> {
        // SAFETY: the pid belongs to a child we have not reaped yet
        let ret = unsafe { libc::kill(self.0.id() as i32, libc::SIGINT) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.0.kill()
    }
}

pub struct OsLauncher;

impl Launcher for OsLauncher {
    fn spawn(&self, mut cmd: Command, log: File) -> io::Result<Box<dyn ChildProcess>> {
        let stderr_log = log.try_clone()?;
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(log));
        cmd.stderr(Stdio::from(stderr_log));
        // Own process group: terminal Ctrl+C reaches only the supervisor,
        // which forwards it exactly once
        cmd.process_group(0);
        let child = cmd.spawn()?;
        Ok(Box::new(OsChild(child)))
    }
}

/// Timing knobs for the forced-cleanup poll loop
#[derive(Debug, Clone, Copy)]
pub struct CleanupPolicy {
    pub grace_period: Duration,
    pub poll_interval: Duration,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(7),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Owns the encoder child for one session. Dropping the handle runs the
/// forced-cleanup path, so the child is never left orphaned.
pub struct SessionHandle {
    id: Uuid,
    child: Option<Box<dyn ChildProcess>>,
    pid: Option<u32>,
    output_path: PathBuf,
    termination_requested: bool,
    state: SessionState,
    outcome: Option<OutputStatus>,
    log: SessionLog,
    policy: CleanupPolicy,
}

impl SessionHandle {
    pub fn new(output_path: PathBuf, log: SessionLog, policy: CleanupPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            child: None,
            pid: None,
            output_path,
            termination_requested: false,
            state: SessionState::Idle,
            outcome: None,
            log,
            policy,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn termination_requested(&self) -> bool {
        self.termination_requested
    }

    fn set_state(&mut self, state: SessionState) {
        tracing::debug!("session {}: {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
    }

    /// A termination signal was already forwarded to the child; forced
    /// cleanup must not send another SIGINT
    fn record_forwarded_signal(&mut self, signo: i32) {
        self.termination_requested = true;
        self.note(&format!("Stop requested by signal {}", signo));
    }

    fn note(&self, message: &str) {
        self.log.write(&format!("[{}] {}", self.id, message)).ok();
    }

    pub fn attach(&mut self, child: Box<dyn ChildProcess>) {
        let pid = child.id();
        self.pid = Some(pid);
        self.child = Some(child);
        self.set_state(SessionState::Running);
        self.note(&format!("ffmpeg started (pid {})", pid));
    }

    /// Block until the child exits on its own. The child stays owned by the
    /// handle while waiting, so an unwinding supervisor still cleans it up.
    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| io::Error::other("no encoder process attached"))?;
        let status = child.wait()?;
        self.child = None;
        self.set_state(SessionState::Finalizing);
        self.note(&format!("ffmpeg exited: {}", status));
        Ok(status)
    }

    /// Forced cleanup: SIGINT, poll for the grace period, then SIGKILL and reap.
    /// Idempotent; a handle without a live child is a no-op.
    pub fn shutdown(&mut self) -> Cleanup {
        let Some(mut child) = self.child.take() else {
            return Cleanup::NotRunning;
        };
        if !self.state.is_terminal() {
            self.set_state(SessionState::Finalizing);
        }

        if let Ok(Some(status)) = child.try_wait() {
            self.note(&format!("ffmpeg already exited: {}", status));
            return Cleanup::NotRunning;
        }

        if !self.termination_requested {
            self.termination_requested = true;
            self.note("Stopping ffmpeg (SIGINT)");
            if let Err(e) = child.interrupt() {
                tracing::debug!("SIGINT to ffmpeg failed: {}", e);
            }
        }

        let deadline = Instant::now() + self.policy.grace_period;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.note(&format!("ffmpeg stopped: {}", status));
                    return Cleanup::Interrupted;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(self.policy.poll_interval),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("polling ffmpeg failed: {}", e);
                    break;
                }
            }
        }

        tracing::error!(
            "ffmpeg did not stop within {}s; killing it. {} may be corrupt",
            self.policy.grace_period.as_secs(),
            self.output_path.display()
        );
        self.note("ffmpeg ignored SIGINT; sent SIGKILL, output may be corrupt");
        if let Err(e) = child.kill() {
            tracing::debug!("SIGKILL to ffmpeg failed: {}", e);
        }
        if let Err(e) = child.wait() {
            tracing::debug!("reaping ffmpeg failed: {}", e);
        }
        Cleanup::Killed
    }

    /// Post-run validation. Runs exactly once; later calls return the first result.
    pub fn finish(&mut self) -> OutputStatus {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        let outcome = validate_output(&self.output_path);
        self.outcome = Some(outcome);
        self.set_state(outcome.state());

        let message = match outcome {
            OutputStatus::Succeeded { bytes } => format!(
                "Status: success ({} bytes) {}",
                bytes,
                self.output_path.display()
            ),
            OutputStatus::SmallOutput { bytes } => format!(
                "Status: warning, output is only {} bytes: {}",
                bytes,
                self.output_path.display()
            ),
            OutputStatus::NoOutput => format!(
                "Status: warning, no output produced at {}",
                self.output_path.display()
            ),
        };
        self.note(&message);
        outcome
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Rewrite a single status line once per tick until the countdown ends
pub fn countdown<W: Write>(secs: u32, out: &mut W, tick: Duration) -> io::Result<()> {
    if secs == 0 {
        return Ok(());
    }
    for remaining in (1..=secs).rev() {
        queue!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format!("Recording starts in {}...", remaining))
        )?;
        out.flush()?;
        thread::sleep(tick);
    }
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    out.flush()
}

/// What a finished session reports back to the CLI
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub exit_status: Option<ExitStatus>,
    pub cleanup: Cleanup,
    pub output: OutputStatus,
}

pub struct SupervisorOptions {
    pub countdown_secs: u32,
    pub tick: Duration,
    pub cleanup: CleanupPolicy,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            countdown_secs: 0,
            tick: Duration::from_secs(1),
            cleanup: CleanupPolicy::default(),
        }
    }
}

pub struct SessionSupervisor<'a> {
    launcher: &'a dyn Launcher,
    isolation: &'a dyn SignalIsolation,
    log: SessionLog,
    options: SupervisorOptions,
}

impl<'a> SessionSupervisor<'a> {
    pub fn new(
        launcher: &'a dyn Launcher,
        isolation: &'a dyn SignalIsolation,
        log: SessionLog,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            launcher,
            isolation,
            log,
            options,
        }
    }

    /// Build phase: assemble the command and record it in the session log
    pub fn prepare(&self, plan: &CapturePlan, handle: &mut SessionHandle) -> Command {
        handle.set_state(SessionState::Building);
        let cmd = build_capture_cmd(plan);

        for line in plan_summary(plan) {
            handle.note(&line);
        }
        handle.note(&format!("Command: {}", format_ffmpeg_cmd(&cmd)));
        cmd
    }

    /// Build, count down, launch, wait and validate one recording
    pub fn run<W: Write>(
        &self,
        plan: &CapturePlan,
        status_out: &mut W,
    ) -> Result<SessionOutcome, SessionError> {
        let mut handle = SessionHandle::new(
            plan.output_path.clone(),
            self.log.clone(),
            self.options.cleanup,
        );
        let cmd = self.prepare(plan, &mut handle);

        handle.set_state(SessionState::CountingDown);
        if let Err(e) = countdown(self.options.countdown_secs, status_out, self.options.tick) {
            tracing::debug!("countdown display failed: {}", e);
        }

        let sink = self
            .log
            .child_sink()
            .map_err(|e| SessionError::LogUnavailable(format!("{:#}", e)))?;

        let (exit_status, cleanup) = {
            let _scope = IsolationScope::enter(self.isolation).map_err(SessionError::Signals)?;
            let child = self.launcher.spawn(cmd, sink).map_err(SessionError::Spawn)?;
            self.isolation.attach(child.id());
            handle.attach(child);
            tracing::info!(
                "Recording to {} (Ctrl+C to stop)",
                handle.output_path().display()
            );

            match handle.wait() {
                Ok(status) => (Some(status), Cleanup::NotRunning),
                Err(e) => {
                    tracing::error!("Lost track of ffmpeg: {}", e);
                    if let Some(signo) = take_pending_signal() {
                        handle.record_forwarded_signal(signo);
                    }
                    (None, handle.shutdown())
                }
            }
        };

        if let Some(signo) = take_pending_signal() {
            handle.record_forwarded_signal(signo);
        }

        let output = handle.finish();
        Ok(SessionOutcome {
            session_id: handle.id(),
            exit_status,
            cleanup,
            output,
        })
    }
}
