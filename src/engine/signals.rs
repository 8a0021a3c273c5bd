//! Keeps SIGINT/SIGTERM from killing the supervisor while ffmpeg runs.
//!
//! ffmpeg needs a clean interrupt to flush its buffers and write the
//! container trailer. While a session is active, termination signals sent to
//! the supervisor are caught and forwarded to the child as SIGINT, so the
//! supervisor stays alive to reap the child and validate the output.
//!
//! A caught (not ignored) disposition is reset to the default on exec, so
//! the child starts with normal signal handling.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

/// "Run child with isolated signal delivery" primitive
pub trait SignalIsolation {
    /// Start intercepting termination signals. Called before the child is spawned.
    fn install(&self) -> io::Result<()>;

    /// Forward intercepted signals to `child_pid` from now on
    fn attach(&self, child_pid: u32);

    /// Put the previous dispositions back
    fn restore(&self);
}

/// Restores signal delivery when dropped, on every exit path
pub struct IsolationScope<'a> {
    isolation: &'a dyn SignalIsolation,
}

impl<'a> IsolationScope<'a> {
    pub fn enter(isolation: &'a dyn SignalIsolation) -> io::Result<Self> {
        isolation.install()?;
        Ok(Self { isolation })
    }
}

impl Drop for IsolationScope<'_> {
    fn drop(&mut self) {
        self.isolation.restore();
    }
}

const INTERCEPTED: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

static CHILD_PID: AtomicI32 = AtomicI32::new(0);
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn forward_signal(signo: libc::c_int) {
    // Async-signal-safe only: atomics and kill(2)
    PENDING_SIGNAL.store(signo, Ordering::SeqCst);
    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        // SAFETY: pid is the encoder child recorded by attach(); pid 0 is never signaled
        unsafe {
            libc::kill(pid, libc::SIGINT);
        }
    }
}

/// Most recent signal intercepted since the last call, if any
pub fn take_pending_signal() -> Option<i32> {
    match PENDING_SIGNAL.swap(0, Ordering::SeqCst) {
        0 => None,
        signo => Some(signo),
    }
}

/// Process-wide forwarder built on sigaction(2)
#[derive(Default)]
pub struct ForwardToChild {
    previous: Mutex<Vec<(libc::c_int, libc::sigaction)>>,
}

impl ForwardToChild {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalIsolation for ForwardToChild {
    fn install(&self) -> io::Result<()> {
        let mut previous = self
            .previous
            .lock()
            .map_err(|_| io::Error::other("signal state poisoned"))?;
        if !previous.is_empty() {
            return Ok(());
        }

        CHILD_PID.store(0, Ordering::SeqCst);
        PENDING_SIGNAL.store(0, Ordering::SeqCst);

        for signo in INTERCEPTED {
            // SAFETY: sigaction is a plain C struct; zeroed plus sigemptyset is a valid empty action
            unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = forward_signal as extern "C" fn(libc::c_int) as usize;
                action.sa_flags = libc::SA_RESTART;
                libc::sigemptyset(&mut action.sa_mask);

                let mut old: libc::sigaction = std::mem::zeroed();
                if libc::sigaction(signo, &action, &mut old) != 0 {
                    let err = io::Error::last_os_error();
                    drop(previous);
                    self.restore();
                    return Err(err);
                }
                previous.push((signo, old));
            }
        }
        Ok(())
    }

    fn attach(&self, child_pid: u32) {
        let pid = child_pid as i32;
        CHILD_PID.store(pid, Ordering::SeqCst);

        // A signal that landed between install() and spawn still reaches the child
        if pid > 0 && PENDING_SIGNAL.load(Ordering::SeqCst) != 0 {
            // SAFETY: pid is the freshly spawned encoder child
            unsafe {
                libc::kill(pid, libc::SIGINT);
            }
        }
    }

    fn restore(&self) {
        CHILD_PID.store(0, Ordering::SeqCst);

        let Ok(mut previous) = self.previous.lock() else {
            return;
        };
        for (signo, old) in previous.drain(..) {
            // SAFETY: `old` was filled in by the matching sigaction call in install()
            unsafe {
                if libc::sigaction(signo, &old, std::ptr::null_mut()) != 0 {
                    tracing::debug!(
                        "failed to restore handler for signal {}: {}",
                        signo,
                        io::Error::last_os_error()
                    );
                }
            }
        }
    }
}
