use crate::ProcessError;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a finished invocation terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// Normal termination with an exit code.
    Exited(i32),
    /// Terminated by a signal, no exit code available.
    Signaled,
    /// Forcibly killed after exceeding the wall-clock limit.
    TimedOut,
}

#[derive(Debug)]
pub struct InvokeResult {
    pub outcome: InvokeOutcome,
    /// Full standard-error text, captured for diagnostics. Standard output
    /// is discarded: the checker writes its structured result to a file, and
    /// banner text on stdout is never a data channel.
    pub stderr: String,
}

impl InvokeResult {
    pub fn timed_out(&self) -> bool {
        self.outcome == InvokeOutcome::TimedOut
    }
}

/// Run `binary` with `args`, waiting at most `timeout`.
///
/// The child races against the deadline: whichever of normal exit and the
/// timer is observed first determines the outcome. A kill issued at the
/// deadline never reclassifies an exit that was already observed.
///
/// A missing executable is reported as [`ProcessError::NotFound`] so callers
/// can emit targeted remediation; all other spawn failures are
/// [`ProcessError::Spawn`].
pub fn invoke(binary: &Path, args: &[String], timeout: Duration) -> Result<InvokeResult, ProcessError> {
    debug!("invoking {} {:?}", binary.display(), args);

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound(binary.display().to_string())
            } else {
                ProcessError::Spawn {
                    binary: binary.display().to_string(),
                    source: e,
                }
            }
        })?;

    // Drain stderr on a separate thread so a chatty child cannot fill the
    // pipe and deadlock against our exit polling.
    let stderr_pipe = child.stderr.take();
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let outcome = loop {
        if let Some(status) = child.try_wait()? {
            break classify_exit(status);
        }
        if Instant::now() >= deadline {
            // Final check before killing: an exit that lands exactly at the
            // deadline still wins the race.
            if let Some(status) = child.try_wait()? {
                break classify_exit(status);
            }
            warn!(
                "{} exceeded {}s limit, killing",
                binary.display(),
                timeout.as_secs()
            );
            let _ = child.kill();
            let _ = child.wait();
            break InvokeOutcome::TimedOut;
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = reader.join().unwrap_or_default();
    Ok(InvokeResult { outcome, stderr })
}

fn classify_exit(status: std::process::ExitStatus) -> InvokeOutcome {
    match status.code() {
        Some(code) => InvokeOutcome::Exited(code),
        None => InvokeOutcome::Signaled,
    }
}
