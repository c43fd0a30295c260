//! Job drivers: how a queued job actually gets executed.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// Everything a driver needs to launch one forward-model job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub script: PathBuf,
    pub run_path: PathBuf,
    pub args: Vec<String>,
    pub num_cpu: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Ok,
    Failed { reason: String },
    Killed,
}

/// Cooperative cancellation flag shared between the queue and the driver.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Seam between the queue and the execution backend. Production uses
/// [`ScriptDriver`]; tests inject closure-backed drivers.
pub trait JobDriver: Send + Sync {
    fn run(&self, spec: &JobSpec, cancel: &CancelToken) -> JobOutcome;
}

/// Runs the job script as a child process in the job's run directory,
/// polling for completion so cancellation can interrupt it.
#[derive(Debug, Clone)]
pub struct ScriptDriver {
    poll_interval: Duration,
}

impl ScriptDriver {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl Default for ScriptDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl JobDriver for ScriptDriver {
    fn run(&self, spec: &JobSpec, cancel: &CancelToken) -> JobOutcome {
        let mut child = match Command::new(&spec.script)
            .args(&spec.args)
            .current_dir(&spec.run_path)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                return JobOutcome::Failed {
                    reason: format!("failed to spawn {}: {err}", spec.script.display()),
                };
            }
        };

        loop {
            if cancel.is_cancelled() {
                if let Err(err) = child.kill() {
                    warn!(job = %spec.name, %err, "failed to kill child process");
                }
                let _ = child.wait();
                return JobOutcome::Killed;
            }
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return JobOutcome::Ok,
                Ok(Some(status)) => {
                    return JobOutcome::Failed {
                        reason: format!("job script exited with {status}"),
                    };
                }
                Ok(None) => std::thread::sleep(self.poll_interval),
                Err(err) => {
                    return JobOutcome::Failed {
                        reason: format!("wait failed: {err}"),
                    };
                }
            }
        }
    }
}
