//! Fixed-cadence sampling loop: sample, emit one record, sleep, repeat until
//! a shutdown signal arrives.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::SamplingConfig;
use crate::error::AgentError;
use crate::provider::SnapshotProvider;
use crate::record::write_record;

/// Cooperative cancellation flag. Setting it only stores the flag and wakes a
/// sleeping sampler; the loop itself decides when to stop.
#[derive(Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            self.wake.notify_waiters();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Resolves once the flag is set.
    pub async fn wait(&self) {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        // register before checking so a trigger in between is not lost
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// Spawns a task that turns SIGINT/SIGTERM into [`Shutdown::trigger`].
/// Must be called from within a tokio runtime.
#[cfg(unix)]
pub fn install_signal_handlers(shutdown: &Shutdown) -> Result<JoinHandle<()>, AgentError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut int = signal(SignalKind::interrupt()).map_err(AgentError::Signal)?;
    let mut term = signal(SignalKind::terminate()).map_err(AgentError::Signal)?;
    let shutdown = shutdown.clone();
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = int.recv() => info!("received SIGINT, finishing current sample"),
                Some(()) = term.recv() => info!("received SIGTERM, finishing current sample"),
                else => break,
            }
            shutdown.trigger();
        }
    }))
}

#[cfg(not(unix))]
pub fn install_signal_handlers(shutdown: &Shutdown) -> Result<JoinHandle<()>, AgentError> {
    let shutdown = shutdown.clone();
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, finishing current sample");
            shutdown.trigger();
        }
    }))
}

/// Runs the sampling loop until shutdown or the first error, returning the
/// number of records written.
///
/// The provider is consumed: it is dropped (released) exactly once, whether
/// the loop ends through cancellation, a sampling error, or an output error.
/// Cancellation is only observed at the top of an iteration and while
/// sleeping, so every record written is complete.
pub async fn run<P, W>(
    cfg: &SamplingConfig,
    mut provider: P,
    sink: &mut W,
    interval: Duration,
    shutdown: &Shutdown,
) -> Result<u64, AgentError>
where
    P: SnapshotProvider,
    W: Write,
{
    let mut emitted = 0u64;
    loop {
        if shutdown.is_triggered() {
            debug!("shutdown flag set, leaving loop");
            break;
        }

        let snapshot = provider.sample(cfg)?;
        write_record(sink, cfg, &snapshot).map_err(AgentError::Output)?;
        emitted += 1;
        debug!(
            sample = snapshot.sample,
            uptime_s = snapshot.uptime().num_seconds(),
            "record written"
        );

        tokio::select! {
            _ = sleep(interval) => {}
            _ = shutdown.wait() => {
                debug!("sleep interrupted by shutdown");
                break;
            }
        }
    }
    Ok(emitted)
}
