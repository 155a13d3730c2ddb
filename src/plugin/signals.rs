//! Forwarding of termination signals to the supervised plugin.
//!
//! Signal dispositions are process-wide. [`SignalScope`] intercepts SIGINT and
//! SIGTERM while at least one scope is alive and puts the default disposition
//! back when the last one is dropped, so a signal arriving after the plugin
//! exited terminates the wrapper as usual.

use nix::sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use std::io;
use std::sync::{Mutex, MutexGuard};
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};
use tokio_util::sync::CancellationToken;

/// Signals relayed to the plugin.
pub const FORWARDED_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

struct Disposition {
    active: usize,
    // Handlers taken out while no scope was alive, re-armed by the next one.
    parked: Vec<(Signal, SigAction)>,
}

static DISPOSITION: Mutex<Disposition> = Mutex::new(Disposition {
    active: 0,
    parked: Vec::new(),
});

fn disposition() -> MutexGuard<'static, Disposition> {
    DISPOSITION.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Install `action` for `sig`, returning the previous one.
fn swap_action(sig: Signal, action: &SigAction) -> io::Result<SigAction> {
    // SAFETY: `action` is either SIG_DFL or a handler previously returned by
    // sigaction for the same signal, so no new handler code is introduced.
    unsafe { sigaction(sig, action) }.map_err(io::Error::from)
}

fn default_action() -> SigAction {
    SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty())
}

/// Handler currently installed for `sig`.
pub fn installed_handler(sig: Signal) -> io::Result<SigHandler> {
    let _state = disposition();
    let current = swap_action(sig, &default_action())?;
    swap_action(sig, &current)?;
    Ok(current.handler())
}

/// Streams of the signals received by the wrapper while a scope is alive.
pub struct SignalStreams {
    interrupt: SignalStream,
    terminate: SignalStream,
}

/// Interception of [`FORWARDED_SIGNALS`] for the lifetime of the guard.
pub struct SignalScope {
    _private: (),
}

impl SignalScope {
    /// Start intercepting. Must be called from within a tokio runtime.
    pub fn install() -> io::Result<(Self, SignalStreams)> {
        let mut state = disposition();

        if state.active == 0 {
            for (sig, action) in state.parked.drain(..) {
                swap_action(sig, &action)?;
            }
        }

        let streams = SignalStreams {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        };
        state.active += 1;

        Ok((Self { _private: () }, streams))
    }
}

impl Drop for SignalScope {
    fn drop(&mut self) {
        let mut state = disposition();
        state.active = state.active.saturating_sub(1);
        if state.active > 0 {
            return;
        }

        let default = default_action();
        for sig in FORWARDED_SIGNALS {
            match swap_action(sig, &default) {
                Ok(previous) => state.parked.push((sig, previous)),
                Err(e) => tracing::warn!("Failed to restore default handler for {}: {}", sig, e),
            }
        }
    }
}

/// Forward every intercepted signal to `pid` until `cancel` fires.
///
/// Cancellation is checked before pending signals, so once the supervisor
/// cancels after reaping the child nothing more is sent.
pub async fn relay_signals(pid: Pid, mut streams: SignalStreams, cancel: CancellationToken) {
    loop {
        let sig = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(()) = streams.interrupt.recv() => Signal::SIGINT,
            Some(()) = streams.terminate.recv() => Signal::SIGTERM,
        };

        match kill(pid, sig) {
            Ok(()) => tracing::info!("Forwarded {} to CNI plugin (pid {})", sig, pid),
            Err(e) => tracing::warn!("Failed to forward {} to CNI plugin (pid {}): {}", sig, pid, e),
        }
    }

    tracing::debug!("Signal relay for pid {} stopped", pid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_relay_stops_on_cancel() {
        let (scope, streams) = SignalScope::install().unwrap();
        let cancel = CancellationToken::new();
        let relay = tokio::spawn(relay_signals(Pid::this(), streams, cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .expect("relay did not stop")
            .unwrap();
        drop(scope);
    }

    #[tokio::test]
    async fn test_relay_already_cancelled() {
        let (_scope, streams) = SignalScope::install().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), relay_signals(Pid::this(), streams, cancel))
            .await
            .expect("relay did not stop");
    }

    #[tokio::test]
    async fn test_scopes_nest() {
        let (outer, _outer_streams) = SignalScope::install().unwrap();
        let (inner, _inner_streams) = SignalScope::install().unwrap();
        assert!(disposition().active >= 2);

        drop(inner);
        assert!(disposition().active >= 1);
        drop(outer);
    }
}
