//! Shutdown Signal - Cooperative Cancellation for the Worker
//!
//! A one-way flag flipped by the signal handler in `main`. The worker
//! checks it between steps and wakes early from timed sleeps; in-flight
//! relay and RPC calls are never interrupted.

use std::time::Duration;

use tokio::sync::watch;

/// Receiving side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
  rx: watch::Receiver<bool>,
}

/// Sending side, owned by the signal handler.
#[derive(Debug)]
pub struct ShutdownTrigger {
  tx: watch::Sender<bool>,
}

/// Create a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
  let (tx, rx) = watch::channel(false);
  (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
  /// Request shutdown. Returns `false` if it was already requested.
  pub fn trigger(&self) -> bool {
    self.tx.send_if_modified(|requested| {
      if *requested {
        false
      } else {
        *requested = true;
        true
      }
    })
  }

  /// New receiver observing this trigger.
  pub fn subscribe(&self) -> ShutdownSignal {
    ShutdownSignal {
      rx: self.tx.subscribe(),
    }
  }
}

impl ShutdownSignal {
  /// A signal that never fires (tests, one-shot runs).
  pub fn never() -> Self {
    let (_tx, rx) = watch::channel(false);
    Self { rx }
  }

  pub fn is_requested(&self) -> bool {
    *self.rx.borrow()
  }

  /// Sleep for `duration` unless shutdown is requested first.
  ///
  /// Returns `true` when the full duration elapsed, `false` on shutdown.
  pub async fn sleep(&mut self, duration: Duration) -> bool {
    if self.is_requested() {
      return false;
    }
    let elapsed = tokio::select! {
      biased;
      () = Self::requested(&mut self.rx) => false,
      () = tokio::time::sleep(duration) => true,
    };
    elapsed && !self.is_requested()
  }

  /// Resolve once shutdown is requested.
  pub async fn wait(&mut self) {
    Self::requested(&mut self.rx).await;
  }

  async fn requested(rx: &mut watch::Receiver<bool>) {
    // A dropped sender can never request shutdown: pend forever.
    if rx.wait_for(|requested| *requested).await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}
