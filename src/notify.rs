//! Change notification
//!
//! A level-triggered broadcast: [`ChangeNotifier::signal`] bumps a generation
//! counter and wakes every [`ChangeWatcher`]. No payload travels with the
//! wake; watchers re-read the latest snapshot, so several signals that land
//! before a watcher wakes collapse into one wake.

use tokio::sync::watch;

/// Broadcast "state changed" to any number of watchers
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Wake every watcher
    pub fn signal(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Create a watcher that wakes on the next signal
    ///
    /// Signals sent before this call are not observed.
    pub fn subscribe(&self) -> ChangeWatcher {
        ChangeWatcher {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of signals sent so far
    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Number of live watchers
    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of a [`ChangeNotifier`]
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    rx: watch::Receiver<u64>,
}

impl ChangeWatcher {
    /// Wait until at least one signal was sent since the last wake
    ///
    /// Returns `false` once the notifier is gone.
    pub async fn wait(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
