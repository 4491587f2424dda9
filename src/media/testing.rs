//! Recording media engine for tests

use std::collections::HashMap;

use parking_lot::Mutex;

use super::descriptor::{SinkDescriptor, SourceDescriptor};
use super::engine::{FaultSender, MediaEngine, MediaError, MediaFault};

#[derive(Default)]
struct Recorded {
    next_id: u64,
    started: Vec<(SourceDescriptor, SinkDescriptor)>,
    stopped: usize,
    running: HashMap<u64, FaultSender>,
    fail_starts: usize,
}

/// Engine that records every path instead of running it
#[derive(Default)]
pub struct RecordingEngine {
    inner: Mutex<Recorded>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` starts
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().fail_starts = count;
    }

    /// Every successful start, in order
    pub fn started(&self) -> Vec<(SourceDescriptor, SinkDescriptor)> {
        self.inner.lock().started.clone()
    }

    pub fn start_count(&self) -> usize {
        self.inner.lock().started.len()
    }

    pub fn stop_count(&self) -> usize {
        self.inner.lock().stopped
    }

    pub fn running(&self) -> usize {
        self.inner.lock().running.len()
    }

    /// Report `fault` on every running path
    pub fn fault_all(&self, fault: MediaFault) {
        let mut inner = self.inner.lock();
        for (_, faults) in inner.running.drain() {
            let _ = faults.send(fault.clone());
        }
    }
}

impl MediaEngine for RecordingEngine {
    type Handle = u64;

    async fn start(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        faults: FaultSender,
    ) -> Result<u64, MediaError> {
        tokio::task::yield_now().await;

        let mut inner = self.inner.lock();
        if inner.fail_starts > 0 {
            inner.fail_starts -= 1;
            return Err(MediaError::Rejected(format!("{} -> {}", source, sink)));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.started.push((source.clone(), sink.clone()));
        inner.running.insert(id, faults);
        Ok(id)
    }

    async fn stop(&self, handle: u64) {
        let mut inner = self.inner.lock();
        inner.running.remove(&handle);
        inner.stopped += 1;
    }
}
