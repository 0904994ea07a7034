//! Suspension source for timed waits
//!
//! Every delay in the playback pipeline goes through a [`Clock`] so tests can
//! drive the state machines without real time passing.

use std::time::Duration;

use async_trait::async_trait;

/// Something that can suspend the current task
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `tokio::time`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
