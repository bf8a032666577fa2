//! Best-effort observability sink.
//!
//! Each scheduler can publish one [`DebugFrame`] per cycle: cycle timing, the
//! per-module wall times and the JSON rendering of every slot value. Frames
//! travel over a bounded [`flume`] channel and are *offered*, never awaited:
//! when the subscriber lags, frames are dropped rather than stalling the
//! control loop. Serialization is skipped entirely while nobody listens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::types::GroupKind;

/// Wall time one module spent in its `cycle()` this tick.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleTiming {
    /// The module's configuration name.
    pub module: String,
    /// Elapsed wall time of this module's cycle.
    pub elapsed: Duration,
}

/// One cycle's worth of introspection data for external tooling.
#[derive(Debug, Clone, Serialize)]
pub struct DebugFrame {
    /// The publishing execution group.
    pub group: GroupKind,
    /// The group's cycle counter at publication.
    pub cycle: u64,
    /// Wall-clock timestamp of publication.
    pub when: DateTime<Utc>,
    /// Wall time of the whole cycle.
    pub elapsed: Duration,
    /// Rolling average cycle time (60-sample window).
    pub average: Duration,
    /// Per-module wall times, in execution order.
    pub module_timings: Vec<ModuleTiming>,
    /// Every slot value of the group's store, keyed by data-kind name.
    pub values: FxHashMap<String, Value>,
}

/// Producer side of the debug channel. Cloneable; one sink can serve several
/// schedulers, whose frames interleave on the same stream.
#[derive(Clone)]
pub struct DebugSink {
    tx: flume::Sender<DebugFrame>,
}

impl DebugSink {
    /// Creates a sink/stream pair with a bounded capacity.
    #[must_use]
    pub fn bounded(capacity: usize) -> (DebugSink, DebugStream) {
        let (tx, rx) = flume::bounded(capacity);
        (DebugSink { tx }, DebugStream { rx })
    }

    /// Offers a frame without blocking.
    ///
    /// Returns `false` when the frame was dropped (channel full or stream
    /// gone).
    pub fn offer(&self, frame: DebugFrame) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    /// Whether any subscriber is currently attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

/// Consumer side of the debug channel.
pub struct DebugStream {
    rx: flume::Receiver<DebugFrame>,
}

impl DebugStream {
    /// Takes the next frame if one is ready.
    #[must_use]
    pub fn try_next(&self) -> Option<DebugFrame> {
        self.rx.try_recv().ok()
    }

    /// Waits for the next frame; `None` once all sinks are gone.
    pub async fn next(&self) -> Option<DebugFrame> {
        self.rx.recv_async().await.ok()
    }

    /// Drains everything currently buffered.
    #[must_use]
    pub fn drain(&self) -> Vec<DebugFrame> {
        self.rx.try_iter().collect()
    }
}
