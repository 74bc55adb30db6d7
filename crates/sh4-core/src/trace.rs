//! Structured event stream for observing core-internal transitions.
//!
//! The core never formats or stores events itself; it hands each one to a
//! caller-supplied [`TraceSink`] at the moment the transition becomes
//! architecturally visible. Hosts route them into their own logging, tests
//! capture them with [`RecordingSink`].

use crate::exception::ExceptionCode;

/// One observable core transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// The exception entry sequence ran for `code`.
    ExceptionEntered {
        /// Code whose entry sequence executed.
        code: ExceptionCode,
        /// Program counter saved into `SPC` by the entry sequence.
        previous_pc: u32,
        /// Handler address the program counter vectored to.
        handler_pc: u32,
    },
    /// An interrupt was latched as pending without being serviced yet.
    InterruptLatched {
        /// Latched interrupt code.
        code: ExceptionCode,
    },
    /// A first-level TLB slot was refilled from a second-level hit.
    ItlbRefilled {
        /// Direct-mapped first-level slot that was replaced.
        slot: usize,
        /// Virtual page number now held by the slot.
        vpn: u32,
    },
    /// Block translation finished, successfully or by fallback.
    BlockTranslated {
        /// Guest address of the block's first instruction.
        base_pc: u32,
        /// Number of guest instructions consumed.
        instruction_count: usize,
        /// Accumulated issue-cycle estimate for the block.
        cycle_count: u32,
    },
}

/// Receiver for core trace events.
pub trait TraceSink {
    /// Accepts one event; called synchronously at the transition point.
    fn record(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&mut self, _event: TraceEvent) {}
}

/// Sink that keeps every event in order, for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<TraceEvent>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Removes and returns all recorded events.
    pub fn drain(&mut self) -> Vec<TraceEvent> {
        core::mem::take(&mut self.events)
    }
}

impl TraceSink for RecordingSink {
    fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}
