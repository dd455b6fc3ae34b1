use std::sync::atomic::{AtomicBool, Ordering};

/// Whether a pipeline is in the middle of a command or file exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Exchanging,
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeState::Idle => write!(f, "idle"),
            ExchangeState::Exchanging => write!(f, "exchanging"),
        }
    }
}

/// `Idle -> Exchanging -> Idle` gate allowing one exchange at a time
#[derive(Debug, Default)]
pub struct ExchangeGate {
    exchanging: AtomicBool,
}

impl ExchangeGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ExchangeState {
        if self.exchanging.load(Ordering::Acquire) {
            ExchangeState::Exchanging
        } else {
            ExchangeState::Idle
        }
    }

    /// Move to `Exchanging`, or `None` if an exchange is already running.
    /// The gate returns to `Idle` when the ticket is dropped.
    pub fn begin(&self) -> Option<ExchangeTicket<'_>> {
        self.exchanging
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExchangeTicket { gate: self })
    }
}

/// Proof that the holder owns the current exchange
#[derive(Debug)]
pub struct ExchangeTicket<'a> {
    gate: &'a ExchangeGate,
}

impl Drop for ExchangeTicket<'_> {
    fn drop(&mut self) {
        self.gate.exchanging.store(false, Ordering::Release);
    }
}
