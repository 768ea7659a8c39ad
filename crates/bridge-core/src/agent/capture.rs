use std::time::{Duration, Instant};

/// Artifact capture gate state. The gate is re-armed from `Idle` on every eligible stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Armed { since: Instant },
    Captured { since: Instant },
}

/// What the caller should do after advancing the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStep {
    Waiting,
    /// Issue the one capture request for this cycle.
    CaptureNow,
    ReadyToPublish,
}

/// Delays a publish until a screenshot of the settled frame has been requested and written.
#[derive(Debug, Clone)]
pub struct CaptureGate {
    pub state: CaptureState,
    capture_delay: Duration,
    publish_delay: Duration,
}

impl CaptureGate {
    /// `publish_delay` is measured from arming, not from the capture.
    pub fn new(capture_delay: Duration, publish_delay: Duration) -> Self {
        Self {
            state: CaptureState::Idle,
            capture_delay,
            publish_delay: publish_delay.max(capture_delay),
        }
    }

    /// Advances on an eligible tick.
    pub fn advance(&mut self, now: Instant) -> GateStep {
        match self.state {
            CaptureState::Idle => {
                self.state = CaptureState::Armed { since: now };
                GateStep::Waiting
            }
            CaptureState::Armed { since } => {
                if now.saturating_duration_since(since) >= self.capture_delay {
                    self.state = CaptureState::Captured { since };
                    GateStep::CaptureNow
                } else {
                    GateStep::Waiting
                }
            }
            CaptureState::Captured { since } => {
                if now.saturating_duration_since(since) >= self.publish_delay {
                    self.state = CaptureState::Idle;
                    GateStep::ReadyToPublish
                } else {
                    GateStep::Waiting
                }
            }
        }
    }

    /// Called on ineligible ticks. Never captures.
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
    }

    pub fn is_idle(&self) -> bool {
        self.state == CaptureState::Idle
    }
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(2))
    }
}
