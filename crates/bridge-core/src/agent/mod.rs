//! Bridge agent: turns engine state into published snapshots and decisions back into moves.
//!
//! One [`Bridge`] owns all state between frames. Per tick it runs the publish controller
//! (readiness, capture gate, encode, dedup, publish), then the poll controller, then hands any
//! ready decision to the dispatcher.

pub mod bridge;
pub mod capture;
pub mod dispatch;
pub mod encoder;
pub mod poll;
pub mod publish;
pub mod snapshot;
pub mod text;
pub mod wire;

pub use bridge::{Bridge, TickOutcome};
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher};
pub use encoder::encode;
pub use snapshot::{FailedAction, Phase, PhaseSection, SnapshotDocument};
pub use wire::{ActionKind, Decision, PollResponse};
