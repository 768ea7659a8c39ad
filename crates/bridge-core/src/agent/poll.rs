use std::time::{Duration, Instant};

use crate::agent::wire::{Decision, PollResponse};
use crate::service::{DecisionService, PendingPoll};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Not awaiting, or the interval has not elapsed.
    Idle,
    Started,
    /// A started poll has not come back yet.
    InFlight,
    Pending,
    Failed,
    Ready(Decision),
}

/// Asks the decision service for its answer, at most once per interval, while a published
/// state is awaiting a decision.
#[derive(Debug)]
pub struct PollController {
    interval: Duration,
    next_poll_at: Option<Instant>,
    in_flight: Option<PendingPoll>,
}

impl PollController {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_poll_at: None,
            in_flight: None,
        }
    }

    /// Makes the next tick poll. A poll still in flight belongs to an older state and is dropped.
    pub fn fire_now(&mut self, now: Instant) {
        self.in_flight = None;
        self.next_poll_at = Some(now);
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn tick(&mut self, awaiting: bool, service: &dyn DecisionService, now: Instant) -> PollStep {
        if !awaiting {
            self.in_flight = None;
            return PollStep::Idle;
        }

        if let Some(poll) = self.in_flight.as_mut() {
            let Some(result) = poll.try_take() else {
                return PollStep::InFlight;
            };
            self.in_flight = None;
            return match result {
                Ok(PollResponse::Pending) => {
                    tracing::debug!(target: "bridge.poll", "decision pending");
                    PollStep::Pending
                }
                Ok(PollResponse::Ready(decision)) => {
                    tracing::info!(
                        target: "bridge.poll",
                        action = %decision.action,
                        positions = ?decision.positions,
                        "decision ready"
                    );
                    PollStep::Ready(decision)
                }
                Err(err) => {
                    tracing::warn!(target: "bridge.poll", error = %err, "poll failed, retrying next interval");
                    PollStep::Failed
                }
            };
        }

        if self.next_poll_at.is_some_and(|at| now < at) {
            return PollStep::Idle;
        }
        self.in_flight = Some(service.request_action());
        self.next_poll_at = Some(now + self.interval);
        PollStep::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::agent::snapshot::SnapshotDocument;
    use crate::service::{TransportError, WinNotice};

    #[derive(Default)]
    struct ScriptedService {
        responses: Mutex<VecDeque<Result<PollResponse, TransportError>>>,
        requests: Mutex<usize>,
    }

    impl ScriptedService {
        fn with(responses: Vec<Result<PollResponse, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(0),
            }
        }

        fn requests(&self) -> usize {
            *self.requests.lock().unwrap()
        }
    }

    impl DecisionService for ScriptedService {
        fn publish_state(&self, _document: &SnapshotDocument) {}

        fn notify_win(&self, _notice: &WinNotice) {}

        fn request_action(&self) -> PendingPoll {
            *self.requests.lock().unwrap() += 1;
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PollResponse::Pending));
            PendingPoll::ready(next)
        }
    }

    #[test]
    fn polls_at_most_once_per_interval() {
        let service = ScriptedService::default();
        let mut poller = PollController::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert_eq!(poller.tick(true, &service, t0), PollStep::Started);
        assert_eq!(poller.tick(true, &service, t0 + Duration::from_millis(16)), PollStep::Pending);
        for ms in [100, 1_000, 4_999] {
            assert_eq!(
                poller.tick(true, &service, t0 + Duration::from_millis(ms)),
                PollStep::Idle
            );
        }
        assert_eq!(poller.tick(true, &service, t0 + Duration::from_secs(5)), PollStep::Started);
        assert_eq!(service.requests(), 2);
    }

    #[test]
    fn does_nothing_unless_awaiting() {
        let service = ScriptedService::default();
        let mut poller = PollController::new(Duration::from_secs(5));
        assert_eq!(poller.tick(false, &service, Instant::now()), PollStep::Idle);
        assert_eq!(service.requests(), 0);
    }

    #[test]
    fn failure_is_retried_on_the_next_interval() {
        let service = ScriptedService::with(vec![
            Err(TransportError::Dropped),
            Ok(PollResponse::Ready(Decision::new("skip_booster", vec![]))),
        ]);
        let mut poller = PollController::new(Duration::from_secs(5));
        let t0 = Instant::now();

        poller.tick(true, &service, t0);
        assert_eq!(poller.tick(true, &service, t0), PollStep::Failed);
        assert_eq!(poller.tick(true, &service, t0 + Duration::from_secs(1)), PollStep::Idle);
        assert_eq!(poller.tick(true, &service, t0 + Duration::from_secs(5)), PollStep::Started);
        assert_eq!(
            poller.tick(true, &service, t0 + Duration::from_secs(5)),
            PollStep::Ready(Decision::new("skip_booster", vec![]))
        );
    }

    #[test]
    fn unanswered_poll_stays_in_flight_and_fire_now_drops_it() {
        let service = ScriptedService::default();
        let mut poller = PollController::new(Duration::from_secs(5));
        let (_tx, stuck) = PendingPoll::channel();
        poller.in_flight = Some(stuck);
        let t0 = Instant::now();

        assert_eq!(poller.tick(true, &service, t0), PollStep::InFlight);
        assert_eq!(
            poller.tick(true, &service, t0 + Duration::from_secs(60)),
            PollStep::InFlight
        );

        poller.fire_now(t0);
        assert!(!poller.in_flight());
        assert_eq!(poller.tick(true, &service, t0), PollStep::Started);
    }
}
