use std::time::Instant;

use crate::agent::dispatch::{DispatchOutcome, Dispatcher};
use crate::agent::poll::{PollController, PollStep};
use crate::agent::publish::{PublishController, PublishStep};
use crate::config::BridgeConfig;
use crate::service::DecisionService;
use crate::world::Simulation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// Capture gate armed or counting down.
    Waiting,
    Captured,
    Published,
    Deduplicated,
    AdvancedRoundEval,
    PollStarted,
    PollPending,
    PollFailed,
    Dispatched(DispatchOutcome),
}

/// Everything the bridge remembers between frames.
///
/// `tick` runs once per engine frame on the game thread. It never blocks: network calls are
/// started on one tick and collected on a later one.
pub struct Bridge<S: DecisionService> {
    service: S,
    publisher: PublishController,
    poller: PollController,
    dispatcher: Dispatcher,
}

impl<S: DecisionService> Bridge<S> {
    pub fn new(service: S, cfg: &BridgeConfig) -> Self {
        Self {
            service,
            publisher: PublishController::new(
                cfg.artifact_path.clone(),
                cfg.capture_delay(),
                cfg.publish_delay(),
            ),
            poller: PollController::new(cfg.poll_interval()),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn awaiting_decision(&self) -> bool {
        self.publisher.awaiting_decision()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn tick(&mut self, sim: &mut dyn Simulation, now: Instant) -> TickOutcome {
        let step = self
            .publisher
            .tick(sim, &self.service, self.dispatcher.last_failure(), now);
        match step {
            PublishStep::Published => {
                self.poller.fire_now(now);
                return TickOutcome::Published;
            }
            PublishStep::AdvancedRoundEval => return TickOutcome::AdvancedRoundEval,
            PublishStep::Captured => return TickOutcome::Captured,
            PublishStep::Ineligible | PublishStep::Waiting | PublishStep::Deduplicated => {}
        }

        match self
            .poller
            .tick(self.publisher.awaiting_decision(), &self.service, now)
        {
            PollStep::Ready(decision) => {
                self.publisher.decision_received();
                let outcome = self.dispatcher.apply(&decision, sim);
                // Failures and resend requests must reach the service even if nothing moved.
                // An applied action keeps the baseline: if it changed nothing, the next
                // document is deduplicated and the bridge stays quiet until the game moves.
                if !matches!(outcome, DispatchOutcome::Applied) {
                    self.publisher.invalidate_baseline();
                }
                TickOutcome::Dispatched(outcome)
            }
            PollStep::Started => TickOutcome::PollStarted,
            PollStep::Pending => TickOutcome::PollPending,
            PollStep::Failed => TickOutcome::PollFailed,
            PollStep::InFlight | PollStep::Idle => match step {
                PublishStep::Waiting => TickOutcome::Waiting,
                PublishStep::Deduplicated => TickOutcome::Deduplicated,
                _ => TickOutcome::Idle,
            },
        }
    }
}
