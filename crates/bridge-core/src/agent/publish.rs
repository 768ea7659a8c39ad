use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::agent::capture::{CaptureGate, GateStep};
use crate::agent::encoder::encode;
use crate::agent::snapshot::{FailedAction, Phase, SnapshotDocument};
use crate::service::{DecisionService, WinNotice};
use crate::world::Simulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    /// Not eligible this tick; the capture gate was reset.
    Ineligible,
    Waiting,
    Captured,
    Published,
    /// The freshly encoded document equals the last published one.
    Deduplicated,
    /// Round evaluation was advanced instead of published.
    AdvancedRoundEval,
}

/// Decides when the current game state is worth sending and sends it.
#[derive(Debug)]
pub struct PublishController {
    gate: CaptureGate,
    artifact_path: PathBuf,
    baseline: Option<SnapshotDocument>,
    awaiting_decision: bool,
    win_reported: bool,
}

impl PublishController {
    pub fn new(artifact_path: PathBuf, capture_delay: Duration, publish_delay: Duration) -> Self {
        Self {
            gate: CaptureGate::new(capture_delay, publish_delay),
            artifact_path,
            baseline: None,
            awaiting_decision: false,
            win_reported: false,
        }
    }

    pub fn awaiting_decision(&self) -> bool {
        self.awaiting_decision
    }

    pub fn baseline(&self) -> Option<&SnapshotDocument> {
        self.baseline.as_ref()
    }

    pub fn decision_received(&mut self) {
        self.awaiting_decision = false;
    }

    /// The next ready cycle publishes even when nothing changed.
    pub fn invalidate_baseline(&mut self) {
        self.baseline = None;
    }

    pub fn tick(
        &mut self,
        sim: &mut dyn Simulation,
        service: &dyn DecisionService,
        failure: Option<&FailedAction>,
        now: Instant,
    ) -> PublishStep {
        let phase = Phase::from_engine_state(sim.engine_state());
        let engine_idle = !sim.events_pending() && sim.frame_complete();

        if phase == Some(Phase::RoundEval) {
            self.gate.reset();
            if engine_idle {
                tracing::info!(target: "bridge.publish", "round eval: cashing out");
                sim.cash_out();
                return PublishStep::AdvancedRoundEval;
            }
            return PublishStep::Ineligible;
        }

        self.report_win(sim, service);

        let eligible = match phase {
            Some(Phase::GameOver) => true,
            Some(_) => engine_idle && !self.awaiting_decision,
            None => false,
        };
        if !eligible {
            self.gate.reset();
            return PublishStep::Ineligible;
        }

        match self.gate.advance(now) {
            GateStep::Waiting => PublishStep::Waiting,
            GateStep::CaptureNow => {
                tracing::debug!(
                    target: "bridge.capture",
                    path = %self.artifact_path.display(),
                    "capture requested"
                );
                sim.capture_frame(&self.artifact_path);
                PublishStep::Captured
            }
            GateStep::ReadyToPublish => self.publish(&*sim, service, failure),
        }
    }

    fn publish(
        &mut self,
        sim: &dyn Simulation,
        service: &dyn DecisionService,
        failure: Option<&FailedAction>,
    ) -> PublishStep {
        let Some(document) = encode(sim, failure) else {
            return PublishStep::Ineligible;
        };
        if self.baseline.as_ref() == Some(&document) {
            tracing::debug!(target: "bridge.publish", state = %document.phase(), "unchanged, not publishing");
            return PublishStep::Deduplicated;
        }
        tracing::info!(
            target: "bridge.publish",
            state = %document.phase(),
            failed = document.failed_action.is_some(),
            "publishing state"
        );
        service.publish_state(&document);
        self.awaiting_decision = true;
        self.baseline = Some(document);
        PublishStep::Published
    }

    /// One notice per run; a new run re-arms it.
    fn report_win(&mut self, sim: &dyn Simulation, service: &dyn DecisionService) {
        let progress = sim.progress();
        if !progress.won {
            self.win_reported = false;
            return;
        }
        if !self.win_reported {
            self.win_reported = true;
            tracing::info!(target: "bridge.publish", ante = progress.ante, round = progress.round, "run won");
            service.notify_win(&WinNotice::from_progress(&progress));
        }
    }
}
