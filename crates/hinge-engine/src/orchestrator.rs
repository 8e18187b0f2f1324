//! Turn orchestration.
//!
//! The only component that talks to the store, the pipeline, the stream and
//! the narrator together. Per campaign, at most one action resolves at a
//! time: a second submission while one is in flight is rejected as `Busy`
//! rather than queued. The receipt is written and then state committed,
//! both before anything is published or narrated.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, TryLockError};

use hinge_core::{
    Action, ActionId, ActionPayload, Campaign, CampaignId, CampaignView, HingeMoment,
    ProposalResult, TurnPhase, TurnResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{StoreError, SubmitResult, TurnError};
use crate::narrative::{NarrationDispatcher, NarrationRequest, NarrativeAdapter};
use crate::pipeline::TurnPipeline;
use crate::store::CampaignStore;
use crate::stream::EventStream;

/// Lifecycles kept for inspection, newest last.
const LIFECYCLE_HISTORY: usize = 128;

/// Phase history of one submitted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnLifecycle {
    pub action_id: ActionId,
    pub campaign_id: CampaignId,
    pub phase: TurnPhase,
    pub history: Vec<TurnPhase>,
}

impl TurnLifecycle {
    fn new(action: &Action) -> Self {
        Self {
            action_id: action.action_id.clone(),
            campaign_id: action.campaign_id.clone(),
            phase: TurnPhase::Idle,
            history: vec![TurnPhase::Idle],
        }
    }

    /// Move to `next`; illegal transitions are logged and ignored.
    fn advance(&mut self, next: TurnPhase) {
        if !self.phase.can_transition_to(next) {
            warn!(action = %self.action_id, from = %self.phase, to = %next, "illegal_phase_transition");
            return;
        }
        self.phase = next;
        self.history.push(next);
    }
}

/// Serializes turns per campaign and sequences persistence, streaming and
/// narration around the pure pipeline.
pub struct TurnOrchestrator {
    store: Arc<dyn CampaignStore>,
    pipeline: Arc<TurnPipeline>,
    locks: Mutex<HashMap<CampaignId, Arc<Mutex<()>>>>,
    stream: EventStream,
    narrator: Option<NarrationDispatcher>,
    lifecycles: Mutex<VecDeque<TurnLifecycle>>,
}

impl TurnOrchestrator {
    pub fn new(store: Arc<dyn CampaignStore>, config: EngineConfig) -> Self {
        Self::with_pipeline(store, TurnPipeline::standard(config))
    }

    pub fn with_pipeline(store: Arc<dyn CampaignStore>, pipeline: TurnPipeline) -> Self {
        let stream = EventStream::new(pipeline.config().stream_capacity);
        Self {
            store,
            pipeline: Arc::new(pipeline),
            locks: Mutex::new(HashMap::new()),
            stream,
            narrator: None,
            lifecycles: Mutex::new(VecDeque::new()),
        }
    }

    /// Attach a narrator. Ignored when narration is disabled in the config.
    pub fn with_narrator(mut self, adapter: Arc<dyn NarrativeAdapter>) -> Self {
        let config = &self.pipeline.config().narrative;
        if config.enabled {
            self.narrator = Some(NarrationDispatcher::new(adapter, config.timeout(), self.stream.clone()));
        } else {
            debug!(adapter = adapter.name(), "narration_disabled");
        }
        self
    }

    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    pub fn pipeline(&self) -> &TurnPipeline {
        &self.pipeline
    }

    pub fn narrator(&self) -> Option<&NarrationDispatcher> {
        self.narrator.as_ref()
    }

    // =========================================================================
    // Campaigns
    // =========================================================================

    pub fn create_campaign(&self, campaign: &Campaign) -> Result<CampaignView, TurnError> {
        self.store.create(campaign)?;
        Ok(campaign.view())
    }

    pub fn list(&self) -> Result<Vec<CampaignId>, TurnError> {
        Ok(self.store.list()?)
    }

    pub fn snapshot(&self, id: &CampaignId) -> Result<Campaign, TurnError> {
        Ok(self.store.load(id)?)
    }

    pub fn view(&self, id: &CampaignId) -> Result<CampaignView, TurnError> {
        Ok(self.store.load(id)?.view())
    }

    pub fn hinges(&self, id: &CampaignId) -> Result<Vec<HingeMoment>, TurnError> {
        Ok(self.store.load(id)?.hinges().to_vec())
    }

    pub fn delete(&self, id: &CampaignId) -> Result<(), TurnError> {
        let lock = self.campaign_lock(id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.store.delete(id)?;
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        info!(campaign = %id, "campaign_deleted");
        Ok(())
    }

    // =========================================================================
    // Turns
    // =========================================================================

    /// Preview a payload. Takes no lock and writes nothing.
    pub fn propose(&self, id: &CampaignId, payload: &ActionPayload) -> Result<ProposalResult, TurnError> {
        let campaign = self.store.load(id)?;
        let result = self.pipeline.preview(&campaign, payload)?;
        debug!(
            campaign = %id,
            action_type = %payload.action_type(),
            traversable = result.traversable,
            "proposal_previewed"
        );
        Ok(result)
    }

    /// Resolve and commit one action.
    ///
    /// Re-submitting a committed action id returns its stored result
    /// unchanged. An action built against an older version is rejected
    /// with `StaleState`.
    pub fn submit(&self, action: &Action) -> SubmitResult<TurnResult> {
        let lock = self.campaign_lock(&action.campaign_id);
        let guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                info!(campaign = %action.campaign_id, action = %action.action_id, "submit_busy");
                return Err(TurnError::Busy(action.campaign_id.clone()));
            }
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
        };

        let campaign = self.store.load(&action.campaign_id)?;
        if campaign.has_seen(&action.action_id) {
            return match self.store.load_receipt(&campaign.id, &action.action_id)? {
                Some(receipt) => {
                    info!(campaign = %campaign.id, action = %action.action_id, "duplicate_replayed");
                    Ok(receipt)
                }
                None => Err(TurnError::Duplicate(action.action_id.clone())),
            };
        }
        if action.state_version != campaign.state_version {
            info!(
                campaign = %campaign.id,
                action = %action.action_id,
                submitted = action.state_version,
                current = campaign.state_version,
                "submit_stale"
            );
            return Err(TurnError::StaleState {
                submitted: action.state_version,
                current: campaign.state_version,
            });
        }

        let mut lifecycle = TurnLifecycle::new(action);
        lifecycle.advance(TurnPhase::Proposed);
        lifecycle.advance(TurnPhase::Resolving);

        // The receipt lands before the snapshot so a committed action always
        // has one to replay. A receipt without a commit is never served.
        let committed = self
            .pipeline
            .execute(&campaign, action)
            .and_then(|outcome| {
                self.store.save_receipt(&campaign.id, &outcome.result)?;
                self.store
                    .commit(&outcome.campaign, campaign.state_version)
                    .map_err(|e| match e {
                        StoreError::StaleVersion { expected, found } => TurnError::StaleState {
                            submitted: expected,
                            current: found,
                        },
                        other => TurnError::Store(other),
                    })?;
                Ok(outcome)
            });
        let outcome = match committed {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(campaign = %campaign.id, action = %action.action_id, code = e.code(), error = %e, "turn_failed");
                lifecycle.advance(TurnPhase::Error);
                self.record(lifecycle);
                return Err(e);
            }
        };
        lifecycle.advance(TurnPhase::Resolved);

        let keep: Vec<ActionId> = outcome.campaign.recent_actions().cloned().collect();
        match self.store.prune_receipts(&campaign.id, &keep) {
            Ok(0) => {}
            Ok(pruned) => debug!(campaign = %campaign.id, pruned, "receipts_pruned"),
            Err(e) => warn!(campaign = %campaign.id, error = %e, "receipt_prune_failed"),
        }
        drop(guard);

        self.stream.publish_turn(&campaign.id, &outcome.result);
        match &self.narrator {
            Some(narrator) => {
                lifecycle.advance(TurnPhase::Narrating);
                narrator.dispatch(NarrationRequest::from_turn(&outcome.campaign, &outcome.result));
                lifecycle.advance(TurnPhase::Complete);
            }
            None => lifecycle.advance(TurnPhase::Complete),
        }
        self.record(lifecycle);
        Ok(outcome.result)
    }

    /// Most recent lifecycle recorded for `action_id`.
    pub fn lifecycle(&self, action_id: &ActionId) -> Option<TurnLifecycle> {
        self.lifecycles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|l| &l.action_id == action_id)
            .cloned()
    }

    fn record(&self, lifecycle: TurnLifecycle) {
        let mut lifecycles = self.lifecycles.lock().unwrap_or_else(|e| e.into_inner());
        lifecycles.push_back(lifecycle);
        while lifecycles.len() > LIFECYCLE_HISTORY {
            lifecycles.pop_front();
        }
    }

    fn campaign_lock(&self, id: &CampaignId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.clone())
            .or_default()
            .clone()
    }
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("pipeline", &self.pipeline)
            .field("narrator", &self.narrator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::test_support::two_region_campaign;
    use crate::error::StoreResult;
    use crate::store::MemoryCampaignStore;
    use hinge_core::{RegionId, TravelApproach};

    /// Memory store that refuses to keep receipts.
    #[derive(Default)]
    struct NoReceiptStore(MemoryCampaignStore);

    impl CampaignStore for NoReceiptStore {
        fn create(&self, campaign: &Campaign) -> StoreResult<()> {
            self.0.create(campaign)
        }

        fn load(&self, id: &CampaignId) -> StoreResult<Campaign> {
            self.0.load(id)
        }

        fn commit(&self, campaign: &Campaign, expected_version: u64) -> StoreResult<()> {
            self.0.commit(campaign, expected_version)
        }

        fn delete(&self, id: &CampaignId) -> StoreResult<()> {
            self.0.delete(id)
        }

        fn list(&self) -> StoreResult<Vec<CampaignId>> {
            self.0.list()
        }

        fn save_receipt(&self, _id: &CampaignId, _receipt: &TurnResult) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("receipt volume full")))
        }

        fn load_receipt(&self, id: &CampaignId, action_id: &ActionId) -> StoreResult<Option<TurnResult>> {
            self.0.load_receipt(id, action_id)
        }

        fn prune_receipts(&self, id: &CampaignId, keep: &[ActionId]) -> StoreResult<usize> {
            self.0.prune_receipts(id, keep)
        }
    }

    fn orchestrator() -> (TurnOrchestrator, Campaign) {
        let orchestrator = TurnOrchestrator::new(Arc::new(MemoryCampaignStore::new()), EngineConfig::default());
        let campaign = two_region_campaign();
        orchestrator.create_campaign(&campaign).unwrap();
        (orchestrator, campaign)
    }

    fn travel(campaign: &Campaign, id: &str, version: u64) -> Action {
        Action::new(
            id,
            campaign.id.clone(),
            ActionPayload::Travel {
                destination: RegionId::new("market"),
                approach: TravelApproach::RiskyTraversal,
            },
            version,
        )
    }

    #[test]
    fn test_submit_commits_and_records_lifecycle() {
        let (orchestrator, campaign) = orchestrator();
        let result = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap();

        assert_eq!(result.new_state_version, 1);
        assert_eq!(orchestrator.view(&campaign.id).unwrap().state_version, 1);
        let lifecycle = orchestrator.lifecycle(&"a1".into()).unwrap();
        assert_eq!(
            lifecycle.history,
            vec![
                TurnPhase::Idle,
                TurnPhase::Proposed,
                TurnPhase::Resolving,
                TurnPhase::Resolved,
                TurnPhase::Complete
            ]
        );
    }

    #[test]
    fn test_resubmission_replays_receipt() {
        let (orchestrator, campaign) = orchestrator();
        let first = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap();
        let again = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap();

        assert_eq!(again, first);
        assert_eq!(orchestrator.view(&campaign.id).unwrap().state_version, 1);
    }

    #[test]
    fn test_resubmission_without_receipt_is_duplicate() {
        let store = Arc::new(MemoryCampaignStore::new());
        let orchestrator = TurnOrchestrator::new(store.clone(), EngineConfig::default());
        let campaign = two_region_campaign();
        orchestrator.create_campaign(&campaign).unwrap();
        orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap();

        assert_eq!(store.prune_receipts(&campaign.id, &[]).unwrap(), 1);
        let err = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap_err();
        assert!(matches!(err, TurnError::Duplicate(ref id) if id.as_str() == "a1"));
        assert_eq!(err.code(), "DUPLICATE");
        assert_eq!(orchestrator.view(&campaign.id).unwrap().state_version, 1);
    }

    #[test]
    fn test_failed_receipt_write_commits_nothing() {
        let orchestrator = TurnOrchestrator::new(Arc::new(NoReceiptStore::default()), EngineConfig::default());
        let campaign = two_region_campaign();
        orchestrator.create_campaign(&campaign).unwrap();

        let err = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap_err();
        assert!(matches!(err, TurnError::Store(StoreError::Io(_))));
        assert_eq!(orchestrator.lifecycle(&"a1".into()).unwrap().phase, TurnPhase::Error);
        let view = orchestrator.view(&campaign.id).unwrap();
        assert_eq!(view.state_version, 0);
        assert_eq!(view.turn_count, 0);

        // The action never committed, so it is not a duplicate either.
        let err = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap_err();
        assert!(matches!(err, TurnError::Store(_)));
    }

    #[test]
    fn test_failed_validation_is_recorded_as_error() {
        let (orchestrator, campaign) = orchestrator();
        let mut action = travel(&campaign, "a1", 0);
        action.payload = ActionPayload::Travel {
            destination: RegionId::new("market"),
            approach: TravelApproach::Direct,
        };

        let err = orchestrator.submit(&action).unwrap_err();
        assert_eq!(err.code(), "REQUIREMENT_NOT_MET");
        assert_eq!(orchestrator.lifecycle(&"a1".into()).unwrap().phase, TurnPhase::Error);
        assert_eq!(orchestrator.view(&campaign.id).unwrap().state_version, 0);
    }

    #[test]
    fn test_held_lock_reports_busy() {
        let (orchestrator, campaign) = orchestrator();
        let lock = orchestrator.campaign_lock(&campaign.id);
        let _held = lock.lock().unwrap();

        let err = orchestrator.submit(&travel(&campaign, "a1", 0)).unwrap_err();
        assert!(matches!(err, TurnError::Busy(_)));
    }

    #[test]
    fn test_unknown_campaign_is_not_found() {
        let (orchestrator, _) = orchestrator();
        let err = orchestrator.view(&"missing".into()).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
