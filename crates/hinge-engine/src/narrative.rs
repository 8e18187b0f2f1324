//! Optional narrative collaborator.
//!
//! Narration runs after a turn is committed and only ever adds prose to the
//! stream. Failures and timeouts surface as `narration_unavailable`; the
//! committed state and the turn result are never affected.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hinge_core::{
    ActionId, Campaign, CampaignId, Disposition, EventPayload, HingeMoment, NpcId, TurnResult,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::NarrativeError;
use crate::stream::{EventStream, StreamMessage};

/// How many of the latest hinge moments are handed to the narrator.
const RECENT_HINGES: usize = 3;

/// An NPC the turn touched, with the tone the narrator should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcBrief {
    pub id: NpcId,
    pub name: String,
    pub disposition: Disposition,
    pub tone: Option<String>,
}

/// Everything a narrator may use. Built from committed data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub campaign_id: CampaignId,
    pub campaign_name: String,
    pub region: String,
    pub result: TurnResult,
    pub recent_hinges: Vec<HingeMoment>,
    pub npcs: Vec<NpcBrief>,
}

impl NarrationRequest {
    pub fn from_turn(campaign: &Campaign, result: &TurnResult) -> Self {
        let region = campaign
            .current_region()
            .map(|r| r.name.clone())
            .unwrap_or_else(|| campaign.player.current_region.to_string());

        let mut involved: Vec<&NpcId> = result
            .events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::DispositionShifted { npc, .. } | EventPayload::FavorCalled { npc, .. } => Some(npc),
                EventPayload::CombatResolved { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        involved.sort();
        involved.dedup();

        let npcs = involved
            .into_iter()
            .filter_map(|id| {
                campaign.npcs.get(id).map(|npc| NpcBrief {
                    id: id.clone(),
                    name: npc.name.clone(),
                    disposition: npc.disposition,
                    tone: npc.current_modifier().map(|m| m.tone.clone()),
                })
            })
            .collect();

        let hinges = campaign.hinges();
        Self {
            campaign_id: campaign.id.clone(),
            campaign_name: campaign.name.clone(),
            region,
            result: result.clone(),
            recent_hinges: hinges[hinges.len().saturating_sub(RECENT_HINGES)..].to_vec(),
            npcs,
        }
    }

    pub fn action_id(&self) -> &ActionId {
        &self.result.action_id
    }
}

/// Turns a committed turn into prose.
#[async_trait]
pub trait NarrativeAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrativeError>;
}

/// Offline narrator that stitches the feed into a paragraph.
#[derive(Debug, Default, Clone)]
pub struct TemplateNarrator;

#[async_trait]
impl NarrativeAdapter for TemplateNarrator {
    fn name(&self) -> &str {
        "template"
    }

    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrativeError> {
        let mut text = format!("Turn {} finds you in {}.", request.result.turn, request.region);
        for entry in &request.result.feed {
            text.push(' ');
            text.push_str(&entry.text);
            text.push('.');
        }
        for npc in &request.npcs {
            if let Some(tone) = &npc.tone {
                text.push_str(&format!(" {} is {}.", npc.name, tone));
            }
        }
        Ok(text)
    }
}

/// Runs an adapter under a timeout and publishes what it produced.
#[derive(Clone)]
pub struct NarrationDispatcher {
    adapter: Arc<dyn NarrativeAdapter>,
    timeout: Duration,
    stream: EventStream,
}

impl NarrationDispatcher {
    pub fn new(adapter: Arc<dyn NarrativeAdapter>, timeout: Duration, stream: EventStream) -> Self {
        Self {
            adapter,
            timeout,
            stream,
        }
    }

    /// Narrate inline, bounded by the timeout.
    pub async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrativeError> {
        match tokio::time::timeout(self.timeout, self.adapter.narrate(request)).await {
            Ok(result) => result,
            Err(_) => Err(NarrativeError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Narrate in the background, publishing the text or the failure.
    ///
    /// Returns `None` without a tokio runtime; the failure is published.
    pub fn dispatch(&self, request: NarrationRequest) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(action = %request.action_id(), "narration_skipped_no_runtime");
            self.publish_unavailable(&request, "no async runtime".to_string());
            return None;
        };

        let dispatcher = self.clone();
        Some(handle.spawn(async move {
            match dispatcher.narrate(&request).await {
                Ok(text) => {
                    debug!(action = %request.action_id(), adapter = dispatcher.adapter.name(), "narration_ready");
                    dispatcher.stream.publish(StreamMessage::Narration {
                        campaign_id: request.campaign_id.clone(),
                        action_id: request.action_id().clone(),
                        text,
                    });
                }
                Err(e) => {
                    warn!(action = %request.action_id(), error = %e, "narration_unavailable");
                    dispatcher.publish_unavailable(&request, e.to_string());
                }
            }
        }))
    }

    fn publish_unavailable(&self, request: &NarrationRequest, reason: String) {
        self.stream.publish(StreamMessage::NarrationUnavailable {
            campaign_id: request.campaign_id.clone(),
            action_id: request.action_id().clone(),
            reason,
        });
    }
}

impl fmt::Debug for NarrationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationDispatcher")
            .field("adapter", &self.adapter.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::TurnPipeline;
    use crate::resolvers::test_support::{action, two_region_campaign};
    use hinge_core::{ActionPayload, RegionId, TravelApproach};

    struct Sleepy;

    #[async_trait]
    impl NarrativeAdapter for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        async fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrativeError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    fn request() -> NarrationRequest {
        let pipeline = TurnPipeline::standard(EngineConfig::default());
        let campaign = two_region_campaign();
        let act = action(
            &campaign,
            "n1",
            ActionPayload::Travel {
                destination: RegionId::new("market"),
                approach: TravelApproach::RiskyTraversal,
            },
        );
        let outcome = pipeline.execute(&campaign, &act).unwrap();
        NarrationRequest::from_turn(&outcome.campaign, &outcome.result)
    }

    #[tokio::test]
    async fn test_template_narrator_mentions_region() {
        let request = request();
        let text = TemplateNarrator.narrate(&request).await.unwrap();
        assert!(text.starts_with("Turn 1 finds you in Drowned Market."));
    }

    #[tokio::test]
    async fn test_timeout_publishes_unavailable() {
        let stream = EventStream::new(8);
        let mut rx = stream.subscribe();
        let dispatcher = NarrationDispatcher::new(Arc::new(Sleepy), Duration::from_millis(20), stream);

        dispatcher.dispatch(request()).unwrap().await.unwrap();

        match rx.recv().await.unwrap() {
            StreamMessage::NarrationUnavailable { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_without_runtime_reports_unavailable() {
        let stream = EventStream::new(8);
        let mut rx = stream.subscribe();
        let dispatcher = NarrationDispatcher::new(Arc::new(TemplateNarrator), Duration::from_secs(1), stream);

        assert!(dispatcher.dispatch(request()).is_none());
        assert!(matches!(
            rx.try_recv(),
            Ok(StreamMessage::NarrationUnavailable { .. })
        ));
    }
}
