//! Live event stream for renderers.
//!
//! A broadcast channel of small, self-describing messages. Publishing never
//! blocks and never fails a turn: with no subscribers messages are dropped,
//! and slow subscribers see `Lagged` from the channel.

use hinge_core::{
    ActionId, CampaignId, ConnectivityTier, DemandId, DemandState, Event, EventPayload, FactionId,
    FeedEntry, RegionId, Severity, ThreadId, TurnResult,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Message pushed to stream subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    TurnStart {
        campaign_id: CampaignId,
        action_id: ActionId,
        turn: u64,
    },
    RegionChanged {
        campaign_id: CampaignId,
        from: RegionId,
        to: RegionId,
    },
    ConnectivityUpdated {
        campaign_id: CampaignId,
        region: RegionId,
        tier: ConnectivityTier,
    },
    FactionChanged {
        campaign_id: CampaignId,
        faction: FactionId,
        standing: i32,
        delta: i32,
    },
    ThreadSurfaced {
        campaign_id: CampaignId,
        thread: ThreadId,
        summary: String,
        severity: Severity,
    },
    DemandEscalated {
        campaign_id: CampaignId,
        demand: DemandId,
        faction: FactionId,
        state: DemandState,
    },
    TurnEnd {
        campaign_id: CampaignId,
        action_id: ActionId,
        turn: u64,
        state_version: u64,
        feed: Vec<FeedEntry>,
    },
    Narration {
        campaign_id: CampaignId,
        action_id: ActionId,
        text: String,
    },
    NarrationUnavailable {
        campaign_id: CampaignId,
        action_id: ActionId,
        reason: String,
    },
}

impl StreamMessage {
    /// Stream message for a single audit event, if it has one.
    pub fn from_event(campaign_id: &CampaignId, event: &Event) -> Option<Self> {
        let campaign_id = campaign_id.clone();
        let message = match &event.payload {
            EventPayload::RegionChanged { from, to } => Self::RegionChanged {
                campaign_id,
                from: from.clone(),
                to: to.clone(),
            },
            EventPayload::ConnectivityUpdated { region, to, .. } => Self::ConnectivityUpdated {
                campaign_id,
                region: region.clone(),
                tier: *to,
            },
            EventPayload::FactionStandingChanged {
                faction,
                current,
                delta,
                ..
            } => Self::FactionChanged {
                campaign_id,
                faction: faction.clone(),
                standing: *current,
                delta: *delta,
            },
            EventPayload::ThreadSurfaced {
                thread,
                summary,
                severity,
            } => Self::ThreadSurfaced {
                campaign_id,
                thread: thread.clone(),
                summary: summary.clone(),
                severity: *severity,
            },
            EventPayload::DemandStateChanged {
                demand, faction, to, ..
            } if *to >= DemandState::Escalating => Self::DemandEscalated {
                campaign_id,
                demand: demand.clone(),
                faction: faction.clone(),
                state: *to,
            },
            _ => return None,
        };
        Some(message)
    }

    pub fn campaign_id(&self) -> &CampaignId {
        match self {
            Self::TurnStart { campaign_id, .. }
            | Self::RegionChanged { campaign_id, .. }
            | Self::ConnectivityUpdated { campaign_id, .. }
            | Self::FactionChanged { campaign_id, .. }
            | Self::ThreadSurfaced { campaign_id, .. }
            | Self::DemandEscalated { campaign_id, .. }
            | Self::TurnEnd { campaign_id, .. }
            | Self::Narration { campaign_id, .. }
            | Self::NarrationUnavailable { campaign_id, .. } => campaign_id,
        }
    }
}

/// Cloneable handle to the broadcast channel.
#[derive(Debug, Clone)]
pub struct EventStream {
    tx: broadcast::Sender<StreamMessage>,
}

impl EventStream {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, message: StreamMessage) {
        // Err only means nobody is listening.
        if self.tx.send(message).is_err() {
            trace!("stream_no_subscribers");
        }
    }

    /// Publish a committed turn: start, one message per streamable event, end.
    pub fn publish_turn(&self, campaign_id: &CampaignId, result: &TurnResult) {
        self.publish(StreamMessage::TurnStart {
            campaign_id: campaign_id.clone(),
            action_id: result.action_id.clone(),
            turn: result.turn,
        });
        for event in &result.events {
            if let Some(message) = StreamMessage::from_event(campaign_id, event) {
                self.publish(message);
            }
        }
        self.publish(StreamMessage::TurnEnd {
            campaign_id: campaign_id.clone(),
            action_id: result.action_id.clone(),
            turn: result.turn,
            state_version: result.new_state_version,
            feed: result.feed.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let stream = EventStream::new(4);
        stream.publish(StreamMessage::Narration {
            campaign_id: "c".into(),
            action_id: "a".into(),
            text: "rain".to_string(),
        });
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[test]
    fn test_only_escalations_are_streamed() {
        let campaign: CampaignId = "c".into();
        let change = |to| {
            Event::root(
                &ActionId::new("a"),
                0,
                1,
                EventPayload::DemandStateChanged {
                    demand: "d".into(),
                    faction: "f".into(),
                    from: DemandState::Offered,
                    to,
                },
                Vec::new(),
            )
        };
        assert!(StreamMessage::from_event(&campaign, &change(DemandState::Active)).is_none());
        assert!(matches!(
            StreamMessage::from_event(&campaign, &change(DemandState::Called)),
            Some(StreamMessage::DemandEscalated { state: DemandState::Called, .. })
        ));
    }

    #[test]
    fn test_messages_are_tagged_by_type() {
        let json = serde_json::to_value(StreamMessage::FactionChanged {
            campaign_id: "c".into(),
            faction: "guild".into(),
            standing: 5,
            delta: -2,
        })
        .unwrap();
        assert_eq!(json["type"], "faction_changed");
        assert_eq!(json["campaign_id"], "c");
    }
}
