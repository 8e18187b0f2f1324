//! Turn commands: preview and commit actions.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hinge_core::{Action, ActionPayload, CampaignId, FeedTone, ProposalResult, TurnResult};
use hinge_engine::{StreamMessage, TemplateNarrator};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{turn_error, Session};
use crate::config::Config;

/// Parse a payload given inline or as `@path`.
pub fn parse_payload(raw: &str) -> Result<ActionPayload> {
    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file {path}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&json).with_context(|| "Payload is not a valid action")
}

pub fn propose(config: &Config, id: &str, payload: &str) -> Result<()> {
    let payload = parse_payload(payload)?;
    let session = Session::open(config)?;
    let result = session
        .orchestrator
        .propose(&CampaignId::new(id), &payload)
        .map_err(turn_error)?;
    print_proposal(&result);
    Ok(())
}

fn print_proposal(result: &ProposalResult) {
    let verdict = if result.traversable { "✅ possible" } else { "❌ blocked" };
    println!("{} {}", result.action_type, verdict);
    for requirement in &result.requirements {
        let mark = if requirement.met { "✓" } else { "✗" };
        println!("   {mark} {}", requirement.description);
    }

    let cost = &result.cost_preview;
    println!(
        "   cost: {} turn(s), credits {}, energy {}, exposure {}",
        cost.turns, cost.credits, cost.social_energy, cost.exposure
    );
    for (faction, delta) in &cost.standing {
        println!("   standing {faction} {delta:+}");
    }
    for note in &cost.notes {
        println!("   note: {note}");
    }

    if !result.alternatives.is_empty() {
        println!();
        println!("Alternatives:");
        for alternative in &result.alternatives {
            let mark = if alternative.available { "•" } else { "·" };
            println!("   {mark} {}", alternative.label);
            if let Ok(json) = serde_json::to_string(&alternative.payload) {
                println!("     {json}");
            }
        }
    }
}

/// Options of `hinge act`.
#[derive(Debug, Clone, Default)]
pub struct ActOptions {
    pub action_id: Option<String>,
    pub state_version: Option<u64>,
    pub narrate: bool,
    pub json: bool,
}

pub async fn act(config: &Config, id: &str, payload: &str, options: ActOptions) -> Result<()> {
    let payload = parse_payload(payload)?;
    let campaign_id = CampaignId::new(id);
    let mut session = Session::open(config)?;

    let state_version = match options.state_version {
        Some(version) => version,
        None => session.orchestrator.view(&campaign_id).map_err(turn_error)?.state_version,
    };
    let action_id = options
        .action_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    debug!(action = %action_id, state_version, "Submitting action");
    let action = Action::new(action_id, campaign_id, payload, state_version);

    let mut narration = None;
    if options.narrate {
        session.orchestrator = session
            .orchestrator
            .with_narrator(Arc::new(TemplateNarrator));
        narration = Some(session.orchestrator.stream().subscribe());
    }

    let result = session.orchestrator.submit(&action).map_err(turn_error)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if let Some(rx) = narration {
        let wait = session.orchestrator.pipeline().config().narrative.timeout() + Duration::from_secs(1);
        match await_narration(rx, &action, wait).await {
            Some(text) => println!("\n{text}"),
            None => warn!(action = %action.action_id, "No narration received"),
        }
    }
    Ok(())
}

fn print_result(result: &TurnResult) {
    println!(
        "Turn {} resolved (version {}){}",
        result.turn,
        result.new_state_version,
        if result.truncated { " - consequences truncated" } else { "" }
    );
    for entry in &result.feed {
        let mark = match entry.tone {
            FeedTone::Positive => "+",
            FeedTone::Negative => "-",
            FeedTone::Warning => "!",
            FeedTone::Neutral => "·",
        };
        println!("   {mark} {}", entry.text);
    }
}

async fn await_narration(
    mut rx: broadcast::Receiver<StreamMessage>,
    action: &Action,
    wait: Duration,
) -> Option<String> {
    let next = async {
        loop {
            match rx.recv().await {
                Ok(StreamMessage::Narration { action_id, text, .. }) if action_id == action.action_id => {
                    return Some(text);
                }
                Ok(StreamMessage::NarrationUnavailable { action_id, reason, .. })
                    if action_id == action.action_id =>
                {
                    return Some(format!("(narration unavailable: {reason})"));
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(wait, next).await.ok().flatten()
}
