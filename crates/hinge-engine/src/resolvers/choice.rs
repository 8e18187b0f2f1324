//! Narrative choices committed as hinge moments.

use hinge_core::{Action, ActionPayload, ActionType, Campaign, EventPayload, ProposalResult};

use super::Preview;
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{expect_payload, Resolver, ResolverContext};

/// Records an irreversible choice. The payload's tags travel with the
/// hinge event so dormant threads can wake on what was decided.
#[derive(Debug, Default, Clone)]
pub struct ChoiceResolver;

impl Resolver for ChoiceResolver {
    fn action_type(&self) -> ActionType {
        ActionType::CommitChoice
    }

    fn description(&self) -> &str {
        "Commit an irreversible choice"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, _config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::CommitChoice { situation, choice, .. } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::CommitChoice,
                found: payload.action_type(),
            });
        };
        let mut preview = Preview::new(ActionType::CommitChoice);
        preview
            .require("situation is described", !situation.trim().is_empty())
            .require("choice is stated", !choice.trim().is_empty());
        preview.cost_mut().notes.push(format!(
            "becomes hinge moment #{} and cannot be revised",
            state.hinges().len()
        ));
        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let (situation, choice, reasoning, choice_tags) = expect_payload!(action, ActionType::CommitChoice,
            ActionPayload::CommitChoice { situation, choice, reasoning, tags } => (situation, choice, reasoning, tags));

        let index = state
            .record_hinge(action.action_id.clone(), situation.as_str(), choice.as_str(), reasoning.as_str())
            .index();
        let mut event_tags = choice_tags.clone();
        event_tags.push("hinge".to_string());
        ctx.emit(
            EventPayload::HingeRecorded {
                index,
                situation: situation.clone(),
                choice: choice.clone(),
            },
            event_tags,
        );
        Ok(())
    }
}
