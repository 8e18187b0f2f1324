//! Answering leverage demands.

use hinge_core::{Action, ActionPayload, ActionType, Campaign, ProposalResult};

use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::leverage;
use crate::resolver::{expect_payload, Resolver, ResolverContext};

#[derive(Debug, Default, Clone)]
pub struct DemandResponseResolver;

impl Resolver for DemandResponseResolver {
    fn action_type(&self) -> ActionType {
        ActionType::RespondToDemand
    }

    fn description(&self) -> &str {
        "Comply with, resist or negotiate a faction's demand"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, config: &EngineConfig) -> ResolverResult<ProposalResult> {
        match payload {
            ActionPayload::RespondToDemand { demand, response } => {
                Ok(leverage::preview_response(state, demand, *response, &config.leverage))
            }
            other => Err(ResolverError::PayloadMismatch {
                expected: ActionType::RespondToDemand,
                found: other.action_type(),
            }),
        }
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let (demand, response) = expect_payload!(action, ActionType::RespondToDemand,
            ActionPayload::RespondToDemand { demand, response } => (demand, *response));
        leverage::respond(state, demand, response, &action.action_id, ctx)
    }
}
