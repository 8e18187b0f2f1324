//! Player intents: proposals (previews) and actions (commitments).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, CampaignId, DemandId, EnhancementId, FactionId, JobId, NpcId, RegionId};
use crate::leverage::DemandResponse;

/// Registry key for resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Travel,
    AcceptJob,
    CompleteJob,
    CallFavor,
    RespondToDemand,
    InitiateCombat,
    AcceptEnhancement,
    CommitChoice,
}

impl ActionType {
    pub const ALL: [ActionType; 8] = [
        ActionType::Travel,
        ActionType::AcceptJob,
        ActionType::CompleteJob,
        ActionType::CallFavor,
        ActionType::RespondToDemand,
        ActionType::InitiateCombat,
        ActionType::AcceptEnhancement,
        ActionType::CommitChoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Travel => "travel",
            Self::AcceptJob => "accept_job",
            Self::CompleteJob => "complete_job",
            Self::CallFavor => "call_favor",
            Self::RespondToDemand => "respond_to_demand",
            Self::InitiateCombat => "initiate_combat",
            Self::AcceptEnhancement => "accept_enhancement",
            Self::CommitChoice => "commit_choice",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the player intends to get past a region's route requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TravelApproach {
    /// Meet every requirement outright.
    #[default]
    Direct,
    /// Pay off whoever enforces faction-standing requirements.
    Bribe,
    /// Be vouched for by a warm contact.
    Contact { npc: NpcId },
    /// Slip through regardless, accepting exposure and the controller's ire.
    RiskyTraversal,
}

impl TravelApproach {
    pub fn label(&self) -> String {
        match self {
            Self::Direct => "direct route".to_string(),
            Self::Bribe => "bribe the checkpoint".to_string(),
            Self::Contact { npc } => format!("travel on {npc}'s word"),
            Self::RiskyTraversal => "risky traversal".to_string(),
        }
    }
}

/// What is asked of a contact when calling in a favor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FavorAsk {
    Introduction { faction: FactionId },
    Intel { region: RegionId },
    Resources,
}

impl fmt::Display for FavorAsk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Introduction { faction } => write!(f, "introduction to {faction}"),
            Self::Intel { region } => write!(f, "intel on {region}"),
            Self::Resources => f.write_str("resources"),
        }
    }
}

/// Typed payload of an action; the variant determines the [`ActionType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    Travel {
        destination: RegionId,
        #[serde(default)]
        approach: TravelApproach,
    },
    AcceptJob {
        job: JobId,
    },
    CompleteJob {
        job: JobId,
    },
    CallFavor {
        npc: NpcId,
        ask: FavorAsk,
    },
    RespondToDemand {
        demand: DemandId,
        response: DemandResponse,
    },
    InitiateCombat {
        target: NpcId,
    },
    AcceptEnhancement {
        offer: EnhancementId,
    },
    CommitChoice {
        situation: String,
        choice: String,
        #[serde(default)]
        reasoning: String,
        #[serde(default)]
        tags: Vec<String>,
    },
}

impl ActionPayload {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Travel { .. } => ActionType::Travel,
            Self::AcceptJob { .. } => ActionType::AcceptJob,
            Self::CompleteJob { .. } => ActionType::CompleteJob,
            Self::CallFavor { .. } => ActionType::CallFavor,
            Self::RespondToDemand { .. } => ActionType::RespondToDemand,
            Self::InitiateCombat { .. } => ActionType::InitiateCombat,
            Self::AcceptEnhancement { .. } => ActionType::AcceptEnhancement,
            Self::CommitChoice { .. } => ActionType::CommitChoice,
        }
    }
}

/// A read-only preview request. Never mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub campaign_id: CampaignId,
    pub payload: ActionPayload,
}

impl Proposal {
    pub fn action_type(&self) -> ActionType {
        self.payload.action_type()
    }
}

/// A confirmed intent that will cost exactly one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Idempotency key supplied by the caller.
    pub action_id: ActionId,
    pub campaign_id: CampaignId,
    pub payload: ActionPayload,
    /// Version the caller observed when confirming.
    pub state_version: u64,
    /// Explicit resolution seed; derived from the campaign when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Action {
    pub fn new(
        action_id: impl Into<ActionId>,
        campaign_id: impl Into<CampaignId>,
        payload: ActionPayload,
        state_version: u64,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            campaign_id: campaign_id.into(),
            payload,
            state_version,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.payload.action_type()
    }
}

/// One requirement line of a preview, phrased for the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub description: String,
    pub met: bool,
}

impl Requirement {
    pub fn new(description: impl Into<String>, met: bool) -> Self {
        Self {
            description: description.into(),
            met,
        }
    }
}

/// Everything an action would cost if confirmed. Always one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPreview {
    pub turns: u64,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub social_energy: i32,
    #[serde(default)]
    pub exposure: i32,
    #[serde(default)]
    pub standing: Vec<(FactionId, i32)>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for CostPreview {
    fn default() -> Self {
        Self {
            turns: 1,
            credits: 0,
            social_energy: 0,
            exposure: 0,
            standing: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// A ready-to-confirm variant of the proposed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub label: String,
    pub payload: ActionPayload,
    pub requirements: Vec<Requirement>,
    pub cost_preview: CostPreview,
    pub available: bool,
}

/// Result of previewing a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub action_type: ActionType,
    pub requirements: Vec<Requirement>,
    pub cost_preview: CostPreview,
    pub alternatives: Vec<Alternative>,
    /// `true` when every requirement is met and the action can be confirmed as-is.
    pub traversable: bool,
}

impl ProposalResult {
    pub fn failed_requirements(&self) -> Vec<String> {
        self.requirements
            .iter()
            .filter(|r| !r.met)
            .map(|r| r.description.clone())
            .collect()
    }
}
