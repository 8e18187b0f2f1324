//! Campaign seeds: the authored starting state of a campaign, as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use hinge_core::{
    ActionId, Campaign, CampaignId, DormantThread, EnhancementId, EnhancementOffer, FactionId,
    FactionLink, FactionState, Job, JobId, Npc, NpcId, PlayerState, RegionId, RegionState,
    RouteRequirement, Severity, ThreadConsequence, ThreadId, TriggerCondition,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

const SAMPLE_SEED: &str = include_str!("../seeds/drowned_market.json");

/// Origin recorded on threads that were authored rather than caused.
const SEED_ORIGIN: &str = "seed";

/// A dormant thread authored into the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedThread {
    pub id: ThreadId,
    pub trigger: TriggerCondition,
    pub consequence: ThreadConsequence,
    #[serde(default)]
    pub severity: Severity,
}

/// Authored starting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSeed {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    pub player: PlayerState,
    pub regions: BTreeMap<RegionId, RegionState>,
    pub factions: BTreeMap<FactionId, FactionState>,
    #[serde(default)]
    pub faction_links: Vec<FactionLink>,
    #[serde(default)]
    pub npcs: BTreeMap<NpcId, Npc>,
    #[serde(default)]
    pub jobs: BTreeMap<JobId, Job>,
    #[serde(default)]
    pub enhancement_offers: BTreeMap<EnhancementId, EnhancementOffer>,
    #[serde(default)]
    pub threads: Vec<SeedThread>,
}

fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { field, message }
}

impl CampaignSeed {
    /// Load and validate a seed file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let seed: CampaignSeed = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        seed.validate()?;
        debug!(path = %path.display(), name = %seed.name, "Loaded campaign seed");
        Ok(seed)
    }

    /// Check that every reference points at something the seed defines.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let region = |id: &RegionId| self.regions.contains_key(id);
        let faction = |id: &FactionId| self.factions.contains_key(id);

        if !region(&self.player.current_region) {
            return Err(invalid(
                "player.current_region",
                format!("unknown region {}", self.player.current_region),
            ));
        }
        for (id, r) in &self.regions {
            if let Some(missing) = r.adjacent.iter().find(|a| !region(a)) {
                return Err(invalid("regions.adjacent", format!("{id} borders unknown region {missing}")));
            }
            if let Some(f) = r.controlling_faction.as_ref().filter(|f| !faction(f)) {
                return Err(invalid(
                    "regions.controlling_faction",
                    format!("{id} is controlled by unknown faction {f}"),
                ));
            }
            for requirement in &r.route_requirements {
                let known = match requirement {
                    RouteRequirement::FactionStanding { faction: f, .. } => faction(f),
                    RouteRequirement::Contact { npc } => self.npcs.contains_key(npc),
                    RouteRequirement::Connectivity { .. } | RouteRequirement::Credits { .. } => true,
                };
                if !known {
                    return Err(invalid(
                        "regions.route_requirements",
                        format!("{id} has a requirement naming something unknown: {requirement:?}"),
                    ));
                }
            }
        }
        for link in &self.faction_links {
            if !faction(&link.from) || !faction(&link.to) {
                return Err(invalid(
                    "faction_links",
                    format!("link {} -> {} names an unknown faction", link.from, link.to),
                ));
            }
        }
        for (id, npc) in &self.npcs {
            if !region(&npc.region) {
                return Err(invalid("npcs.region", format!("{id} lives in unknown region {}", npc.region)));
            }
            if let Some(f) = npc.faction.as_ref().filter(|f| !faction(f)) {
                return Err(invalid("npcs.faction", format!("{id} belongs to unknown faction {f}")));
            }
        }
        for (id, job) in &self.jobs {
            if !faction(&job.patron) || !region(&job.region) {
                return Err(invalid("jobs", format!("job {id} names an unknown patron or region")));
            }
        }
        for (id, offer) in &self.enhancement_offers {
            if !faction(&offer.faction) {
                return Err(invalid(
                    "enhancement_offers.faction",
                    format!("offer {id} comes from unknown faction {}", offer.faction),
                ));
            }
        }
        Ok(())
    }

    /// Instantiate the seed as a fresh campaign at version 0.
    pub fn into_campaign(self, id: impl Into<CampaignId>) -> Campaign {
        let mut campaign = Campaign::new(id, self.name, self.seed, self.player);
        campaign.regions = self.regions;
        campaign.factions = self.factions;
        campaign.faction_links = self.faction_links;
        campaign.npcs = self.npcs;
        campaign.jobs = self.jobs;
        campaign.enhancement_offers = self.enhancement_offers;
        for thread in self.threads {
            campaign.queue_thread(DormantThread::new(
                thread.id,
                ActionId::new(SEED_ORIGIN),
                thread.trigger,
                thread.consequence,
                thread.severity,
                0,
            ));
        }
        let start = campaign.player.current_region.clone();
        if let Some(region) = campaign.regions.get_mut(&start) {
            region.visited = true;
        }
        campaign
    }
}

/// The bundled sample campaign.
pub fn sample_seed() -> Result<CampaignSeed, ConfigError> {
    let seed: CampaignSeed = serde_json::from_str(SAMPLE_SEED)?;
    seed.validate()?;
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sample_seed_is_valid() {
        let seed = sample_seed().unwrap();
        assert_eq!(seed.regions.len(), 4);
        let campaign = seed.into_campaign("sample");
        assert_eq!(campaign.state_version, 0);
        assert!(campaign.current_region().unwrap().visited);
        assert_eq!(campaign.threads().len(), 1);
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let mut seed = sample_seed().unwrap();
        seed.regions
            .get_mut(&RegionId::new("docks"))
            .unwrap()
            .adjacent
            .push(RegionId::new("atlantis"));
        let err = seed.validate().unwrap_err();
        assert!(err.to_string().contains("atlantis"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(&path, SAMPLE_SEED).unwrap();
        let seed = CampaignSeed::load(&path).unwrap();
        assert_eq!(seed.name, "The Drowned Market");
    }
}
