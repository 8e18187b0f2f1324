//! Campaign commands: create, inspect, delete.

use std::path::Path;

use anyhow::{Context, Result};
use hinge_core::{CampaignId, CampaignView};
use hinge_engine::{sample_seed, CampaignSeed};
use tracing::info;

use super::{turn_error, Session};
use crate::config::Config;

/// Create a campaign from a seed file or the bundled sample.
pub fn create(config: &Config, id: &str, seed_file: Option<&Path>, rng_seed: Option<u64>) -> Result<()> {
    let seed = match seed_file {
        Some(path) => CampaignSeed::load(path)
            .with_context(|| format!("Failed to load seed {}", path.display()))?,
        None => sample_seed()?,
    };
    let mut campaign = seed.into_campaign(id);
    if let Some(rng_seed) = rng_seed {
        campaign.seed = rng_seed;
    }

    let session = Session::open(config)?;
    let view = session
        .orchestrator
        .create_campaign(&campaign)
        .map_err(turn_error)?;
    info!(campaign = %view.campaign_id, data_dir = %config.data_dir.display(), "Created campaign");

    println!("✅ Created campaign '{}' ({})", view.name, view.campaign_id);
    println!("   Starting in {}", view.player.current_region);
    Ok(())
}

pub fn list(config: &Config) -> Result<()> {
    let session = Session::open(config)?;
    let ids = session.orchestrator.list().map_err(turn_error)?;
    if ids.is_empty() {
        println!("(no campaigns)");
    }
    for id in ids {
        let view = session.orchestrator.view(&id).map_err(turn_error)?;
        println!(
            "{:<20} turn {:>4}  v{:<4} {}",
            id, view.turn_count, view.state_version, view.name
        );
    }
    Ok(())
}

pub fn status(config: &Config, id: &str, json: bool) -> Result<()> {
    let session = Session::open(config)?;
    let view = session
        .orchestrator
        .view(&CampaignId::new(id))
        .map_err(turn_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_status(&view);
    let stats = session.store.stats()?;
    println!();
    println!(
        "💾 Store:       {} campaigns, {} receipts, {}",
        stats.campaign_count,
        stats.receipt_count,
        humansize::format_size(stats.total_size, humansize::DECIMAL)
    );
    println!("📂 Data:        {}", config.data_dir.display());
    Ok(())
}

fn print_status(view: &CampaignView) {
    let player = &view.player;
    println!("📊 {} ({})", view.name, view.campaign_id);
    println!("{:─<50}", "");
    println!("Turn {}  ·  version {}", view.turn_count, view.state_version);
    println!(
        "📍 {}  ·  credits {}  ·  energy {}/{}  ·  exposure {}",
        player.current_region,
        player.credits,
        player.social_energy,
        player.max_social_energy,
        player.exposure
    );

    println!();
    println!("Factions:");
    for faction in &view.factions {
        println!("   {:<24} {:>4}  {}", faction.name, faction.standing, faction.label);
    }

    if !view.priority_items.is_empty() {
        println!();
        println!("⚠️  Demands:");
        for item in &view.priority_items {
            println!(
                "   [{}] {} - {} (deadline turn {}{})",
                item.state.as_str(),
                item.faction,
                item.text,
                item.deadline,
                if item.overdue { ", overdue" } else { "" }
            );
        }
    }

    if !view.surfaced_threads.is_empty() {
        println!();
        println!("Threads:");
        for thread in &view.surfaced_threads {
            println!("   {} (turn {})", thread.summary, thread.surfaced_turn);
        }
    }
}

pub fn hinges(config: &Config, id: &str) -> Result<()> {
    let session = Session::open(config)?;
    let hinges = session
        .orchestrator
        .hinges(&CampaignId::new(id))
        .map_err(turn_error)?;
    if hinges.is_empty() {
        println!("(no hinge moments yet)");
    }
    for hinge in hinges {
        println!("#{} turn {}: {}", hinge.index(), hinge.turn(), hinge.situation());
        println!("   → {}", hinge.choice());
        if !hinge.reasoning().is_empty() {
            println!("   because {}", hinge.reasoning());
        }
    }
    Ok(())
}

pub fn log(config: &Config, id: &str, limit: Option<usize>) -> Result<()> {
    let session = Session::open(config)?;
    let campaign = session
        .orchestrator
        .snapshot(&CampaignId::new(id))
        .map_err(turn_error)?;
    let events = campaign.event_log();
    let skip = limit.map(|n| events.len().saturating_sub(n)).unwrap_or(0);
    for event in &events[skip..] {
        let indent = "  ".repeat(event.depth as usize);
        println!(
            "{:>4} {:<24} {}{}",
            event.turn,
            event.event_id,
            indent,
            event.event_type.as_str()
        );
    }
    Ok(())
}

pub fn delete(config: &Config, id: &str) -> Result<()> {
    let session = Session::open(config)?;
    session
        .orchestrator
        .delete(&CampaignId::new(id))
        .map_err(turn_error)?;
    println!("🗑️  Deleted campaign {id}");
    Ok(())
}
