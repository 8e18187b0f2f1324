//! Config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Hinge CLI Configuration");
    println!("{:-<40}", "");

    println!("Data Directory:      {}", config.data_dir.display());
    println!(
        "Engine Config:       {}",
        config
            .engine_config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".to_string())
    );
    println!("Server Port:         {}", config.port);

    let engine = config.engine()?;
    println!();
    println!("Cascade depth:       {}", engine.cascade.max_depth);
    println!("Idempotency window:  {} actions", engine.idempotency_window);
    println!(
        "Narration:           {} (timeout {} ms)",
        if engine.narrative.enabled { "enabled" } else { "disabled" },
        engine.narrative.timeout_ms
    );
    println!(
        "Demands:             deadline {} turns, escalate {} turn(s) before",
        engine.leverage.deadline_turns, engine.leverage.escalation_window
    );

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}
