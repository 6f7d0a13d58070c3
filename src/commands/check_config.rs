//! `plaza check-config` - validate configuration without starting anything.

use anyhow::Result;

use crate::config::Config;

/// Validate `config` and print its warnings.
pub fn execute(config: &Config) -> Result<()> {
    let result = config.validate()?;

    if result.has_warnings() {
        println!("Configuration is valid, with warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    } else {
        println!("Configuration is valid");
    }

    println!();
    println!("  store:     {:?} ({})", config.store.backend, config.store_path()?.display());
    println!("  blobs:     {:?} ({})", config.blobs.backend, config.blob_dir()?.display());
    println!("  bulk like: up to {} ids", config.engagement.bulk_like_limit);
    println!(
        "  stories:   tombstones kept {}h, sweep batch {}",
        config.stories.tombstone_retention_hours, config.stories.sweep_batch_size
    );
    println!("  sweeper:   '{}'", config.sweeper.schedule);
    if let Some(addr) = &config.sweeper.metrics_addr {
        println!("  metrics:   http://{addr}/metrics");
    }
    Ok(())
}
