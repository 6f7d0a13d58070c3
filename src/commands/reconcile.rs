//! `plaza reconcile` - repair drifted denormalized counters.
//!
//! Counters are caches of their source records: `likes_count` of the
//! engagement ledger, follow counters of accepted edges, `stories_count` of
//! story records. This command recomputes them, rewrites the ones that
//! drifted and purges engagement records whose content is gone.

use anyhow::Result;

use crate::config::Config;
use crate::model::{ContentType, Profile, collections};
use crate::services::Services;
use crate::store::{Order, Query};

const PROFILE_PAGE: usize = 500;

/// Execute reconciliation for one content type, or all of them.
pub async fn execute(
    config: &Config,
    content_type: Option<ContentType>,
    skip_profiles: bool,
) -> Result<()> {
    let services = Services::from_config(config)?;

    let content_types = match content_type {
        Some(content_type) => vec![content_type],
        None => ContentType::ALL.to_vec(),
    };

    println!("Likes");
    println!("=====");
    for content_type in content_types {
        let report = services.ledger.reconcile(content_type).await?;
        println!(
            "  {:<12} scanned {:>8}  corrected {:>6}  orphans purged {:>6}",
            content_type.as_str(),
            report.scanned,
            report.corrections.len(),
            report.orphans_purged
        );
        for correction in &report.corrections {
            println!(
                "    {}: {} -> {}",
                correction.id, correction.previous, correction.actual
            );
        }
    }

    if skip_profiles {
        return Ok(());
    }

    let totals = reconcile_profiles(&services).await?;
    println!();
    println!("Profile counters");
    println!("================");
    println!("  profiles scanned {:>8}", totals.scanned);
    println!("  follow counters corrected {:>6}", totals.follows_corrected);
    println!("  stories_count corrected   {:>6}", totals.stories_corrected);
    Ok(())
}

#[derive(Debug, Default)]
struct ProfileTotals {
    scanned: usize,
    follows_corrected: usize,
    stories_corrected: usize,
}

async fn reconcile_profiles(services: &Services) -> Result<ProfileTotals> {
    let mut totals = ProfileTotals::default();
    loop {
        let query = Query::all()
            .sort("id", Order::Asc)
            .skip(totals.scanned)
            .limit(PROFILE_PAGE);
        let page: Vec<Profile> = services.store.find(collections::PROFILES, &query).await?;
        if page.is_empty() {
            break;
        }
        totals.scanned += page.len();

        for profile in page {
            if services.follows.reconcile_profile(&profile.id).await?.corrected {
                totals.follows_corrected += 1;
            }
            if services.stories.reconcile_stories_count(&profile.id).await?.is_some() {
                totals.stories_corrected += 1;
            }
        }
    }
    Ok(totals)
}
