pub mod feed;
pub mod fetch;
pub mod html_pages;

use std::collections::HashSet;

use tracing::{info, warn};

use crate::settings::Settings;
use crate::error::{Error, Result};
use crate::record::ProviderRecord;
use fetch::Fetch;

/// A target that could not be fetched or decoded.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub target: String,
    pub reason: String,
}

/// Everything one scraper produced in a run.
#[derive(Debug, Default)]
pub struct Harvest {
    pub records: Vec<ProviderRecord>,
    pub targets: usize,
    pub fetched: usize,
    /// Candidates the extractor could not turn into a record.
    pub rejected: usize,
    /// Records dropped by validation before reaching the caller.
    pub invalid: usize,
    pub failures: Vec<FetchFailure>,
}

impl Harvest {
    pub(crate) fn fail(&mut self, target: &str, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(url = %target, "fetch failed: {}", reason);
        self.failures.push(FetchFailure {
            target: target.to_string(),
            reason,
        });
    }
}

/// A source of provider records.
///
/// Implementors provide `scrape`; callers use `run`, which de-duplicates the
/// targets and validates the output.
pub trait Scraper {
    /// Label stored on every record, usually the site's name.
    fn source(&self) -> &str;

    /// Targets used when the caller does not supply any.
    fn default_targets(&self) -> Vec<String>;

    /// Fetch and extract every target. A failing target is recorded in
    /// `Harvest::failures` and contributes nothing; it never aborts the run.
    fn scrape(&self, _fetcher: &dyn Fetch, _targets: &[String]) -> Result<Harvest> {
        Err(Error::NotImplemented {
            source_name: self.source().to_string(),
        })
    }

    fn run(&self, fetcher: &dyn Fetch, targets: Option<&[String]>) -> Result<Harvest> {
        let targets = match targets {
            Some(t) if !t.is_empty() => dedup_targets(t),
            _ => dedup_targets(&self.default_targets()),
        };

        let mut harvest = self.scrape(fetcher, &targets)?;
        harvest.targets = targets.len();

        let before = harvest.records.len();
        harvest.records.retain(ProviderRecord::is_valid);
        harvest.invalid += before - harvest.records.len();

        info!(
            source = self.source(),
            records = harvest.records.len(),
            invalid = harvest.invalid,
            failures = harvest.failures.len(),
            "scrape finished"
        );
        Ok(harvest)
    }
}

/// Unique targets, first occurrence wins.
pub fn dedup_targets(targets: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// The sources enabled in `settings`, in a stable order.
pub fn configured(settings: &Settings) -> Result<Vec<Box<dyn Scraper>>> {
    let mut scrapers: Vec<Box<dyn Scraper>> = Vec::new();
    if settings.howard_brown.enabled {
        scrapers.push(Box::new(html_pages::howard_brown(
            &settings.howard_brown.category_ids,
            settings.max_category_tokens,
        )?));
    }
    if settings.go_affirmations.enabled {
        scrapers.push(Box::new(feed::go_affirmations(
            &settings.go_affirmations.feed_url,
        )));
    }
    Ok(scrapers)
}

// ── Tests ──
