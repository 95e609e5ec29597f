use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::record::ProviderRecord;
use crate::sources::fetch::Fetch;
use crate::sources::{FetchFailure, Scraper};
use crate::upsert::{get_or_create_resource, UpdatePolicy};

/// Outcome of persisting one batch of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Default)]
pub struct SourceReport {
    pub source: String,
    pub targets: usize,
    pub fetched: usize,
    pub extracted: usize,
    pub rejected: usize,
    pub invalid: usize,
    pub persisted: PersistCounts,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn totals(&self) -> SourceReport {
        let mut total = SourceReport {
            source: "total".to_string(),
            ..Default::default()
        };
        for s in &self.sources {
            total.targets += s.targets;
            total.fetched += s.fetched;
            total.extracted += s.extracted;
            total.rejected += s.rejected;
            total.invalid += s.invalid;
            total.persisted.created += s.persisted.created;
            total.persisted.updated += s.persisted.updated;
            total.persisted.unchanged += s.persisted.unchanged;
            total.failures.extend(s.failures.iter().cloned());
        }
        total
    }

    pub fn print(&self) {
        for s in &self.sources {
            print_line(s);
            for f in &s.failures {
                println!("    failed {}: {}", f.target, f.reason);
            }
        }
        if self.sources.len() > 1 {
            print_line(&self.totals());
        }
    }
}

fn print_line(s: &SourceReport) {
    println!(
        "{}: {}/{} targets fetched, {} extracted, {} rejected, {} invalid, {} created, {} updated, {} unchanged",
        s.source,
        s.fetched,
        s.targets,
        s.extracted,
        s.rejected,
        s.invalid,
        s.persisted.created,
        s.persisted.updated,
        s.persisted.unchanged,
    );
}

/// Run each scraper in turn and persist its records, one transaction per
/// scraper. Target failures are reported, not raised; a store error rolls
/// back the current scraper's batch and ends the run.
pub fn run_scrapers(
    conn: &Connection,
    scrapers: &[Box<dyn Scraper>],
    fetcher: &dyn Fetch,
    targets: Option<&[String]>,
    policy: UpdatePolicy,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    for scraper in scrapers {
        let harvest = scraper.run(fetcher, targets)?;
        let persisted = persist_batch(conn, &harvest.records, true, policy)?;
        info!(
            source = scraper.source(),
            created = persisted.created,
            updated = persisted.updated,
            "batch committed"
        );

        report.sources.push(SourceReport {
            source: scraper.source().to_string(),
            targets: harvest.targets,
            fetched: harvest.fetched,
            extracted: harvest.records.len() + harvest.invalid,
            rejected: harvest.rejected,
            invalid: harvest.invalid,
            persisted,
            failures: harvest.failures,
        });
    }

    Ok(report)
}

/// Upsert `records` inside one transaction and commit it. Nothing is kept
/// if any record fails to persist.
pub fn persist_batch(
    conn: &Connection,
    records: &[ProviderRecord],
    create_categories: bool,
    policy: UpdatePolicy,
) -> Result<PersistCounts> {
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let tx = conn.unchecked_transaction()?;
    let mut counts = PersistCounts::default();
    for record in records {
        let (is_new, _) = get_or_create_resource(&tx, record, create_categories, policy)?;
        match (is_new, policy) {
            (true, _) => counts.created += 1,
            (false, UpdatePolicy::Eager) => counts.updated += 1,
            (false, UpdatePolicy::Lazy) => counts.unchanged += 1,
        }
        pb.inc(1);
    }
    tx.commit()?;

    pb.finish_and_clear();
    Ok(counts)
}

// ── Tests ──
