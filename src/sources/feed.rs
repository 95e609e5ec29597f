use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::fetch::Fetch;
use super::{Harvest, Scraper};
use crate::error::Result;
use crate::record::{non_blank, ProviderRecord};

pub const GO_AFFIRMATIONS_SOURCE: &str = "Michigan's Affirmations Referral Network";
pub const GO_AFFIRMATIONS_FEED: &str = "https://raw.githubusercontent.com/workdept/affirmations-referral-network/master/src/data/providers.json";

/// Maps one feed entry to a record. `None` skips the entry.
pub type EntryMapper = fn(&Value, &str) -> Option<ProviderRecord>;

/// Scrapes a JSON array published by the source itself; no HTML involved.
#[derive(Clone)]
pub struct FeedScraper {
    source: String,
    feed_url: String,
    mapper: EntryMapper,
}

impl FeedScraper {
    pub fn new(source: impl Into<String>, feed_url: impl Into<String>, mapper: EntryMapper) -> Self {
        FeedScraper {
            source: source.into(),
            feed_url: feed_url.into(),
            mapper,
        }
    }
}

impl Scraper for FeedScraper {
    fn source(&self) -> &str {
        &self.source
    }

    fn default_targets(&self) -> Vec<String> {
        vec![self.feed_url.clone()]
    }

    fn scrape(&self, fetcher: &dyn Fetch, targets: &[String]) -> Result<Harvest> {
        let mut harvest = Harvest::default();
        for target in targets {
            let body = match fetcher.fetch(target) {
                Ok(body) => body,
                Err(e) => {
                    harvest.fail(target, e);
                    continue;
                }
            };
            let entries: Vec<Value> = match serde_json::from_str(&body) {
                Ok(entries) => entries,
                Err(e) => {
                    harvest.fail(target, format!("invalid feed: {}", e));
                    continue;
                }
            };
            harvest.fetched += 1;

            let before = harvest.records.len();
            for entry in &entries {
                match (self.mapper)(entry, &self.source) {
                    Some(record) => harvest.records.push(record),
                    None => harvest.rejected += 1,
                }
            }
            info!(
                url = %target,
                entries = entries.len(),
                records = harvest.records.len() - before,
                "feed mapped"
            );
        }
        Ok(harvest)
    }
}

/// One provider in the Affirmations network's `providers.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AffirmationsEntry {
    providername: String,
    agencyname: Option<String>,
    streetaddress: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    #[serde(rename = "type")]
    kind: Vec<String>,
    officehours: Option<String>,
}

fn map_affirmations(entry: &Value, source: &str) -> Option<ProviderRecord> {
    let e: AffirmationsEntry = match AffirmationsEntry::deserialize(entry) {
        Ok(e) => e,
        Err(err) => {
            warn!(source = source, "skipping feed entry: {}", err);
            return None;
        }
    };

    Some(ProviderRecord {
        name: e.providername.trim().to_string(),
        organization: non_blank(e.agencyname),
        street: non_blank(e.streetaddress),
        city: non_blank(e.city),
        state: non_blank(e.state),
        country: Some("U.S.A".to_string()),
        zipcode: non_blank(e.zip),
        email: non_blank(e.email),
        phone: non_blank(e.phone),
        url: non_blank(e.website),
        category_names: e
            .kind
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        hours: non_blank(e.officehours),
        source: source.to_string(),
        ..Default::default()
    })
}

pub fn go_affirmations(feed_url: &str) -> FeedScraper {
    FeedScraper::new(GO_AFFIRMATIONS_SOURCE, feed_url, map_affirmations)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::fetch::StaticFetcher;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/affirmations.json").unwrap()
    }

    #[test]
    fn maps_feed_entries() {
        let fetcher = StaticFetcher::new().with_page(GO_AFFIRMATIONS_FEED, fixture());
        let harvest = go_affirmations(GO_AFFIRMATIONS_FEED).run(&fetcher, None).unwrap();

        assert_eq!(harvest.fetched, 1);
        // Entry with a list as its name cannot be decoded; entry with a blank name is invalid.
        assert_eq!(harvest.rejected, 1);
        assert_eq!(harvest.invalid, 1);
        assert_eq!(harvest.records.len(), 2);

        let r = &harvest.records[0];
        assert_eq!(r.name, "Allen E. Kash, DC");
        assert_eq!(r.organization.as_deref(), Some("Madison Heights Chiropractic"));
        assert_eq!(r.street.as_deref(), Some("28107 John R. Road"));
        assert_eq!(r.state.as_deref(), Some("MI"));
        assert_eq!(r.zipcode.as_deref(), Some("48071"));
        assert_eq!(r.country.as_deref(), Some("U.S.A"));
        assert_eq!(r.url.as_deref(), Some("www.madisonheightschiro.com"));
        assert_eq!(r.category_names, vec!["Chiropractor"]);
        assert_eq!(r.hours.as_deref(), Some("Monday, Wednesday, Friday 9-12:30\nSaturday 8-12"));
        assert_eq!(r.source, GO_AFFIRMATIONS_SOURCE);

        let second = &harvest.records[1];
        assert_eq!(second.organization, None);
        assert_eq!(second.email, None);
        assert_eq!(second.category_names, vec!["Therapist", "Counselor"]);
    }

    #[test]
    fn malformed_feed_is_a_target_failure() {
        let fetcher = StaticFetcher::new().with_page(GO_AFFIRMATIONS_FEED, "{not json");
        let harvest = go_affirmations(GO_AFFIRMATIONS_FEED).run(&fetcher, None).unwrap();
        assert_eq!(harvest.fetched, 0);
        assert_eq!(harvest.failures.len(), 1);
        assert!(harvest.records.is_empty());
    }
}
