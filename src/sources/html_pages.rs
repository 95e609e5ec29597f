use scraper::Selector;
use tracing::info;

use super::fetch::Fetch;
use super::{Harvest, Scraper};
use crate::error::{Error, Result};
use crate::parser::extract::{CategoryMarker, Extractor};
use crate::parser::extract_page;

pub const HOWARD_BROWN_SOURCE: &str = "Howard Brown";
const HOWARD_BROWN_PAGE: &str = "http://www.howardbrown.org/hb_services.asp?id=";
pub const HOWARD_BROWN_CATEGORIES: &[u32] = &[2722, 2706, 2723, 2725, 2715, 2475];

/// Scrapes listing pages where each provider is introduced by a bold link,
/// optionally grouped under styled category labels.
#[derive(Debug, Clone)]
pub struct HtmlPageScraper {
    content: Selector,
    extractor: Extractor,
    targets: Vec<String>,
}

impl HtmlPageScraper {
    /// `content` selects the element holding the listings; only its
    /// subtree is segmented.
    pub fn new(content: &str, extractor: Extractor, targets: Vec<String>) -> Result<Self> {
        let content = Selector::parse(content)
            .map_err(|e| Error::Pattern(format!("content selector {:?}: {}", content, e)))?;
        Ok(HtmlPageScraper {
            content,
            extractor,
            targets,
        })
    }
}

impl Scraper for HtmlPageScraper {
    fn source(&self) -> &str {
        &self.extractor.source
    }

    fn default_targets(&self) -> Vec<String> {
        self.targets.clone()
    }

    fn scrape(&self, fetcher: &dyn Fetch, targets: &[String]) -> Result<Harvest> {
        let mut harvest = Harvest::default();
        for target in targets {
            let html = match fetcher.fetch(target) {
                Ok(html) => html,
                Err(e) => {
                    harvest.fail(target, e);
                    continue;
                }
            };
            harvest.fetched += 1;

            let extraction = extract_page(&html, &self.content, &self.extractor);
            info!(
                url = %target,
                records = extraction.records.len(),
                rejected = extraction.rejected,
                "page extracted"
            );
            harvest.rejected += extraction.rejected;
            harvest.records.extend(extraction.records);
        }
        Ok(harvest)
    }
}

/// Howard Brown Health service pages, one per category id.
pub fn howard_brown(category_ids: &[u32], max_category_tokens: usize) -> Result<HtmlPageScraper> {
    let marker = CategoryMarker::new("font", "color", "#00000")
        .map_err(|e| Error::Pattern(e.to_string()))?;
    let extractor = Extractor::new(HOWARD_BROWN_SOURCE, marker)
        .with_max_category_tokens(max_category_tokens);
    let targets = category_ids
        .iter()
        .map(|id| format!("{}{}", HOWARD_BROWN_PAGE, id))
        .collect();
    HtmlPageScraper::new("td#content", extractor, targets)
}

// ── Tests ──
