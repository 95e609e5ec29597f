pub mod extract;
pub mod headers;
pub mod segment;
pub mod text;

use scraper::{Html, Selector};

use extract::{Extraction, Extractor};

/// Pipeline for one fetched page: parse → locate content root → split at
/// pseudo-headers → extract records. A page without the content root
/// yields nothing.
pub fn extract_page(html: &str, content: &Selector, extractor: &Extractor) -> Extraction {
    let document = Html::parse_document(html);
    let Some(root) = document.select(content).next() else {
        return Extraction::default();
    };
    let segments = segment::segment(root, headers::is_pseudo_header);
    extractor.extract_segments(&segments)
}
