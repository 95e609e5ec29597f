use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::segment::Segment;
use super::text::normalize;
use crate::record::ProviderRecord;

/// Category labels longer than this many words are almost always a
/// paragraph that happened to carry the marker styling.
pub const MAX_CATEGORY_TOKENS: usize = 10;

static STARTS_WITH_END_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*<\s*/.*?>)+").expect("valid regex"));

/// The styled element that labels the category of the links after it,
/// e.g. `<font color="#000000">`.
#[derive(Debug, Clone)]
pub struct CategoryMarker {
    tag: String,
    attr: String,
    pattern: Regex,
}

impl CategoryMarker {
    pub fn new(tag: &str, attr: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(CategoryMarker {
            tag: tag.to_string(),
            attr: attr.to_string(),
            pattern: Regex::new(pattern)?,
        })
    }

    fn matches(&self, el: ElementRef<'_>) -> bool {
        let data = el.value();
        data.name().eq_ignore_ascii_case(&self.tag)
            && data.attr(&self.attr).is_some_and(|v| self.pattern.is_match(v))
    }
}

/// Counts for one pass over a segmented document.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ProviderRecord>,
    /// Marker blocks that did not yield a usable record.
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    pub source: String,
    pub category: CategoryMarker,
    pub max_category_tokens: usize,
}

impl Extractor {
    pub fn new(source: impl Into<String>, category: CategoryMarker) -> Self {
        Extractor {
            source: source.into(),
            category,
            max_category_tokens: MAX_CATEGORY_TOKENS,
        }
    }

    pub fn with_max_category_tokens(mut self, max: usize) -> Self {
        self.max_category_tokens = max;
        self
    }

    /// Turn one marker and the markup after it into a record. Returns `None`
    /// when the marker has no text or its target is not an absolute URL.
    pub fn extract(&self, marker: ElementRef<'_>, following: &str) -> Option<ProviderRecord> {
        let text: String = marker.text().collect();
        let name = normalize(&text).trim().to_string();
        let href = marker.value().attr("href").unwrap_or_default();

        if name.is_empty() || !href.contains("://") {
            debug!(name = %name, href = %href, "not scraping marker");
            return None;
        }

        let category = self.category_for(marker);
        let description = description_from(following);

        Some(ProviderRecord {
            name,
            url: Some(href.to_string()),
            description: (!description.is_empty()).then_some(description),
            category_names: if category.is_empty() {
                Vec::new()
            } else {
                vec![category]
            },
            source: self.source.clone(),
            ..Default::default()
        })
    }

    /// Extract every segment that starts at a marker, in document order.
    pub fn extract_segments(&self, segments: &[Segment<'_>]) -> Extraction {
        let mut out = Extraction::default();
        for seg in segments {
            let Some(marker) = seg.marker else {
                continue;
            };
            match self.extract(marker, &seg.content) {
                Some(record) => out.records.push(record),
                None => out.rejected += 1,
            }
        }
        out
    }

    fn category_for(&self, marker: ElementRef<'_>) -> String {
        find_previous(marker, |el| self.category.matches(el))
            .map(|el| parse_category(&el.text().collect::<String>(), self.max_category_tokens))
            .unwrap_or_default()
    }
}

/// Category label text, or empty when it is too long to be a label.
pub fn parse_category(text: &str, max_tokens: usize) -> String {
    let text = normalize(text);
    if text.split_whitespace().count() > max_tokens {
        return String::new();
    }
    text.trim().to_string()
}

/// Nearest element before `el` in document order (ancestors included)
/// accepted by `pred`.
pub fn find_previous<'a, F>(el: ElementRef<'a>, pred: F) -> Option<ElementRef<'a>>
where
    F: Fn(ElementRef<'a>) -> bool,
{
    let mut node = *el;
    loop {
        node = match node.prev_sibling() {
            Some(mut sibling) => {
                while let Some(last) = sibling.last_child() {
                    sibling = last;
                }
                sibling
            }
            None => node.parent()?,
        };
        if let Some(candidate) = ElementRef::wrap(node) {
            if pred(candidate) {
                return Some(candidate);
            }
        }
    }
}

/// Visible text of a segment's trailing markup, one stripped string per line.
pub fn description_from(following: &str) -> String {
    let cleaned = STARTS_WITH_END_TAG.replace(following, "");
    let fragment = Html::parse_fragment(&cleaned);

    let mut lines = Vec::new();
    for node in fragment.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(|p| matches!(p.value().name(), "script" | "style"));
        if hidden {
            continue;
        }
        let line = text.trim();
        if !line.is_empty() {
            lines.push(line);
        }
    }
    normalize(&lines.join("\n"))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::headers::is_pseudo_header;
    use crate::parser::segment::segment;
    use scraper::Selector;

    fn font_marker() -> CategoryMarker {
        CategoryMarker::new("font", "color", "#00000").unwrap()
    }

    fn run(html: &str) -> Extraction {
        let doc = Html::parse_document(html);
        let body = doc.select(&Selector::parse("body").unwrap()).next().unwrap();
        let segments = segment(body, is_pseudo_header);
        Extractor::new("Test Source", font_marker()).extract_segments(&segments)
    }

    #[test]
    fn example_clinic() {
        let out = run(
            r##"<font color="#000000">Clinics</font><a href="http://example.org/clinic"><strong>Example Clinic</strong></a> Open weekdays."##,
        );
        assert_eq!(out.rejected, 0);
        assert_eq!(
            out.records,
            vec![ProviderRecord {
                name: "Example Clinic".into(),
                url: Some("http://example.org/clinic".into()),
                description: Some("Open weekdays.".into()),
                category_names: vec!["Clinics".into()],
                source: "Test Source".into(),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn rejects_relative_and_script_links() {
        let out = run(
            r#"<b><a href="javascript:void(0)">Menu</a></b> x
               <b><a href="/page">Local</a></b> y
               <b><a href="http://ok.org"></a></b> z
               <b><a href="http://ok.org">Fine</a></b> w"#,
        );
        assert_eq!(out.rejected, 3);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].name, "Fine");
    }

    #[test]
    fn long_category_is_noise() {
        let out = run(
            r##"<font color="#000000">This is a very long paragraph that just happens to be styled black</font>
               <b><a href="http://x.org">X</a></b> about x"##,
        );
        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].category_names.is_empty());
        assert_eq!(parse_category("one two three", 2), "");
        assert_eq!(parse_category(" Mental Health ", 10), "Mental Health");
    }

    #[test]
    fn nearest_category_wins() {
        let out = run(
            r##"<font color="#000000">Clinics</font>
               <b><a href="http://a.org">A</a></b> a
               <p><font color="#000000">Therapy</font></p>
               <b><a href="http://b.org">B</a></b> b
               <font color="#ff0000">Not a category</font>
               <b><a href="http://c.org">C</a></b> c"##,
        );
        let cats: Vec<_> = out
            .records
            .iter()
            .map(|r| r.category_names.clone())
            .collect();
        assert_eq!(cats, vec![vec!["Clinics"], vec!["Therapy"], vec!["Therapy"]]);
    }

    #[test]
    fn no_markers_no_records() {
        let out = run("<p>Just some text with a <a href=\"http://x.org\">link</a>.</p>");
        assert!(out.records.is_empty());
        assert_eq!(out.rejected, 0);
    }

    #[test]
    fn description_skips_leading_end_tags() {
        let d = description_from("</strong></b>\r\n  First line<br>Second Ã‚line <script>var x;</script>");
        assert_eq!(d, "First line\nSecond line");
        assert_eq!(description_from("</b>   "), "");
    }
}
