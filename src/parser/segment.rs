use std::mem;

use ego_tree::iter::Edge;
use ego_tree::NodeId;
use scraper::node::{Element, Node};
use scraper::ElementRef;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

/// One block of a segmented document: the marker that opened it (`None` for
/// whatever precedes the first marker) and the serialized markup that
/// follows the marker up to the next one.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub marker: Option<ElementRef<'a>>,
    pub content: String,
}

/// Split the subtree under `root` at every descendant element matching
/// `is_marker`, walking the tree in document order.
///
/// Markers are located by their position in the tree, so two markers that
/// serialize identically are still told apart. The markup of a marker
/// itself is the delimiter and belongs to no segment: concatenating the
/// first segment's content with `serialize(marker) + content` of every
/// following segment rebuilds `serialize(root)`. Markers nested inside a
/// marker are part of that marker and are not split on.
///
/// Always yields at least one segment; with no markers the single segment
/// has `marker: None` and holds the whole serialization. Nesting depth is
/// not limited by the call stack.
pub fn segment<'a, P>(root: ElementRef<'a>, is_marker: P) -> Vec<Segment<'a>>
where
    P: Fn(ElementRef<'a>) -> bool,
{
    let mut writer = Writer {
        is_marker,
        segments: Vec::new(),
        current: None,
        buf: String::new(),
    };
    writer.write(root);
    writer.segments.push(Segment {
        marker: writer.current,
        content: writer.buf,
    });
    writer.segments
}

/// Serialize an element and its subtree with the same rules `segment` uses.
pub fn serialize(el: ElementRef<'_>) -> String {
    let mut writer = Writer {
        is_marker: |_: ElementRef<'_>| false,
        segments: Vec::new(),
        current: None,
        buf: String::new(),
    };
    writer.write(el);
    writer.buf
}

struct Writer<'a, P> {
    is_marker: P,
    segments: Vec<Segment<'a>>,
    current: Option<ElementRef<'a>>,
    buf: String,
}

impl<'a, P> Writer<'a, P>
where
    P: Fn(ElementRef<'a>) -> bool,
{
    fn write(&mut self, root: ElementRef<'a>) {
        // Marker whose subtree is being passed over.
        let mut skipping: Option<NodeId> = None;

        for edge in root.traverse() {
            match edge {
                Edge::Open(node) => {
                    if skipping.is_some() {
                        continue;
                    }
                    if let Some(el) = ElementRef::wrap(node) {
                        if node.id() != root.id() && (self.is_marker)(el) {
                            self.segments.push(Segment {
                                marker: self.current,
                                content: mem::take(&mut self.buf),
                            });
                            self.current = Some(el);
                            skipping = Some(node.id());
                        } else {
                            self.open_tag(el.value());
                        }
                        continue;
                    }
                    match node.value() {
                        Node::Text(text) => {
                            let raw = node
                                .parent()
                                .and_then(ElementRef::wrap)
                                .is_some_and(|p| RAW_TEXT_ELEMENTS.contains(&p.value().name()));
                            if raw {
                                self.buf.push_str(text);
                            } else {
                                escape_into(&mut self.buf, text, false);
                            }
                        }
                        Node::Comment(comment) => {
                            self.buf.push_str("<!--");
                            self.buf.push_str(comment);
                            self.buf.push_str("-->");
                        }
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if let Some(id) = skipping {
                        if id == node.id() {
                            skipping = None;
                        }
                        continue;
                    }
                    if let Node::Element(data) = node.value() {
                        self.close_tag(data);
                    }
                }
            }
        }
    }

    fn open_tag(&mut self, data: &Element) {
        self.buf.push('<');
        self.buf.push_str(data.name());
        for (attr, value) in data.attrs() {
            self.buf.push(' ');
            self.buf.push_str(attr);
            self.buf.push_str("=\"");
            escape_into(&mut self.buf, value, true);
            self.buf.push('"');
        }
        self.buf.push('>');
    }

    fn close_tag(&mut self, data: &Element) {
        let name = data.name();
        if VOID_ELEMENTS.contains(&name) {
            return;
        }
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }
}

fn escape_into(out: &mut String, s: &str, attr: bool) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr => out.push_str("&quot;"),
            '<' if !attr => out.push_str("&lt;"),
            '>' if !attr => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::headers::is_pseudo_header;
    use scraper::{Html, Selector};

    fn content_root(doc: &Html) -> ElementRef<'_> {
        let sel = Selector::parse("#content").unwrap();
        doc.select(&sel).next().unwrap()
    }

    fn rebuild(segments: &[Segment<'_>]) -> String {
        let mut out = String::new();
        for seg in segments {
            if let Some(marker) = seg.marker {
                out.push_str(&serialize(marker));
            }
            out.push_str(&seg.content);
        }
        out
    }

    #[test]
    fn no_markers_single_segment() {
        let doc = Html::parse_document(
            r#"<div id="content"><p>Nothing <a href="/x">here</a> is bold.</p></div>"#,
        );
        let root = content_root(&doc);
        let segments = segment(root, is_pseudo_header);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].marker.is_none());
        assert_eq!(segments[0].content, serialize(root));
    }

    #[test]
    fn splits_at_each_marker_in_order() {
        let doc = Html::parse_document(
            r#"<div id="content">intro
            <b><a href="http://a.org">A</a></b> about a
            <a href="http://b.org"><strong>B</strong></a> about b
            </div>"#,
        );
        let root = content_root(&doc);
        let segments = segment(root, is_pseudo_header);
        assert_eq!(segments.len(), 3);
        assert!(segments[0].marker.is_none());
        assert!(segments[0].content.contains("intro"));

        let first = segments[1].marker.unwrap();
        assert_eq!(first.value().attr("href"), Some("http://a.org"));
        assert!(segments[1].content.starts_with("</b>"));
        assert!(segments[1].content.contains("about a"));
        assert!(!segments[1].content.contains("about b"));

        let second = segments[2].marker.unwrap();
        assert_eq!(second.value().attr("href"), Some("http://b.org"));
        assert!(segments[2].content.contains("about b"));
        assert!(segments[2].content.ends_with("</div>"));
    }

    #[test]
    fn lossless_reconstruction() {
        let doc = Html::parse_document(
            r##"<div id="content"><font color="#000000">Clinics</font>
            <b><a href="http://a.org">A &amp; Co</a></b><br>first<!-- note -->
            <p><b><a href="http://b.org">B</a></b> second <img src="x.png"></p>
            <script>if (a < b) {}</script>tail</div>"##,
        );
        let root = content_root(&doc);
        let segments = segment(root, is_pseudo_header);
        assert_eq!(segments.len(), 3);
        assert_eq!(rebuild(&segments), serialize(root));
    }

    #[test]
    fn identical_markers_are_distinct() {
        let doc = Html::parse_document(
            r#"<div id="content"><b><a href="http://same.org">Same</a></b> one
            <b><a href="http://same.org">Same</a></b> two</div>"#,
        );
        let root = content_root(&doc);
        let segments = segment(root, is_pseudo_header);
        assert_eq!(segments.len(), 3);
        assert!(segments[1].content.contains("one"));
        assert!(!segments[1].content.contains("two"));
        assert!(segments[2].content.contains("two"));
        assert_ne!(segments[1].marker.unwrap().id(), segments[2].marker.unwrap().id());
        assert_eq!(rebuild(&segments), serialize(root));
    }

    #[test]
    fn deep_nesting_does_not_exhaust_stack() {
        let depth = 20_000;
        let html = format!(
            r#"<div id="content"><b><a href="http://a.org">A</a></b>{}deep{}</div>"#,
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let doc = Html::parse_document(&html);
        let root = content_root(&doc);
        let segments = segment(root, is_pseudo_header);
        assert_eq!(segments.len(), 2);
        assert!(segments[1].content.contains("deep"));
        assert_eq!(segments[1].content.matches("<span>").count(), depth);
        assert_eq!(rebuild(&segments), serialize(root));
    }
}
