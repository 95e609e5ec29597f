use scraper::ElementRef;

fn is_tag(el: ElementRef<'_>, name: &str) -> bool {
    el.value().name().eq_ignore_ascii_case(name)
}

fn is_bold(el: ElementRef<'_>) -> bool {
    is_tag(el, "b") || is_tag(el, "strong")
}

/// An anchor that reads as a section header: it sits directly inside
/// `<b>`/`<strong>` (parent or grandparent) or wraps one itself.
pub fn is_pseudo_header(el: ElementRef<'_>) -> bool {
    if !is_tag(el, "a") {
        return false;
    }

    let parent = el.parent().and_then(ElementRef::wrap);
    if parent.is_some_and(is_bold) {
        return true;
    }
    let grandparent = parent
        .and_then(|p| p.parent())
        .and_then(ElementRef::wrap);
    if grandparent.is_some_and(is_bold) {
        return true;
    }

    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(is_bold)
}

// ── Tests ──
