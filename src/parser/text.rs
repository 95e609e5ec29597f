/// Byte sequences left behind when Latin-1 pages are decoded as UTF-8.
/// Each entry is (artifact, replacement).
const ENCODING_ARTIFACTS: &[(&str, &str)] = &[("Ã‚", ""), ("Â\u{a0}", "\u{a0}")];

/// Cleanse scraped text: drop encoding artifacts and turn `\r\n` into `\n`.
/// Never truncates and never fails.
pub fn normalize(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n");
    for (artifact, replacement) in ENCODING_ARTIFACTS {
        if out.contains(artifact) {
            out = out.replace(artifact, replacement);
        }
    }
    out
}

/// Lookup key for names: trimmed and lower-cased.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ── Tests ──
