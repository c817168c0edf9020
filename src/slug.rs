// Slug generation for student-facing URLs and upload directory names

use regex::Regex;
use std::sync::OnceLock;

static NON_WORD: OnceLock<Regex> = OnceLock::new();
static SEPARATORS: OnceLock<Regex> = OnceLock::new();

/// Derives a URL-safe identifier from a display name: lowercase, strip
/// non-word characters, collapse whitespace/hyphen runs to a single
/// hyphen. Collision handling is the caller's concern.
pub fn slugify(name: &str) -> String {
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex"));
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[\s-]+").expect("static regex"));

    let lowered = name.trim().to_lowercase();
    let cleaned = non_word.replace_all(&lowered, "");
    separators
        .replace_all(cleaned.trim(), "-")
        .trim_matches('-')
        .to_string()
}

/// First candidate among `base`, `base-2`, `base-3`, ... that is not
/// an exact member of `taken`.
///
/// Membership is exact: `anna-smith` in `taken` never blocks `anna`,
/// and a pre-existing `anna-2` is skipped rather than re-issued.
pub fn first_free_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.iter().any(|s| *s == candidate) {
            return candidate;
        }
        n += 1;
    }
}
