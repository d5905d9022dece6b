//! Pattern helpers for prompt and expect-string matching.

use regex::bytes::Regex;

/// Compile an expect string.
///
/// Expect strings are searched, not anchored: the device may echo
/// trailing spaces or a bell after the prompt.
pub fn compile_expect(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

/// Build one regex that matches if any of `patterns` matches.
pub fn any_of<'a>(patterns: impl IntoIterator<Item = &'a Regex>) -> Result<Regex, regex::Error> {
    let combined: Vec<String> = patterns
        .into_iter()
        .map(|p| format!("(?:{})", p.as_str()))
        .collect();
    Regex::new(&combined.join("|"))
}
