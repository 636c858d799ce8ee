use regex::Regex;

fn external_reference_patterns() -> &'static [Regex] {
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^[-a-z]+://").expect("invalid scheme regex"),
                Regex::new(r"(?i)^(?:cid|data):").expect("invalid data URI regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
            ]
        })
        .as_slice()
}

/// Determine whether an asset reference points outside the pipeline.
///
/// Absolute URLs, protocol-relative URLs and inline data URIs are handed back to the caller
/// verbatim instead of being looked up in the manifest or the live index.
pub fn is_external_reference(value: &str) -> bool {
    external_reference_patterns()
        .iter()
        .any(|pattern| pattern.is_match(value))
}
