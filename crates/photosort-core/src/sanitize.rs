/// Characters that are not allowed in file names on at least one common platform.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace forbidden file name characters with `_` and trim surrounding whitespace.
pub fn sanitize(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    replaced.trim().to_string()
}
