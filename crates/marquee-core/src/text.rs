//! Text helpers shared by the descriptor builder and the query pipeline.

/// Join items with `separator`, using `final_separator` before the last.
///
/// An empty slice yields an empty string and a single item is returned
/// as-is, with no separator.
pub fn join_with_final<S: AsRef<str>>(items: &[S], separator: &str, final_separator: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => {
            let mut joined = head
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(separator);
            joined.push_str(final_separator);
            joined.push_str(last.as_ref());
            joined
        }
    }
}

/// `"a, b and c"` style joining.
pub fn join_natural<S: AsRef<str>>(items: &[S]) -> String {
    join_with_final(items, ", ", " and ")
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
