//! Grounding and prompt text for answer generation.

use marquee_core::text::join_natural;
use marquee_core::Descriptor;

/// Grounding used when no retrieved record could be resolved.
pub const NO_MATCHES: &str = "No matching results were found.";

/// Assistant persona sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a friendly film and television expert helping someone \
pick something to watch from their own media library. Only recommend titles that appear in the \
library matches you are given, and keep the answer short and conversational.";

/// Join query-time descriptors in the order given.
///
/// All but the last are separated by `", "`, the last by `" and "`; a
/// single descriptor stands alone and an empty list yields [`NO_MATCHES`].
pub fn grounding_text(descriptors: &[Descriptor]) -> String {
    if descriptors.is_empty() {
        return NO_MATCHES.to_string();
    }
    let parts: Vec<&str> = descriptors.iter().map(Descriptor::as_str).collect();
    join_natural(&parts)
}

/// The user message: grounding, the request, and the next-best rule.
pub fn user_prompt(query: &str, grounding: &str) -> String {
    format!(
        "Library matches: {grounding}\n\n\
         Request: {query}\n\n\
         If none of the library matches is a good fit for the request, recommend the \
         next-best title from the matches and say explicitly that it is a next-best \
         recommendation rather than an exact match."
    )
}
