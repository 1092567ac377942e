//! Query side of marquee.
//!
//! Embeds a free-text request, retrieves the nearest catalog entries,
//! resolves them back to live catalog records, and asks a chat model to
//! answer from that grounding.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod pipeline;
pub mod prompt;

pub use pipeline::{QueryPipeline, DEFAULT_TOP_K};
pub use prompt::{grounding_text, user_prompt, NO_MATCHES, SYSTEM_PROMPT};
