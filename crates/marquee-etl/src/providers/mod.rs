//! HTTP clients for the external providers.

pub mod http;
pub mod openai;
pub mod pacing;
pub mod pinecone;
pub mod plex;
