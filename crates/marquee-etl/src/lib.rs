//! Provider clients and the ingestion pipeline for marquee.
//!
//! Implements the OpenAI, Pinecone, and Plex clients behind the
//! `marquee-core` provider traits, layered configuration, and the
//! full-library sync that feeds the vector index.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod pipeline;
pub mod providers;

pub use config::Config;
pub use pipeline::{IngestPipeline, IngestSettings};
pub use providers::openai::OpenAiClient;
pub use providers::pinecone::PineconeClient;
pub use providers::plex::PlexClient;
