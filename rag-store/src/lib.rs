//! Vector-store boundary for the study backend.
//!
//! This crate provides:
//! - the [`VectorStore`] trait (`query`, `describe_stats`, concurrent `query_many`)
//! - Qdrant and Pinecone adapters selected from the environment
//! - the [`EmbeddingsProvider`] trait and an LLM-service backed embedder
//! - metadata normalization into [`CanonicalRecord`]s and question filters
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

mod config;
mod embed;
mod errors;
mod filters;
pub mod normalize;
mod pinecone;
mod qdrant_facade;
mod record;
mod store;

pub use config::{IndexConfig, PineconeConfig, QdrantConfig, StoreConfig, VectorBackend};
pub use embed::{EmbeddingsProvider, LlmEmbedder};
pub use errors::RagError;
pub use filters::QuestionFilter;
pub use normalize::{CanonicalRecord, MetadataView, OptionIndexPolicy};
pub use pinecone::PineconeStore;
pub use qdrant_facade::QdrantStore;
pub use record::{IndexStats, Match, Metadata, NamespaceResult, NamespaceStats};
pub use store::VectorStore;
