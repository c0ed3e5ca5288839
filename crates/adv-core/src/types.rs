//! Wire types for the embeddings API.

use serde::{Deserialize, Serialize};

pub type EmbeddingTypeId = String;

/// A named, dimension-fixed vector schema owned by the service.
///
/// - `id`: opaque, server-assigned identifier
/// - `name`: unique, caller-supplied
/// - `dims`: fixed at creation; 0 when the service omits it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingType {
    pub id: EmbeddingTypeId,
    pub name: String,
    #[serde(default)]
    pub dims: u32,
}

/// Body of `POST adv/v1/embeddings`.
#[derive(Debug, Clone, Serialize)]
pub struct NewEmbeddingType<'a> {
    pub name: &'a str,
    pub dims: u32,
}

/// Body of `GET adv/v1/embeddings`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingTypeList {
    pub results: Vec<EmbeddingType>,
}

/// Body of `GET adv/v1/embeddings/{id}/vectors/_count`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VectorCount {
    #[serde(default)]
    pub count: u64,
}

/// Totals for one NDJSON import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub batches: usize,
    pub lines: usize,
    /// Source bytes sent, not counting the newline appended to each batch.
    pub bytes: u64,
}
