#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Blocking client for the embeddings service: JSON transport, chunked NDJSON
//! import and embedding-type operations.

pub mod embeddings;
pub mod import;
pub mod transport;

pub use embeddings::EmbeddingsApi;
pub use import::{BatchHandler, BatchUploader, FinishedBatch, ImportBatch, NdjsonImporter, MAX_BATCH_LINES};
pub use transport::AdvClient;
