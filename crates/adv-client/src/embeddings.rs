use std::path::Path;

use adv_core::error::{Error, Result};
use adv_core::types::{EmbeddingType, EmbeddingTypeList, ImportSummary, NewEmbeddingType, VectorCount};

use crate::import::{BatchHandler, NdjsonImporter};
use crate::transport::AdvClient;

const EMBEDDINGS_PATH: &str = "v1/embeddings";

/// Embedding-type operations on top of a shared [`AdvClient`].
pub struct EmbeddingsApi<'c> {
    client: &'c AdvClient,
}

impl<'c> EmbeddingsApi<'c> {
    pub fn new(client: &'c AdvClient) -> Self {
        Self { client }
    }

    pub fn create_embedding_type(&self, name: &str, dims: u32) -> Result<EmbeddingType> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("embedding type name must not be empty".to_string()));
        }
        if dims == 0 {
            return Err(Error::InvalidInput("dims must be a positive integer".to_string()));
        }
        let created = self
            .client
            .post(EMBEDDINGS_PATH, &NewEmbeddingType { name, dims })?
            .ok_or_else(|| Error::UnexpectedResponse("empty body creating embedding type".to_string()))?;
        Ok(serde_json::from_value(created)?)
    }

    pub fn list_embedding_types(&self) -> Result<Vec<EmbeddingType>> {
        let listed = self
            .client
            .get(EMBEDDINGS_PATH)?
            .ok_or_else(|| Error::UnexpectedResponse("empty body listing embedding types".to_string()))?;
        let list: EmbeddingTypeList = serde_json::from_value(listed)?;
        Ok(list.results)
    }

    pub fn import_vectors_from_file(
        &self,
        id: &str,
        file: &Path,
        on_batch: Option<BatchHandler<'_>>,
    ) -> Result<ImportSummary> {
        let path = format!("{}/_import_ndjson", embedding_path(id)?);
        NdjsonImporter::new(self.client).import_file(&path, file, on_batch)
    }

    /// Number of vectors the service reports as imported; 0 if it reports none.
    pub fn imported_vector_count(&self, id: &str) -> Result<u64> {
        let path = format!("{}/vectors/_count", embedding_path(id)?);
        match self.client.get(&path)? {
            Some(value) => Ok(serde_json::from_value::<VectorCount>(value)?.count),
            None => Ok(0),
        }
    }
}

/// Ids go into the URL path verbatim, so only unreserved characters pass.
fn embedding_path(id: &str) -> Result<String> {
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
    if id.is_empty() || id == "." || id == ".." || !id.chars().all(unreserved) {
        return Err(Error::InvalidInput(format!("invalid embedding type id '{}'", id)));
    }
    Ok(format!("{}/{}", EMBEDDINGS_PATH, id))
}
