use serde_json::Value;
use std::path::Path;

use crate::error::{Error, Result};

/// Response field carrying the cumulative size imported for a batch.
pub const IMPORTED_SIZE_FIELD: &str = "importedFileSizeOfBytes";

/// Byte-level progress of one file upload.
///
/// `uploaded_bytes` only grows. It is fed from the server's per-batch
/// response, so it may overshoot `total_bytes`; the percentage is not clamped.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    total_bytes: u64,
    uploaded_bytes: u64,
}

impl UploadProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self { total_bytes, uploaded_bytes: 0 }
    }

    pub fn for_file(path: &Path) -> Result<Self> {
        Ok(Self::new(std::fs::metadata(path)?.len()))
    }

    /// Account for one batch response.
    pub fn record(&mut self, response: &Value) -> Result<()> {
        let size = response
            .get(IMPORTED_SIZE_FIELD)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("import response lacks '{}'", IMPORTED_SIZE_FIELD))
            })?;
        self.uploaded_bytes += size;
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    /// Whole-number percentage: `round(uploaded / total, 2) * 100`, with exact
    /// ties going to the even percent.
    pub fn percent(&self) -> f64 {
        if self.uploaded_bytes == 0 || self.total_bytes == 0 {
            return 0.0;
        }
        let ratio = self.uploaded_bytes as f64 / self.total_bytes as f64;
        (ratio * 100.0).round_ties_even()
    }
}
