//! Chunked NDJSON upload.
//!
//! The source is read line by line and uploaded in batches of at most
//! [`MAX_BATCH_LINES`] lines, one request at a time. Lines are opaque bytes:
//! they are neither parsed nor validated here.
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use adv_core::error::Result;
use adv_core::types::ImportSummary;

use crate::transport::{error_from_response, AdvClient};

pub const MAX_BATCH_LINES: usize = 1000;
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
pub const CONTENT_LINES_HEADER: &str = "x-content-lines";

/// Called with the decoded response of every uploaded batch.
pub type BatchHandler<'h> = &'h mut dyn FnMut(&Value) -> Result<()>;

/// Lines accumulated for the next upload.
#[derive(Debug, Default)]
pub struct ImportBatch {
    buffer: Vec<u8>,
    lines: usize,
}

impl ImportBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &[u8]) {
        self.buffer.extend_from_slice(line);
        self.lines += 1;
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    pub fn is_full(&self) -> bool {
        self.lines >= MAX_BATCH_LINES
    }

    /// Terminate the payload with one extra newline and freeze it.
    pub fn finish(mut self) -> FinishedBatch {
        self.buffer.push(b'\n');
        FinishedBatch { lines: self.lines, body: self.buffer }
    }
}

/// A batch ready to go on the wire.
#[derive(Debug)]
pub struct FinishedBatch {
    pub lines: usize,
    pub body: Vec<u8>,
}

impl FinishedBatch {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(NDJSON_CONTENT_TYPE));
        headers.insert(HeaderName::from_static(CONTENT_LINES_HEADER), HeaderValue::from(self.lines));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        headers
    }
}

/// Where finished batches go.
pub trait BatchUploader {
    /// Upload one batch to `path`, returning the decoded response body
    /// (`Value::Null` when the body is empty).
    fn upload_batch(&self, path: &str, batch: FinishedBatch) -> Result<Value>;
}

impl BatchUploader for AdvClient {
    fn upload_batch(&self, path: &str, batch: FinishedBatch) -> Result<Value> {
        let headers = batch.headers();
        let rsp = self.send_bytes(path, batch.body, headers)?;
        if !rsp.status().is_success() {
            return Err(error_from_response(rsp));
        }
        let body = rsp.bytes()?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

pub struct NdjsonImporter<'a, U: BatchUploader + ?Sized> {
    uploader: &'a U,
}

impl<'a, U: BatchUploader + ?Sized> NdjsonImporter<'a, U> {
    pub fn new(uploader: &'a U) -> Self {
        Self { uploader }
    }

    pub fn import_file(
        &self,
        path: &str,
        file: &Path,
        on_batch: Option<BatchHandler<'_>>,
    ) -> Result<ImportSummary> {
        let reader = BufReader::new(File::open(file)?);
        info!(source = %file.display(), resource = path, "starting NDJSON import");
        self.import_reader(path, reader, on_batch)
    }

    /// Stream `reader` to `path`. The first failed upload or handler error
    /// aborts the import; batches already sent are not rolled back.
    pub fn import_reader<R: BufRead>(
        &self,
        path: &str,
        mut reader: R,
        mut on_batch: Option<BatchHandler<'_>>,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut batch = ImportBatch::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            batch.push_line(&line);
            summary.lines += 1;
            summary.bytes += line.len() as u64;
            if batch.is_full() {
                self.send(path, std::mem::take(&mut batch), &mut on_batch)?;
                summary.batches += 1;
            }
        }
        if !batch.is_empty() {
            self.send(path, batch, &mut on_batch)?;
            summary.batches += 1;
        }
        info!(batches = summary.batches, lines = summary.lines, bytes = summary.bytes, "import finished");
        Ok(summary)
    }

    fn send(
        &self,
        path: &str,
        batch: ImportBatch,
        on_batch: &mut Option<BatchHandler<'_>>,
    ) -> Result<()> {
        let finished = batch.finish();
        debug!(lines = finished.lines, bytes = finished.body.len(), "uploading batch");
        let response = self.uploader.upload_batch(path, finished)?;
        if let Some(handler) = on_batch.as_deref_mut() {
            handler(&response)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_appends_single_newline() {
        let mut batch = ImportBatch::new();
        batch.push_line(b"{\"a\":1}\n");
        batch.push_line(b"{\"a\":2}");
        let finished = batch.finish();
        assert_eq!(finished.lines, 2);
        assert_eq!(finished.body, b"{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn headers_describe_payload() {
        let mut batch = ImportBatch::new();
        batch.push_line(b"{}\n");
        let finished = batch.finish();
        let headers = finished.headers();
        assert_eq!(headers[CONTENT_TYPE], NDJSON_CONTENT_TYPE);
        assert_eq!(headers[CONTENT_LINES_HEADER], "1");
        assert_eq!(headers[CONTENT_LENGTH], "4");
    }

    #[test]
    fn batch_fills_at_limit() {
        let mut batch = ImportBatch::new();
        for _ in 0..MAX_BATCH_LINES - 1 {
            batch.push_line(b"{}\n");
        }
        assert!(!batch.is_full());
        batch.push_line(b"{}\n");
        assert!(batch.is_full());
    }
}
