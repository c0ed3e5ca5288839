use std::cell::RefCell;
use std::io::Cursor;

use adv_client::{BatchUploader, FinishedBatch, NdjsonImporter, MAX_BATCH_LINES};
use adv_core::{Error, Result};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Upload { lines: usize, header_lines: String },
    Callback(u64),
}

/// Records every batch it sees and answers with the batch's payload size.
#[derive(Default)]
struct RecordingUploader {
    events: RefCell<Vec<Event>>,
    bodies: RefCell<Vec<Vec<u8>>>,
    fail_on_call: Option<usize>,
}

impl RecordingUploader {
    fn failing_on(call: usize) -> Self {
        Self { fail_on_call: Some(call), ..Self::default() }
    }

    fn upload_count(&self) -> usize {
        self.bodies.borrow().len()
    }
}

impl BatchUploader for RecordingUploader {
    fn upload_batch(&self, path: &str, batch: FinishedBatch) -> Result<Value> {
        assert_eq!(path, "v1/embeddings/e1/_import_ndjson");
        if self.fail_on_call == Some(self.upload_count()) {
            return Err(Error::Api { status: 500, message: "boom".into() });
        }
        let headers = batch.headers();
        let header_lines = headers["x-content-lines"].to_str().unwrap().to_string();
        assert_eq!(headers["content-length"].to_str().unwrap(), batch.body.len().to_string());
        self.events.borrow_mut().push(Event::Upload { lines: batch.lines, header_lines });
        let size = batch.body.len() as u64;
        self.bodies.borrow_mut().push(batch.body);
        Ok(json!({ "importedFileSizeOfBytes": size }))
    }
}

fn ndjson(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("{{\"id\":\"v{i}\",\"vector\":[{i}.0,0.5]}}\n"))
        .collect::<String>()
        .into_bytes()
}

fn run(uploader: &RecordingUploader, source: &[u8]) -> Result<adv_core::types::ImportSummary> {
    let mut handler = |rsp: &Value| -> Result<()> {
        let size = rsp["importedFileSizeOfBytes"].as_u64().unwrap();
        uploader.events.borrow_mut().push(Event::Callback(size));
        Ok(())
    };
    NdjsonImporter::new(uploader).import_reader(
        "v1/embeddings/e1/_import_ndjson",
        Cursor::new(source),
        Some(&mut handler),
    )
}

#[test]
fn empty_source_uploads_nothing() {
    let uploader = RecordingUploader::default();
    let summary = run(&uploader, b"").unwrap();
    assert_eq!(summary.batches, 0);
    assert_eq!(uploader.upload_count(), 0);
    assert!(uploader.events.borrow().is_empty());
}

#[test]
fn batch_count_is_ceiling_of_lines() {
    for n in [1usize, 999, 1000, 1001, 3000, 3001] {
        let uploader = RecordingUploader::default();
        let summary = run(&uploader, &ndjson(n)).unwrap();
        let expected = n.div_ceil(MAX_BATCH_LINES);
        assert_eq!(uploader.upload_count(), expected, "n={n}");
        assert_eq!(summary.batches, expected, "n={n}");
        assert_eq!(summary.lines, n);
    }
}

#[test]
fn exact_multiple_has_no_trailing_request() {
    let uploader = RecordingUploader::default();
    run(&uploader, &ndjson(2000)).unwrap();
    let lines: Vec<usize> = uploader
        .events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Upload { lines, .. } => Some(*lines),
            Event::Callback(_) => None,
        })
        .collect();
    assert_eq!(lines, vec![1000, 1000]);
}

#[test]
fn twenty_five_hundred_lines_in_three_ordered_batches() {
    let uploader = RecordingUploader::default();
    run(&uploader, &ndjson(2500)).unwrap();

    let bodies = uploader.bodies.borrow();
    let sizes: Vec<u64> = bodies.iter().map(|b| b.len() as u64).collect();
    let expected = vec![
        Event::Upload { lines: 1000, header_lines: "1000".into() },
        Event::Callback(sizes[0]),
        Event::Upload { lines: 1000, header_lines: "1000".into() },
        Event::Callback(sizes[1]),
        Event::Upload { lines: 500, header_lines: "500".into() },
        Event::Callback(sizes[2]),
    ];
    assert_eq!(*uploader.events.borrow(), expected);
}

#[test]
fn payloads_reassemble_the_source() {
    let source = ndjson(2345);
    let uploader = RecordingUploader::default();
    let summary = run(&uploader, &source).unwrap();

    let mut rebuilt = Vec::new();
    for body in uploader.bodies.borrow().iter() {
        assert_eq!(body.last(), Some(&b'\n'));
        rebuilt.extend_from_slice(&body[..body.len() - 1]);
    }
    assert_eq!(rebuilt, source);
    assert_eq!(summary.bytes, source.len() as u64);
}

#[test]
fn unterminated_last_line_is_kept() {
    let uploader = RecordingUploader::default();
    run(&uploader, b"{\"a\":1}\n{\"a\":2}").unwrap();
    assert_eq!(uploader.bodies.borrow()[0], b"{\"a\":1}\n{\"a\":2}\n");
}

#[test]
fn lines_pass_through_unvalidated() {
    let uploader = RecordingUploader::default();
    let source: &[u8] = b"not json\n\xff\xfe\n\n";
    run(&uploader, source).unwrap();
    let body = &uploader.bodies.borrow()[0];
    assert_eq!(&body[..body.len() - 1], source);
    assert!(matches!(
        uploader.events.borrow()[0],
        Event::Upload { lines: 3, .. }
    ));
}

#[test]
fn failed_upload_aborts_remaining_batches() {
    let uploader = RecordingUploader::failing_on(1);
    let err = run(&uploader, &ndjson(3500)).unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(uploader.upload_count(), 1);
    assert_eq!(uploader.events.borrow().len(), 2, "one upload and its callback");
}

#[test]
fn handler_error_aborts_import() {
    let uploader = RecordingUploader::default();
    let mut calls = 0;
    let mut handler = |_: &Value| -> Result<()> {
        calls += 1;
        Err(Error::UnexpectedResponse("stop".into()))
    };
    let err = NdjsonImporter::new(&uploader)
        .import_reader("v1/embeddings/e1/_import_ndjson", Cursor::new(ndjson(2500)), Some(&mut handler))
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse(_)));
    assert_eq!(calls, 1);
    assert_eq!(uploader.upload_count(), 1);
}

#[test]
fn handler_is_optional() {
    let uploader = RecordingUploader::default();
    let summary = NdjsonImporter::new(&uploader)
        .import_reader("v1/embeddings/e1/_import_ndjson", Cursor::new(ndjson(10)), None)
        .unwrap();
    assert_eq!(summary.batches, 1);
}
