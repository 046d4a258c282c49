//! Shared utilities for integration tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fhir_submission_consumer::consumer::{ConsumerRecord, HandlerError, MessageHandler};
use fhir_submission_consumer::lifecycle::{CloseError, FnResource, Resource};
use tempfile::NamedTempFile;

/// Ordered record of close calls, shared between resources.
#[allow(dead_code)]
pub type CloseLog = Arc<Mutex<Vec<String>>>;

/// A resource that appends its name to `log` when closed and optionally fails.
#[allow(dead_code)]
pub fn recording_resource(name: &str, log: &CloseLog, fail: bool) -> Box<dyn Resource> {
    let log = log.clone();
    let label = name.to_string();
    Box::new(FnResource::new(name, move || -> Result<(), CloseError> {
        log.lock().unwrap().push(label.clone());
        if fail {
            return Err(format!("{label} failed to close").into());
        }
        Ok(())
    }))
}

/// Write `contents` to a temporary `.yaml` file.
#[allow(dead_code)]
pub fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Handler remembering every record key; keys starting with `bad` fail.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingHandler {
    pub keys: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, record: ConsumerRecord) -> Result<(), HandlerError> {
        let key = record.key.unwrap_or_default();
        self.keys.lock().unwrap().push(key.clone());
        if key.starts_with("bad") {
            return Err(format!("rejected {key}").into());
        }
        Ok(())
    }
}
