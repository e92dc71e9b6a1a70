use serde::{Deserialize, Serialize};

/// A single file handed to the pipeline, as received from an upload form
/// or read from disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Decoded text of one upload.
///
/// `degraded` is set when the file could not be decoded for its stated
/// type; `text` is then empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedText {
    pub name: String,
    pub text: String,
    pub degraded: Option<String>,
}

impl ExtractedText {
    pub fn decoded(name: String, text: String) -> Self {
        Self {
            name,
            text,
            degraded: None,
        }
    }

    pub fn degraded(name: String, reason: String) -> Self {
        Self {
            name,
            text: String::new(),
            degraded: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}
