//! Prompt assembly and attachment loading.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Raw bytes forwarded alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Attachment {
    /// Buffer without a file name; the mime type is sniffed from its bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        let mime_type = sniff_mime_type(&bytes).to_string();
        Self { bytes, mime_type }
    }

    /// File contents, typed by extension and sniffed only when the
    /// extension is unknown.
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_owned())
            .unwrap_or_else(|| sniff_mime_type(&bytes).to_string());
        Self { bytes, mime_type }
    }
}

/// Everything needed to issue one request. Built once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Fully assembled prompt text.
    pub query: String,
    pub context: Option<String>,
    /// Per-call model; `None` or `"default"` defers to preferences.
    pub model: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Text the response is diffed against, usually the original selection.
    pub reference_text: Option<String>,
}

impl RequestSpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: None,
            model: None,
            attachments: Vec::new(),
            reference_text: None,
        }
    }

    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.filter(|c| !c.is_empty()).map(str::to_string);
        self
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(str::to_string);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_reference(mut self, reference: Option<&str>) -> Self {
        self.reference_text = reference.map(str::to_string);
        self
    }
}

fn join_lines<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for a request that carries selected text.
///
/// With a query: `context \n query \n selection`. With only the context
/// template: `context \n selection`.
pub fn selection_prompt(context: Option<&str>, query: &str, selection: &str) -> String {
    if query.is_empty() {
        join_lines([context, Some(selection)])
    } else {
        join_lines([context, Some(query), Some(selection)])
    }
}

/// Prompt for a free-form query: `context \n\n query`, or just the query.
pub fn query_prompt(context: Option<&str>, query: &str) -> String {
    match context {
        Some(context) if !context.is_empty() => format!("{}\n\n{}", context, query),
        _ => query.to_string(),
    }
}

/// Reads the given paths into attachments.
///
/// Paths that don't exist or aren't regular files are skipped. A file that
/// exists but can't be read is skipped as well.
pub fn load_attachments<P: AsRef<Path>>(paths: &[P]) -> Vec<Attachment> {
    let mut attachments = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let is_file = fs::symlink_metadata(path)
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            debug!("Skipping attachment {:?}: not a regular file", path);
            continue;
        }

        match fs::read(path) {
            Ok(bytes) => attachments.push(Attachment::from_path(path, bytes)),
            Err(e) => warn!("Skipping attachment {:?}: {}", path, e),
        }
    }

    attachments
}

/// Magic-byte fallback for buffers with no usable file name.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"%PDF-") {
        "application/pdf"
    } else if std::str::from_utf8(bytes).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}
