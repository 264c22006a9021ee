use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

/// Bytes scanned for a `<meta charset>` declaration, as browsers do.
const CHARSET_PRESCAN: usize = 1024;

static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*charset\s*=\s*["']?\s*([a-z0-9_.:-]+)"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Html,
    Pdf,
}

impl DocumentFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => Ok(DocumentFormat::Html),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(PipelineError::UnsupportedFormat(ext)),
        }
    }
}

/// Raw document content ready for extraction.
#[derive(Debug)]
pub enum Loaded {
    Html(String),
    Text(String),
}

pub fn load(path: &Path) -> Result<Loaded> {
    if !path.exists() {
        return Err(PipelineError::NotFound(path.to_path_buf()).into());
    }
    let format = DocumentFormat::from_path(path)?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    info!("Loaded {:?} ({} bytes, {:?})", path, bytes.len(), format);

    match format {
        DocumentFormat::Html => Ok(Loaded::Html(decode_html(&bytes))),
        DocumentFormat::Pdf => {
            let text = pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| anyhow::anyhow!("Failed to extract text from {:?}: {}", path, e))?;
            debug!("PDF text: {} lines", text.lines().count());
            Ok(Loaded::Text(text))
        }
    }
}

/// Decode HTML bytes to UTF-8: byte-order mark first, then `<meta charset>`, then UTF-8.
pub fn decode_html(bytes: &[u8]) -> String {
    let declared = declared_charset(bytes).unwrap_or(UTF_8);
    // `decode` lets a BOM override the declared encoding.
    let (text, used, had_errors) = declared.decode(bytes);
    if had_errors {
        warn!("HTML is not valid {}; malformed bytes were replaced", used.name());
    }
    debug!("HTML decoded as {}", used.name());
    text.into_owned()
}

fn declared_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(CHARSET_PRESCAN)];
    let label = META_CHARSET_RE.captures(head)?.get(1)?;
    // A meta tag cannot declare UTF-16 (it would not be ASCII-readable); that maps to UTF-8.
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}
