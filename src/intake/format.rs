use std::path::Path;

use serde::Serialize;

use super::IntakeRejection;

/// Raster formats the analysis endpoint accepts.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// A file the user picked or dropped, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub content: Vec<u8>,
    /// Media type as declared by the entry point (not sniffed).
    pub media_type: String,
    pub file_name: Option<String>,
}

impl FileCandidate {
    pub fn new(content: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            content,
            media_type: media_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// File-picker entry point: reads the file and declares its media type
    /// from the extension, the way a browser file input does.
    pub async fn from_picker(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);

        Ok(Self {
            content,
            media_type: media_type.to_string(),
            file_name,
        })
    }

    /// Drag-and-drop entry point: only the first dropped file counts.
    pub fn from_drop(files: Vec<FileCandidate>) -> Option<Self> {
        files.into_iter().next()
    }
}

/// A candidate that passed validation. Only `validate` constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedScan {
    #[serde(skip)]
    content: Vec<u8>,
    media_type: String,
    file_name: String,
    size_bytes: u64,
}

impl AcceptedScan {
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Normalised essence of a declared media type: lowercase, no parameters.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn default_file_name(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "scan.png",
        _ => "scan.jpg",
    }
}

/// Accept a candidate only if its declared type is on the allow-list.
///
/// A missing candidate and an empty payload are both "missing".
pub fn validate(candidate: Option<FileCandidate>) -> Result<AcceptedScan, IntakeRejection> {
    let candidate = candidate.ok_or(IntakeRejection::Missing)?;

    let media_type = essence(&candidate.media_type);
    if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(IntakeRejection::UnsupportedType(candidate.media_type));
    }
    if candidate.content.is_empty() {
        return Err(IntakeRejection::Missing);
    }

    let file_name = candidate
        .file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| default_file_name(&media_type).to_string());

    Ok(AcceptedScan {
        size_bytes: candidate.content.len() as u64,
        content: candidate.content,
        media_type,
        file_name,
    })
}
