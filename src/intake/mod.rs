//! Image intake domain: public API.
//!
//! This module owns everything between "the user picked a file" and
//! "we hold a base64 payload ready to send":
//!   - encoder.rs   - raw image → data URI + raw base64 body
//!   - selection.rs: the staging area of picked images and their previews
//!
//! External code should only use the types re-exported here.

mod encoder;
mod selection;

pub use encoder::{encode, split_data_uri, EncodedImage};
pub use selection::{PreviewState, SelectionStore, StagedId, StagedImage};

use std::path::PathBuf;
use std::sync::Arc;

/// Image encodings accepted into the staging area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeType {
    Png,
    Jpeg,
    Svg,
}

impl MimeType {
    /// Check a MIME tag against the allow-list.
    ///
    /// Matching ignores case and any `;charset=...` style parameters.
    /// `image/jpg` is a common mislabel for JPEG and is accepted.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let essence = tag.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Guess a MIME tag from a file extension (used by the CLI driver).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the bytes of a picked image live.
#[derive(Debug, Clone)]
pub enum RawImage {
    /// A file on disk, read fully when encoded.
    File(PathBuf),
    /// Bytes already in memory (clipboard paste, drag-and-drop, tests).
    Bytes(Arc<[u8]>),
}

impl RawImage {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(Arc::from(bytes.into()))
    }
}

/// One user pick, as handed over by the selection input collaborator.
#[derive(Debug, Clone)]
pub struct ImageSource {
    /// Display name (usually the file name).
    pub name: String,
    /// MIME tag reported by the picker; checked against the allow-list.
    pub mime: String,
    pub raw: RawImage,
    /// URL of a copy the backend already holds, if any.
    pub remote_url: Option<String>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, raw: RawImage) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            raw,
            remote_url: None,
        }
    }

    /// Build a source from a path, deriving the MIME tag from its extension.
    /// Unknown extensions get `application/octet-stream`, which the
    /// allow-list rejects.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(MimeType::from_extension)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, mime, RawImage::File(path))
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }
}

/// Preview generation failed. Non-fatal: only the preview degrades.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to read image '{name}': {message}")]
    Read { name: String, message: String },

    #[error("image '{name}' is empty")]
    Empty { name: String },

    #[error("encoding of '{name}' was aborted")]
    Aborted { name: String },

    #[error("malformed data URI: {0}")]
    MalformedDataUri(String),
}

/// A pick whose MIME tag is not on the allow-list. The item never
/// enters the selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{name}' has unsupported type '{mime}' (only PNG, SVG, or JPG files are accepted)")]
pub struct RejectedTypeError {
    pub name: String,
    pub mime: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_accepts_png_jpeg_svg() {
        assert_eq!(MimeType::from_tag("image/png"), Some(MimeType::Png));
        assert_eq!(MimeType::from_tag("image/jpeg"), Some(MimeType::Jpeg));
        assert_eq!(MimeType::from_tag("image/svg+xml"), Some(MimeType::Svg));
    }

    #[test]
    fn allow_list_ignores_case_and_parameters() {
        assert_eq!(MimeType::from_tag("IMAGE/PNG"), Some(MimeType::Png));
        assert_eq!(
            MimeType::from_tag("image/svg+xml; charset=utf-8"),
            Some(MimeType::Svg)
        );
        assert_eq!(MimeType::from_tag("image/jpg"), Some(MimeType::Jpeg));
    }

    #[test]
    fn allow_list_rejects_everything_else() {
        for tag in ["image/gif", "image/webp", "application/pdf", "", "png"] {
            assert_eq!(MimeType::from_tag(tag), None, "tag {:?} slipped through", tag);
        }
    }

    #[test]
    fn source_from_path_derives_mime() {
        let src = ImageSource::from_path("/tmp/lunch.JPG");
        assert_eq!(src.mime, "image/jpeg");
        assert_eq!(src.name, "lunch.JPG");

        let src = ImageSource::from_path("/tmp/notes.txt");
        assert_eq!(src.mime, "application/octet-stream");
    }
}
