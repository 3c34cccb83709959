//! Image encoder: raw image resource → data URI.
//!
//! Single-shot and non-streaming: the whole resource is buffered in memory
//! before encoding. Picks are small user photos, so this is fine.

use super::{EncodeError, MimeType, RawImage};
use base64::Engine;

const BASE64_MARKER: &str = ";base64,";

/// A fully encoded image: `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime: MimeType,
    data_uri: String,
    /// Byte offset where the base64 body starts inside `data_uri`.
    payload_start: usize,
}

impl EncodedImage {
    fn from_bytes(mime: MimeType, bytes: &[u8]) -> Self {
        let prefix = format!("data:{}{}", mime.as_str(), BASE64_MARKER);
        let payload_start = prefix.len();
        let mut data_uri = prefix;
        base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut data_uri);
        Self {
            mime,
            data_uri,
            payload_start,
        }
    }

    pub fn mime(&self) -> MimeType {
        self.mime
    }

    /// The full data URI, suitable for display and for the history record.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// The raw base64 body with the `data:...;base64,` prefix split off.
    /// This is what the classification endpoint expects.
    pub fn payload(&self) -> &str {
        &self.data_uri[self.payload_start..]
    }
}

/// Read an image resource fully and encode it as a data URI.
///
/// `name` is only used for error messages and logs.
pub async fn encode(name: &str, raw: &RawImage, mime: MimeType) -> Result<EncodedImage, EncodeError> {
    let start = std::time::Instant::now();

    let encoded = match raw {
        RawImage::File(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| EncodeError::Read {
                name: name.to_string(),
                message: e.to_string(),
            })?;
            if bytes.is_empty() {
                return Err(EncodeError::Empty {
                    name: name.to_string(),
                });
            }
            EncodedImage::from_bytes(mime, &bytes)
        }
        RawImage::Bytes(bytes) => {
            if bytes.is_empty() {
                return Err(EncodeError::Empty {
                    name: name.to_string(),
                });
            }
            EncodedImage::from_bytes(mime, bytes)
        }
    };

    log::debug!(
        "[INTAKE] Encoded '{}' ({}) in {}ms - {} base64 chars",
        name,
        mime,
        start.elapsed().as_millis(),
        encoded.payload().len()
    );
    Ok(encoded)
}

/// Split any data URI into `(mime, base64 payload)`.
pub fn split_data_uri(uri: &str) -> Result<(&str, &str), EncodeError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| EncodeError::MalformedDataUri("missing 'data:' scheme".to_string()))?;
    let marker = rest
        .find(BASE64_MARKER)
        .ok_or_else(|| EncodeError::MalformedDataUri("missing ';base64,' marker".to_string()))?;
    Ok((&rest[..marker], &rest[marker + BASE64_MARKER.len()..]))
}
