//! Image data URIs: `data:<mime>;base64,<payload>`.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Largest upload accepted from a file or camera, in raw bytes.
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;

/// A validated image data URI.
///
/// The MIME type is always `image/*` and the payload is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageDataUri {
    uri: String,
    // byte offset where the base64 payload begins
    payload_start: usize,
    mime_end: usize,
}

impl ImageDataUri {
    /// Parse and validate a data URI string.
    pub fn parse(uri: impl Into<String>) -> Result<Self, ValidationError> {
        let uri = uri.into();
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ValidationError::MalformedDataUri("missing `data:` prefix".into()))?;

        let comma = rest
            .find(',')
            .ok_or_else(|| ValidationError::MalformedDataUri("missing `,` separator".into()))?;
        let header = &rest[..comma];
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| ValidationError::MalformedDataUri("payload is not base64".into()))?;

        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(ValidationError::UnsupportedType {
                mime: if mime.is_empty() { "unknown".into() } else { mime.to_string() },
            });
        }

        let payload_start = "data:".len() + comma + 1;
        if uri.len() == payload_start {
            return Err(ValidationError::MalformedDataUri("empty payload".into()));
        }

        Ok(Self {
            payload_start,
            mime_end: "data:".len() + mime.len(),
            uri,
        })
    }

    /// Encode raw bytes under the given MIME type.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::MalformedDataUri("empty payload".into()));
        }
        Self::parse(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    pub fn mime_type(&self) -> &str {
        &self.uri["data:".len()..self.mime_end]
    }

    /// The base64 payload without the header.
    pub fn base64_data(&self) -> &str {
        &self.uri[self.payload_start..]
    }

    pub fn decode(&self) -> Result<Vec<u8>, ValidationError> {
        STANDARD
            .decode(self.base64_data())
            .map_err(|e| ValidationError::MalformedDataUri(e.to_string()))
    }

    /// Approximate decoded size without decoding.
    pub fn decoded_len(&self) -> usize {
        let data = self.base64_data().trim_end_matches('=');
        data.len() * 3 / 4
    }

    /// File extension for the MIME type, `png` when unknown.
    pub fn extension(&self) -> &str {
        match self.mime_type() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/svg+xml" => "svg",
            _ => "png",
        }
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl TryFrom<String> for ImageDataUri {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ImageDataUri> for String {
    fn from(value: ImageDataUri) -> Self {
        value.uri
    }
}

/// File name stem for a downloaded image: first 20 chars of the prompt with
/// whitespace replaced by `_`, or `generated`.
pub fn download_stem(prompt: &str) -> String {
    let stem: String = prompt
        .chars()
        .take(20)
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '\0'))
        .collect();
    if stem.is_empty() {
        "generated".to_string()
    } else {
        stem
    }
}

/// Write a generated image into `dir`, named after the prompt.
pub fn save_image(dir: &Path, prompt: &str, image: &ImageDataUri) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", download_stem(prompt), image.extension()));
    std::fs::write(&path, image.decode()?)?;
    tracing::info!(path = %path.display(), bytes = image.decoded_len(), "saved generated image");
    Ok(path)
}
