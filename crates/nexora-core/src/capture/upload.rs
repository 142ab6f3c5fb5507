//! Local file to image data URI, with the upload constraints applied first.

use std::fs;
use std::path::{Path, PathBuf};

use crate::data_uri::{ImageDataUri, MAX_UPLOAD_BYTES};
use crate::error::ValidationError;

/// Expand a leading `~/` to the home directory.
pub fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

/// Read an image file into a data URI.
///
/// Size is checked before the type, and both before the file is read.
pub fn load_image(path: &Path) -> Result<ImageDataUri, ValidationError> {
    let metadata = fs::metadata(path)
        .map_err(|e| ValidationError::Io(format!("{}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(ValidationError::Io(format!("{} is not a file", path.display())));
    }
    check_size(metadata.len())?;

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    check_mime(mime.essence_str())?;

    let bytes =
        fs::read(path).map_err(|e| ValidationError::Io(format!("{}: {}", path.display(), e)))?;
    let uri = ImageDataUri::from_bytes(mime.essence_str(), &bytes)?;
    tracing::debug!(
        path = %path.display(),
        mime = uri.mime_type(),
        bytes = bytes.len(),
        "image attached"
    );
    Ok(uri)
}

/// Encode in-memory bytes (camera frames, pasted data) under the same rules.
pub fn encode_upload(mime: &str, bytes: &[u8]) -> Result<ImageDataUri, ValidationError> {
    check_size(bytes.len() as u64)?;
    check_mime(mime)?;
    ImageDataUri::from_bytes(mime, bytes)
}

/// Sniff common image signatures.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ => None,
    }
}

fn check_size(size: u64) -> Result<(), ValidationError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

fn check_mime(mime: &str) -> Result<(), ValidationError> {
    if !mime.starts_with("image/") {
        return Err(ValidationError::UnsupportedType {
            mime: mime.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn loads_png_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fox.png");
        fs::write(&path, PNG_HEADER).unwrap();

        let uri = load_image(&path).unwrap();
        assert_eq!(uri.mime_type(), "image/png");
        assert_eq!(uri.decode().unwrap(), PNG_HEADER);
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

        let err = load_image(&path).unwrap_err();
        assert_eq!(
            err,
            ValidationError::FileTooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                limit: MAX_UPLOAD_BYTES
            }
        );
    }

    #[test]
    fn exactly_four_mib_is_accepted() {
        let bytes = vec![0u8; MAX_UPLOAD_BYTES as usize];
        assert!(encode_upload("image/png", &bytes).is_ok());
    }

    #[test]
    fn rejects_non_image_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(
            load_image(&path).unwrap_err(),
            ValidationError::UnsupportedType { mime: "text/plain".into() }
        );
        assert!(matches!(
            encode_upload("application/pdf", b"%PDF"),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_image(&dir.path().join("nope.png")),
            Err(ValidationError::Io(_))
        ));
        assert!(matches!(load_image(dir.path()), Err(ValidationError::Io(_))));
    }

    #[test]
    fn sniffs_signatures() {
        assert_eq!(sniff_image_mime(PNG_HEADER), Some("image/png"));
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_mime(b"hello"), None);
    }

    #[test]
    fn expands_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/pics/a.png"), home.join("pics/a.png"));
        }
        assert_eq!(expand_path(" /tmp/a.png "), PathBuf::from("/tmp/a.png"));
    }
}
