//! Media capture adapters: file upload, camera, and speech-to-text.
//!
//! Camera and speech are capability traits. The default adapters shell out to
//! a user-configured command; when none is configured the capability is
//! absent and the UI simply does not offer it.

pub mod camera;
pub mod speech;
pub mod upload;

pub use camera::{Camera, CameraPermission, CameraSession, CameraStream, CommandCamera};
pub use speech::{CommandRecognizer, SpeechErrorKind, SpeechEvent, SpeechRecognizer, VoiceInput, VoiceState};
pub use upload::{encode_upload, load_image};

use std::path::{Path, PathBuf};

/// Resolve a program name against `PATH`, or check an explicit path.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// Heuristic used by command adapters: did the device refuse us?
pub(crate) fn looks_like_permission_denial(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["permission", "denied", "not authorized", "not permitted"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_found() {
        assert!(find_program("definitely-not-a-real-program-nexora").is_none());
        assert!(find_program("/definitely/not/here").is_none());
    }

    #[test]
    fn permission_heuristic() {
        assert!(looks_like_permission_denial("Error: Camera access DENIED by user"));
        assert!(looks_like_permission_denial("Operation not permitted"));
        assert!(!looks_like_permission_denial("device busy"));
    }
}
