//! Camera snapshot capability.

use std::sync::Arc;

use tokio::process::Command;

use super::upload::{encode_upload, sniff_image_mime};
use super::{find_program, looks_like_permission_denial};
use crate::data_uri::ImageDataUri;
use crate::error::{CaptureError, PermissionError};

/// A camera that can be opened for capturing stills.
#[async_trait::async_trait]
pub trait Camera: Send + Sync {
    /// Acquire the device. The returned stream releases it on drop.
    async fn open(&self) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// An acquired camera.
#[async_trait::async_trait]
pub trait CameraStream: Send {
    /// Grab the current frame as a still image.
    async fn capture(&mut self) -> Result<ImageDataUri, CaptureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPermission {
    Unknown,
    Granted,
    Denied,
}

/// Scoped camera use: open, capture any number of stills, release on drop.
pub struct CameraSession {
    camera: Arc<dyn Camera>,
    stream: Option<Box<dyn CameraStream>>,
    permission: CameraPermission,
}

impl CameraSession {
    pub fn new(camera: Arc<dyn Camera>) -> Self {
        Self {
            camera,
            stream: None,
            permission: CameraPermission::Unknown,
        }
    }

    pub fn permission(&self) -> CameraPermission {
        self.permission
    }

    pub async fn open(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }
        match self.camera.open().await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.permission = CameraPermission::Granted;
                Ok(())
            }
            Err(err) => {
                if matches!(err, CaptureError::Permission(_)) {
                    self.permission = CameraPermission::Denied;
                }
                tracing::warn!(error = %err, "camera unavailable");
                Err(err)
            }
        }
    }

    pub async fn capture(&mut self) -> Result<ImageDataUri, CaptureError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(CaptureError::Unavailable("camera stream"))?;
        match stream.capture().await {
            Err(CaptureError::Permission(err)) => {
                self.permission = CameraPermission::Denied;
                self.stream = None;
                Err(err.into())
            }
            other => other,
        }
    }

    /// Release the device.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("camera released");
        }
    }
}

/// Camera backed by a command that prints one frame (PNG/JPEG) to stdout,
/// e.g. `imagesnap -` or `fswebcam -`.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    /// `None` when the command is empty or the program cannot be found.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        find_program(program)?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl Camera for CommandCamera {
    async fn open(&self) -> Result<Box<dyn CameraStream>, CaptureError> {
        if find_program(&self.program).is_none() {
            return Err(CaptureError::Unavailable("camera command"));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl CameraStream for CommandCamera {
    async fn capture(&mut self) -> Result<ImageDataUri, CaptureError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::Failed(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if looks_like_permission_denial(&stderr) {
                return Err(PermissionError::CameraDenied(stderr).into());
            }
            return Err(CaptureError::Failed(stderr));
        }

        let mime = sniff_image_mime(&output.stdout)
            .ok_or_else(|| CaptureError::Failed("camera command did not print an image".into()))?;
        Ok(encode_upload(mime, &output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FRAME: &str = "data:image/png;base64,iVBORw0KGgo=";

    struct FakeCamera {
        deny: bool,
        live_streams: Arc<AtomicUsize>,
    }

    struct FakeStream {
        live_streams: Arc<AtomicUsize>,
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl Camera for FakeCamera {
        async fn open(&self) -> Result<Box<dyn CameraStream>, CaptureError> {
            if self.deny {
                return Err(PermissionError::CameraDenied("user said no".into()).into());
            }
            self.live_streams.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                live_streams: Arc::clone(&self.live_streams),
            }))
        }
    }

    #[async_trait::async_trait]
    impl CameraStream for FakeStream {
        async fn capture(&mut self) -> Result<ImageDataUri, CaptureError> {
            Ok(ImageDataUri::parse(FRAME)?)
        }
    }

    fn session(deny: bool) -> (CameraSession, Arc<AtomicUsize>) {
        let live = Arc::new(AtomicUsize::new(0));
        let camera = FakeCamera {
            deny,
            live_streams: Arc::clone(&live),
        };
        (CameraSession::new(Arc::new(camera)), live)
    }

    #[tokio::test]
    async fn capture_after_open_returns_frame() {
        let (mut session, live) = session(false);
        session.open().await.unwrap();
        assert_eq!(session.permission(), CameraPermission::Granted);
        assert_eq!(live.load(Ordering::SeqCst), 1);

        let frame = session.capture().await.unwrap();
        assert_eq!(frame.as_str(), FRAME);
    }

    #[tokio::test]
    async fn denial_is_recorded() {
        let (mut session, _) = session(true);
        let err = session.open().await.unwrap_err();
        assert!(matches!(err, CaptureError::Permission(PermissionError::CameraDenied(_))));
        assert_eq!(session.permission(), CameraPermission::Denied);
        assert!(matches!(session.capture().await, Err(CaptureError::Unavailable(_))));
    }

    #[tokio::test]
    async fn stream_released_on_close_and_drop() {
        let (mut session, live) = session(false);
        session.open().await.unwrap();
        session.close();
        assert_eq!(live.load(Ordering::SeqCst), 0);

        session.open().await.unwrap();
        assert_eq!(live.load(Ordering::SeqCst), 1);
        drop(session);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn command_camera_requires_program() {
        assert!(CommandCamera::from_command(&[]).is_none());
        assert!(CommandCamera::from_command(&["no-such-camera-tool-nexora".into()]).is_none());
    }
}
