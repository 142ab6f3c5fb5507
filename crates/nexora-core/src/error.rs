//! Error taxonomy shared by flows, tabs, and capture adapters.
//!
//! Every error here is local to the tab that raised it. None of them are
//! fatal; the UI surfaces them and leaves the tab usable for another try.

/// Input rejected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Neither text nor an image was supplied.
    #[error("nothing to send: enter some text or attach an image")]
    EmptyInput,

    /// The file is over the upload cap.
    #[error("file too large: {size} bytes (limit is {limit} bytes). Please upload an image smaller than 4MB.")]
    FileTooLarge { size: u64, limit: u64 },

    /// The file is not an image.
    #[error("unsupported file type: {mime}. Please upload an image file.")]
    UnsupportedType { mime: String },

    /// A string that should have been an image data URI was not.
    #[error("malformed data URI: {0}")]
    MalformedDataUri(String),

    /// The file could not be read.
    #[error("could not read file: {0}")]
    Io(String),
}

impl ValidationError {
    /// Short title for a warning notice.
    pub fn title(&self) -> &'static str {
        match self {
            Self::EmptyInput => "Nothing to send",
            Self::FileTooLarge { .. } => "File too large",
            Self::UnsupportedType { .. } => "Unsupported file type",
            Self::MalformedDataUri(_) => "Invalid image",
            Self::Io(_) => "Could not read file",
        }
    }
}

/// A device capability was refused by the operating system or the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("camera access denied: {0}")]
    CameraDenied(String),

    #[error("microphone access denied: {0}")]
    MicrophoneDenied(String),
}

/// The external model call failed or returned a payload we could not use.
#[derive(Debug, thiserror::Error)]
pub enum ModelInvocationError {
    /// No API key is configured for the selected provider.
    #[error("{provider} API key not configured. Press 'P' to set one up.")]
    MissingApiKey { provider: &'static str },

    /// The HTTP request itself failed.
    #[error("API request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The response parsed but contained no answer text.
    #[error("the model returned no answer")]
    MissingAnswer,

    /// The response parsed but contained no image.
    #[error("the model returned no image")]
    MissingImage,

    /// The selected provider cannot do what was asked.
    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: &'static str,
        capability: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Everything a flow can fail with.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ModelInvocation(#[from] ModelInvocationError),
}

/// Failures from camera and speech adapters.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The capability is not present on this machine.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    #[error("capture failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
