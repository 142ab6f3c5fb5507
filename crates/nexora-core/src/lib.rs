pub mod ai;
pub mod capture;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod flows;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod reveal;
pub mod state;
pub mod tabs;

// Re-export main types for convenience
pub use ai::{ClaudeClient, GeminiClient, OllamaClient, OpenAIClient, Timeouts};
pub use config::Config;
pub use data_uri::{save_image, ImageDataUri, MAX_UPLOAD_BYTES};
pub use error::{CaptureError, FlowError, ModelInvocationError, PermissionError, ValidationError};
pub use flows::{
    generate_image, respond_with_reasoning, ImageRequest, ImageResponse, ReasoningRequest,
    ReasoningResponse,
};
pub use model::{ModelBackend, SharedBackend};
pub use provider::{build_backend, Provider};
pub use reveal::Reveal;
pub use state::{ChatMessage, ChatRole, HistoryTurn};
pub use tabs::{ChatEntry, ChatFailurePolicy, ChatTab, ImageGenTab, Notice, ReasoningTab};
