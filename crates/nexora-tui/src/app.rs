use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::{JoinError, JoinHandle};

use nexora_core::capture::upload::expand_path;
use nexora_core::capture::{
    load_image, Camera, CameraPermission, CameraSession, CommandCamera, CommandRecognizer,
    VoiceInput,
};
use nexora_core::{
    build_backend, generate_image, respond_with_reasoning, save_image, CaptureError, ChatRole,
    ChatTab, Config, FlowError, ImageDataUri, ImageGenTab, ImageResponse, ModelInvocationError,
    Notice, OllamaClient, Provider, ReasoningResponse, ReasoningTab, SharedBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Reasoning,
    ImageGen,
    Chat,
}

impl Tab {
    pub fn all() -> [Tab; 3] {
        [Tab::Reasoning, Tab::ImageGen, Tab::Chat]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Reasoning => "Reasoning",
            Tab::ImageGen => "Image Generation",
            Tab::Chat => "Chat",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Reasoning => 0,
            Tab::ImageGen => 1,
            Tab::Chat => 2,
        }
    }

    pub fn next(&self) -> Tab {
        Tab::all()[(self.index() + 1) % 3]
    }

    pub fn prev(&self) -> Tab {
        Tab::all()[(self.index() + 2) % 3]
    }

    /// Tabs that take an image alongside the text.
    pub fn accepts_images(&self) -> bool {
        matches!(self, Tab::Reasoning | Tab::Chat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Ticks per ellipsis frame.
const ANIMATION_TICKS: u64 = 6;

type FlowTask<T> = JoinHandle<Result<T, FlowError>>;
type CaptureTask = JoinHandle<(CameraPermission, Result<ImageDataUri, CaptureError>)>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub tab: Tab,
    pub input_mode: InputMode,
    pub cursor: usize, // cursor position in the active tab's input

    // Tabs
    pub reasoning: ReasoningTab,
    pub image_gen: ImageGenTab,
    pub chat: ChatTab,
    pub reasoning_task: Option<FlowTask<ReasoningResponse>>,
    pub image_task: Option<FlowTask<ImageResponse>>,
    pub chat_task: Option<FlowTask<ReasoningResponse>>,

    // Chat transcript scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of transcript area for scroll calculations
    pub chat_width: u16,  // Width of transcript area for wrap calculations
    pub chat_area: Option<Rect>, // For mouse hit-testing (updated during render)

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub ticks: u64,

    // Provider state
    pub config: Config,
    pub current_provider: Provider,
    pub backend: Option<SharedBackend>,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target_provider: Option<Provider>,

    // Attach-file popup state
    pub show_attach_input: bool,
    pub attach_input: String,
    pub attach_input_cursor: usize,

    // Capture capabilities (absent when not configured)
    pub camera: Option<Arc<dyn Camera>>,
    pub camera_permission: CameraPermission,
    pub camera_task: Option<(Tab, CaptureTask)>,
    pub voice: Option<VoiceInput>,
    pub voice_target: Tab,

    pub notice: Option<Notice>,
}

impl App {
    pub fn new(config: Config, provider: Provider) -> Self {
        let mut app = Self::without_backend(config, provider);
        app.rebuild_backend();
        app
    }

    /// App state with capture adapters wired from config but no model backend.
    pub fn without_backend(mut config: Config, provider: Provider) -> Self {
        config.switch_provider(provider);
        let camera = config
            .camera_command
            .as_deref()
            .and_then(CommandCamera::from_command)
            .map(|camera| Arc::new(camera) as Arc<dyn Camera>);
        let voice = config
            .speech_command
            .as_deref()
            .and_then(CommandRecognizer::from_command)
            .map(|recognizer| VoiceInput::new(Box::new(recognizer)));

        tracing::info!(
            provider = provider.as_str(),
            camera = camera.is_some(),
            voice = voice.is_some(),
            "starting nexora"
        );

        Self {
            should_quit: false,
            tab: Tab::Reasoning,
            input_mode: InputMode::Normal,
            cursor: 0,

            reasoning: ReasoningTab::new(),
            image_gen: ImageGenTab::new(),
            chat: ChatTab::new(config.chat_failure_policy(), config.reveal_interval()),
            reasoning_task: None,
            image_task: None,
            chat_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,
            ticks: 0,

            current_provider: provider,
            config,
            backend: None,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target_provider: None,

            show_attach_input: false,
            attach_input: String::new(),
            attach_input_cursor: 0,

            camera,
            camera_permission: CameraPermission::Unknown,
            camera_task: None,
            voice,
            voice_target: Tab::Reasoning,

            notice: None,
        }
    }

    // Backend

    /// Rebuild the backend after a provider, key, or model change.
    pub fn rebuild_backend(&mut self) {
        self.backend = match build_backend(self.current_provider, &self.config) {
            Ok(backend) => Some(backend),
            Err(err) => {
                tracing::warn!(
                    provider = self.current_provider.as_str(),
                    error = %err,
                    "backend unavailable"
                );
                None
            }
        };
    }

    fn backend(&mut self) -> Result<SharedBackend, ModelInvocationError> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::clone(backend));
        }
        let backend = build_backend(self.current_provider, &self.config)?;
        self.backend = Some(Arc::clone(&backend));
        Ok(backend)
    }

    /// Model shown in the header.
    pub fn model_label(&self) -> String {
        match (&self.backend, self.tab) {
            (Some(backend), Tab::ImageGen) => backend.image_model().to_string(),
            (Some(backend), _) => backend.reasoning_model().to_string(),
            (None, _) => "not configured".to_string(),
        }
    }

    // Tabs and input

    pub fn switch_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.input_mode = InputMode::Normal;
            self.cursor = self.active_input().chars().count();
        }
    }

    pub fn active_input(&self) -> &str {
        match self.tab {
            Tab::Reasoning => &self.reasoning.question,
            Tab::ImageGen => &self.image_gen.prompt,
            Tab::Chat => &self.chat.input,
        }
    }

    pub fn active_input_mut(&mut self) -> &mut String {
        match self.tab {
            Tab::Reasoning => &mut self.reasoning.question,
            Tab::ImageGen => &mut self.image_gen.prompt,
            Tab::Chat => &mut self.chat.input,
        }
    }

    pub fn show_popup(&self) -> bool {
        self.show_api_key_input || self.show_attach_input || self.show_provider_picker || self.show_model_picker
    }

    pub fn start_editing(&mut self) {
        self.input_mode = InputMode::Editing;
        self.cursor = self.active_input().chars().count();
    }

    pub fn is_loading(&self, tab: Tab) -> bool {
        match tab {
            Tab::Reasoning => self.reasoning.loading,
            Tab::ImageGen => self.image_gen.loading,
            Tab::Chat => self.chat.loading,
        }
    }

    pub fn attached_image(&self, tab: Tab) -> Option<&ImageDataUri> {
        match tab {
            Tab::Reasoning => self.reasoning.image.as_ref(),
            Tab::Chat => self.chat.image.as_ref(),
            Tab::ImageGen => None,
        }
    }

    /// Submit the active tab. A no-op while that tab is loading or empty.
    pub fn submit(&mut self) {
        match self.tab {
            Tab::Reasoning => {
                let Some(request) = self.reasoning.begin_submit() else {
                    return;
                };
                match self.backend() {
                    Ok(backend) => {
                        self.reasoning_task = Some(tokio::spawn(async move {
                            respond_with_reasoning(backend.as_ref(), &request).await
                        }));
                    }
                    Err(err) => self.reasoning.complete(Err(err.into())),
                }
            }
            Tab::ImageGen => {
                let Some(request) = self.image_gen.begin_submit() else {
                    return;
                };
                match self.backend() {
                    Ok(backend) => {
                        self.image_task = Some(tokio::spawn(async move {
                            generate_image(backend.as_ref(), &request).await
                        }));
                    }
                    Err(err) => self.image_gen.complete(Err(err.into())),
                }
            }
            Tab::Chat => {
                let Some(request) = self.chat.begin_submit() else {
                    return;
                };
                self.cursor = 0;
                match self.backend() {
                    Ok(backend) => {
                        self.chat_task = Some(tokio::spawn(async move {
                            respond_with_reasoning(backend.as_ref(), &request).await
                        }));
                    }
                    Err(err) => {
                        self.chat.complete(Err(err.into()));
                        self.cursor = self.chat.input.chars().count();
                    }
                }
                // Scroll to bottom so "Thinking..." is visible
                self.scroll_chat_to_bottom();
            }
        }
    }

    /// Fold finished background work back into the tabs.
    pub async fn poll_tasks(&mut self) {
        if let Some(result) = take_finished(&mut self.reasoning_task).await {
            self.reasoning.complete(result.unwrap_or_else(|e| Err(join_failure(e))));
        }
        if let Some(result) = take_finished(&mut self.image_task).await {
            self.image_gen.complete(result.unwrap_or_else(|e| Err(join_failure(e))));
        }
        if let Some(result) = take_finished(&mut self.chat_task).await {
            self.chat.complete(result.unwrap_or_else(|e| Err(join_failure(e))));
            if self.tab == Tab::Chat && self.input_mode == InputMode::Editing {
                self.cursor = self.chat.input.chars().count();
            }
            self.scroll_chat_to_bottom();
        }

        if self.camera_task.as_ref().is_some_and(|(_, task)| task.is_finished()) {
            if let Some((target, task)) = self.camera_task.take() {
                match task.await {
                    Ok((permission, result)) => {
                        self.camera_permission = permission;
                        self.finish_capture(target, result);
                    }
                    Err(e) => self.finish_capture(target, Err(CaptureError::Failed(e.to_string()))),
                }
            }
        }

        if let Some(transcript) = self.voice.as_mut().and_then(VoiceInput::poll) {
            tracing::debug!(chars = transcript.chars().count(), "transcript received");
            match self.voice_target {
                Tab::Reasoning => self.reasoning.apply_transcript(&transcript),
                Tab::ImageGen => self.image_gen.apply_transcript(&transcript),
                Tab::Chat => self.chat.apply_transcript(&transcript),
            }
            if self.tab == self.voice_target {
                self.cursor = self.active_input().chars().count();
            }
        }
        if let Some(err) = self.voice.as_mut().and_then(VoiceInput::take_denial) {
            self.notice = Some(Notice::from(&err));
            self.voice = None;
        }
    }

    /// Abort everything in flight. Called on quit.
    pub fn abort_tasks(&mut self) {
        for task in [self.reasoning_task.take(), self.chat_task.take()].into_iter().flatten() {
            task.abort();
        }
        if let Some(task) = self.image_task.take() {
            task.abort();
        }
        if let Some((_, task)) = self.camera_task.take() {
            task.abort();
        }
        if let Some(voice) = self.voice.as_mut() {
            voice.stop();
        }
    }

    // Attachments

    pub fn open_attach_input(&mut self) {
        if self.tab.accepts_images() && !self.is_loading(self.tab) {
            self.show_attach_input = true;
            self.attach_input.clear();
            self.attach_input_cursor = 0;
        }
    }

    pub fn attach_from_path(&mut self) {
        let path = expand_path(&self.attach_input);
        self.show_attach_input = false;
        self.attach_input.clear();
        self.attach_input_cursor = 0;
        if path.as_os_str().is_empty() {
            return;
        }
        let upload = load_image(&path);
        self.notice = match self.tab {
            Tab::Reasoning => self.reasoning.attach_image(upload),
            Tab::Chat => self.chat.attach_image(upload),
            Tab::ImageGen => None,
        };
    }

    pub fn remove_attachment(&mut self) {
        match self.tab {
            Tab::Reasoning if !self.reasoning.loading => self.reasoning.clear_image(),
            Tab::Chat if !self.chat.loading => self.chat.clear_image(),
            _ => {}
        }
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some() && self.camera_permission != CameraPermission::Denied
    }

    /// Take one still from the camera for the active tab.
    pub fn capture_photo(&mut self) {
        if !self.tab.accepts_images() || self.camera_task.is_some() || self.is_loading(self.tab) {
            return;
        }
        let Some(camera) = self.camera.as_ref().map(Arc::clone) else {
            return;
        };
        self.camera_task = Some((
            self.tab,
            tokio::spawn(async move {
                let mut session = CameraSession::new(camera);
                if let Err(err) = session.open().await {
                    return (session.permission(), Err(err));
                }
                let frame = session.capture().await;
                session.close();
                (session.permission(), frame)
            }),
        ));
    }

    fn finish_capture(&mut self, target: Tab, result: Result<ImageDataUri, CaptureError>) {
        let notice = match result {
            Ok(image) => match target {
                Tab::Reasoning => self.reasoning.attach_image(Ok(image)),
                Tab::Chat => self.chat.attach_image(Ok(image)),
                Tab::ImageGen => None,
            },
            Err(CaptureError::Permission(err)) => Some(Notice::from(&err)),
            Err(CaptureError::Validation(err)) => Some(Notice::from(&err)),
            Err(err) => {
                tracing::warn!(error = %err, "camera capture failed");
                Some(Notice {
                    title: "Camera unavailable",
                    message: err.to_string(),
                })
            }
        };
        self.notice = notice;
    }

    pub fn has_voice(&self) -> bool {
        self.voice.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.voice.as_ref().is_some_and(VoiceInput::is_listening)
    }

    pub fn toggle_voice(&mut self) {
        let target = self.tab;
        let Some(voice) = self.voice.as_mut() else {
            return;
        };
        match voice.toggle() {
            Ok(_) => self.voice_target = target,
            Err(CaptureError::Permission(err)) => {
                self.notice = Some(Notice::from(&err));
                self.voice = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not start voice input");
                self.notice = Some(Notice {
                    title: "Voice input unavailable",
                    message: err.to_string(),
                });
            }
        }
    }

    // Image download

    pub fn save_generated_image(&mut self) {
        let Some(image) = self.image_gen.image.as_ref() else {
            return;
        };
        match save_image(&self.config.image_dir(), &self.image_gen.generated_for, image) {
            Ok(path) => self.image_gen.saved_path = Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "saving image failed");
                self.notice = Some(Notice {
                    title: "Download failed",
                    message: err.to_string(),
                });
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        let busy = self.is_loading(self.tab) || self.camera_task.is_some() || self.is_listening();
        if busy && self.ticks % ANIMATION_TICKS == 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.chat.is_revealing() {
            self.scroll_chat_to_bottom();
        }
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual transcript width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for entry in &self.chat.entries {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "Nexora:")
            if entry.message.image.is_some() {
                total_lines = total_lines.saturating_add(1);
            }
            total_lines = total_lines.saturating_add(wrapped_height(entry.display_text(), wrap_width));
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.chat.loading {
            total_lines = total_lines.saturating_add(2); // "Nexora:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn clear_chat(&mut self) {
        self.chat.clear();
        self.chat_scroll = 0;
    }

    /// Number of messages per role, for the transcript title.
    pub fn chat_counts(&self) -> (usize, usize) {
        self.chat.messages().fold((0, 0), |(user, bot), m| match m.role {
            ChatRole::User => (user + 1, bot),
            ChatRole::Bot => (user, bot + 1),
        })
    }

    // Model picker methods

    pub async fn open_model_picker(&mut self) {
        self.available_models = self.get_models_for_provider(self.current_provider).await;
        let current = self.backend.as_ref().map(|b| b.reasoning_model().to_string());
        let selected = current
            .and_then(|m| self.available_models.iter().position(|x| *x == m))
            .unwrap_or(0);
        self.model_picker_state.select(Some(selected));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i) {
                self.config.reasoning_model = Some(model.clone());
                self.show_model_picker = false;
                self.save_config();
                self.rebuild_backend();
            }
        }
    }

    pub async fn get_models_for_provider(&self, provider: Provider) -> Vec<String> {
        match provider {
            Provider::Ollama => {
                let client = match OllamaClient::new(self.config.ollama_url(), None, self.config.timeouts()) {
                    Ok(client) => client,
                    Err(_) => return Vec::new(),
                };
                client.list_models().await.unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "could not list Ollama models");
                    Vec::new()
                })
            }
            _ => provider.known_models(),
        }
    }

    // Provider picker methods

    pub fn open_provider_picker(&mut self) {
        let current = Provider::all()
            .iter()
            .position(|p| *p == self.current_provider)
            .unwrap_or(0);
        self.provider_picker_state.select(Some(current));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        if len > 0 {
            let i = self.provider_picker_state.selected().unwrap_or(0);
            self.provider_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch provider, asking for an API key first when none is known.
    pub fn choose_provider(&mut self, provider: Provider) {
        self.show_provider_picker = false;
        if self.get_key_source(provider).is_none() {
            self.api_key_target_provider = Some(provider);
            self.show_api_key_input = true;
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
            return;
        }
        self.set_provider(provider);
    }

    fn set_provider(&mut self, provider: Provider) {
        self.current_provider = provider;
        self.config.switch_provider(provider);
        self.save_config();
        self.rebuild_backend();
    }

    pub fn submit_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        if let (false, Some(provider)) = (key.is_empty(), self.api_key_target_provider) {
            self.config.set_api_key(provider, &key);
            self.set_provider(provider);
        }
        self.cancel_api_key_input();
    }

    pub fn cancel_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        self.api_key_target_provider = None;
    }

    /// Returns the source of the API key for a provider: "env", "config", "local", or None
    pub fn get_key_source(&self, provider: Provider) -> Option<&'static str> {
        if !provider.needs_api_key() {
            return Some("local");
        }
        let from_env = provider
            .env_vars()
            .iter()
            .any(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()));
        if from_env {
            Some("env")
        } else if self.config.stored_key(provider).is_some() {
            Some("config")
        } else {
            None
        }
    }

    fn save_config(&self) {
        if let Err(err) = self.config.save() {
            tracing::warn!(error = %err, "could not save config");
        }
    }
}

/// Rows a message body takes when wrapped. An empty body still takes one.
fn wrapped_height(text: &str, width: usize) -> u16 {
    let rows = text
        .lines()
        .map(|line| line.chars().count() / width.max(1) + 1)
        .sum::<usize>()
        .max(1);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

async fn take_finished<T>(slot: &mut Option<JoinHandle<T>>) -> Option<Result<T, JoinError>> {
    if slot.as_ref().is_some_and(JoinHandle::is_finished) {
        let task = slot.take()?;
        return Some(task.await);
    }
    None
}

fn join_failure(err: JoinError) -> FlowError {
    ModelInvocationError::Request(format!("request task failed: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexora_core::model::{ImageOutput, ReasoningOutput};
    use nexora_core::prompt::Prompt;
    use nexora_core::ModelBackend;
    use std::time::Duration;

    const FOX: &str = "data:image/png;base64,iVBORw0KGgo=";

    struct StubBackend;

    #[async_trait::async_trait]
    impl ModelBackend for StubBackend {
        fn name(&self) -> &'static str {
            "Stub"
        }

        fn reasoning_model(&self) -> &str {
            "stub-reasoner"
        }

        fn image_model(&self) -> &str {
            "stub-painter"
        }

        async fn invoke_reasoning_model(&self, prompt: &Prompt) -> Result<ReasoningOutput, ModelInvocationError> {
            if prompt.flatten_text().contains("fail") {
                return Err(ModelInvocationError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(Some("42 🎉".into()))
        }

        async fn invoke_image_model(&self, _prompt: &str) -> Result<ImageOutput, ModelInvocationError> {
            Ok(Some(FOX.into()))
        }
    }

    fn test_app() -> App {
        let mut config = Config::new();
        config.reveal_interval_ms = Some(0);
        let mut app = App::without_backend(config, Provider::Gemini);
        app.backend = Some(Arc::new(StubBackend));
        app
    }

    async fn settle(app: &mut App) {
        for _ in 0..50 {
            app.poll_tasks().await;
            if app.reasoning_task.is_none() && app.image_task.is_none() && app.chat_task.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn tabs_cycle_both_ways() {
        assert_eq!(Tab::Reasoning.next(), Tab::ImageGen);
        assert_eq!(Tab::Chat.next(), Tab::Reasoning);
        assert_eq!(Tab::Reasoning.prev(), Tab::Chat);
        assert!(!Tab::ImageGen.accepts_images());
    }

    #[test]
    fn capabilities_absent_without_commands() {
        let app = test_app();
        assert!(!app.has_camera());
        assert!(!app.has_voice());
    }

    #[test]
    fn provider_override_does_not_reuse_other_models() {
        let mut config = Config::new();
        config.reasoning_model = Some("gemini-2.5-pro".into());
        config.set_api_key(Provider::Claude, "test-key");

        let app = App::new(config, Provider::Claude);
        assert_eq!(app.config.provider(), Provider::Claude);
        assert!(app.config.reasoning_model.is_none());
        assert_eq!(app.model_label(), nexora_core::ai::claude::DEFAULT_REASONING_MODEL);
    }

    #[test]
    fn switching_tabs_keeps_each_input() {
        let mut app = test_app();
        app.active_input_mut().push_str("why is the sky blue");
        app.switch_tab(Tab::Chat);
        assert_eq!(app.active_input(), "");
        app.switch_tab(Tab::Reasoning);
        assert_eq!(app.active_input(), "why is the sky blue");
        assert_eq!(app.cursor, "why is the sky blue".len());
    }

    #[tokio::test]
    async fn reasoning_submit_runs_in_background() {
        let mut app = test_app();
        app.reasoning.question = "What is 6 x 7?".into();
        app.submit();
        assert!(app.reasoning.loading);
        assert!(app.reasoning_task.is_some());

        settle(&mut app).await;
        assert!(!app.reasoning.loading);
        assert_eq!(app.reasoning.answer.as_deref(), Some("42 🎉"));
    }

    #[tokio::test]
    async fn chat_failure_reverts_and_restores_cursor_text() {
        let mut app = test_app();
        app.switch_tab(Tab::Chat);
        app.chat.input = "please fail".into();
        app.submit();
        assert_eq!(app.chat.entries.len(), 1);
        assert!(app.chat.input.is_empty());

        settle(&mut app).await;
        assert!(app.chat.entries.is_empty());
        assert_eq!(app.chat.input, "please fail");
        assert!(app.chat.error.is_some());
    }

    #[tokio::test]
    async fn chat_success_appends_bot_message() {
        let mut app = test_app();
        app.switch_tab(Tab::Chat);
        app.chat.input = "Hi".into();
        app.submit();
        settle(&mut app).await;

        assert_eq!(app.chat_counts(), (1, 1));
        assert_eq!(app.chat.entries[1].display_text(), "42 🎉");
    }

    #[tokio::test]
    async fn generated_image_can_be_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app();
        app.config.image_dir = Some(dir.path().to_path_buf());
        app.switch_tab(Tab::ImageGen);
        app.image_gen.prompt = "a red fox".into();
        app.submit();
        settle(&mut app).await;

        assert_eq!(app.image_gen.image.as_ref().map(ImageDataUri::as_str), Some(FOX));
        app.save_generated_image();
        assert_eq!(app.image_gen.saved_path, Some(dir.path().join("a_red_fox.png")));
        assert!(app.notice.is_none());
    }

    #[test]
    fn attach_rejects_non_images_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let mut app = test_app();
        app.open_attach_input();
        assert!(app.show_attach_input);
        app.attach_input = path.display().to_string();
        app.attach_from_path();

        assert!(!app.show_attach_input);
        assert!(app.reasoning.image.is_none());
        assert_eq!(app.notice.as_ref().map(|n| n.title), Some("Unsupported file type"));
    }

    #[test]
    fn attach_is_not_offered_on_image_tab() {
        let mut app = test_app();
        app.switch_tab(Tab::ImageGen);
        app.open_attach_input();
        assert!(!app.show_attach_input);
    }

    #[test]
    fn image_only_message_counts_one_body_row() {
        let mut app = test_app();
        app.chat_height = 2;
        app.chat_width = 10;
        app.chat.image = Some(ImageDataUri::parse(FOX).unwrap());
        app.chat.begin_submit();
        app.scroll_chat_to_bottom();
        // role + image + empty body + blank + thinking (2) = 6 lines, 2 visible
        assert_eq!(app.chat_scroll, 4);
    }

    #[test]
    fn wrapped_height_saturates() {
        assert_eq!(wrapped_height("", 10), 1);
        assert_eq!(wrapped_height("a\n\nb", 10), 3);
        assert_eq!(wrapped_height(&"x".repeat(200_000), 1), u16::MAX);
    }

    #[test]
    fn scroll_to_bottom_tracks_transcript_length() {
        let mut app = test_app();
        app.chat_height = 4;
        app.chat_width = 10;
        app.chat.input = "x".repeat(35);
        app.chat.begin_submit();
        app.scroll_chat_to_bottom();
        // role + 4 wrapped lines + blank + thinking (2) = 8 lines, 4 visible
        assert_eq!(app.chat_scroll, 4);
    }
}
