//! Speech-to-text dictation.
//!
//! A [`SpeechRecognizer`] pushes [`SpeechEvent`]s into a channel. [`VoiceInput`]
//! owns the listening state and turns those events into at most one
//! transcript per session.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{find_program, looks_like_permission_denial};
use crate::error::{CaptureError, PermissionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// Nothing was said. Expected and silently ignored.
    NoSpeech,
    Aborted,
    AudioCapture,
    NotAllowed,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Result(String),
    Error(SpeechErrorKind),
    End,
}

pub trait SpeechRecognizer: Send {
    /// Begin recognition, delivering events on `events`.
    fn start(&mut self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<(), CaptureError>;
    /// Stop recognition. Further events may still arrive and must be ignored.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Listening,
}

pub struct VoiceInput {
    recognizer: Box<dyn SpeechRecognizer>,
    state: VoiceState,
    events: Option<mpsc::UnboundedReceiver<SpeechEvent>>,
    denied: Option<PermissionError>,
}

impl VoiceInput {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer,
            state: VoiceState::Idle,
            events: None,
            denied: None,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == VoiceState::Listening
    }

    /// Start listening when idle, stop when listening.
    pub fn toggle(&mut self) -> Result<VoiceState, CaptureError> {
        match self.state {
            VoiceState::Idle => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.recognizer.start(tx)?;
                self.events = Some(rx);
                self.state = VoiceState::Listening;
                tracing::debug!("voice input listening");
            }
            VoiceState::Listening => self.stop(),
        }
        Ok(self.state)
    }

    pub fn stop(&mut self) {
        if self.state == VoiceState::Listening {
            self.recognizer.stop();
            tracing::debug!("voice input stopped");
        }
        self.events = None;
        self.state = VoiceState::Idle;
    }

    /// Drain pending events. Returns the transcript when one arrived.
    pub fn poll(&mut self) -> Option<String> {
        let events = self.events.as_mut()?;
        loop {
            match events.try_recv() {
                Ok(SpeechEvent::Result(text)) => {
                    self.stop();
                    let text = text.trim().to_string();
                    return (!text.is_empty()).then_some(text);
                }
                Ok(SpeechEvent::Error(SpeechErrorKind::NoSpeech)) => {}
                Ok(SpeechEvent::Error(SpeechErrorKind::NotAllowed)) => {
                    tracing::warn!("microphone access denied");
                    self.denied = Some(PermissionError::MicrophoneDenied("not allowed".into()));
                    self.stop();
                    return None;
                }
                Ok(SpeechEvent::Error(kind)) => {
                    tracing::warn!(?kind, "speech recognition error");
                    self.stop();
                    return None;
                }
                Ok(SpeechEvent::End) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.stop();
                    return None;
                }
                Err(mpsc::error::TryRecvError::Empty) => return None,
            }
        }
    }

    /// Microphone refusal seen by the last session, if any. Cleared on read.
    pub fn take_denial(&mut self) -> Option<PermissionError> {
        self.denied.take()
    }
}

impl Drop for VoiceInput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Recognizer backed by a command that records one utterance and prints the
/// transcript on stdout.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    task: Option<JoinHandle<()>>,
}

impl CommandRecognizer {
    /// `None` when the command is empty or the program cannot be found.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        find_program(program)?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            task: None,
        })
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn start(&mut self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<(), CaptureError> {
        self.stop();
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::Failed(format!("{}: {}", self.program, e)))?;

        self.task = Some(tokio::spawn(async move {
            let event = match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if text.is_empty() {
                        SpeechEvent::Error(SpeechErrorKind::NoSpeech)
                    } else {
                        SpeechEvent::Result(text)
                    }
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    SpeechEvent::Error(classify_failure(stderr.trim()))
                }
                Err(e) => SpeechEvent::Error(SpeechErrorKind::Other(e.to_string())),
            };
            let _ = events.send(event);
            let _ = events.send(SpeechEvent::End);
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CommandRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify_failure(stderr: &str) -> SpeechErrorKind {
    if looks_like_permission_denial(stderr) {
        tracing::warn!(
            error = %PermissionError::MicrophoneDenied(stderr.to_string()),
            "microphone refused"
        );
        SpeechErrorKind::NotAllowed
    } else if stderr.to_lowercase().contains("no speech") {
        SpeechErrorKind::NoSpeech
    } else {
        SpeechErrorKind::Other(stderr.to_string())
    }
}
