use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nexora_core::capture::load_image;
use nexora_core::{
    build_backend, generate_image, respond_with_reasoning, save_image, Config, ImageRequest,
    Provider, ReasoningRequest,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "nexora")]
#[command(version, about = "AI assistant for reasoning, image generation, and chat")]
struct Cli {
    /// Provider to use (gemini, openai, claude, ollama). Defaults to the configured one
    #[arg(short, long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Image to reason about
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Generate an image from a prompt and save it
    Imagine {
        /// What to draw
        prompt: String,
        /// Directory to save into (defaults to the configured image dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|_| Config::new());

    let provider = match cli.provider.as_deref() {
        Some(name) => Provider::from_str(name).ok_or_else(|| anyhow!("unknown provider: {}", name))?,
        None => config.provider(),
    };
    config.switch_provider(provider);

    match cli.command {
        None => {
            init_file_logging()?;
            run_tui(config, provider).await
        }
        Some(command) => {
            init_stderr_logging();
            run_command(command, config, provider).await
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The TUI owns the terminal, so logs go to a file in the config directory.
fn init_file_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let log_path = dir.join("nexora.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

async fn run_tui(config: Config, provider: Provider) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(config, provider);
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event).await?;
            app.poll_tasks().await;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.abort_tasks();
    tui::restore()?;
    result
}

async fn run_command(command: Commands, config: Config, provider: Provider) -> Result<()> {
    let backend = build_backend(provider, &config)?;

    match command {
        Commands::Ask { question, image } => {
            let image = image.map(|path| load_image(&path)).transpose()?;
            let request = ReasoningRequest::new(question).with_image(image);
            let response = respond_with_reasoning(backend.as_ref(), &request).await?;
            println!("{}", response.answer);
        }
        Commands::Imagine { prompt, out } => {
            let request = ImageRequest::new(prompt);
            let response = generate_image(backend.as_ref(), &request).await?;
            let dir = out.unwrap_or_else(|| config.image_dir());
            let path = save_image(&dir, &request.prompt, &response.image)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
