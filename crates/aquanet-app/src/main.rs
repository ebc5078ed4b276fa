//! Aquanet application binary - composition root.
//!
//! 1. Parse CLI args, load configuration from TOML and initialize tracing
//! 2. Build the backend gateway for the configured response format
//! 3. Run the interactive prompt against a `ConversationController`

mod cli;
mod commands;
mod render;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use aquanet_chat::{
    export_file_name, BackendGateway, ChatCompletionsGateway, ConversationController,
};
use aquanet_core::config::{AquanetConfig, ResponseFormat};
use aquanet_core::error::AquanetError;
use aquanet_core::events::ConversationEvent;
use aquanet_core::types::{AquacultureData, TaskKind};

use cli::CliArgs;
use commands::{parse_command, Command, HELP};
use render::StreamEcho;

/// Expand a leading `~` to the user's home directory.
fn resolve_dir(dir: &str) -> PathBuf {
    if dir.starts_with("~/") || dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&dir[2..])
    } else {
        PathBuf::from(dir)
    }
}

/// Load the config file, or defaults plus the error that prevented loading.
fn load_config(path: &Path) -> (AquanetConfig, Option<AquanetError>) {
    match AquanetConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (AquanetConfig::default(), Some(e)),
    }
}

fn build_gateway(config: &AquanetConfig) -> Result<BackendGateway, Box<dyn std::error::Error>> {
    let client = Arc::new(ChatCompletionsGateway::from_config(config)?);
    tracing::info!(
        endpoint = client.endpoint(),
        format = %config.backend.response_format,
        "Backend gateway ready"
    );
    Ok(match config.backend.response_format {
        ResponseFormat::Stream => BackendGateway::Streaming(client),
        ResponseFormat::Complete => BackendGateway::Routed(client),
    })
}

/// Interactive session state outside the controller.
struct Session {
    controller: ConversationController,
    events: broadcast::Receiver<ConversationEvent>,
    echo: StreamEcho,
    task: Option<TaskKind>,
    input: AquacultureData,
    export_dir: PathBuf,
}

impl Session {
    fn print(&mut self, event: &ConversationEvent) {
        if let Some(text) = self.echo.handle(event) {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
    }

    /// Submit and echo events while the backend runs.
    async fn ask(&mut self, question: &str) {
        self.controller.set_pending_question(question);
        let result = {
            let submission = self
                .controller
                .submit(self.task, self.input.clone(), question);
            tokio::pin!(submission);
            loop {
                tokio::select! {
                    result = &mut submission => break result,
                    event = self.events.recv() => match event {
                        Ok(event) => {
                            if let Some(text) = self.echo.handle(&event) {
                                print!("{}", text);
                                let _ = std::io::stdout().flush();
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Event echo lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {}
                    },
                }
            }
        };
        while let Ok(event) = self.events.try_recv() {
            self.print(&event);
        }
        if let Err(e) = result {
            eprintln!("error: {}", e);
        }
    }

    fn load_input(&mut self, path: &Path) {
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                serde_json::from_str::<AquacultureData>(&text).map_err(|e| e.to_string())
            });
        match loaded {
            Ok(data) => {
                let water = data.water_quality();
                println!(
                    "Loaded {} ({} / {}): {}°C, pH {}, DO {} mg/L",
                    path.display(),
                    data.biological_data.species,
                    data.biological_data.stage,
                    water.temperature,
                    water.ph,
                    water.dissolved_oxygen
                );
                self.input = data;
            }
            Err(e) => eprintln!("error: cannot load {}: {}", path.display(), e),
        }
    }

    fn export(&self) {
        let bytes = match self.controller.export_transcript() {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("error: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.export_dir) {
            eprintln!("error: cannot create {}: {}", self.export_dir.display(), e);
            return;
        }
        let path = self.export_dir.join(export_file_name(chrono::Utc::now()));
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Transcript exported");
                println!("Exported to {}", path.display());
            }
            Err(e) => eprintln!("error: cannot write {}: {}", path.display(), e),
        }
    }

    fn show_task(&self) {
        match self.task {
            Some(kind) => println!("Task: {}", kind.label()),
            None => println!("Task: none (free questions)"),
        }
        let kinds: Vec<&str> = TaskKind::ALL.iter().map(|k| k.as_str()).collect();
        println!("Available: {}", kinds.join(", "));
    }

    fn show_stats(&self) {
        let analytics = self.controller.analytics();
        if analytics.is_empty() {
            println!("No completed requests yet.");
            return;
        }
        println!(
            "{} requests, avg {} ms, max {} ms",
            analytics.len(),
            analytics.average_latency_ms().unwrap_or_default(),
            analytics.max_latency_ms().unwrap_or_default()
        );
        for (label, latency_ms) in analytics.points() {
            println!("  {}  {} ms", label, latency_ms);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Load errors are held until tracing is up.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = load_config(&config_file);
    args.apply_overrides(&mut config)?;

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Aquanet v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) if config_file.exists() => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        Some(_) => tracing::info!(
            path = %config_file.display(),
            "No config file, using defaults"
        ),
    }
    config.validate()?;

    let task = match args.task.as_deref() {
        Some(name) => Some(aquanet_chat::TaskCatalog::parse(name)?),
        None => None,
    };

    let gateway = build_gateway(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to build backend gateway");
        e
    })?;
    let controller = ConversationController::from_config(gateway, &config);
    let events = controller.subscribe();

    let mut session = Session {
        controller,
        events,
        echo: StreamEcho::new(),
        task,
        input: AquacultureData::default(),
        export_dir: resolve_dir(&config.general.export_dir),
    };

    println!("Aquanet assistant. Type a question, or /help for commands.");
    session.show_task();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Ask(question) => session.ask(&question).await,
            Command::Analyze => session.ask("").await,
            Command::SelectTask(kind) => {
                session.task = kind;
                session.show_task();
            }
            Command::ShowTask => session.show_task(),
            Command::LoadInput(path) => session.load_input(&path),
            Command::Reset => match session.controller.reset() {
                Ok(()) => {
                    while let Ok(event) = session.events.try_recv() {
                        session.print(&event);
                    }
                }
                Err(e) => eprintln!("error: {}", e),
            },
            Command::Export => session.export(),
            Command::Debug => println!("{}", session.controller.debug_json()),
            Command::Stats => session.show_stats(),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }

    tracing::info!("Aquanet shutting down");
    Ok(())
}
