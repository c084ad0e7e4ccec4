mod commands;
mod helper;
mod render;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use contable_application::{ContableApp, TurnOutcome};
use contable_core::{ContableError, MessageRole, UploadStatus};
use contable_infrastructure::{ConfigService, ContablePaths};
use contable_interaction::HttpAssistantClient;

use crate::commands::{COMMANDS, Command};
use crate::helper::CliHelper;

/// Terminal client for the accounting assistant.
#[derive(Parser, Debug)]
#[command(name = "contable", version, about)]
struct Args {
    /// Base URL of the assistant server (overrides config.toml)
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Alternate configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Sends logs to a daily file so they never interleave with the REPL.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) -> Result<WorkerGuard> {
    let logs_dir = ContablePaths::logs_dir()?;
    std::fs::create_dir_all(&logs_dir)?;

    let appender = tracing_appender::rolling::daily(logs_dir, "contable.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

/// Short, localized explanation of an error for the user.
fn user_message(err: &ContableError) -> String {
    match err {
        ContableError::Validation(rejection) => rejection.to_string(),
        ContableError::InvalidInput(message) => message.clone(),
        ContableError::TurnInFlight => "Espera a que termine la consulta actual.".to_string(),
        ContableError::Io { .. } => format!("No se pudo leer el archivo ({err})."),
        ContableError::Transport { .. } => {
            "No se pudo conectar con el servidor. Intenta nuevamente.".to_string()
        }
        _ => "Ocurrió un error inesperado. Intenta nuevamente.".to_string(),
    }
}

fn clear_line() {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r\x1b[2K");
    let _ = stdout.flush();
}

/// Runs one chat turn while drawing the progress bar.
///
/// Returns the text to pre-fill in the next prompt when the turn failed.
async fn run_turn(app: &ContableApp, text: &str) -> Option<String> {
    let before = app.state().context().await;

    let mut rx = app.state().progress().subscribe();
    let renderer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            let mut stdout = std::io::stdout();
            if state.visible {
                let _ = write!(stdout, "\r\x1b[2K{}", render::progress_line(&state));
            } else {
                let _ = write!(stdout, "\r\x1b[2K");
            }
            let _ = stdout.flush();
        }
    });

    let outcome = app.chat().send_turn(text).await;
    renderer.abort();
    clear_line();

    match outcome {
        Ok(TurnOutcome::Answered(message)) => {
            println!("{}", render::render_markdown(&message.content));
            println!();
            let after = app.state().context().await;
            if after != before {
                if let Some(panel) = render::context_panel(&after) {
                    println!("{panel}\n");
                }
            }
            None
        }
        Ok(TurnOutcome::Failed(message)) => {
            println!("{}", render::render_markdown(&message.content).red());
            println!();
            Some(app.state().draft().await)
        }
        Ok(TurnOutcome::Skipped) => None,
        Err(err) => {
            println!("{}", user_message(&err).yellow());
            None
        }
    }
}

fn start_upload(app: &ContableApp, path: PathBuf) {
    let uploads = app.uploads().clone();
    println!("{}", format!("📎 Subiendo {}...", path.display()).bright_black());

    tokio::spawn(async move {
        match uploads.submit_path(&path).await {
            Ok(report) => {
                let line = render::sanitize(&format!(
                    "{} ({}, {})",
                    report.message,
                    report.file_name,
                    report.mode.label()
                ));
                match report.status {
                    UploadStatus::Uploaded => println!("\n{}", line.green()),
                    UploadStatus::Duplicate => println!("\n{}", line.yellow()),
                    UploadStatus::Error => println!("\n{}", line.red()),
                }
            }
            Err(err) => println!("\n{}", user_message(&err).yellow()),
        }
    });
}

async fn show_capabilities(app: &ContableApp) {
    match app.capabilities().await {
        Ok(capabilities) => {
            let title = match (&capabilities.system_name, &capabilities.version) {
                (Some(name), Some(version)) => format!("{name} v{version}"),
                (Some(name), None) => name.clone(),
                _ => "Asistente contable".to_string(),
            };
            println!("{}", render::sanitize(&title).bright_magenta().bold());
            for (key, capability) in &capabilities.capabilities {
                println!(
                    "  {} {}",
                    format!("{}:", render::sanitize(key)).bright_cyan(),
                    render::sanitize(&capability.description)
                );
                for example in &capability.examples {
                    println!(
                        "    {}",
                        format!("• {}", render::sanitize(example)).bright_black()
                    );
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "capabilities unavailable");
            println!("{}", user_message(&err).yellow());
        }
    }
}

async fn show_files(app: &ContableApp) {
    match app.uploaded_files().await {
        Ok(files) if files.is_empty() => {
            println!("{}", "No hay archivos subidos todavía.".bright_black())
        }
        Ok(files) => println!("{}", render::files_table(&files)),
        Err(err) => {
            tracing::warn!(error = %err, "file listing unavailable");
            println!("{}", user_message(&err).yellow());
        }
    }
}

async fn show_history(app: &ContableApp) {
    let messages = app.state().messages().await;
    if messages.is_empty() {
        println!("{}", "Todavía no hay mensajes.".bright_black());
        return;
    }
    for message in messages {
        match message.role {
            MessageRole::User => {
                println!("{}", format!("> {}", render::sanitize(&message.content)).green())
            }
            MessageRole::Assistant => {
                println!("{}\n", render::render_markdown(&message.content))
            }
        }
    }
}

fn print_help() {
    println!("{}", "Comandos:".bright_yellow());
    for (name, description) in COMMANDS {
        println!("  {:<14} {}", name.bright_cyan(), description);
    }
    println!(
        "{}",
        "Cualquier otro texto se envía como consulta.".bright_black()
    );
}

/// Executes one command. Returns `false` when the REPL should stop.
async fn dispatch(app: &Arc<ContableApp>, command: Command, prefill: &mut Option<String>) -> bool {
    match command {
        Command::Chat(text) => {
            println!("{}", format!("> {}", text.trim()).green());
            *prefill = run_turn(app, &text).await;
        }
        Command::Upload(path) => start_upload(app, path),
        Command::Mode(mode) => {
            app.state().set_upload_mode(mode).await;
            tracing::info!(mode = %mode, "upload mode changed");
            println!("{}", format!("Modo de carga: {}", mode.label()).bright_green());
        }
        Command::ShowMode => {
            let mode = app.state().upload_mode().await;
            println!("Modo de carga: {}", mode.label());
        }
        Command::Context => match render::context_panel(&app.state().context().await) {
            Some(panel) => println!("{panel}"),
            None => println!("{}", "Todavía no hay contexto para esta sesión.".bright_black()),
        },
        Command::Files => show_files(app).await,
        Command::Capabilities => show_capabilities(app).await,
        Command::Feedback { rating, comment } => {
            match app.feedback().rate_last_turn(rating, comment).await {
                Ok(_) => println!("{}", "¡Gracias por tu calificación!".bright_green()),
                Err(err) => {
                    tracing::warn!(error = %err, "feedback not sent");
                    println!("{}", user_message(&err).yellow());
                }
            }
        }
        Command::History => show_history(app).await,
        Command::Help => print_help(),
        Command::Invalid(usage) => println!("{}", usage.yellow()),
        Command::Quit => {
            println!("{}", "¡Hasta luego!".bright_green());
            return false;
        }
    }
    true
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_service = match &args.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let mut config = config_service.get_config()?;
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    let _log_guard = init_tracing(&config.logging.level)?;

    let client = Arc::new(HttpAssistantClient::from_settings(&config.server)?);
    let app = Arc::new(ContableApp::new(client));

    println!("{}", "=== IA Contable ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Servidor: {}  ·  Sesión: {}",
            config.server.base_url,
            app.state().session_id()
        )
        .bright_black()
    );

    let report = app.start().await;
    if report.server_reachable() {
        println!("{}", "● conectado".bright_green());
    } else {
        println!("{}", "● sin conexión".red());
        println!(
            "{}",
            "El servidor no responde. Puedes seguir escribiendo; las consultas fallarán hasta que vuelva."
                .yellow()
        );
    }
    if let Some(panel) = render::context_panel(&app.state().context().await) {
        println!("{panel}");
    }
    println!(
        "{}",
        "Escribe tu consulta contable, '/help' para ver los comandos o 'quit' para salir."
            .bright_black()
    );
    println!();

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));
    let mut prefill: Option<String> = None;

    loop {
        let mode = app.state().upload_mode().await;
        let prompt = format!("[{mode}] >> ");
        // rustyline blocks; keep background uploads running on the other workers
        let readline = tokio::task::block_in_place(|| match prefill.take() {
            Some(draft) => rl.readline_with_initial(&prompt, (draft.as_str(), "")),
            None => rl.readline(&prompt),
        });

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if !dispatch(&app, Command::parse(&line), &mut prefill).await {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detectado. Escribe 'quit' para salir.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detectado. Saliendo...".bright_green());
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "readline failed");
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    let messages = app.state().message_count().await;
    tracing::info!(session_id = %app.state().session_id(), messages, "session ended");
    Ok(())
}
