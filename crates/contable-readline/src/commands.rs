//! Slash commands understood by the REPL.

use contable_core::UploadMode;
use std::path::PathBuf;

/// Commands offered for completion and listed by `/help`.
pub const COMMANDS: [(&str, &str); 9] = [
    ("/upload", "<ruta> Sube un documento (PDF, TXT, XLSX, XLS, CSV; máx. 50 MB)"),
    ("/mode", "<train|context> Cambia el modo de carga"),
    ("/context", "Muestra tu contexto"),
    ("/files", "Lista los archivos subidos"),
    ("/capabilities", "Muestra qué puede hacer el asistente"),
    ("/feedback", "<1-5> [comentario] Califica la última respuesta"),
    ("/history", "Muestra la conversación"),
    ("/help", "Muestra esta ayuda"),
    ("/quit", "Salir"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text sent as a chat turn.
    Chat(String),
    Upload(PathBuf),
    Mode(UploadMode),
    ShowMode,
    Context,
    Files,
    Capabilities,
    Feedback { rating: u8, comment: Option<String> },
    History,
    Help,
    Quit,
    /// A slash command that could not be parsed; carries the usage hint.
    Invalid(String),
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let trimmed = input.trim();
        if trimmed == "quit" || trimmed == "exit" {
            return Command::Quit;
        }
        if !trimmed.starts_with('/') {
            return Command::Chat(input.to_string());
        }

        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };

        match name {
            "/upload" => {
                if rest.is_empty() {
                    Command::Invalid("Uso: /upload <ruta>".into())
                } else {
                    Command::Upload(PathBuf::from(unquote(rest)))
                }
            }
            "/mode" => {
                if rest.is_empty() {
                    Command::ShowMode
                } else {
                    match UploadMode::parse(rest) {
                        Some(mode) => Command::Mode(mode),
                        None => Command::Invalid("Uso: /mode <train|context>".into()),
                    }
                }
            }
            "/context" => Command::Context,
            "/files" => Command::Files,
            "/capabilities" => Command::Capabilities,
            "/feedback" => parse_feedback(rest),
            "/history" => Command::History,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Invalid(format!("Comando desconocido: {other}. Escribe /help.")),
        }
    }
}

fn parse_feedback(rest: &str) -> Command {
    let usage = || Command::Invalid("Uso: /feedback <1-5> [comentario]".into());
    let (rating, comment) = match rest.split_once(char::is_whitespace) {
        Some((rating, comment)) => (rating, Some(comment.trim().to_string())),
        None => (rest, None),
    };
    match rating.parse::<u8>() {
        Ok(rating) => Command::Feedback {
            rating,
            comment: comment.filter(|c| !c.is_empty()),
        },
        Err(_) => usage(),
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_chat_turn() {
        assert_eq!(
            Command::parse("¿Qué es el patrimonio?"),
            Command::Chat("¿Qué es el patrimonio?".into())
        );
    }

    #[test]
    fn upload_takes_a_path_and_strips_quotes() {
        assert_eq!(
            Command::parse("/upload \"mis docs/balance.pdf\""),
            Command::Upload(PathBuf::from("mis docs/balance.pdf"))
        );
        assert!(matches!(Command::parse("/upload"), Command::Invalid(_)));
    }

    #[test]
    fn mode_accepts_both_languages() {
        assert_eq!(
            Command::parse("/mode contexto"),
            Command::Mode(UploadMode::Context)
        );
        assert_eq!(Command::parse("/mode train"), Command::Mode(UploadMode::Train));
        assert_eq!(Command::parse("/mode"), Command::ShowMode);
        assert!(matches!(Command::parse("/mode otro"), Command::Invalid(_)));
    }

    #[test]
    fn feedback_parses_rating_and_comment() {
        assert_eq!(
            Command::parse("/feedback 4 bastante útil"),
            Command::Feedback {
                rating: 4,
                comment: Some("bastante útil".into())
            }
        );
        assert_eq!(
            Command::parse("/feedback 2"),
            Command::Feedback {
                rating: 2,
                comment: None
            }
        );
        assert!(matches!(Command::parse("/feedback bien"), Command::Invalid(_)));
    }

    #[test]
    fn quit_aliases() {
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn unknown_command_is_invalid() {
        assert!(matches!(Command::parse("/plan"), Command::Invalid(_)));
    }
}
