use std::collections::HashMap;

use anyhow::Result;
use tokio::io;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::domain::models::Notification;
use crate::domain::models::Request;

/// Minimal interactive surface for the session: renders notifications as
/// console lines and turns stdin lines into coordinator requests. Anything
/// that is not a slash command is sent as chat text.
pub struct ConsoleService {}

impl ConsoleService {
    pub async fn start(
        request_tx: mpsc::UnboundedSender<Request>,
        mut notify_rx: mpsc::UnboundedReceiver<Notification>,
    ) -> Result<()> {
        let _ = request_tx.send(Request::Start);

        let mut stdin = BufReader::new(io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                notification = notify_rx.recv() => match notification {
                    Some(notification) => Self::render(notification),
                    None => break,
                },
                line = stdin.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => {
                        if !Self::handle_line(&request_tx, line.trim()) {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => {
                        stdin_open = false;
                    }
                },
                _ = signal::ctrl_c() => {
                    let _ = request_tx.send(Request::Stop);
                    break;
                }
            }
        }

        return Ok(());
    }

    fn handle_line(request_tx: &mpsc::UnboundedSender<Request>, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }

        match line {
            "/quit" | "/exit" | "/q" => {
                let _ = request_tx.send(Request::Stop);
                return false;
            }
            "/start" => {
                let _ = request_tx.send(Request::Start);
            }
            "/stop" => {
                let _ = request_tx.send(Request::Stop);
            }
            "/mic on" => {
                let _ = request_tx.send(Request::MicStart);
            }
            "/mic off" => {
                let _ = request_tx.send(Request::MicStop);
            }
            _ => {
                if let Some(rest) = line.strip_prefix("/set ") {
                    match rest.split_once(' ') {
                        Some((key, value)) => {
                            let values =
                                HashMap::from([(key.to_string(), value.trim().to_string())]);
                            let _ = request_tx.send(Request::ConfigUpdated(values));
                        }
                        None => println!("Usage: /set KEY VALUE"),
                    }
                } else if line.starts_with('/') {
                    println!(
                        "Unknown command. Available: /start /stop /mic on|off /set KEY VALUE /quit"
                    );
                } else {
                    let _ = request_tx.send(Request::SendText(line.to_string()));
                }
            }
        }

        return true;
    }

    fn render(notification: Notification) {
        match notification {
            Notification::ShowPanel => {
                println!("{}", Paint::green("* session started"));
            }
            Notification::HidePanel => {
                println!("{}", Paint::new("* session ended").dimmed());
            }
            Notification::StatusUpdate(text) => {
                if !text.is_empty() {
                    println!("{}", Paint::new(format!("- {text}")).dimmed());
                }
            }
            Notification::AiResponse(text) => {
                println!("{} {text}", Paint::magenta("assistant:"));
            }
            Notification::UserSpeech(text) => {
                println!("{} {text}", Paint::cyan("you (voice):"));
            }
            Notification::AsrPartial(text) => {
                println!("{}", Paint::new(format!("~ {text}")).dimmed());
            }
            Notification::PlayAudio(data) => {
                println!(
                    "{}",
                    Paint::new(format!("[audio] {} base64 chars of synthesized speech", data.len()))
                        .dimmed()
                );
            }
        }
    }
}
