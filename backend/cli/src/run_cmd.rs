//! Interactive session: one utterance per stdin line.

use anyhow::Result;
use futures::StreamExt;
use pagesight_config::PageSightConfig;
use pagesight_controller::{Controller, ControllerInput};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use crate::settings;
use crate::terminal_output::{describe_event, note, Tone};
use crate::wiring;

/// Map one input line onto a controller input. Blank lines are ignored.
pub fn parse_line(line: &str) -> Option<ControllerInput> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => None,
        "scan" | "scan page" => Some(ControllerInput::Scan),
        "quit" | "exit" => Some(ControllerInput::Shutdown),
        _ => Some(ControllerInput::Utterance(trimmed.to_string())),
    }
}

pub async fn run(config: PageSightConfig) -> Result<()> {
    let bridge = wiring::connect_bridge(&config).await?;
    let (speech, speech_events) = wiring::build_speech(&config);
    let collab = wiring::collaborators(&config, bridge, speech);
    let controller = Controller::new(collab, settings::controller_options(&config));

    let printer = tokio::spawn(print_events(controller.subscribe()));
    let (tx, rx) = mpsc::channel(32);
    let reader = tokio::spawn(read_stdin(tx));

    note(Tone::Info, "type \"scan\" to read the current tab, then commands like \"read headings\"; \"quit\" leaves");
    let result = controller.run(rx, speech_events).await;

    reader.abort();
    printer.abort();
    result
}

async fn read_stdin(tx: mpsc::Sender<ControllerInput>) {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("[Input] reading stdin failed: {}", e);
                break;
            }
        };
        let Some(input) = parse_line(&line) else { continue };
        let shutdown = input == ControllerInput::Shutdown;
        if tx.send(input).await.is_err() || shutdown {
            return;
        }
    }
    debug!("[Input] stdin closed");
    let _ = tx.send(ControllerInput::Shutdown).await;
}

async fn print_events(mut events: broadcast::Receiver<pagesight_core::ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some((tone, text)) = describe_event(&event) {
                    note(tone, &text);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => debug!("[Input] skipped {} event(s)", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
