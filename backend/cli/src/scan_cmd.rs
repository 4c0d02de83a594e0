//! One-shot scan: read the active tab, enrich it, print the snapshot as JSON.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pagesight_config::PageSightConfig;
use pagesight_controller::Controller;
use pagesight_core::ControllerEvent;
use tokio::sync::broadcast;
use tracing::info;

use crate::settings;
use crate::wiring::{self, LoggedSpeech};

pub async fn run(config: PageSightConfig, skip_enrichment: bool) -> Result<()> {
    let bridge = wiring::connect_bridge(&config).await?;
    let collab = wiring::collaborators(&config, bridge, Arc::new(LoggedSpeech::default()));
    let mut controller = Controller::new(collab, settings::controller_options(&config));
    let mut events = controller.subscribe();

    if controller.scan().await.is_none() {
        let reason = last_notice(&mut events).unwrap_or_else(|| "scan failed".to_string());
        bail!(reason);
    }

    if !skip_enrichment {
        while !controller.session().is_some_and(|s| s.enrichment_finished) {
            if !controller.pump_pipeline().await {
                break;
            }
        }
    }

    let session = controller.session().context("scan produced no session")?;
    info!(url = %session.target.url, "[Scan] printing snapshot");
    println!("{}", serde_json::to_string_pretty(&session.snapshot)?);
    Ok(())
}

fn last_notice(events: &mut broadcast::Receiver<ControllerEvent>) -> Option<String> {
    let mut last = None;
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::Notice { text, .. } = event {
            last = Some(text);
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesight_core::NoticeKind;

    #[test]
    fn picks_the_latest_notice() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(ControllerEvent::Notice { kind: NoticeKind::Info, text: "first".into() }).unwrap();
        tx.send(ControllerEvent::Spoke { text: "x".into(), rate: 1.0 }).unwrap();
        tx.send(ControllerEvent::Notice { kind: NoticeKind::Target, text: "No active page found.".into() })
            .unwrap();
        assert_eq!(last_notice(&mut rx).as_deref(), Some("No active page found."));
    }

    #[test]
    fn no_notice_is_none() {
        let (_tx, mut rx) = broadcast::channel::<ControllerEvent>(8);
        assert!(last_notice(&mut rx).is_none());
    }
}
