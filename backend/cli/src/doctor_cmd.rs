//! `pagesight doctor`: checks the config and that Chrome is reachable.

use anyhow::Result;
use pagesight_browser::CdpClient;
use pagesight_config::{validate, PageSightConfig};

use crate::settings;
use crate::terminal_output::{note, Tone};

pub async fn run(config: &PageSightConfig) -> Result<()> {
    eprintln!("\nRunning PageSight doctor...\n");

    let config_ok = check_config(config);
    let browser_ok = check_browser(config).await;

    eprintln!();
    if config_ok && browser_ok {
        note(Tone::Success, "All checks passed.");
    } else {
        note(Tone::Error, "Some checks failed; see above.");
    }
    Ok(())
}

fn check_config(config: &PageSightConfig) -> bool {
    let report = validate(config);
    for warning in &report.warnings {
        note(Tone::Warn, &format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note(Tone::Error, &format!("{}: {}", error.path, error.message));
    }
    if report.is_valid() {
        note(Tone::Success, "config is valid");
    }
    report.is_valid()
}

async fn check_browser(config: &PageSightConfig) -> bool {
    let (endpoint, timeout) = settings::cdp_endpoint(config);
    let client = match CdpClient::connect(&endpoint).await {
        Ok(client) => client.with_call_timeout(timeout),
        Err(e) => {
            note(Tone::Error, &format!("Chrome at {endpoint}: {e}"));
            note(Tone::Info, "start Chrome with --remote-debugging-port=9222");
            return false;
        }
    };
    match client.list_pages().await {
        Ok(pages) => {
            let content = pages.iter().filter(|p| p.is_content_page()).count();
            note(Tone::Success, &format!("Chrome at {endpoint}: {content} open tab(s)"));
            true
        }
        Err(e) => {
            note(Tone::Error, &format!("listing tabs failed: {e}"));
            false
        }
    }
}
