//! Terminal notes for the interactive session. Everything here goes to
//! stderr; stdout carries spoken lines and JSON.

use pagesight_core::{ControllerEvent, NoticeKind};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Progress,
    Success,
    Warn,
    Error,
}

pub fn note(tone: Tone, msg: &str) {
    let (color, mark, plain) = match tone {
        Tone::Info => (CYAN, "ℹ", "INFO"),
        Tone::Progress => (DIM, "…", "...."),
        Tone::Success => (GREEN, "✓", "OK"),
        Tone::Warn => (YELLOW, "⚠", "WARN"),
        Tone::Error => (RED, "✗", "ERROR"),
    };
    if supports_color() {
        eprintln!("{color}{BOLD}{mark}{RESET} {msg}");
    } else {
        eprintln!("{plain}: {msg}");
    }
}

/// What to show for a controller event, if anything. Spoken lines are left
/// to the speech output.
pub fn describe_event(event: &ControllerEvent) -> Option<(Tone, String)> {
    match event {
        ControllerEvent::SessionStarted { session, url } => {
            Some((Tone::Info, format!("session {session}: {url}")))
        }
        ControllerEvent::ItemInProgress { index, total, .. } => {
            Some((Tone::Progress, format!("describing item {} of {}", index + 1, total)))
        }
        ControllerEvent::EnrichmentFinished { total, .. } => {
            Some((Tone::Success, format!("enrichment finished ({total} item(s))")))
        }
        ControllerEvent::Notice { kind, text } => {
            let tone = match kind {
                NoticeKind::Info | NoticeKind::UserInput => Tone::Info,
                NoticeKind::Target => Tone::Warn,
                NoticeKind::Transport | NoticeKind::Provider => Tone::Error,
            };
            Some((tone, text.clone()))
        }
        ControllerEvent::Executed { script } => Some((Tone::Info, format!("ran {script:?}"))),
        ControllerEvent::SnapshotUpdated { .. } | ControllerEvent::Spoke { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesight_core::SessionId;

    #[test]
    fn finished_reports_item_count() {
        let event = ControllerEvent::EnrichmentFinished { session: SessionId::new(), total: 3 };
        let (tone, text) = describe_event(&event).unwrap();
        assert_eq!(tone, Tone::Success);
        assert_eq!(text, "enrichment finished (3 item(s))");
    }

    #[test]
    fn transport_notice_is_an_error() {
        let event = ControllerEvent::Notice {
            kind: NoticeKind::Transport,
            text: "I cannot access this page.".into(),
        };
        assert_eq!(describe_event(&event).map(|(t, _)| t), Some(Tone::Error));
    }

    #[test]
    fn spoken_lines_are_not_repeated() {
        let event = ControllerEvent::Spoke { text: "hi".into(), rate: 1.0 };
        assert!(describe_event(&event).is_none());
    }
}
