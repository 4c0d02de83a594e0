/// Per-intent handlers. Each one reads the snapshot, updates the interpreter
/// state it was given, and returns the actions for the controller.
use pagesight_core::{EnrichedSnapshot, PageScript};

use crate::types::{clamp_rate, Action, InterpreterState, RateDirection, SpeechMode};

pub const SCAN_FIRST: &str = "Please scan the page first.";
pub const NO_IMAGES: &str = "No images found on this page.";
pub const NO_HEADINGS: &str = "No headings found on this page.";
pub const NO_CONTENT: &str = "No readable content found on this page.";
pub const MISSING_DESCRIPTION: &str = "No description available";
pub const EMPTY_QUERY: &str = "What should I search for?";
pub const UNRECOGNIZED: &str = "Sorry, I didn't catch that.";
pub const SCROLLED_TOP: &str = "Scrolled to the top.";
pub const SCROLLED_BOTTOM: &str = "Scrolled to the bottom.";
pub const SUMMARIZING: &str = "Summarizing this page.";

/// Speak `text` and remember it for rate changes.
fn speak(state: &mut InterpreterState, text: String) -> Action {
    state.last_spoken_text = Some(text.clone());
    Action::Speak { text, rate: state.speech_rate }
}

/// A notice leaves state alone.
pub fn notice(state: &InterpreterState, text: &str) -> Action {
    Action::Notice { text: text.to_string(), rate: state.speech_rate }
}

// ---------------------------------------------------------------------------
// Speech control
// ---------------------------------------------------------------------------

pub fn stop(state: &mut InterpreterState) -> Vec<Action> {
    state.mode = SpeechMode::Idle;
    state.last_spoken_text = None;
    vec![Action::StopSpeech]
}

pub fn change_rate(state: &mut InterpreterState, direction: RateDirection, step: f32) -> Vec<Action> {
    let delta = match direction {
        RateDirection::Faster => step,
        RateDirection::Slower => -step,
    };
    state.speech_rate = clamp_rate(state.speech_rate + delta);
    match state.last_spoken_text.clone() {
        Some(text) => vec![Action::Speak { text, rate: state.speech_rate }],
        None => vec![Action::Notice {
            text: format!("Reading speed {:.1}.", state.speech_rate),
            rate: state.speech_rate,
        }],
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

pub fn nav_top(state: &mut InterpreterState) -> Vec<Action> {
    vec![
        Action::Execute { script: PageScript::ScrollToTop },
        speak(state, SCROLLED_TOP.to_string()),
    ]
}

pub fn nav_bottom(state: &mut InterpreterState) -> Vec<Action> {
    vec![
        Action::Execute { script: PageScript::ScrollToBottom },
        speak(state, SCROLLED_BOTTOM.to_string()),
    ]
}

/// Advance the image cursor with wrap-around and narrate the image.
pub fn next_image(snapshot: &EnrichedSnapshot, state: &mut InterpreterState) -> Vec<Action> {
    let count = snapshot.image_count();
    if count == 0 {
        return vec![notice(state, NO_IMAGES)];
    }
    let next = state.current_image_cursor.map_or(0, |c| (c + 1) % count);
    state.current_image_cursor = Some(next);

    let image = &snapshot.images[next];
    let description = image.spoken_description().unwrap_or(MISSING_DESCRIPTION);
    let text = format!("Image {} of {}: {}.", next + 1, count, description.trim_end_matches('.'));
    vec![
        Action::Execute { script: PageScript::HighlightImage { src: image.src.clone() } },
        speak(state, text),
    ]
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub fn read_headings(snapshot: &EnrichedSnapshot, state: &mut InterpreterState) -> Vec<Action> {
    if snapshot.headings.is_empty() {
        return vec![notice(state, NO_HEADINGS)];
    }
    let listed: Vec<String> = snapshot
        .headings
        .iter()
        .map(|h| format!("Level {}: {}.", h.level, h.text.trim_end_matches('.')))
        .collect();
    let text = format!("{} headings. {}", snapshot.headings.len(), listed.join(" "));
    vec![speak(state, text)]
}

pub fn read_content(snapshot: &EnrichedSnapshot, state: &mut InterpreterState) -> Vec<Action> {
    if snapshot.main_text.is_empty() {
        return vec![notice(state, NO_CONTENT)];
    }
    vec![speak(state, snapshot.main_text.join(" "))]
}

/// Summaries use the main text, or the title and headings when there is none.
pub fn summarize(snapshot: &EnrichedSnapshot, state: &mut InterpreterState) -> Vec<Action> {
    let text = if snapshot.main_text.is_empty() {
        let mut parts = vec![snapshot.title.clone()];
        parts.extend(snapshot.headings.iter().map(|h| h.text.clone()));
        parts.retain(|p| !p.trim().is_empty());
        parts.join(". ")
    } else {
        snapshot.joined_text()
    };
    if text.trim().is_empty() {
        return vec![notice(state, NO_CONTENT)];
    }
    vec![speak(state, SUMMARIZING.to_string()), Action::Summarize { text }]
}

/// In-page find and QA over the main text; both run, neither excludes the other.
pub fn search(snapshot: &EnrichedSnapshot, state: &mut InterpreterState, query: &str) -> Vec<Action> {
    if query.trim().is_empty() {
        return vec![notice(state, EMPTY_QUERY)];
    }
    vec![
        Action::Execute { script: PageScript::FindText { query: query.to_string() } },
        speak(state, format!("Searching for {query}.")),
        Action::Answer { question: query.to_string(), context: snapshot.joined_text() },
    ]
}
