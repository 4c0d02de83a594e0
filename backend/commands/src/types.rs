/// Voice command types.
use pagesight_core::PageScript;
use serde::{Deserialize, Serialize};

/// Lowest speech rate the interpreter will set.
pub const MIN_RATE: f32 = 0.5;
/// Highest speech rate the interpreter will set.
pub const MAX_RATE: f32 = 3.0;
/// Default step applied by "faster" / "slower".
pub const DEFAULT_RATE_STEP: f32 = 0.4;

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Row keys of the intent table, in no particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Stop,
    Faster,
    Slower,
    Summarize,
    NavTop,
    NavBottom,
    NextImage,
    ReadHeadings,
    ReadContent,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateDirection {
    Faster,
    Slower,
}

/// Result of the classification pass over one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Stop,
    ChangeRate { direction: RateDirection },
    Summarize,
    NavTop,
    NavBottom,
    NextImage,
    ReadHeadings,
    ReadContent,
    /// `query` has the leading command words stripped and may be empty.
    Search { query: String },
    Unrecognized,
}

impl Intent {
    /// Stop and rate changes pre-empt speech; everything else can be suppressed.
    pub fn is_preemptive(&self) -> bool {
        matches!(self, Self::Stop | Self::ChangeRate { .. })
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechMode {
    #[default]
    Idle,
    Speaking,
}

/// Per-session interpreter state. Reset whenever the target page changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterState {
    pub last_utterance_handled: Option<String>,
    /// `None` before the first "next image" (the -1 position).
    pub current_image_cursor: Option<usize>,
    pub last_spoken_text: Option<String>,
    pub speech_rate: f32,
    pub mode: SpeechMode,
}

impl InterpreterState {
    pub fn new(speech_rate: f32) -> Self {
        Self {
            last_utterance_handled: None,
            current_image_cursor: None,
            last_spoken_text: None,
            speech_rate: clamp_rate(speech_rate),
            mode: SpeechMode::Idle,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.mode == SpeechMode::Speaking
    }

    /// Cursor in the signed form used for display: -1 before the first image.
    pub fn cursor_index(&self) -> i64 {
        self.current_image_cursor.map_or(-1, |c| c as i64)
    }
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Clamp to [`MIN_RATE`, `MAX_RATE`] and round to one decimal place.
pub fn clamp_rate(rate: f32) -> f32 {
    let rate = if rate.is_finite() { rate } else { 1.0 };
    (rate.clamp(MIN_RATE, MAX_RATE) * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Side effects requested by the interpreter; the controller performs them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Speak and remember as the last spoken text.
    Speak { text: String, rate: f32 },
    /// Speak without touching interpreter state (user-input notices).
    Notice { text: String, rate: f32 },
    StopSpeech,
    Execute { script: PageScript },
    /// Summarize `text` and speak the result.
    Summarize { text: String },
    /// Ask the QA provider and speak the answer if one comes back.
    Answer { question: String, context: String },
}

/// Output of one interpreter step.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub intent: Intent,
    pub actions: Vec<Action>,
    pub state: InterpreterState,
    /// True when the utterance arrived while speaking and was ignored.
    pub suppressed: bool,
}
