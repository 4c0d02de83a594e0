pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod types;

pub use detection::{classify, extract_search_query, is_interrupting, normalize_utterance};
pub use dispatch::Interpreter;
pub use registry::{builtin_rules, IntentRegistry, IntentRule};
pub use types::{
    clamp_rate, Action, Intent, IntentCategory, Interpretation, InterpreterState, RateDirection,
    SpeechMode, DEFAULT_RATE_STEP, MAX_RATE, MIN_RATE,
};
