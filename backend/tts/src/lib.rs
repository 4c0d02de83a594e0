pub mod channel;
pub mod console;
pub mod engine;
pub mod sink;

pub use channel::SpeechChannel;
pub use console::ConsoleSpeech;
pub use engine::{create_tts, AudioFormat, ElevenLabsTts, OpenAiTts, TtsProvider, TtsProviderKind, TtsRequest};
pub use sink::{AudioSink, CommandSink, FileSink};
