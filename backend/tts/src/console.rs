//! Speech output for terminals without audio: prints each line and reports
//! completion after roughly the time it would take to say it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use pagesight_core::{SpeechEvent, SpeechId, SpeechOutput};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Speaking pace at rate 1.0.
const WORDS_PER_SECOND: f32 = 2.5;

pub struct ConsoleSpeech {
    next_id: AtomicU64,
    current: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<SpeechEvent>,
}

impl ConsoleSpeech {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { next_id: AtomicU64::new(0), current: Mutex::new(None), events }, rx)
    }
}

/// Time a listener would need to hear `text` at `rate`.
pub fn estimated_duration(text: &str, rate: f32) -> Duration {
    let words = text.split_whitespace().count().max(1) as f32;
    Duration::from_secs_f32(words / (WORDS_PER_SECOND * rate.max(0.1)))
}

#[async_trait]
impl SpeechOutput for ConsoleSpeech {
    async fn speak(&self, text: &str, rate: f32) -> Result<SpeechId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.abort();
        }
        println!("[speech {rate:.1}x] {text}");

        let events = self.events.clone();
        let duration = estimated_duration(text, rate);
        *current = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = events.send(SpeechEvent::Finished { id });
        }));
        Ok(id)
    }

    async fn stop(&self) -> Result<()> {
        if let Some(handle) = self.current.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faster_rate_is_shorter() {
        let slow = estimated_duration("one two three four five", 1.0);
        let fast = estimated_duration("one two three four five", 2.0);
        assert_eq!(slow, Duration::from_secs(2));
        assert!(fast < slow);
    }

    #[tokio::test(start_paused = true)]
    async fn finishes_after_the_estimate() {
        let (speech, mut events) = ConsoleSpeech::new();
        let id = speech.speak("hello there", 1.0).await.unwrap();
        assert_eq!(events.recv().await, Some(SpeechEvent::Finished { id }));
    }
}
