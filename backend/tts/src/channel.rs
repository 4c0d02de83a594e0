//! Interruptible speech output.
//!
//! Each `speak` cancels whatever is playing and starts a new task that
//! synthesizes and plays the text. Completion is reported on an event channel
//! so the controller can return to Idle; interrupted clips report nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use pagesight_core::{SpeechEvent, SpeechId, SpeechOutput};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{AudioFormat, TtsProvider, TtsRequest};
use crate::sink::AudioSink;

pub struct SpeechChannel {
    tts: Arc<dyn TtsProvider>,
    sink: Arc<dyn AudioSink>,
    format: AudioFormat,
    next_id: AtomicU64,
    current: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<SpeechEvent>,
}

impl SpeechChannel {
    /// Build a channel and the receiver for its completion events.
    pub fn new(
        tts: Arc<dyn TtsProvider>,
        sink: Arc<dyn AudioSink>,
    ) -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let channel = Self {
            tts,
            sink,
            format: AudioFormat::Mp3,
            next_id: AtomicU64::new(0),
            current: Mutex::new(None),
            events,
        };
        (channel, rx)
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }
}

#[async_trait]
impl SpeechOutput for SpeechChannel {
    async fn speak(&self, text: &str, rate: f32) -> Result<SpeechId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.abort();
        }

        let tts = self.tts.clone();
        let sink = self.sink.clone();
        let events = self.events.clone();
        let mut request = TtsRequest::new(text, rate);
        request.format = self.format;
        debug!("[Speech] #{} via {} at {}x: {:?}", id, tts.name(), rate, text);

        *current = Some(tokio::spawn(async move {
            let format = request.format;
            let played = async {
                let audio = tts.synthesize(request).await?;
                sink.play(audio, format).await
            }
            .await;
            if let Err(e) = played {
                warn!("[Speech] #{} failed: {:#}", id, e);
            }
            let _ = events.send(SpeechEvent::Finished { id });
        }));
        Ok(id)
    }

    async fn stop(&self) -> Result<()> {
        if let Some(handle) = self.current.lock().await.take() {
            handle.abort();
            debug!("[Speech] stopped");
        }
        Ok(())
    }
}
