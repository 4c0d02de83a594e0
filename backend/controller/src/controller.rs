//! Orchestration controller.
//!
//! Owns the session, runs scans, feeds utterances through the interpreter,
//! and performs the resulting actions. It is the single writer of all state;
//! the pipeline runs on its own task and reports back over a channel tagged
//! with the session id, so results from a superseded scan are simply dropped.
//! Summarize and answer calls run off the loop the same way, tagged with the
//! session and a call generation, so Stop and rate changes are never queued
//! behind a slow model.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use pagesight_commands::{
    normalize_utterance, Action, Intent, Interpreter, InterpreterState, SpeechMode,
};
use pagesight_core::{
    AccessibilityPolicy, ControllerEvent, EnrichedSnapshot, EnrichmentStatus, NoticeKind,
    PageHandle, PageScript, PageSightError, PageSnapshot, PageTarget, PageTransport,
    QuestionAnswerer, RemoteExecutor, SessionId, SpeechEvent, SpeechId, SpeechOutput, Summarizer,
    TargetResolver, DESCRIPTION_UNAVAILABLE,
};
use pagesight_pipeline::{
    enrich, EnrichmentProviders, EnrichmentUpdate, PipelineOptions, ProgressEvent, NO_TEXT_FOUND,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::scan::{read_document, request_with_recovery, ScanSettings};
use crate::session::Session;

pub const NO_ACTIVE_PAGE: &str = "No active page found.";
pub const CANNOT_ACCESS: &str = "Cannot access this page.";
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable right now.";
pub const REMOTE_FAILED: &str = "I couldn't do that on this page.";
const DOCUMENT_UNREADABLE: &str = "I couldn't read this PDF.";

const EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Everything outside the controller's own state.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn TargetResolver>,
    pub transport: Arc<dyn PageTransport>,
    pub executor: Arc<dyn RemoteExecutor>,
    pub providers: EnrichmentProviders,
    pub summarizer: Arc<dyn Summarizer>,
    pub answerer: Arc<dyn QuestionAnswerer>,
    pub speech: Arc<dyn SpeechOutput>,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Rate every new session starts at.
    pub default_rate: f32,
    pub rate_step: f32,
    pub scan: ScanSettings,
    pub policy: AccessibilityPolicy,
    pub pipeline: PipelineOptions,
    /// Bound on summarize and answer calls.
    pub provider_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            default_rate: 1.0,
            rate_step: pagesight_commands::DEFAULT_RATE_STEP,
            scan: ScanSettings::default(),
            policy: AccessibilityPolicy::default(),
            pipeline: PipelineOptions::default(),
            provider_timeout: Duration::from_secs(60),
        }
    }
}

/// Inputs driving [`Controller::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerInput {
    Scan,
    /// One recognized utterance, as delivered by speech-to-text.
    Utterance(String),
    Shutdown,
}

/// A pipeline report, tagged with the session that started the run.
#[derive(Debug)]
pub(crate) struct Tagged {
    pub(crate) session: SessionId,
    pub(crate) message: PipelineMessage,
}

#[derive(Debug)]
pub(crate) enum PipelineMessage {
    Progress(ProgressEvent),
    Update(EnrichmentUpdate),
}

/// What a finished summarize or answer call wants said.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    Speak(String),
    Failure(String),
    Quiet,
}

/// A provider reply, tagged with the session and call that asked for it.
#[derive(Debug)]
pub(crate) struct ProviderReply {
    pub(crate) session: Option<SessionId>,
    pub(crate) generation: u64,
    pub(crate) reply: Reply,
}

/// The one provider call allowed in flight.
struct PendingCall {
    generation: u64,
    task: JoinHandle<()>,
}

/// How far an utterance's action list got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// A page script failed; the rest of the list is dropped.
    Halted,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller {
    collab: Collaborators,
    options: ControllerOptions,
    interpreter: Interpreter,
    session: Option<Session>,
    /// Interpreter state used before the first successful scan.
    detached: InterpreterState,
    current_speech: Option<SpeechId>,
    pipeline_task: Option<JoinHandle<()>>,
    pipeline_tx: mpsc::UnboundedSender<Tagged>,
    pipeline_rx: mpsc::UnboundedReceiver<Tagged>,
    pending: Option<PendingCall>,
    generation: u64,
    reply_tx: mpsc::UnboundedSender<ProviderReply>,
    reply_rx: mpsc::UnboundedReceiver<ProviderReply>,
    events: broadcast::Sender<ControllerEvent>,
}

impl Controller {
    pub fn new(collab: Collaborators, options: ControllerOptions) -> Self {
        let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let interpreter = Interpreter::default().with_rate_step(options.rate_step);
        Self {
            detached: InterpreterState::new(options.default_rate),
            collab,
            options,
            interpreter,
            session: None,
            current_speech: None,
            pipeline_task: None,
            pipeline_tx,
            pipeline_rx,
            pending: None,
            generation: 0,
            reply_tx,
            reply_rx,
            events,
        }
    }

    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn interpreter_state(&self) -> &InterpreterState {
        match &self.session {
            Some(s) => &s.interpreter,
            None => &self.detached,
        }
    }

    fn state_mut(&mut self) -> &mut InterpreterState {
        match &mut self.session {
            Some(s) => &mut s.interpreter,
            None => &mut self.detached,
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Drive the controller until `Shutdown` arrives or the input channel closes.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<ControllerInput>,
        mut speech_events: mpsc::UnboundedReceiver<SpeechEvent>,
    ) -> Result<()> {
        info!("[Controller] started");
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(ControllerInput::Scan) => {
                        self.scan().await;
                    }
                    Some(ControllerInput::Utterance(text)) => self.handle_utterance(&text).await,
                    Some(ControllerInput::Shutdown) | None => break,
                },
                Some(tagged) = self.pipeline_rx.recv() => self.apply_pipeline(tagged),
                Some(reply) = self.reply_rx.recv() => self.apply_reply(reply).await,
                Some(event) = speech_events.recv() => self.on_speech_event(event),
            }
        }
        self.shutdown().await;
        info!("[Controller] stopped");
        Ok(())
    }

    /// Apply the next pipeline report, waiting for one. Returns false once the
    /// channel can produce nothing more.
    pub async fn pump_pipeline(&mut self) -> bool {
        match self.pipeline_rx.recv().await {
            Some(tagged) => {
                self.apply_pipeline(tagged);
                true
            }
            None => false,
        }
    }

    /// Wait for the provider call in flight, if any, and speak its reply.
    pub async fn settle(&mut self) {
        while self.pending.is_some() {
            match self.reply_rx.recv().await {
                Some(reply) => self.apply_reply(reply).await,
                None => break,
            }
        }
    }

    async fn shutdown(&mut self) {
        self.abort_pipeline();
        self.cancel_pending();
        if let Err(e) = self.collab.speech.stop().await {
            warn!("[Controller] stopping speech on shutdown failed: {:#}", e);
        }
    }

    pub fn on_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Finished { id } if self.current_speech == Some(id) => {
                self.current_speech = None;
                self.state_mut().mode = SpeechMode::Idle;
            }
            SpeechEvent::Finished { id } => {
                debug!("[Controller] ignoring finish of superseded speech {}", id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scanning
    // -----------------------------------------------------------------------

    /// Scan the active page and start enriching it. Failures are spoken, never
    /// returned; the result is the new session id on success.
    #[instrument(skip_all)]
    pub async fn scan(&mut self) -> Option<SessionId> {
        self.abort_pipeline();
        self.cancel_pending();
        self.silence().await;

        match self.try_scan().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("[Controller] scan failed: {}", e);
                self.drop_session();
                let (kind, text) = match &e {
                    PageSightError::NoActiveTarget => (NoticeKind::Target, NO_ACTIVE_PAGE),
                    _ => (NoticeKind::Transport, CANNOT_ACCESS),
                };
                self.fail(kind, text).await;
                None
            }
        }
    }

    /// The page is gone or unreadable; its half-enriched snapshot goes with it.
    fn drop_session(&mut self) {
        if let Some(old) = self.session.take() {
            info!(session = %old.id, "[Controller] session for {} closed", old.target.url);
            self.detached = InterpreterState::new(self.options.default_rate);
            self.current_speech = None;
        }
    }

    async fn try_scan(&mut self) -> Result<SessionId, PageSightError> {
        let target = match self.collab.resolver.active_page().await {
            Ok(Some(target)) => target,
            Ok(None) => return Err(PageSightError::NoActiveTarget),
            Err(e) => {
                warn!("[Controller] resolving active page failed: {:#}", e);
                return Err(PageSightError::NoActiveTarget);
            }
        };
        info!(url = %target.url, "[Controller] scanning {}", target.handle);

        if target.is_document() {
            return Ok(self.open_document(target).await);
        }

        let raw = request_with_recovery(
            self.collab.transport.as_ref(),
            &target.handle,
            &self.options.scan,
        )
        .await?;
        let snapshot = EnrichedSnapshot::new(raw.normalize(&self.options.policy));
        let summary = scan_summary(&snapshot);

        let id = self.begin_session(target, snapshot.clone());
        self.start_pipeline(id, snapshot);
        self.say(&summary, true).await;
        Ok(id)
    }

    /// The target is itself a PDF: skip the scanner and per-image loop.
    async fn open_document(&mut self, target: PageTarget) -> SessionId {
        let result = read_document(
            self.collab.providers.rasterizer.as_deref(),
            self.collab.providers.ocr.as_ref(),
            &target.url,
            self.options.pipeline.item_timeout,
        )
        .await;

        let (snapshot, spoken) = match result {
            Ok(text) => {
                let text = if text.is_empty() { NO_TEXT_FOUND.to_string() } else { text };
                let snap = PageSnapshot::from_document(&target, &text, EnrichmentStatus::Complete);
                let spoken = format!("Opened PDF {}.", snap.title);
                (snap, spoken)
            }
            Err(e) => {
                warn!("[Controller] document {} unreadable: {}", target.url, e);
                let mut snap = PageSnapshot::from_document(&target, "", EnrichmentStatus::Failed);
                for pdf in &mut snap.pdfs {
                    pdf.ai_description = Some(DESCRIPTION_UNAVAILABLE.to_string());
                }
                (snap, DOCUMENT_UNREADABLE.to_string())
            }
        };

        let snapshot = EnrichedSnapshot::new(snapshot);
        let id = self.begin_session(target, snapshot);
        if let Some(session) = &mut self.session {
            session.enrichment_finished = true;
        }
        self.emit(ControllerEvent::EnrichmentFinished { session: id, total: 1 });
        self.say(&spoken, true).await;
        id
    }

    fn begin_session(&mut self, target: PageTarget, snapshot: EnrichedSnapshot) -> SessionId {
        let session = Session::new(target, snapshot.clone(), self.options.default_rate);
        let id = session.id;
        info!(session = %id, "[Controller] new session for {}", session.target.url);
        self.emit(ControllerEvent::SessionStarted { session: id, url: session.target.url.clone() });
        self.emit(ControllerEvent::SnapshotUpdated { session: id, index: None, snapshot });
        self.session = Some(session);
        self.current_speech = None;
        id
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    fn start_pipeline(&mut self, session: SessionId, snapshot: EnrichedSnapshot) {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let stream = enrich(
            snapshot,
            self.collab.providers.clone(),
            self.options.pipeline.clone(),
            Some(progress_tx),
        );
        let tx = self.pipeline_tx.clone();

        let handle = tokio::spawn(async move {
            let send = |message: PipelineMessage| tx.send(Tagged { session, message }).is_ok();
            let mut stream = std::pin::pin!(stream);
            loop {
                tokio::select! {
                    biased;
                    Some(event) = progress_rx.recv() => {
                        if !send(PipelineMessage::Progress(event)) {
                            return;
                        }
                    }
                    update = stream.next() => match update {
                        Some(update) => {
                            // An item that resolved within one poll has its
                            // Started marker still queued; it goes first.
                            while let Ok(event) = progress_rx.try_recv() {
                                if !send(PipelineMessage::Progress(event)) {
                                    return;
                                }
                            }
                            if !send(PipelineMessage::Update(update)) {
                                return;
                            }
                        }
                        None => break,
                    },
                }
            }
            while let Ok(event) = progress_rx.try_recv() {
                send(PipelineMessage::Progress(event));
            }
        });
        self.pipeline_task = Some(handle);
    }

    fn abort_pipeline(&mut self) {
        if let Some(handle) = self.pipeline_task.take() {
            handle.abort();
        }
    }

    pub(crate) fn apply_pipeline(&mut self, tagged: Tagged) {
        let Some(session) = self.session.as_mut().filter(|s| s.is_current(tagged.session)) else {
            debug!(session = %tagged.session, "[Controller] discarding stale pipeline report");
            return;
        };
        let id = session.id;

        match tagged.message {
            PipelineMessage::Progress(ProgressEvent::Started { position, total, snapshot, .. }) => {
                if !session.accepts_marker(position) {
                    debug!(session = %id, "[Controller] ignoring late marker for item {}", position);
                    return;
                }
                session.snapshot = snapshot.clone();
                self.emit(ControllerEvent::ItemInProgress { session: id, index: position, total, snapshot });
            }
            PipelineMessage::Update(update) => {
                session.record_update(update.position, update.snapshot.clone());
                self.emit(ControllerEvent::SnapshotUpdated {
                    session: id,
                    index: Some(update.position),
                    snapshot: update.snapshot,
                });
            }
            PipelineMessage::Progress(ProgressEvent::Finished { total, failed }) => {
                session.enrichment_finished = true;
                info!(session = %id, failed, "[Controller] enrichment finished, {} item(s)", total);
                self.emit(ControllerEvent::EnrichmentFinished { session: id, total });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Utterances
    // -----------------------------------------------------------------------

    /// Interpret one utterance and perform its actions in order.
    pub async fn handle_utterance(&mut self, raw: &str) {
        let utterance = normalize_utterance(raw);
        if utterance.is_empty() {
            return;
        }
        let snapshot = self.session.as_ref().map(|s| s.snapshot.clone());
        let before = self.interpreter_state().clone();
        let result = self.interpreter.interpret(&utterance, snapshot.as_ref(), &before);
        if result.suppressed {
            return;
        }
        if self.pending.is_some() && supersedes_pending(&result.intent, &result.actions) {
            self.cancel_pending();
        }
        *self.state_mut() = result.state;

        for action in result.actions {
            if self.perform(action).await == Flow::Halted {
                // Nothing after the failed script ran; undo what the
                // interpreter assumed it would say.
                *self.state_mut() = InterpreterState { mode: SpeechMode::Idle, ..before };
                return;
            }
        }
    }

    async fn perform(&mut self, action: Action) -> Flow {
        match action {
            Action::Speak { text, .. } => self.say(&text, true).await,
            Action::Notice { text, .. } => self.notify(NoticeKind::UserInput, &text).await,
            Action::StopSpeech => self.silence().await,
            Action::Execute { script } => return self.execute(script).await,
            Action::Summarize { text } => self.summarize(text),
            Action::Answer { question, context } => self.answer(question, context),
        }
        Flow::Continue
    }

    async fn execute(&mut self, script: PageScript) -> Flow {
        let page = match self.page_handle().await {
            Some(page) => page,
            None => {
                self.fail(NoticeKind::Target, NO_ACTIVE_PAGE).await;
                return Flow::Halted;
            }
        };
        match self.collab.executor.execute(&page, &script).await {
            Ok(()) => {
                debug!("[Controller] executed {} on {}", script.name(), page);
                self.emit(ControllerEvent::Executed { script });
                Flow::Continue
            }
            Err(e) => {
                warn!("[Controller] {} on {} failed: {:#}", script.name(), page, e);
                self.fail(NoticeKind::Transport, REMOTE_FAILED).await;
                Flow::Halted
            }
        }
    }

    /// The session's page, or whatever is active when nothing was scanned yet.
    async fn page_handle(&self) -> Option<PageHandle> {
        if let Some(session) = &self.session {
            return Some(session.target.handle.clone());
        }
        match self.collab.resolver.active_page().await {
            Ok(target) => target.map(|t| t.handle),
            Err(e) => {
                warn!("[Controller] resolving active page failed: {:#}", e);
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Provider calls
    // -----------------------------------------------------------------------

    fn summarize(&mut self, text: String) {
        let summarizer = self.collab.summarizer.clone();
        let timeout = self.options.provider_timeout;
        self.spawn_call(async move {
            match tokio::time::timeout(timeout, summarizer.summarize(&text)).await {
                Ok(Ok(summary)) if !summary.trim().is_empty() => Reply::Speak(summary.trim().to_string()),
                Ok(Ok(_)) => Reply::Failure(SUMMARY_UNAVAILABLE.to_string()),
                Ok(Err(e)) => {
                    warn!("[Controller] summarize failed: {:#}", e);
                    Reply::Failure(SUMMARY_UNAVAILABLE.to_string())
                }
                Err(_) => {
                    warn!("[Controller] summarize timed out");
                    Reply::Failure(SUMMARY_UNAVAILABLE.to_string())
                }
            }
        });
    }

    /// QA over the page text. The in-page search already ran, so failures stay quiet.
    fn answer(&mut self, question: String, context: String) {
        if context.trim().is_empty() {
            debug!("[Controller] no page text to answer from");
            return;
        }
        let answerer = self.collab.answerer.clone();
        let timeout = self.options.provider_timeout;
        self.spawn_call(async move {
            match tokio::time::timeout(timeout, answerer.answer(&question, &context)).await {
                Ok(Ok(answer)) if !answer.trim().is_empty() => {
                    Reply::Speak(format!("Answer: {}", answer.trim()))
                }
                Ok(Ok(_)) => {
                    debug!("[Controller] empty answer for {:?}", question);
                    Reply::Quiet
                }
                Ok(Err(e)) => {
                    warn!("[Controller] answer failed: {:#}", e);
                    Reply::Quiet
                }
                Err(_) => {
                    warn!("[Controller] answer timed out");
                    Reply::Quiet
                }
            }
        });
    }

    fn spawn_call<F>(&mut self, call: F)
    where
        F: Future<Output = Reply> + Send + 'static,
    {
        self.cancel_pending();
        let generation = self.generation;
        let session = self.session.as_ref().map(|s| s.id);
        let tx = self.reply_tx.clone();
        let task = tokio::spawn(async move {
            let reply = call.await;
            let _ = tx.send(ProviderReply { session, generation, reply });
        });
        self.pending = Some(PendingCall { generation, task });
    }

    /// Abort the call in flight and make any reply it already sent stale.
    fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some(call) = self.pending.take() {
            debug!("[Controller] cancelling provider call {}", call.generation);
            call.task.abort();
        }
    }

    pub(crate) async fn apply_reply(&mut self, reply: ProviderReply) {
        let current = self.session.as_ref().map(|s| s.id);
        let live = self.pending.as_ref().is_some_and(|p| p.generation == reply.generation);
        if !live || reply.session != current {
            debug!("[Controller] discarding stale provider reply {}", reply.generation);
            return;
        }
        self.pending = None;
        match reply.reply {
            Reply::Speak(text) => self.say(&text, true).await,
            Reply::Failure(text) => self.fail(NoticeKind::Provider, &text).await,
            Reply::Quiet => {}
        }
    }

    // -----------------------------------------------------------------------
    // Speech
    // -----------------------------------------------------------------------

    /// Speak at the current rate. `remember` records the text for rate changes.
    async fn say(&mut self, text: &str, remember: bool) {
        let rate = self.interpreter_state().speech_rate;
        match self.collab.speech.speak(text, rate).await {
            Ok(id) => {
                self.current_speech = Some(id);
                let state = self.state_mut();
                state.mode = SpeechMode::Speaking;
                if remember {
                    state.last_spoken_text = Some(text.to_string());
                }
                self.emit(ControllerEvent::Spoke { text: text.to_string(), rate });
            }
            Err(e) => {
                warn!("[Controller] speech output failed: {:#}", e);
                self.current_speech = None;
                self.state_mut().mode = SpeechMode::Idle;
            }
        }
    }

    async fn notify(&mut self, kind: NoticeKind, text: &str) {
        self.emit(ControllerEvent::Notice { kind, text: text.to_string() });
        self.say(text, false).await;
    }

    /// A failed external call: say so, and leave the interpreter Idle.
    async fn fail(&mut self, kind: NoticeKind, text: &str) {
        self.notify(kind, text).await;
        self.state_mut().mode = SpeechMode::Idle;
    }

    async fn silence(&mut self) {
        if let Err(e) = self.collab.speech.stop().await {
            warn!("[Controller] stopping speech failed: {:#}", e);
        }
        self.current_speech = None;
        self.state_mut().mode = SpeechMode::Idle;
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.abort_pipeline();
        self.cancel_pending();
    }
}

/// Whether a new utterance replaces the provider call still in flight. Rate
/// changes and unrecognized speech leave it running.
fn supersedes_pending(intent: &Intent, actions: &[Action]) -> bool {
    match intent {
        Intent::Stop => true,
        Intent::ChangeRate { .. } | Intent::Unrecognized => false,
        _ => !actions.is_empty(),
    }
}

/// "Scanned <title>. N headings, M images, K without descriptions."
pub fn scan_summary(snapshot: &PageSnapshot) -> String {
    let title = if snapshot.title.trim().is_empty() { "this page" } else { snapshot.title.trim() };
    format!(
        "Scanned {}. {} headings, {} images, {} without descriptions.",
        title,
        snapshot.headings.len(),
        snapshot.images.len(),
        snapshot.undescribed_images()
    )
}
