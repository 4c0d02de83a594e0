//! The one piece of mutable state the controller owns.

use pagesight_commands::InterpreterState;
use pagesight_core::{EnrichedSnapshot, PageTarget, SessionId};

/// State tied to one target page between scans.
///
/// Created on a successful scan and replaced wholesale by the next one; the
/// interpreter state starts fresh with it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub target: PageTarget,
    pub snapshot: EnrichedSnapshot,
    pub interpreter: InterpreterState,
    /// Set once the pipeline reports it has run out of work.
    pub enrichment_finished: bool,
    /// Worklist position of the last enrichment update applied.
    pub applied_through: Option<usize>,
}

impl Session {
    pub fn new(target: PageTarget, snapshot: EnrichedSnapshot, speech_rate: f32) -> Self {
        Self {
            id: SessionId::new(),
            target,
            snapshot,
            interpreter: InterpreterState::new(speech_rate),
            enrichment_finished: false,
            applied_through: None,
        }
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.id == id
    }

    /// An in-progress marker for `position` may only replace the snapshot
    /// while no update at or past that position has landed.
    pub fn accepts_marker(&self, position: usize) -> bool {
        self.applied_through.map_or(true, |done| position > done)
    }

    pub fn record_update(&mut self, position: usize, snapshot: EnrichedSnapshot) {
        self.snapshot = snapshot;
        self.applied_through = Some(self.applied_through.map_or(position, |done| done.max(position)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagesight_core::{PageHandle, PageSnapshot};

    fn target() -> PageTarget {
        PageTarget { handle: PageHandle::new("t1"), url: "https://x".into(), title: "X".into() }
    }

    fn snapshot() -> EnrichedSnapshot {
        EnrichedSnapshot::new(PageSnapshot {
            title: "X".into(),
            url: "https://x".into(),
            timestamp: Utc::now(),
            headings: vec![],
            main_text: vec![],
            images: vec![],
            links: vec![],
            pdfs: vec![],
        })
    }

    #[test]
    fn each_session_gets_a_fresh_id_and_state() {
        let a = Session::new(target(), snapshot(), 1.4);
        let b = Session::new(target(), snapshot(), 1.4);
        assert!(!a.is_current(b.id));
        assert!(a.is_current(a.id));
        assert_eq!(a.interpreter.current_image_cursor, None);
        assert_eq!(a.interpreter.speech_rate, 1.4);
    }

    #[test]
    fn markers_never_roll_back_applied_updates() {
        let mut s = Session::new(target(), snapshot(), 1.0);
        assert!(s.accepts_marker(0));
        s.record_update(1, snapshot());
        assert!(!s.accepts_marker(0));
        assert!(!s.accepts_marker(1));
        assert!(s.accepts_marker(2));
        s.record_update(0, snapshot());
        assert_eq!(s.applied_through, Some(1));
    }
}
