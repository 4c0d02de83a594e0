/// Command dispatch: turn one utterance into actions and a new interpreter state.
///
/// `Interpreter::interpret` is pure. It never touches speech or the page; the
/// controller performs the returned actions.
use pagesight_core::EnrichedSnapshot;
use tracing::debug;

use crate::detection::{classify, is_interrupting};
use crate::handlers;
use crate::registry::IntentRegistry;
use crate::types::{Action, Intent, Interpretation, InterpreterState, DEFAULT_RATE_STEP};

pub struct Interpreter {
    registry: IntentRegistry,
    rate_step: f32,
}

impl Interpreter {
    pub fn new(registry: IntentRegistry) -> Self {
        Self { registry, rate_step: DEFAULT_RATE_STEP }
    }

    pub fn with_rate_step(mut self, step: f32) -> Self {
        self.rate_step = step.abs();
        self
    }

    pub fn registry(&self) -> &IntentRegistry {
        &self.registry
    }

    pub fn interpret(
        &self,
        utterance: &str,
        snapshot: Option<&EnrichedSnapshot>,
        state: &InterpreterState,
    ) -> Interpretation {
        let intent = classify(utterance, &self.registry);
        let mut next = state.clone();

        // Echo guard: while speaking only pre-emptive intents and explicit
        // barge-in words get through.
        if state.is_speaking()
            && !intent.is_preemptive()
            && !is_interrupting(utterance, &self.registry)
        {
            debug!("[Interpreter] suppressed while speaking: {:?}", utterance);
            return Interpretation { intent, actions: Vec::new(), state: next, suppressed: true };
        }

        let actions = match &intent {
            Intent::Stop => {
                if !state.is_speaking() {
                    return Interpretation { intent, actions: Vec::new(), state: next, suppressed: false };
                }
                handlers::stop(&mut next)
            }
            Intent::ChangeRate { direction } => handlers::change_rate(&mut next, *direction, self.rate_step),
            Intent::NavTop => handlers::nav_top(&mut next),
            Intent::NavBottom => handlers::nav_bottom(&mut next),
            Intent::Unrecognized => vec![handlers::notice(state, handlers::UNRECOGNIZED)],
            Intent::Summarize
            | Intent::NextImage
            | Intent::ReadHeadings
            | Intent::ReadContent
            | Intent::Search { .. } => match snapshot {
                None => vec![handlers::notice(state, handlers::SCAN_FIRST)],
                Some(snap) => match &intent {
                    Intent::Summarize => handlers::summarize(snap, &mut next),
                    Intent::NextImage => handlers::next_image(snap, &mut next),
                    Intent::ReadHeadings => handlers::read_headings(snap, &mut next),
                    Intent::ReadContent => handlers::read_content(snap, &mut next),
                    Intent::Search { query } => handlers::search(snap, &mut next, query),
                    _ => Vec::new(),
                },
            },
        };

        // Pure notices are not state changes.
        let only_notices = actions.iter().all(|a| matches!(a, Action::Notice { .. }));
        if only_notices && !matches!(intent, Intent::ChangeRate { .. }) {
            return Interpretation { intent, actions, state: state.clone(), suppressed: false };
        }

        next.last_utterance_handled = Some(utterance.to_string());
        debug!("[Interpreter] {:?} -> {} action(s)", intent, actions.len());
        Interpretation { intent, actions, state: next, suppressed: false }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(IntentRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{NO_IMAGES, SCAN_FIRST};
    use crate::types::SpeechMode;
    use chrono::Utc;
    use pagesight_core::{
        Dimensions, EnrichmentStatus, Heading, ImageRecord, PageScript, PageSnapshot,
    };

    fn image(i: usize, alt: &str, accessible: bool) -> ImageRecord {
        ImageRecord {
            id: format!("img-{i}"),
            src: format!("https://shop.example/{i}.png"),
            alt_text: alt.into(),
            is_accessible: accessible,
            is_ocr_candidate: false,
            dimensions: Dimensions::default(),
            ai_description: None,
            status: EnrichmentStatus::Pending,
        }
    }

    fn snapshot(images: Vec<ImageRecord>) -> EnrichedSnapshot {
        EnrichedSnapshot::new(PageSnapshot {
            title: "Help".into(),
            url: "https://shop.example/help".into(),
            timestamp: Utc::now(),
            headings: vec![Heading { level: 1, text: "Help center".into() }],
            main_text: vec!["We ship worldwide.".into(), "Returns within 30 days.".into()],
            images,
            links: vec![],
            pdfs: vec![],
        })
    }

    fn speaking(mut state: InterpreterState, text: &str) -> InterpreterState {
        state.mode = SpeechMode::Speaking;
        state.last_spoken_text = Some(text.into());
        state
    }

    #[test]
    fn image_cursor_wraps() {
        let interp = Interpreter::default();
        let snap = snapshot(vec![image(0, "A red bicycle", true), image(1, "", false), image(2, "", false)]);
        let mut state = InterpreterState::default();
        let mut cursors = Vec::new();
        for _ in 0..7 {
            state = interp.interpret("next image", Some(&snap), &state).state;
            state.mode = SpeechMode::Idle;
            cursors.push(state.cursor_index());
        }
        assert_eq!(cursors, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn image_narration_uses_one_based_index() {
        let interp = Interpreter::default();
        let snap = snapshot(vec![image(0, "A red bicycle", true), image(1, "", false)]);
        let first = interp.interpret("next image", Some(&snap), &InterpreterState::default());
        assert_eq!(
            first.actions,
            vec![
                Action::Execute { script: PageScript::HighlightImage { src: "https://shop.example/0.png".into() } },
                Action::Speak { text: "Image 1 of 2: A red bicycle.".into(), rate: 1.0 },
            ]
        );
        let mut state = first.state;
        state.mode = SpeechMode::Idle;
        let second = interp.interpret("next image", Some(&snap), &state);
        assert_eq!(
            second.actions[1],
            Action::Speak { text: "Image 2 of 2: No description available.".into(), rate: 1.0 }
        );
    }

    #[test]
    fn no_images_notice_keeps_cursor() {
        let interp = Interpreter::default();
        let snap = snapshot(vec![]);
        let state = InterpreterState::default();
        for _ in 0..3 {
            let out = interp.interpret("next image", Some(&snap), &state);
            assert_eq!(out.actions, vec![Action::Notice { text: NO_IMAGES.into(), rate: 1.0 }]);
            assert_eq!(out.state.cursor_index(), -1);
            assert_eq!(out.state, state);
        }
    }

    #[test]
    fn stop_while_speaking_goes_idle() {
        let interp = Interpreter::default();
        let state = speaking(InterpreterState::default(), "We ship worldwide.");
        let out = interp.interpret("stop scroll to top", None, &state);
        assert_eq!(out.intent, Intent::Stop);
        assert_eq!(out.actions, vec![Action::StopSpeech]);
        assert_eq!(out.state.mode, SpeechMode::Idle);
        assert_eq!(out.state.last_spoken_text, None);
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let interp = Interpreter::default();
        let state = InterpreterState::default();
        let once = interp.interpret("stop", None, &state);
        let twice = interp.interpret("stop", None, &once.state);
        assert!(once.actions.is_empty());
        assert!(twice.actions.is_empty());
        assert_eq!(twice.state, state);
    }

    #[test]
    fn faster_respeaks_last_text() {
        let interp = Interpreter::default();
        let state = speaking(InterpreterState::default(), "Returns within 30 days.");
        let out = interp.interpret("faster", None, &state);
        assert_eq!(
            out.actions,
            vec![Action::Speak { text: "Returns within 30 days.".into(), rate: 1.4 }]
        );
        assert_eq!(out.state.speech_rate, 1.4);
    }

    #[test]
    fn rate_is_clamped() {
        let interp = Interpreter::default();
        let mut state = InterpreterState::new(2.9);
        state = interp.interpret("faster", None, &state).state;
        assert_eq!(state.speech_rate, 3.0);
        let mut slow = InterpreterState::new(0.6);
        slow = interp.interpret("slower", None, &slow).state;
        assert_eq!(slow.speech_rate, 0.5);
    }

    #[test]
    fn echo_is_suppressed_but_barge_in_is_not() {
        let interp = Interpreter::default();
        let snap = snapshot(vec![image(0, "", false)]);
        let state = speaking(InterpreterState::default(), "Welcome to our help center");

        let echo = interp.interpret("welcome to our help center", Some(&snap), &state);
        assert!(echo.suppressed);
        assert!(echo.actions.is_empty());
        assert_eq!(echo.state, state);

        let barge = interp.interpret("next image", Some(&snap), &state);
        assert!(!barge.suppressed);
        assert_eq!(barge.state.cursor_index(), 0);
    }

    #[test]
    fn content_intents_need_a_snapshot() {
        let interp = Interpreter::default();
        let state = InterpreterState::default();
        for u in ["read headings", "read content", "find shipping", "next image", "summarize"] {
            let out = interp.interpret(u, None, &state);
            assert_eq!(out.actions, vec![Action::Notice { text: SCAN_FIRST.into(), rate: 1.0 }], "{u}");
            assert_eq!(out.state, state);
        }
    }

    #[test]
    fn search_runs_find_and_answer() {
        let interp = Interpreter::default();
        let snap = snapshot(vec![]);
        let out = interp.interpret("where is shipping policy", Some(&snap), &InterpreterState::default());
        assert_eq!(out.intent, Intent::Search { query: "shipping policy".into() });
        assert!(out.actions.contains(&Action::Execute {
            script: PageScript::FindText { query: "shipping policy".into() }
        }));
        assert!(out.actions.iter().any(|a| matches!(a, Action::Answer { question, .. } if question == "shipping policy")));
        assert_eq!(out.state.last_utterance_handled.as_deref(), Some("where is shipping policy"));
    }

    #[test]
    fn navigation_works_without_snapshot() {
        let interp = Interpreter::default();
        let out = interp.interpret("go to bottom", None, &InterpreterState::default());
        assert_eq!(out.actions[0], Action::Execute { script: PageScript::ScrollToBottom });
    }
}
