use serde::{Deserialize, Serialize};

use crate::script::PageScript;
use crate::types::{EnrichedSnapshot, SessionId};

/// Identifies one `speak` call on a speech channel.
pub type SpeechId = u64;

/// Lifecycle notifications from the speech channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Playback of `id` ran to completion or failed; it was not interrupted.
    Finished { id: SpeechId },
}

/// Category of a user-facing notice, mirroring the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Transport,
    Provider,
    UserInput,
    Target,
}

/// What the controller publishes to observers such as a panel UI or the CLI.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    SessionStarted { session: SessionId, url: String },
    /// An item was marked in progress; `snapshot` reflects the marker.
    ItemInProgress { session: SessionId, index: usize, total: usize, snapshot: EnrichedSnapshot },
    SnapshotUpdated { session: SessionId, index: Option<usize>, snapshot: EnrichedSnapshot },
    EnrichmentFinished { session: SessionId, total: usize },
    Spoke { text: String, rate: f32 },
    Executed { script: PageScript },
    Notice { kind: NoticeKind, text: String },
}
