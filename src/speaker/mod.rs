//! Spoken response pipeline
//!
//! Handles segmentation, assistant wake state, playback monitoring, voice
//! selection, and the dispatcher that ties them together.

mod dispatcher;
mod monitor;
mod registry;
mod request;
mod segmenter;
mod session;
mod tts;
mod wake;

pub use dispatcher::{ProviderChoice, ResponseDispatcher};
pub use monitor::{
    Event, InterruptCause, MonitorResult, Observation, Phase, PlaybackMonitor, SETTLE_DELAY,
};
pub use registry::{
    HttpVoiceCatalog, SpeakerRegistry, VoiceCatalog, VoiceCatalogEntry, parse_catalog,
};
pub use request::{
    InterruptionCheck, Payload, PlayOutcome, ResponseOptions, ResponseRequest, normalize_text,
};
pub use segmenter::{CursorPoll, DEFAULT_MAX_CHUNK_CHARS, StreamCursor, StreamSegmenter};
pub use session::{SessionGuard, SessionId, SessionManager};
pub use tts::VendorTts;
pub use wake::{UNWAKE_PHRASE, WakeStateController};
