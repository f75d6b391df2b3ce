pub mod engine;
mod output;
mod player;
pub mod progress;
pub mod scale;
pub mod sink;
#[cfg(feature = "wildmidi")]
pub mod wildmidi;

pub use engine::{Engine, Session, SessionInfo};
pub use output::{write_midi_dump, Output};
pub use player::{Player, Step, CHUNK};
pub use progress::Progress;
pub use sink::Sink;
#[cfg(feature = "wildmidi")]
pub use wildmidi::WildMidi;
