pub mod track;

pub use track::{create_track_command, handle_track_interaction};
