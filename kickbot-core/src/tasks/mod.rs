pub mod stream_updates;

pub use stream_updates::spawn_stream_update_task;
