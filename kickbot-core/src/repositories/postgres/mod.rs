// src/repositories/postgres/mod.rs

pub mod tracked_streams;

pub use tracked_streams::PostgresTrackedStreamRepository;
