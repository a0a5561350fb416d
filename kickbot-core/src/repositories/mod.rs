pub mod postgres;

pub use postgres::PostgresTrackedStreamRepository;
