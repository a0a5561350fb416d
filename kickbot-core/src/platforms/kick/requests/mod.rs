pub mod channel;
pub mod livestream;
