pub mod bot;
pub mod interaction;
pub mod lobby;
pub mod transport;

pub use db::Library;
