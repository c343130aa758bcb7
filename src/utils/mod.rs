pub mod forward;
pub mod logging;

pub use forward::{spawn_forwarder, spawn_watch_forwarder};
