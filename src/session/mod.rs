pub mod bus;
pub mod manager;
pub mod state;
pub mod store;

#[cfg(feature = "desktop")]
pub mod commands;

pub use bus::{SessionBus, SessionSignal, CAMERA_STATUS_CHANGED};
pub use manager::SessionManager;
pub use state::{ConnectionState, PersistedSession, Session};
pub use store::SessionStore;
