//! Job-scoped logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{job_info, job_warn};
//!
//! job_info!(job.id, "scoring with {}", policy.name());
//! ```
//!
//! Every line is prefixed with `[job <id>]` so the interleaved output of a
//! superseded job and its successor can be told apart.

/// Info line for one analysis job.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! job_info {
    ($job_id:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("[job {}] {}", $job_id, format_args!($($arg)*));
        }
    };
}

/// Warning line for one analysis job.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! job_warn {
    ($job_id:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("[job {}] {}", $job_id, format_args!($($arg)*));
        }
    };
}

/// Debug line for one analysis job.
#[macro_export]
macro_rules! job_debug {
    ($job_id:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("[job {}] {}", $job_id, format_args!($($arg)*));
        }
    };
}
