pub mod registry;
pub mod simulated;
pub mod sysfs;

#[cfg(feature = "desktop")]
pub mod commands;

pub use registry::{
    resolve_selection, DeviceDescriptor, DevicePlatform, DeviceRegistry, PermissionState,
};
pub use simulated::SimulatedPlatform;
pub use sysfs::SysfsPlatform;
