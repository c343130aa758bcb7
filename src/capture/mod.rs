pub mod image;
pub mod policy;
pub mod source;

#[cfg(feature = "desktop")]
pub mod commands;

pub use image::{is_image_media_type, CapturedImage, ImageData, ImageOrigin, UploadFile};
pub use policy::{CapturePolicy, StubCapturePolicy};
pub use source::CaptureSource;
