mod crop;
mod error;
mod geometry;
mod session;
mod source;

pub use crop::{CapturedImage, crop_frame, decode_data_url, encode_png, png_data_url};
pub use error::CaptureError;
pub use geometry::{CropBox, Point, selection_rect};
pub use session::{CaptureSession, Gesture, SessionUpdate};
pub use source::{FileScreenshot, ScreenshotSource};
