#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid device scale: {0}")]
    InvalidScale(f64),

    #[error("Screenshot has no pixels")]
    EmptyFrame,

    #[error("Failed to decode screenshot: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Invalid base64 image: {0}")]
    Base64(#[from] base64::DecodeError),
}
