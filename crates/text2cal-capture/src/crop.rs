use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use text2cal_types::CaptureRect;

use crate::error::CaptureError;
use crate::geometry::CropBox;

/// Lossless crop at physical-pixel resolution
#[derive(Clone)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    pub fn to_data_url(&self) -> String {
        png_data_url(&self.png)
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.png.len())
            .finish()
    }
}

/// Cuts `rect` out of an encoded full-frame screenshot
pub fn crop_frame(frame: &[u8], rect: &CaptureRect) -> Result<CapturedImage, CaptureError> {
    let frame = image::load_from_memory(frame).map_err(CaptureError::Decode)?;
    let bounds = CropBox::compute(rect, frame.width(), frame.height())?;

    tracing::debug!(
        "Cropping {}x{} frame to {:?} at scale {}",
        frame.width(),
        frame.height(),
        bounds,
        rect.device_scale
    );

    let cropped = frame
        .crop_imm(bounds.x, bounds.y, bounds.width, bounds.height)
        .to_rgba8();
    Ok(CapturedImage {
        width: cropped.width(),
        height: cropped.height(),
        png: encode_png(&cropped)?,
    })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(CaptureError::Encode)?;
    Ok(buffer)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Bytes of a base64 `data:` URL
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, CaptureError> {
    let (header, payload) = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(CaptureError::MalformedDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(CaptureError::MalformedDataUrl);
    }
    Ok(STANDARD.decode(payload)?)
}
