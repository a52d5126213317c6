use text2cal_types::{CaptureRect, MIN_SELECTION_PX};

use crate::error::CaptureError;

/// Pointer position in page-viewport logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle spanned by a drag, top-left first whatever the drag direction.
/// `None` when either side is below [`MIN_SELECTION_PX`].
pub fn selection_rect(start: Point, end: Point, device_scale: f64) -> Option<CaptureRect> {
    let width = (end.x - start.x).abs();
    let height = (end.y - start.y).abs();
    if width < MIN_SELECTION_PX || height < MIN_SELECTION_PX {
        return None;
    }

    Some(CaptureRect {
        x: start.x.min(end.x),
        y: start.y.min(end.y),
        width,
        height,
        device_scale,
    })
}

/// Source rectangle in physical pixels of the full frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// Scales `rect` by its device scale, flooring every coordinate, and
    /// clamps the result into a `frame_width × frame_height` image.
    pub fn compute(
        rect: &CaptureRect,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, CaptureError> {
        let scale = rect.device_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CaptureError::InvalidScale(scale));
        }
        if frame_width == 0 || frame_height == 0 {
            return Err(CaptureError::EmptyFrame);
        }

        // float → int casts saturate, so negatives land on 0
        let x = ((rect.x * scale).floor() as u32).min(frame_width - 1);
        let y = ((rect.y * scale).floor() as u32).min(frame_height - 1);
        let width = ((rect.width * scale).floor() as u32).max(1);
        let height = ((rect.height * scale).floor() as u32).max(1);

        Ok(Self {
            x,
            y,
            width: width.min(frame_width - x),
            height: height.min(frame_height - y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, width: f64, height: f64, device_scale: f64) -> CaptureRect {
        CaptureRect {
            x,
            y,
            width,
            height,
            device_scale,
        }
    }

    #[test]
    fn test_drag_direction_is_normalized() {
        let r = selection_rect(Point::new(120.0, 80.0), Point::new(20.0, 30.0), 1.0).unwrap();
        assert_eq!(r, rect(20.0, 30.0, 100.0, 50.0, 1.0));
    }

    #[test]
    fn test_small_drags_are_rejected() {
        assert!(selection_rect(Point::new(0.0, 0.0), Point::new(9.9, 200.0), 1.0).is_none());
        assert!(selection_rect(Point::new(0.0, 0.0), Point::new(200.0, 9.0), 2.0).is_none());
        assert!(selection_rect(Point::new(5.0, 5.0), Point::new(5.0, 5.0), 1.0).is_none());
        assert!(selection_rect(Point::new(0.0, 0.0), Point::new(10.0, 10.0), 1.0).is_some());
    }

    #[test]
    fn test_scale_floors_each_coordinate() {
        for (scale, expected) in [
            (1.0, CropBox { x: 10, y: 5, width: 20, height: 12 }),
            (1.25, CropBox { x: 12, y: 6, width: 25, height: 15 }),
            (1.5, CropBox { x: 15, y: 7, width: 31, height: 18 }),
            (2.0, CropBox { x: 20, y: 10, width: 41, height: 24 }),
        ] {
            let r = rect(10.3, 5.0, 20.7, 12.0, scale);
            assert_eq!(CropBox::compute(&r, 1000, 1000).unwrap(), expected, "scale {scale}");
        }
    }

    #[test]
    fn test_crop_is_clamped_to_frame() {
        let r = rect(90.0, 40.0, 50.0, 50.0, 1.0);
        assert_eq!(
            CropBox::compute(&r, 100, 50).unwrap(),
            CropBox { x: 90, y: 40, width: 10, height: 10 }
        );

        let r = rect(-5.0, -5.0, 0.2, 0.2, 1.0);
        assert_eq!(
            CropBox::compute(&r, 100, 50).unwrap(),
            CropBox { x: 0, y: 0, width: 1, height: 1 }
        );

        let r = rect(500.0, 500.0, 20.0, 20.0, 1.0);
        assert_eq!(
            CropBox::compute(&r, 100, 50).unwrap(),
            CropBox { x: 99, y: 49, width: 1, height: 1 }
        );
    }

    #[test]
    fn test_bad_scale_and_empty_frame() {
        let r = rect(0.0, 0.0, 20.0, 20.0, 0.0);
        assert!(matches!(
            CropBox::compute(&r, 10, 10),
            Err(CaptureError::InvalidScale(_))
        ));

        let r = rect(0.0, 0.0, 20.0, 20.0, 1.0);
        assert!(matches!(CropBox::compute(&r, 0, 10), Err(CaptureError::EmptyFrame)));
    }
}
