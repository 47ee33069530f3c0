//! Alpha masks: read-only views over the alpha channel of a raster.
//!
//! An [`AlphaMask`] borrows pixel memory owned by the caller and exposes
//! a rectangular sub-region of it. Sprite sheets are addressed through
//! [`SpriteSheet`], which maps a row-major sprite index to the frame
//! rectangle that [`AlphaMask::frame`] views.
//!
//! Nothing here copies pixel data: every region is a window onto the
//! original buffer.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Point};

/// A read-only alpha view over a rectangular region of a raster.
#[derive(Debug, Clone, Copy)]
pub struct AlphaMask<'a> {
    data: &'a [u8],
    /// Bytes per row of the backing raster.
    stride: usize,
    /// Bytes per pixel of the backing raster.
    pixel_bytes: usize,
    /// Offset of the alpha byte within a pixel.
    alpha_offset: usize,
    origin_x: u32,
    origin_y: u32,
    width: u32,
    height: u32,
}

impl<'a> AlphaMask<'a> {
    /// View a tightly packed single-channel alpha buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRegion`] if either dimension is
    /// zero, or [`PipelineError::InvalidMask`] if `alpha.len()` is not
    /// `width * height`.
    pub fn from_alpha(alpha: &'a [u8], width: u32, height: u32) -> Result<Self, PipelineError> {
        Self::with_layout(alpha, width, height, 1, 0)
    }

    /// View the alpha channel of an RGBA image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRegion`] if the image has zero area.
    pub fn from_rgba(image: &'a RgbaImage) -> Result<Self, PipelineError> {
        Self::with_layout(image.as_raw(), image.width(), image.height(), 4, 3)
    }

    fn with_layout(
        data: &'a [u8],
        width: u32,
        height: u32,
        pixel_bytes: usize,
        alpha_offset: usize,
    ) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyRegion { width, height });
        }
        let stride = width as usize * pixel_bytes;
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(PipelineError::InvalidMask(format!(
                "buffer holds {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            stride,
            pixel_bytes,
            alpha_offset,
            origin_x: 0,
            origin_y: 0,
            width,
            height,
        })
    }

    /// A sub-view of this mask. Coordinates are relative to this view.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRegion`] for a zero-area region and
    /// [`PipelineError::InvalidMask`] if the region extends past this
    /// view.
    pub fn region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyRegion { width, height });
        }
        let fits_x = x.checked_add(width).is_some_and(|right| right <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|bottom| bottom <= self.height);
        if !fits_x || !fits_y {
            return Err(PipelineError::InvalidMask(format!(
                "region {width}x{height} at ({x}, {y}) exceeds {}x{} mask",
                self.width, self.height
            )));
        }
        Ok(Self {
            origin_x: self.origin_x + x,
            origin_y: self.origin_y + y,
            width,
            height,
            ..*self
        })
    }

    /// The sub-view holding sprite `index` of `sheet`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FrameOutOfRange`] if the index is past
    /// the end of the sheet, or the errors of [`region`](Self::region)
    /// if the sheet does not fit this mask.
    pub fn frame(&self, sheet: &SpriteSheet, index: usize) -> Result<Self, PipelineError> {
        let (x, y) = sheet.frame_origin(index)?;
        self.region(x, y, sheet.frame_width, sheet.frame_height)
    }

    /// Width of the view in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the view in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions of the view.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Number of pixels in the view.
    #[must_use]
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Alpha at `(x, y)` relative to the view. Outside the view reads as
    /// fully transparent.
    #[must_use]
    pub fn alpha(&self, x: i64, y: i64) -> u8 {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return 0;
        };
        if x >= self.width || y >= self.height {
            return 0;
        }
        let row = (self.origin_y + y) as usize * self.stride;
        let col = (self.origin_x + x) as usize * self.pixel_bytes;
        self.data
            .get(row + col + self.alpha_offset)
            .copied()
            .unwrap_or(0)
    }

    /// Whether `(x, y)` lies inside the view and meets the alpha
    /// threshold. Outside the view is never solid, even at threshold 0.
    #[must_use]
    pub fn is_solid(&self, x: i64, y: i64, threshold: u8) -> bool {
        self.contains(x, y) && self.alpha(x, y) >= threshold
    }

    /// Whether `(x, y)` lies inside the view.
    #[must_use]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        u32::try_from(x).is_ok_and(|x| x < self.width)
            && u32::try_from(y).is_ok_and(|y| y < self.height)
    }

    /// Every solid pixel in row-major order.
    pub fn solid_pixels(&self, threshold: u8) -> impl Iterator<Item = Point> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .filter(move |&x| self.is_solid(i64::from(x), i64::from(y), threshold))
                .map(move |x| Point::new(f64::from(x), f64::from(y)))
        })
    }
}

/// A uniform grid of equally sized sprite frames.
///
/// Frames are numbered row-major from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSheet {
    /// Width of one frame in pixels.
    pub frame_width: u32,
    /// Height of one frame in pixels.
    pub frame_height: u32,
    /// Frames per row.
    pub columns: u32,
    /// Rows of frames.
    pub rows: u32,
}

impl SpriteSheet {
    /// Lay out the largest grid of `frame_width × frame_height` frames
    /// that fits a `width × height` raster. Partial frames on the right
    /// and bottom edges are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRegion`] if a frame dimension is
    /// zero or no whole frame fits.
    pub fn from_raster(
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, PipelineError> {
        if frame_width == 0 || frame_height == 0 {
            return Err(PipelineError::EmptyRegion {
                width: frame_width,
                height: frame_height,
            });
        }
        let columns = width / frame_width;
        let rows = height / frame_height;
        if columns == 0 || rows == 0 {
            return Err(PipelineError::EmptyRegion {
                width: columns * frame_width,
                height: rows * frame_height,
            });
        }
        Ok(Self {
            frame_width,
            frame_height,
            columns,
            rows,
        })
    }

    /// Total number of frames.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Top-left pixel of frame `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FrameOutOfRange`] if `index` is past the
    /// last frame.
    pub fn frame_origin(&self, index: usize) -> Result<(u32, u32), PipelineError> {
        let frame_count = self.frame_count();
        if index >= frame_count {
            return Err(PipelineError::FrameOutOfRange { index, frame_count });
        }
        let columns = self.columns as usize;
        let (col, row) = (index % columns, index / columns);
        // Both fit in u32: they are bounded by `columns` and `rows`.
        #[allow(clippy::cast_possible_truncation)]
        Ok((
            col as u32 * self.frame_width,
            row as u32 * self.frame_height,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Vec<u8> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| if (x + y) % 2 == 0 { 255 } else { 0 }))
            .collect()
    }

    #[test]
    fn from_alpha_rejects_zero_area() {
        let result = AlphaMask::from_alpha(&[], 0, 5);
        assert!(matches!(
            result,
            Err(PipelineError::EmptyRegion {
                width: 0,
                height: 5
            })
        ));
    }

    #[test]
    fn from_alpha_rejects_wrong_length() {
        let data = vec![0; 10];
        let result = AlphaMask::from_alpha(&data, 4, 4);
        assert!(matches!(result, Err(PipelineError::InvalidMask(_))));
    }

    #[test]
    fn alpha_reads_pixels_and_clamps_outside() {
        let data = checker(3, 3);
        let mask = AlphaMask::from_alpha(&data, 3, 3).unwrap();
        assert_eq!(mask.alpha(0, 0), 255);
        assert_eq!(mask.alpha(1, 0), 0);
        assert_eq!(mask.alpha(-1, 0), 0);
        assert_eq!(mask.alpha(3, 0), 0);
        assert_eq!(mask.alpha(0, 3), 0);
        assert!(mask.is_solid(2, 2, 128));
        assert!(!mask.is_solid(2, 1, 128));
    }

    #[test]
    fn rgba_mask_reads_alpha_channel() {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 255, 255, 10])
            } else {
                image::Rgba([0, 0, 0, 200])
            }
        });
        let mask = AlphaMask::from_rgba(&image).unwrap();
        assert_eq!(mask.alpha(0, 0), 10);
        assert_eq!(mask.alpha(1, 0), 200);
    }

    #[test]
    fn region_offsets_into_parent() {
        let data: Vec<u8> = (0..16).collect();
        let mask = AlphaMask::from_alpha(&data, 4, 4).unwrap();
        let sub = mask.region(1, 2, 2, 2).unwrap();
        assert_eq!(sub.dimensions(), Dimensions { width: 2, height: 2 });
        assert_eq!(sub.alpha(0, 0), 9);
        assert_eq!(sub.alpha(1, 1), 14);
        // Outside the sub-view reads transparent even though the parent has data.
        assert_eq!(sub.alpha(2, 0), 0);

        let nested = sub.region(1, 1, 1, 1).unwrap();
        assert_eq!(nested.alpha(0, 0), 14);
    }

    #[test]
    fn region_rejects_out_of_bounds_and_empty() {
        let data = vec![0; 16];
        let mask = AlphaMask::from_alpha(&data, 4, 4).unwrap();
        assert!(matches!(
            mask.region(3, 3, 2, 1),
            Err(PipelineError::InvalidMask(_))
        ));
        assert!(matches!(
            mask.region(0, 0, 0, 1),
            Err(PipelineError::EmptyRegion { .. })
        ));
        assert!(mask.region(u32::MAX, 0, 2, 1).is_err());
    }

    #[test]
    fn solid_pixels_in_row_major_order() {
        let data = [0, 255, 255, 0];
        let mask = AlphaMask::from_alpha(&data, 2, 2).unwrap();
        let solid: Vec<Point> = mask.solid_pixels(128).collect();
        assert_eq!(solid, vec![Point::new(1.0, 0.0), Point::new(0.0, 1.0)]);
    }

    #[test]
    fn sheet_layout_ignores_partial_frames() {
        let sheet = SpriteSheet::from_raster(70, 33, 16, 16).unwrap();
        assert_eq!(sheet.columns, 4);
        assert_eq!(sheet.rows, 2);
        assert_eq!(sheet.frame_count(), 8);
        assert_eq!(sheet.frame_origin(0).unwrap(), (0, 0));
        assert_eq!(sheet.frame_origin(5).unwrap(), (16, 16));
        assert!(matches!(
            sheet.frame_origin(8),
            Err(PipelineError::FrameOutOfRange {
                index: 8,
                frame_count: 8
            })
        ));
    }

    #[test]
    fn sheet_rejects_oversized_frames() {
        assert!(SpriteSheet::from_raster(10, 10, 16, 16).is_err());
        assert!(SpriteSheet::from_raster(10, 10, 0, 5).is_err());
    }

    #[test]
    fn frame_views_sprite() {
        // 4x2 raster, two 2x2 frames; the second frame is fully opaque.
        let data = [0, 0, 255, 255, 0, 0, 255, 255];
        let mask = AlphaMask::from_alpha(&data, 4, 2).unwrap();
        let sheet = SpriteSheet::from_raster(4, 2, 2, 2).unwrap();
        let first = mask.frame(&sheet, 0).unwrap();
        let second = mask.frame(&sheet, 1).unwrap();
        assert_eq!(first.solid_pixels(1).count(), 0);
        assert_eq!(second.solid_pixels(1).count(), 4);
        assert!(mask.frame(&sheet, 2).is_err());
    }

    #[test]
    fn outside_the_view_is_never_solid() {
        let data = [255u8; 16];
        let raster = AlphaMask::from_alpha(&data, 4, 4).unwrap();
        let view = raster.region(1, 1, 2, 2).unwrap();
        for threshold in [0, 128] {
            assert!(view.is_solid(0, 0, threshold));
            assert!(!view.is_solid(-1, 0, threshold));
            assert!(!view.is_solid(2, 1, threshold));
            assert!(!view.is_solid(0, 2, threshold));
        }
        assert_eq!(view.solid_pixels(0).count(), 4);
    }
}
