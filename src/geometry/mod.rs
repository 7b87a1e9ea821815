//! Pure geometry for 16:9 normalization
//!
//! Aspect classification, fit/cover scale factors and centering offsets. Nothing in
//! here touches the filesystem; every function is total over positive dimensions and
//! rejects zero dimensions with [`Error::InvalidDimensions`].

use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Widescreen target ratio.
pub const WIDESCREEN_RATIO: f64 = 16.0 / 9.0;

/// Maximum distance of `width / height` from 16:9 still counted as widescreen.
pub const WIDESCREEN_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectClass {
    Vertical9x16,
    Horizontal16x9,
    Other,
}

impl AspectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vertical9x16 => "9:16",
            Self::Horizontal16x9 => "16:9",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the size unchanged, or `InvalidDimensions` if either side is zero.
    pub fn validated(self) -> Result<Self> {
        check_dimensions(self.width, self.height)?;
        Ok(self)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Top-left placement of an inner rectangle inside an outer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width as i64, height as i64));
    }
    Ok(())
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Classifies a frame as vertical 9:16, horizontal 16:9 or anything else.
///
/// Vertical frames must be taller than wide with `height / width` equal to 16/9 once
/// both are rounded to one decimal (1.8). Horizontal frames must be within
/// [`WIDESCREEN_TOLERANCE`] of 16/9.
pub fn classify_aspect(width: u32, height: u32) -> Result<AspectClass> {
    check_dimensions(width, height)?;

    let (w, h) = (width as f64, height as f64);
    if height > width && round_to_tenth(h / w) == round_to_tenth(WIDESCREEN_RATIO) {
        return Ok(AspectClass::Vertical9x16);
    }
    if (w / h - WIDESCREEN_RATIO).abs() < WIDESCREEN_TOLERANCE {
        return Ok(AspectClass::Horizontal16x9);
    }
    Ok(AspectClass::Other)
}

/// Largest factor that keeps the whole source inside the target.
pub fn scale_to_fit(source: Size, target: Size) -> Result<f64> {
    let (source, target) = (source.validated()?, target.validated()?);
    let sx = target.width as f64 / source.width as f64;
    let sy = target.height as f64 / source.height as f64;
    Ok(sx.min(sy))
}

/// Smallest factor that makes the source cover the whole target.
pub fn scale_to_cover(source: Size, target: Size) -> Result<f64> {
    let (source, target) = (source.validated()?, target.validated()?);
    let sx = target.width as f64 / source.width as f64;
    let sy = target.height as f64 / source.height as f64;
    Ok(sx.max(sy))
}

/// Pixel size of `source` after fit-scaling into `target`.
///
/// The limiting axis is pinned to the target exactly and the other axis is floored,
/// computed in integers so float error never yields a result one pixel short.
pub fn fit_size(source: Size, target: Size) -> Result<Size> {
    let (source, target) = (source.validated()?, target.validated()?);
    let (sw, sh) = (source.width as u64, source.height as u64);
    let (tw, th) = (target.width as u64, target.height as u64);

    // tw/sw <= th/sh  <=>  tw*sh <= th*sw
    let size = if tw * sh <= th * sw {
        Size::new(target.width, ((sh * tw) / sw).max(1) as u32)
    } else {
        Size::new(((sw * th) / sh).max(1) as u32, target.height)
    };
    Ok(size)
}

/// Region of `source` that ends up on `target` after cover-scaling and center
/// cropping. Cropping this region and resizing it to `target` gives the same picture
/// as scaling first, without ever materializing the oversized intermediate.
pub fn cover_region(source: Size, target: Size) -> Result<(Offset, Size)> {
    let scale = scale_to_cover(source, target)?;
    let width = (target.width as f64 / scale).round().clamp(1.0, source.width as f64) as u32;
    let height = (target.height as f64 / scale)
        .round()
        .clamp(1.0, source.height as f64) as u32;
    let region = Size::new(width, height);
    Ok((center_offset(source, region)?, region))
}

/// Offset that centers `inner` inside `outer`, flooring odd margins toward top/left.
pub fn center_offset(outer: Size, inner: Size) -> Result<Offset> {
    let (outer, inner) = (outer.validated()?, inner.validated()?);
    if inner.width > outer.width || inner.height > outer.height {
        return Err(Error::invalid_dimensions(
            inner.width as i64,
            inner.height as i64,
        ));
    }
    Ok(Offset {
        x: (outer.width - inner.width) / 2,
        y: (outer.height - inner.height) / 2,
    })
}

/// Display-oriented size for a frame carrying rotation metadata.
pub fn oriented_size(size: Size, rotation_degrees: i32) -> Size {
    match rotation_degrees.rem_euclid(360) {
        90 | 270 => Size::new(size.height, size.width),
        _ => size,
    }
}
