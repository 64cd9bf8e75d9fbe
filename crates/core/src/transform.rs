//! Geometric transform pipeline for rasterizing vector (and raster) input.
//!
//! The pipeline composes rotation, scaling, maximum-size clamping and
//! power-of-two clamping into one ordered [`TransformSequence`] while tracking
//! the canvas size the content occupies after each stage. Stages always run in
//! the order rotate → scale → clamp-to-max → clamp-to-power-of-two.

use crate::error::Result;
use crate::preset::keys;
use crate::settings::SettingsLookup;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rotations smaller than this (degrees) are ignored.
pub const MIN_ROTATION_DEGREES: f64 = 0.05;

/// Scale factors closer than this to 1 are ignored.
pub const MIN_SCALE_DELTA: f64 = 0.05;

/// Unit the canvas dimensions are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeUnit {
    #[default]
    Pixels,
    Percent,
}

/// Working width/height of the content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub unit: SizeUnit,
}

impl CanvasSize {
    /// A size in pixels.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            unit: SizeUnit::Pixels,
        }
    }

    pub fn with_unit(mut self, unit: SizeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Both dimensions are finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Longest edge.
    pub fn longest(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Swap width and height.
    pub fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
            unit: self.unit,
        }
    }

    /// Multiply both dimensions by `numerator / denominator`.
    ///
    /// The multiplication happens first so that the edge equal to
    /// `denominator` lands exactly on `numerator`.
    fn rescaled(self, numerator: f64, denominator: f64) -> Self {
        Self {
            width: self.width * numerator / denominator,
            height: self.height * numerator / denominator,
            unit: self.unit,
        }
    }
}

/// Primitive affine operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformOp {
    Translate { tx: f64, ty: f64 },
    /// Clockwise in y-down canvas coordinates.
    Rotate { degrees: f64 },
    /// Uniform scale about the origin.
    Scale { factor: f64 },
}

impl TransformOp {
    fn to_skia(self) -> tiny_skia::Transform {
        match self {
            TransformOp::Translate { tx, ty } => {
                tiny_skia::Transform::from_translate(tx as f32, ty as f32)
            }
            TransformOp::Rotate { degrees } => tiny_skia::Transform::from_rotate(degrees as f32),
            TransformOp::Scale { factor } => {
                tiny_skia::Transform::from_scale(factor as f32, factor as f32)
            }
        }
    }
}

/// Append-only list of operations, applied to the content in append order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformSequence {
    ops: Vec<TransformOp>,
}

impl TransformSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: TransformOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Compose the sequence into a single matrix.
    pub fn to_skia(&self) -> tiny_skia::Transform {
        self.ops
            .iter()
            .fold(tiny_skia::Transform::identity(), |acc, op| {
                acc.post_concat(op.to_skia())
            })
    }
}

/// Size of the axis-aligned box holding content of `size` rotated by `degrees`.
///
/// The angle is reduced to `[0°, 180°)` with a non-negative modulo, and
/// angles in the second quadrant swap width and height before the remainder
/// is applied. The result always contains the rotated content. The height is
/// computed from the already-rotated width, which overestimates it for
/// angles that are not multiples of 90°.
pub fn size_after_rotation(degrees: f64, size: CanvasSize) -> CanvasSize {
    let mut normalized = degrees.rem_euclid(180.0);
    let mut size = size;
    if normalized >= 90.0 {
        size = size.transposed();
        normalized -= 90.0;
    }

    let (sin, cos) = normalized.to_radians().sin_cos();
    let width = size.width * cos + size.height * sin;
    let height = width * sin + size.height * cos;
    CanvasSize {
        width,
        height,
        unit: size.unit,
    }
}

/// Power of two the clamp stage rescales `longest` to: `2^(floor(log2) - 1)`.
///
/// This is the power of two strictly below the one at or under `longest`,
/// not the nearest one.
pub fn power_of_two_below(longest: f64) -> f64 {
    let exponent = longest.log2().floor() as i32 - 1;
    2f64.powi(exponent)
}

/// Result of running the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub transform: TransformSequence,
    pub size: CanvasSize,
}

/// Accumulates transform operations and the resulting canvas size.
///
/// [`TransformPipeline::build`] runs the stages in their fixed order from a
/// preset's settings. The individual stage methods are public so callers can
/// drive them directly; each returns whether it changed anything.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    transform: TransformSequence,
    size: CanvasSize,
}

impl TransformPipeline {
    pub fn new(intrinsic: CanvasSize) -> Self {
        Self {
            transform: TransformSequence::new(),
            size: intrinsic,
        }
    }

    /// Run every stage configured by `settings` on the intrinsic size.
    pub fn build(intrinsic: CanvasSize, settings: &SettingsLookup<'_>) -> Result<PipelineOutput> {
        let mut pipeline = Self::new(intrinsic);

        if let Some(degrees) = settings.try_get::<f64>(keys::IMAGE_ROTATION)? {
            pipeline.rotate(degrees);
        }
        if let Some(factor) = settings.try_get::<f64>(keys::IMAGE_SCALE)? {
            pipeline.scale(factor);
        }
        if let Some(max_size) = settings.try_get::<i64>(keys::IMAGE_MAXIMUM_SIZE)? {
            pipeline.clamp_max_size(max_size);
        }
        if settings
            .try_get::<bool>(keys::IMAGE_CLAMP_SIZE_POWER_OF_2)?
            .unwrap_or(false)
        {
            pipeline.clamp_power_of_two();
        }

        Ok(pipeline.finish())
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn transform(&self) -> &TransformSequence {
        &self.transform
    }

    pub fn finish(self) -> PipelineOutput {
        PipelineOutput {
            transform: self.transform,
            size: self.size,
        }
    }

    /// Rotate about the content center and grow the canvas to the rotated box.
    pub fn rotate(&mut self, degrees: f64) -> bool {
        if !degrees.is_finite() || degrees.abs() < MIN_ROTATION_DEGREES {
            return false;
        }
        let rotated = size_after_rotation(degrees, self.size);
        if !rotated.is_positive() {
            debug!("Skipping rotation of {}°: degenerate canvas", degrees);
            return false;
        }

        debug!("Apply rotation: {}°", degrees);
        self.transform.push(TransformOp::Translate {
            tx: -self.size.width / 2.0,
            ty: -self.size.height / 2.0,
        });
        self.transform.push(TransformOp::Rotate { degrees });
        self.size = rotated;
        self.transform.push(TransformOp::Translate {
            tx: rotated.width / 2.0,
            ty: rotated.height / 2.0,
        });
        true
    }

    /// Scale by `factor`.
    pub fn scale(&mut self, factor: f64) -> bool {
        if !factor.is_finite() || (factor - 1.0).abs() < MIN_SCALE_DELTA {
            return false;
        }
        if !self.apply_scale(factor, 1.0) {
            debug!("Skipping scale factor {}: degenerate canvas", factor);
            return false;
        }
        debug!("Apply scale factor: {}%", factor * 100.0);
        true
    }

    /// Shrink so the longest edge is at most `max_size`.
    pub fn clamp_max_size(&mut self, max_size: i64) -> bool {
        let longest = self.size.longest();
        if max_size <= 0 || longest <= max_size as f64 {
            return false;
        }
        if !self.apply_scale(max_size as f64, longest) {
            return false;
        }
        debug!(
            "Clamp maximum size to {}x{} (by using scale factor: {})",
            self.size.width,
            self.size.height,
            max_size as f64 / longest
        );
        true
    }

    /// Shrink the longest edge to [`power_of_two_below`] it.
    pub fn clamp_power_of_two(&mut self) -> bool {
        let longest = self.size.longest();
        if longest <= 0.0 || !longest.is_finite() {
            return false;
        }
        let target = power_of_two_below(longest);
        if !self.apply_scale(target, longest) {
            return false;
        }
        debug!(
            "Clamp size to power of 2: {}x{} (by using scale factor: {})",
            self.size.width,
            self.size.height,
            target / longest
        );
        true
    }

    /// Append `scale(numerator / denominator)` unless it would leave a
    /// non-positive canvas.
    fn apply_scale(&mut self, numerator: f64, denominator: f64) -> bool {
        let scaled = self.size.rescaled(numerator, denominator);
        if !scaled.is_positive() {
            return false;
        }
        self.transform.push(TransformOp::Scale {
            factor: numerator / denominator,
        });
        self.size = scaled;
        true
    }
}
