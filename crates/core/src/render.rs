//! Rasterization and encoding helpers shared by the image strategies.
//!
//! - SVG documents are parsed with usvg and rendered with resvg
//! - Decoded rasters are redrawn through a [`TransformSequence`] with tiny-skia
//! - PNG is written with the `png` crate, every other format with `image`

use crate::category::extension_of;
use crate::config::RenderConfig;
use crate::error::{ConversionError, Result};
use crate::preset::OutputType;
use crate::transform::{CanvasSize, SizeUnit, TransformSequence};
use image::{DynamicImage, ImageEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};
use resvg::usvg;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whole-pixel output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    /// Round a canvas size to pixels, at least 1x1.
    ///
    /// Returns `None` for relative or non-positive sizes and for sizes with
    /// an edge above `max_edge`.
    pub fn from_canvas(size: CanvasSize, max_edge: u32) -> Option<Self> {
        Self::fit(size, max_edge, Path::new("")).ok()
    }

    /// Like [`PixelSize::from_canvas`], with an error saying why `size`
    /// cannot be rendered to `path`.
    pub fn fit(size: CanvasSize, max_edge: u32, path: &Path) -> Result<Self> {
        let failure = |message: String| ConversionError::EncodeFailure {
            path: path.to_path_buf(),
            message,
        };
        if size.unit != SizeUnit::Pixels {
            return Err(failure(format!("cannot rasterize a size in {:?}", size.unit)));
        }
        if !size.is_positive() {
            return Err(failure(format!(
                "cannot render an empty {}x{} canvas",
                size.width, size.height
            )));
        }
        let round = |v: f64| v.round().max(1.0);
        let (width, height) = (round(size.width), round(size.height));
        if width > max_edge as f64 || height > max_edge as f64 {
            return Err(failure(format!(
                "a {}x{} canvas exceeds the configured maximum edge of {} pixels",
                width, height, max_edge
            )));
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }
}

/// A parsed SVG document.
pub struct SvgDocument {
    path: PathBuf,
    tree: usvg::Tree,
}

impl std::fmt::Debug for SvgDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgDocument")
            .field("path", &self.path)
            .field("size", &self.size())
            .finish()
    }
}

impl SvgDocument {
    /// Read and parse an SVG file.
    pub fn open(path: &Path) -> Result<Self> {
        let open_failure = |message: String| ConversionError::DocumentOpenFailure {
            path: path.to_path_buf(),
            message,
        };

        let data = std::fs::read(path).map_err(|e| open_failure(e.to_string()))?;
        let mut options = usvg::Options::default();
        options.resources_dir = path.parent().map(Path::to_path_buf);
        options.fontdb_mut().load_system_fonts();
        let tree = usvg::Tree::from_data(&data, &options).map_err(|e| open_failure(e.to_string()))?;

        let document = Self {
            path: path.to_path_buf(),
            tree,
        };
        if !document.size().is_positive() {
            return Err(open_failure("SVG has empty dimensions".to_string()));
        }
        Ok(document)
    }

    /// Intrinsic size in pixels.
    pub fn size(&self) -> CanvasSize {
        let size = self.tree.size();
        CanvasSize::new(size.width() as f64, size.height() as f64)
    }

    /// Render through `transform` onto a transparent canvas of `size`.
    pub fn render(&self, transform: &TransformSequence, size: PixelSize) -> Result<RgbaImage> {
        let mut pixmap = new_pixmap(size, &self.path)?;
        resvg::render(&self.tree, transform.to_skia(), &mut pixmap.as_mut());
        Ok(pixmap_to_image(&pixmap))
    }
}

/// Draw a raster through `transform` onto a transparent canvas of `size`.
pub fn draw_raster(
    image: &RgbaImage,
    transform: &TransformSequence,
    size: PixelSize,
) -> Result<RgbaImage> {
    let source_size = tiny_skia::IntSize::from_wh(image.width(), image.height()).ok_or_else(|| {
        ConversionError::EncodeFailure {
            path: PathBuf::new(),
            message: "source image is empty".to_string(),
        }
    })?;

    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let color = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    let source = tiny_skia::Pixmap::from_vec(data, source_size).ok_or_else(|| {
        ConversionError::EncodeFailure {
            path: PathBuf::new(),
            message: "cannot wrap source image".to_string(),
        }
    })?;

    let mut target = new_pixmap(size, Path::new(""))?;
    let paint = tiny_skia::PixmapPaint {
        quality: tiny_skia::FilterQuality::Bicubic,
        ..Default::default()
    };
    target.draw_pixmap(0, 0, source.as_ref(), &paint, transform.to_skia(), None);
    Ok(pixmap_to_image(&target))
}

/// Decode a raster file, or render an SVG file at its intrinsic size.
///
/// SVG canvases with an edge above `max_edge` are refused.
pub fn load_image(path: &Path, max_edge: u32) -> Result<RgbaImage> {
    if extension_of(path) == "svg" {
        let document = SvgDocument::open(path)?;
        let size = PixelSize::fit(document.size(), max_edge, path)?;
        return document.render(&TransformSequence::new(), size);
    }

    let image = image::open(path).map_err(|e| ConversionError::DocumentOpenFailure {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(
        "Decoded {:?} ({}x{})",
        path.file_name(),
        image.width(),
        image.height()
    );
    Ok(image.into_rgba8())
}

/// Encoder settings for one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// PNG compression level, 0-9.
    pub png_compression: u8,
    /// Lossy quality, 1-100.
    pub quality: u8,
    /// Color transparent pixels are blended onto for formats without alpha.
    pub background: (u8, u8, u8),
}

impl EncodeOptions {
    pub fn from_config(config: &RenderConfig, quality: Option<u32>) -> Self {
        Self {
            png_compression: config.png_compression,
            quality: quality
                .map(|q| q.clamp(1, 100) as u8)
                .unwrap_or(config.default_quality),
            background: config.background_color,
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default(), None)
    }
}

/// Encode `image` as `output` and write it to `path`.
pub fn write_image(
    image: &RgbaImage,
    output: OutputType,
    path: &Path,
    options: &EncodeOptions,
) -> Result<()> {
    let encode_failure = |message: String| ConversionError::EncodeFailure {
        path: path.to_path_buf(),
        message,
    };

    let data = encode_image(image, output, options).map_err(encode_failure)?;
    std::fs::write(path, &data).map_err(|e| encode_failure(e.to_string()))?;
    debug!(
        "Wrote {} ({}x{}, {} bytes)",
        path.display(),
        image.width(),
        image.height(),
        data.len()
    );
    Ok(())
}

/// Encode `image` in the format of `output`.
pub fn encode_image(
    image: &RgbaImage,
    output: OutputType,
    options: &EncodeOptions,
) -> std::result::Result<Vec<u8>, String> {
    let format = match output {
        OutputType::Png => return encode_png(image, options.png_compression),
        OutputType::Jpg => {
            let flattened = flatten(image, options.background);
            let mut buffer = Vec::new();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, options.quality)
                .write_image(
                    flattened.as_raw(),
                    flattened.width(),
                    flattened.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| e.to_string())?;
            return Ok(buffer);
        }
        OutputType::Webp => ImageFormat::WebP,
        OutputType::Bmp => ImageFormat::Bmp,
        OutputType::Tiff => ImageFormat::Tiff,
        OutputType::Ico => ImageFormat::Ico,
        OutputType::Gif => ImageFormat::Gif,
        other => return Err(format!("{} is not an image format", other)),
    };

    let dynamic = if output.supports_alpha() {
        DynamicImage::ImageRgba8(image.clone())
    } else {
        DynamicImage::ImageRgb8(flatten(image, options.background))
    };
    let mut buffer = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut buffer, format)
        .map_err(|e| e.to_string())?;
    Ok(buffer.into_inner())
}

/// Encode RGBA pixels as PNG with the `png` crate.
fn encode_png(image: &RgbaImage, level: u8) -> std::result::Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());

    let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(match level {
        0..=3 => png::Compression::Fast,
        4..=6 => png::Compression::Default,
        _ => png::Compression::Best,
    });

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("Failed to write PNG header: {}", e))?;
    writer
        .write_image_data(image.as_raw())
        .map_err(|e| format!("Failed to write PNG data: {}", e))?;
    drop(writer);

    Ok(buffer.into_inner())
}

/// Blend transparent pixels onto an opaque background.
pub fn flatten(image: &RgbaImage, background: (u8, u8, u8)) -> RgbImage {
    let (r, g, b) = background;
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y);
        let alpha = pixel[3] as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let blend = |c: u8, bg: u8| ((c as f32 * alpha) + (bg as f32 * inv_alpha)).round() as u8;
        Rgb([blend(pixel[0], r), blend(pixel[1], g), blend(pixel[2], b)])
    })
}

fn new_pixmap(size: PixelSize, path: &Path) -> Result<tiny_skia::Pixmap> {
    tiny_skia::Pixmap::new(size.width, size.height).ok_or_else(|| {
        ConversionError::EncodeFailure {
            path: path.to_path_buf(),
            message: format!("cannot allocate a {}x{} canvas", size.width, size.height),
        }
    })
}

/// Demultiply a tiny-skia pixmap into straight RGBA.
fn pixmap_to_image(pixmap: &tiny_skia::Pixmap) -> RgbaImage {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}
