//! Image ingestion: decoding uploaded bytes into floating point RGB arrays,
//! and fast preview-quality decimation.

use std::io::{Cursor, Seek, SeekFrom};
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Pixel, Rgb32FImage};
use thiserror::Error;

/// RGB image with one `f32` per channel, in the `[0, 1]` range for
/// integer sources and unbounded for high-dynamic-range ones.
pub type FloatImage = Rgb32FImage;

/// File extensions accepted by [`read_image_from_bytes`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".tif", ".tiff", ".webp", ".hdr", ".exr", ".ico", ".tga",
    ".targa", ".dds", ".bmp",
];

/// Extensions routed through the high-dynamic-range decode path.
const HDR_EXTENSIONS: &[&str] = &[".exr", ".hdr"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image extension '{extension}' for {name}")]
    UnsupportedExtension { name: String, extension: String },
    #[error("Can't decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An in-memory, seekable byte buffer that remembers the name of the file it
/// came from. The name's extension drives codec selection.
#[derive(Debug, Clone)]
pub struct NamedBytes {
    pub name: String,
    cursor: Cursor<Vec<u8>>,
}

impl NamedBytes {
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            cursor: Cursor::new(bytes),
        }
    }

    /// Read a whole file into memory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    /// Lowercase extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    fn rewind(&mut self) -> std::io::Result<&[u8]> {
        self.cursor.seek(SeekFrom::Start(0))?;
        Ok(self.cursor.get_ref().as_slice())
    }
}

/// Decode the given buffer into an RGB floating point image.
///
/// `.exr` and `.hdr` payloads keep their full dynamic range. Every other
/// supported format goes through the general raster codecs. Grayscale images
/// are broadcast to three channels, alpha is dropped, and integer samples are
/// scaled by their bit depth (an 8-bit 255 becomes 1.0).
///
/// No dimension check happens here; size limits are the caller's policy.
pub fn read_image_from_bytes(source: &mut NamedBytes) -> Result<FloatImage, ImageError> {
    let extension = source.extension();
    let name = source.name.clone();
    log::debug!("initial buffer size {:.3}MB", source.len() as f64 / 1024f64.powi(2));

    let is_hdr = HDR_EXTENSIONS.contains(&extension.as_str());
    if !is_hdr && !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImageError::UnsupportedExtension { name, extension });
    }

    let bytes = source.rewind()?;
    let decoded = if is_hdr {
        decode_high_dynamic_range(bytes, &extension)
    } else {
        decode_raster(bytes, &extension)
    };
    let decoded = decoded.map_err(|source| ImageError::Decode {
        name: name.clone(),
        source,
    })?;

    log::debug!(
        "decoded {} as {:?} {}x{}",
        name,
        decoded.color(),
        decoded.width(),
        decoded.height()
    );

    let image = to_float_rgb(decoded);
    log::debug!(
        "float32 image size {:.3}MB",
        (image.len() * std::mem::size_of::<f32>()) as f64 / 1024f64.powi(2)
    );
    Ok(image)
}

fn decode_high_dynamic_range(bytes: &[u8], extension: &str) -> image::ImageResult<DynamicImage> {
    let format = if extension == ".exr" {
        ImageFormat::OpenExr
    } else {
        ImageFormat::Hdr
    };
    // these codecs hand back channels in R, G, B order already
    image::load_from_memory_with_format(bytes, format)
}

fn decode_raster(bytes: &[u8], extension: &str) -> image::ImageResult<DynamicImage> {
    let format = match extension {
        ".targa" => Some(ImageFormat::Tga),
        other => ImageFormat::from_extension(other.trim_start_matches('.')),
    };
    match format {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
}

/// Normalize any decoded image to 3-channel `f32`.
fn to_float_rgb(image: DynamicImage) -> FloatImage {
    match image {
        DynamicImage::ImageRgb32F(buffer) => buffer,
        other => {
            if other.color().channel_count() > 3 {
                log::debug!("dropping alpha channel");
            }
            other.to_rgb32f()
        }
    }
}

/// Keep every `stride_x`-th column and every `stride_y`-th row.
pub fn decimate<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    stride_x: u32,
    stride_y: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
{
    let stride_x = stride_x.max(1);
    let stride_y = stride_y.max(1);
    let width = image.width().div_ceil(stride_x);
    let height = image.height().div_ceil(stride_y);
    ImageBuffer::from_fn(width, height, |x, y| *image.get_pixel(x * stride_x, y * stride_y))
}

/// Rescale the image to roughly `target_width` pixels wide, keeping its
/// aspect ratio, by integer striding. Low quality but fast: meant for previews.
///
/// Requesting a width larger than or equal to the source returns an unchanged
/// copy; the image is never upsampled.
pub fn rescale_image_fast<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    target_width: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
{
    let source_width = image.width();
    let source_height = image.height();
    let target_width = target_width.max(1);

    if target_width >= source_width || source_height == 0 {
        return image.clone();
    }

    let width_ratio = (source_width / target_width).max(1);
    let target_height =
        ((source_height as f64 * target_width as f64 / source_width as f64) as u32).max(1);
    let height_ratio = (source_height / target_height).max(1);

    decimate(image, width_ratio, height_ratio)
}
