//! Image normalisation: arbitrary image bytes → size-capped, re-encoded image.
//!
//! Vision backends impose a ceiling on input size (for Claude, images whose
//! longest edge exceeds 1568 px are downscaled server-side). Resizing locally
//! first keeps uploads small and makes the image the model sees identical to
//! the one we logged.
//!
//! Rules:
//! - longest edge ≤ `max_edge` → dimensions unchanged (still re-encoded)
//! - longest edge > `max_edge` → longest edge becomes exactly `max_edge`,
//!   the other edge is scaled and rounded to the nearest pixel
//! - never upscale
//!
//! Resampling uses Lanczos3.

use crate::config::ImageEncoding;
use crate::error::BuildPlanError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// An encoded image whose longest edge respects the backend ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Encoded image payload.
    pub bytes: Vec<u8>,
    /// Format of `bytes`.
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl NormalizedImage {
    pub fn mime_type(&self) -> &'static str {
        self.encoding.mime_type()
    }

    pub fn was_resized(&self) -> bool {
        (self.width, self.height) != (self.original_width, self.original_height)
    }

    /// Base64 of the encoded payload, as multimodal APIs expect it.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Compute output dimensions for an image of `width`×`height`.
///
/// Pure arithmetic so the resize rule can be tested without pixels.
pub fn target_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    let longer = width.max(height);
    if longer <= max_edge {
        return (width, height);
    }

    // Round-half-up integer scaling of the shorter edge; never collapse to 0.
    let scale = |short: u32| -> u32 {
        let scaled = (u64::from(short) * u64::from(max_edge) + u64::from(longer) / 2)
            / u64::from(longer);
        scaled.max(1) as u32
    };

    if width >= height {
        (max_edge, scale(height))
    } else {
        (scale(width), max_edge)
    }
}

/// Decode `raw`, cap its longest edge at `max_edge`, and re-encode.
///
/// CPU-bound; the orchestrator runs it on the blocking pool.
pub fn normalize(
    raw: &[u8],
    max_edge: u32,
    encoding: ImageEncoding,
) -> Result<NormalizedImage, BuildPlanError> {
    let img = image::load_from_memory(raw).map_err(|e| BuildPlanError::Decode {
        detail: e.to_string(),
    })?;
    normalize_image(img, max_edge, encoding)
}

/// Same as [`normalize`] for an already-decoded image.
pub fn normalize_image(
    img: DynamicImage,
    max_edge: u32,
    encoding: ImageEncoding,
) -> Result<NormalizedImage, BuildPlanError> {
    let (original_width, original_height) = (img.width(), img.height());
    let (width, height) = target_dimensions(original_width, original_height, max_edge);

    let img = if (width, height) == (original_width, original_height) {
        img
    } else {
        debug!(
            "Resizing {}x{} → {}x{} (max edge {})",
            original_width, original_height, width, height, max_edge
        );
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    let bytes = encode(&img, encoding)?;
    debug!("Encoded normalised image → {} bytes {}", bytes.len(), encoding);

    Ok(NormalizedImage {
        bytes,
        encoding,
        width,
        height,
        original_width,
        original_height,
    })
}

fn encode(img: &DynamicImage, encoding: ImageEncoding) -> Result<Vec<u8>, BuildPlanError> {
    let mut buf = Vec::new();
    let result = match encoding {
        ImageEncoding::Png => img.write_to(&mut Cursor::new(&mut buf), encoding.image_format()),
        // The JPEG encoder has no alpha channel.
        ImageEncoding::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut Cursor::new(&mut buf), encoding.image_format()),
    };
    result.map_err(|e| BuildPlanError::Encode {
        format: encoding.to_string(),
        detail: e.to_string(),
    })?;
    Ok(buf)
}
