//! SeeImageTool — read an image file, normalize it, and return base64 for
//! model consumption.

use async_trait::async_trait;
use base64::Engine as _;
use deskhand_core::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::{expand_path, Tool, ToolContext, ToolSchema};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub struct SeeImageTool;

#[async_trait]
impl Tool for SeeImageTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "see_image",
            description: "Read an image file and return its base64-encoded bytes for visual inspection. Supported formats: JPG, PNG, GIF, WEBP. Maximum size: 10MB. Large images are downscaled to fit 1920x1080.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the image, absolute or relative to the workspace"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let path = params
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: file_path".to_string()))?;
        let ext = extension(path);
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::Validation(format!(
                "Unsupported image format '{}'. Supported: JPG, PNG, GIF, WEBP",
                ext
            )));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let path_str = params["file_path"].as_str().unwrap_or("");
        let path = expand_path(path_str, &ctx.workspace);

        if !path.exists() {
            return Err(Error::NotFound(format!("Image not found: {}", path.display())));
        }
        let size = tokio::fs::metadata(&path).await?.len();
        if size > ctx.config.vision.max_image_bytes {
            return Err(Error::Tool(format!(
                "Image is {} bytes; over the {} byte limit",
                size, ctx.config.vision.max_image_bytes
            )));
        }

        let ext = extension(&path.to_string_lossy());
        let bytes = tokio::fs::read(&path).await?;
        let max_w = ctx.config.vision.max_width;
        let max_h = ctx.config.vision.max_height;
        let quality = ctx.config.vision.jpeg_quality;

        // Decode/resize/encode is CPU work; keep it off the async runtime.
        let (mime, encoded) = tokio::task::spawn_blocking(move || {
            process_image(&bytes, &ext, max_w, max_h, quality)
        })
        .await
        .map_err(|e| Error::Tool(format!("Image task failed: {}", e)))??;

        debug!(path = %path.display(), mime = %mime, "image ingested");
        Ok(json!({
            "mime_type": mime,
            "base64": base64::engine::general_purpose::STANDARD.encode(&encoded)
        }))
    }
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Decode, flatten alpha onto white, downscale to fit the configured bounds,
/// and re-encode (JPEG for jpg sources, PNG otherwise).
fn process_image(
    bytes: &[u8],
    ext: &str,
    max_width: u32,
    max_height: u32,
    jpeg_quality: u8,
) -> Result<(&'static str, Vec<u8>)> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::Tool(format!("Failed to decode image: {}", e)))?;

    let img = flatten_alpha(img);

    let (w, h) = (img.width(), img.height());
    let img = if w > max_width || h > max_height {
        img.resize(max_width, max_height, FilterType::Lanczos3)
    } else {
        img
    };

    let mut out = Vec::new();
    let mime = if matches!(ext, "jpg" | "jpeg") {
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), jpeg_quality);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| Error::Tool(format!("Failed to encode JPEG: {}", e)))?;
        "image/jpeg"
    } else {
        let encoder = PngEncoder::new_with_quality(
            Cursor::new(&mut out),
            CompressionType::Default,
            PngFilterType::Adaptive,
        );
        img.write_with_encoder(encoder)
            .map_err(|e| Error::Tool(format!("Failed to encode PNG: {}", e)))?;
        "image/png"
    };
    Ok((mime, out))
}

/// Composite transparent pixels onto a white background so JPEG re-encoding
/// never turns them black.
fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut background = RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
        image::imageops::overlay(&mut background, &rgba, 0, 0);
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(background).to_rgb8())
    } else {
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    #[test]
    fn test_schema() {
        let tool = SeeImageTool;
        assert_eq!(tool.schema().name, "see_image");
    }

    #[test]
    fn test_validate_extensions() {
        let tool = SeeImageTool;
        assert!(tool.validate(&json!({"file_path": "a.png"})).is_ok());
        assert!(tool.validate(&json!({"file_path": "a.JPG"})).is_ok());
        assert!(tool.validate(&json!({"file_path": "shots/b.webp"})).is_ok());
        assert!(tool.validate(&json!({"file_path": "a.bmp"})).is_err());
        assert!(tool.validate(&json!({"file_path": "noext"})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("photo.JPEG"), "jpeg");
        assert_eq!(extension("/a/b/c.png"), "png");
        assert_eq!(extension("none"), "");
    }

    #[test]
    fn test_process_image_resizes_and_encodes() {
        // 4000x100 red PNG, wider than the 1920 bound
        let src = RgbaImage::from_pixel(4000, 100, Rgba([200, 10, 10, 255]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(src)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let (mime, out) = process_image(&png, "png", 1920, 1080, 85).unwrap();
        assert_eq!(mime, "image/png");
        let round = image::load_from_memory(&out).unwrap();
        assert!(round.width() <= 1920);
        assert!(round.height() <= 1080);
    }

    #[test]
    fn test_process_image_jpeg_flattens_alpha() {
        // Fully transparent PNG re-encoded as JPEG should come out white
        let src = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(src)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let (mime, out) = process_image(&png, "jpg", 1920, 1080, 85).unwrap();
        assert_eq!(mime, "image/jpeg");
        let round = image::load_from_memory(&out).unwrap().to_rgb8();
        let px = round.get_pixel(4, 4);
        assert!(px[0] > 240 && px[1] > 240 && px[2] > 240);
    }

    #[test]
    fn test_process_image_rejects_garbage() {
        assert!(process_image(b"not an image", "png", 1920, 1080, 85).is_err());
    }
}
