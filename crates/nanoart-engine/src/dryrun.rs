use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use nanoart_contracts::image_data::ImageData;
use nanoart_contracts::requests::{AspectRatio, EditRequest};
use sha2::{Digest, Sha256};

use crate::service::{ImageService, ServiceError};

const DRYRUN_LONG_EDGE: u32 = 256;

/// Offline service: answers every call with a solid-color PNG whose color is
/// a hash of the request, so identical requests give identical images.
pub struct DryrunImageService {
    name: String,
}

impl DryrunImageService {
    pub fn new(model: &str) -> Self {
        Self {
            name: format!("dryrun:{}", model.trim()),
        }
    }
}

impl ImageService for DryrunImageService {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<ImageData, ServiceError> {
        let (width, height) = dims_for_ratio(aspect_ratio);
        let color = color_from_parts(&[prompt.as_bytes(), aspect_ratio.as_str().as_bytes()]);
        Ok(render_png(width, height, color)?)
    }

    fn edit(&self, request: &EditRequest) -> Result<ImageData, ServiceError> {
        let color = color_from_parts(&[
            request.prompt.as_bytes(),
            request.source_image_base64.as_bytes(),
        ]);
        Ok(render_png(DRYRUN_LONG_EDGE, DRYRUN_LONG_EDGE, color)?)
    }
}

fn dims_for_ratio(aspect_ratio: AspectRatio) -> (u32, u32) {
    let (w, h) = aspect_ratio.terms();
    let longest = w.max(h);
    (
        DRYRUN_LONG_EDGE * w / longest,
        DRYRUN_LONG_EDGE * h / longest,
    )
}

fn color_from_parts(parts: &[&[u8]]) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn render_png(width: u32, height: u32, (r, g, b): (u8, u8, u8)) -> Result<ImageData> {
    let image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("dryrun PNG encode failed")?;
    Ok(ImageData::from_bytes("image/png", &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_follow_aspect_ratio() {
        assert_eq!(dims_for_ratio(AspectRatio::Landscape), (256, 144));
        assert_eq!(dims_for_ratio(AspectRatio::Portrait), (144, 256));
        assert_eq!(dims_for_ratio(AspectRatio::Square), (256, 256));
        assert_eq!(dims_for_ratio(AspectRatio::Vertical), (192, 256));
    }

    #[test]
    fn generate_returns_decodable_png() -> anyhow::Result<()> {
        let service = DryrunImageService::new("dryrun-image-1");
        let data = service.generate("boat", AspectRatio::Standard)?;
        assert_eq!(data.mime_type, "image/png");

        let decoded = image::load_from_memory(&data.decode()?)?;
        assert_eq!((decoded.width(), decoded.height()), (256, 192));
        Ok(())
    }

    #[test]
    fn same_request_same_image() -> anyhow::Result<()> {
        let service = DryrunImageService::new("dryrun-image-1");
        let a = service.generate("boat", AspectRatio::Square)?;
        let b = service.generate("boat", AspectRatio::Square)?;
        let c = service.generate("car", AspectRatio::Square)?;
        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }

    #[test]
    fn edit_depends_on_source_payload() -> anyhow::Result<()> {
        let service = DryrunImageService::new("dryrun-image-1");
        let request = |payload: &str| EditRequest {
            prompt: "sepia".to_string(),
            source_image_base64: payload.to_string(),
            source_mime_type: "image/png".to_string(),
        };
        let a = service.edit(&request("QUJD"))?;
        let b = service.edit(&request("REVG"))?;
        assert_ne!(a, b);
        assert_eq!(service.name(), "dryrun:dryrun-image-1");
        Ok(())
    }
}
