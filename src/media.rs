//! The currently loaded source media: the raw bytes that get uploaded,
//! the decoded pixels, and the GPU texture used for preview.

use egui::{ColorImage, TextureHandle, TextureOptions};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("could not decode media: {0}")]
    Decode(String),
}

/// Decodes arbitrary media bytes into an egui `ColorImage`.
pub fn decode_color_image(bytes: &[u8]) -> Result<ColorImage, MediaError> {
    let img = image::load_from_memory(bytes)
        .map_err(|err| MediaError::Decode(err.to_string()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    Ok(ColorImage::from_rgba_unmultiplied(
        [w as usize, h as usize],
        img.as_raw(),
    ))
}

/// One loaded image. Owned exclusively by the page that loaded it and
/// replaced wholesale when the user picks a new file; dropping it releases
/// the texture, which is the object-URL revoke of this client.
pub struct SourceMedia {
    bytes: Vec<u8>,
    name: String,
    pixels: ColorImage,
    texture: Option<TextureHandle>,
}

impl SourceMedia {
    pub fn decode(bytes: Vec<u8>, name: String) -> Result<Self, MediaError> {
        let pixels = decode_color_image(&bytes)?;
        Ok(Self {
            bytes,
            name,
            pixels,
            texture: None,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intrinsic pixel dimensions, `[width, height]`.
    pub fn natural_size(&self) -> [usize; 2] {
        self.pixels.size
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> &TextureHandle {
        let pixels = &self.pixels;
        self.texture.get_or_insert_with(|| {
            ctx.load_texture("source_media", pixels.clone(), TextureOptions::LINEAR)
        })
    }

    /// Display size that fits the available space while preserving aspect
    /// ratio, leaving a little room for the surrounding controls.
    pub fn fit_size(&self, avail: egui::Vec2) -> egui::Vec2 {
        let w = self.pixels.size[0] as f32;
        let h = self.pixels.size[1] as f32;
        let max_w = (avail.x - 20.0).max(10.0);
        let max_h = (avail.y - 20.0).max(10.0);
        let scale = (max_w / w).min(max_h / h).clamp(0.05, 4.0);
        egui::vec2(w * scale, h * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .expect("encoding a fresh image cannot fail");
        out.into_inner()
    }

    #[test]
    fn decodes_and_reports_natural_size() {
        let media = SourceMedia::decode(png_bytes(12, 7), "tiny.png".to_owned()).unwrap();
        assert_eq!(media.natural_size(), [12, 7]);
        assert_eq!(media.name(), "tiny.png");
        assert!(!media.bytes().is_empty());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = SourceMedia::decode(vec![1, 2, 3, 4], "junk.bin".to_owned());
        assert!(matches!(err, Err(MediaError::Decode(_))));
    }

    #[test]
    fn fit_size_preserves_aspect_ratio() {
        let media = SourceMedia::decode(png_bytes(200, 100), "wide.png".to_owned()).unwrap();
        let fitted = media.fit_size(egui::vec2(120.0, 400.0));
        assert!((fitted.x / fitted.y - 2.0).abs() < 1e-4);
        assert!(fitted.x <= 100.0 + 1e-4);
    }
}
