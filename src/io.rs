use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ImageError, RgbaImage};

use crate::canvas::PixelBuffer;
use crate::error::{EditorError, EditorResult};

/// Raster formats the exporter can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
    Ico,
    Tiff,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Ico => "ico",
            SaveFormat::Tiff => "tiff",
        }
    }

    /// Format from a name or extension; unknown names fall back to PNG.
    pub fn from_name(name: &str) -> SaveFormat {
        match name.trim_start_matches('.').to_lowercase().as_str() {
            "jpeg" | "jpg" => SaveFormat::Jpeg,
            "webp" => SaveFormat::Webp,
            "bmp" => SaveFormat::Bmp,
            "tga" => SaveFormat::Tga,
            "ico" => SaveFormat::Ico,
            "tiff" | "tif" => SaveFormat::Tiff,
            _ => SaveFormat::Png,
        }
    }

    pub fn from_path(path: &Path) -> SaveFormat {
        path.extension()
            .and_then(|e| e.to_str())
            .map(SaveFormat::from_name)
            .unwrap_or_default()
    }
}

/// Decode any supported image file to RGBA8.
pub fn load_image(path: &Path) -> EditorResult<PixelBuffer> {
    let img = image::open(path)?.to_rgba8();
    crate::log_info!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(PixelBuffer::from_rgba_image(img))
}

/// Encode `buffer` to `path`, format from the extension (PNG when unknown).
pub fn save_image(buffer: &PixelBuffer, path: &Path, quality: u8) -> EditorResult<()> {
    if buffer.is_empty() {
        return Err(EditorError::EmptyBuffer);
    }
    let format = SaveFormat::from_path(path);
    encode_and_write(buffer.as_rgba_image(), path, format, quality)?;
    crate::log_info!("saved {} as {:?}", path.display(), format);
    Ok(())
}

pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Webp => {
            drop(writer);
            DynamicImage::ImageRgba8(image.clone()).save(path)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        SaveFormat::Ico => {
            // ICO entries are limited to 256×256
            let dyn_img = if image.width() > 256 || image.height() > 256 {
                let scale = 256.0 / image.width().max(image.height()) as f32;
                let new_w = ((image.width() as f32 * scale) as u32).max(1);
                let new_h = ((image.height() as f32 * scale) as u32).max(1);
                DynamicImage::ImageRgba8(image::imageops::resize(
                    image,
                    new_w,
                    new_h,
                    image::imageops::FilterType::Lanczos3,
                ))
            } else {
                DynamicImage::ImageRgba8(image.clone())
            };
            dyn_img.write_to(&mut writer, image::ImageOutputFormat::Ico)?;
        }
        SaveFormat::Tiff => {
            let encoder = TiffEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(SaveFormat::from_path(Path::new("a/b.JPG")), SaveFormat::Jpeg);
        assert_eq!(SaveFormat::from_path(Path::new("x.tif")), SaveFormat::Tiff);
        assert_eq!(SaveFormat::from_path(Path::new("noext")), SaveFormat::Png);
        assert_eq!(SaveFormat::from_name(".webp"), SaveFormat::Webp);
    }

    #[test]
    fn png_round_trip_through_disk() {
        let dir = std::env::temp_dir().join(format!("photofe-io-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.png");

        let mut buf = PixelBuffer::new_filled(3, 2, [10, 20, 30, 255]);
        buf.put_pixel(2, 1, image::Rgba([200, 100, 0, 128]));
        save_image(&buf, &path, 90).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(back, buf);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_buffer_is_not_saved() {
        let path = std::env::temp_dir().join("photofe-never-written.png");
        assert!(matches!(
            save_image(&PixelBuffer::default(), &path, 90),
            Err(EditorError::EmptyBuffer)
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_image(Path::new("/definitely/not/here.png")).is_err());
    }
}
