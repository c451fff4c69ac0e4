use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;

use super::{Color, Image};

/// Decodes PNG, JPEG, TIFF, Radiance HDR or OpenEXR into a float raster.
/// Float formats keep their unclamped values; 8-bit sources are normalized
/// to [0, 1].
pub fn load_image(path: impl AsRef<Path>) -> Result<Image> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)
        .with_context(|| format!("opening image file {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("sniffing image format of {}", path.display()))?;
    let decoded =
        reader.decode().with_context(|| format!("decoding image file {}", path.display()))?;
    Ok(from_dynamic(&decoded))
}

fn from_dynamic(decoded: &DynamicImage) -> Image {
    let rgba = decoded.to_rgba32f();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    let mut image = Image::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        image.set_texel(x as usize, y as usize, Color::new(r as f64, g as f64, b as f64, a as f64));
    }
    image
}

/// Encodes a clamped 8-bit PNG, used for registry preview blobs.
pub fn encode_png(image: &Image) -> Result<Vec<u8>> {
    let rgba = RgbaImage::from_raw(
        image.width() as u32,
        image.height() as u32,
        image.rgba8_data(),
    )
    .context("assembling preview pixel buffer")?;
    let mut bytes = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("encoding preview PNG")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn png_files_decode_normalized() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("swatch.png");
        let mut png = RgbaImage::new(2, 1);
        png.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        png.put_pixel(1, 0, image::Rgba([0, 128, 0, 255]));
        png.save(&path).expect("save png");

        let image = load_image(&path).expect("load png");
        assert_eq!(image.width(), 2);
        let red = image.texel(0, 0);
        assert!((red.r - 1.0).abs() < 1e-6);
        assert!(red.g.abs() < 1e-6);
        let green = image.texel(1, 0);
        assert!(green.g > 0.4 && green.g < 0.6);
    }

    #[test]
    fn encode_png_round_trips_through_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("roundtrip.png");
        let mut image = Image::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                image.set_texel(x, y, Color::new(x as f64 / 2.0, y as f64, 0.25, 1.0));
            }
        }
        std::fs::write(&path, encode_png(&image).expect("encode")).expect("write");
        let loaded = load_image(&path).expect("load");
        assert_eq!(loaded.width(), 3);
        assert_eq!(loaded.height(), 2);
        let texel = loaded.texel(2, 0);
        assert!((texel.r - 1.0).abs() < 0.01);
    }
}
