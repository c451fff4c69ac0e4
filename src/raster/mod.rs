use glam::DVec2;

pub mod cube;
pub mod ingest;

pub use cube::{
    build_cube_side_from_equirectangular, build_equirectangular_cube_image,
    build_irradiance_cube_image, cube_uv_to_uvw, uvw_to_cube_uv, uvw_to_equirectangular_uv,
    CubeImage, CubeSide,
};
pub use ingest::{encode_png, load_image};

/// Linear, unclamped RGBA color. Values above 1.0 are meaningful (HDR).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn scaled(self, amount: f64) -> Self {
        Self { r: self.r * amount, g: self.g * amount, b: self.b * amount, a: self.a * amount }
    }

    fn mix(first: Color, second: Color, amount: f64) -> Color {
        Color {
            r: first.r + (second.r - first.r) * amount,
            g: first.g + (second.g - first.g) * amount,
            b: first.b + (second.b - first.b) * amount,
            a: first.a + (second.a - first.a) * amount,
        }
    }
}

/// Dense 2D raster of linear float colors.
#[derive(Debug, Clone)]
pub struct Image {
    width: usize,
    height: usize,
    texels: Vec<Color>,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, texels: vec![Color::TRANSPARENT; width * height] }
    }

    /// Rebuilds an image from tightly packed RGBA8 bytes in [0, 255].
    pub fn from_rgba8_data(width: usize, height: usize, data: &[u8]) -> Self {
        let mut image = Image::new(width, height);
        for (index, chunk) in data.chunks_exact(4).take(width * height).enumerate() {
            image.texels[index] = Color::new(
                chunk[0] as f64 / 255.0,
                chunk[1] as f64 / 255.0,
                chunk[2] as f64 / 255.0,
                chunk[3] as f64 / 255.0,
            );
        }
        image
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn texel(&self, x: usize, y: usize) -> Color {
        self.texels[y * self.width + x]
    }

    pub fn set_texel(&mut self, x: usize, y: usize, color: Color) {
        self.texels[y * self.width + x] = color;
    }

    /// Nearest sample at normalized UV. V is flipped: the top-left texel sits
    /// at V = 1.
    pub fn texel_uv(&self, uv: DVec2) -> Color {
        let x = (uv.x * (self.width - 1) as f64).clamp(0.0, (self.width - 1) as f64);
        let y = ((1.0 - uv.y) * (self.height - 1) as f64).clamp(0.0, (self.height - 1) as f64);
        self.texel(x as usize, y as usize)
    }

    /// Bilinear sample at normalized UV, same V flip as `texel_uv`. Mixes the
    /// two horizontal pairs first, then the vertical result.
    pub fn texel_uv_bilinear(&self, uv: DVec2) -> Color {
        let x = (uv.x * (self.width - 1) as f64).clamp(0.0, (self.width - 1) as f64);
        let y = ((1.0 - uv.y) * (self.height - 1) as f64).clamp(0.0, (self.height - 1) as f64);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = x - x0 as f64;
        let ty = y - y0 as f64;
        let top = Color::mix(self.texel(x0, y0), self.texel(x1, y0), tx);
        let bottom = Color::mix(self.texel(x0, y1), self.texel(x1, y1), tx);
        Color::mix(top, bottom, ty)
    }

    /// Resizes the image. Shrinking by more than half in either dimension
    /// first recurses through half-steps (one dimension at a time) so the
    /// final bilinear pass never undersamples.
    pub fn scale(&self, new_width: usize, new_height: usize) -> Image {
        assert!(new_width > 0 && new_height > 0, "image scale target must be non-empty");
        if new_width * 2 >= self.width && new_height * 2 >= self.height {
            return self.resample(new_width, new_height);
        }
        if new_width * 2 < self.width {
            return self.scale(self.width / 2, self.height).scale(new_width, new_height);
        }
        self.scale(self.width, self.height / 2).scale(new_width, new_height)
    }

    fn resample(&self, new_width: usize, new_height: usize) -> Image {
        let mut result = Image::new(new_width, new_height);
        for y in 0..new_height {
            let v = if new_height > 1 { 1.0 - y as f64 / (new_height - 1) as f64 } else { 0.5 };
            for x in 0..new_width {
                let u = if new_width > 1 { x as f64 / (new_width - 1) as f64 } else { 0.5 };
                result.set_texel(x, y, self.texel_uv_bilinear(DVec2::new(u, v)));
            }
        }
        result
    }

    /// Tightly packed RGBA8 bytes; channels clamped to [0, 1].
    pub fn rgba8_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.texels.len() * 4);
        for texel in &self.texels {
            data.push((texel.r.clamp(0.0, 1.0) * 255.0).round() as u8);
            data.push((texel.g.clamp(0.0, 1.0) * 255.0).round() as u8);
            data.push((texel.b.clamp(0.0, 1.0) * 255.0).round() as u8);
            data.push((texel.a.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
        data
    }

    /// Tightly packed little-endian RGBA32F bytes, unclamped.
    pub fn rgba32f_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.texels.len() * 16);
        for texel in &self.texels {
            data.extend_from_slice(&(texel.r as f32).to_le_bytes());
            data.extend_from_slice(&(texel.g as f32).to_le_bytes());
            data.extend_from_slice(&(texel.b as f32).to_le_bytes());
            data.extend_from_slice(&(texel.a as f32).to_le_bytes());
        }
        data
    }
}
