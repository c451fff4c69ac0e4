use glam::{DVec2, DVec3};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::thread;

use super::{Color, Image};

/// Fixed cube sides. Front faces +Z, Top faces +Y; the order is the storage
/// order inside `CubeImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeSide {
    Front,
    Rear,
    Left,
    Right,
    Top,
    Bottom,
}

impl CubeSide {
    pub const ALL: [CubeSide; 6] = [
        CubeSide::Front,
        CubeSide::Rear,
        CubeSide::Left,
        CubeSide::Right,
        CubeSide::Top,
        CubeSide::Bottom,
    ];

    pub fn index(self) -> usize {
        match self {
            CubeSide::Front => 0,
            CubeSide::Rear => 1,
            CubeSide::Left => 2,
            CubeSide::Right => 3,
            CubeSide::Top => 4,
            CubeSide::Bottom => 5,
        }
    }
}

/// Six equal square float rasters.
#[derive(Debug, Clone)]
pub struct CubeImage {
    size: usize,
    sides: [Image; 6],
}

impl CubeImage {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            sides: [
                Image::new(size, size),
                Image::new(size, size),
                Image::new(size, size),
                Image::new(size, size),
                Image::new(size, size),
                Image::new(size, size),
            ],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn side(&self, side: CubeSide) -> &Image {
        &self.sides[side.index()]
    }

    pub fn set_side(&mut self, side: CubeSide, image: Image) {
        assert!(
            image.width() == self.size && image.height() == self.size,
            "cube side must be square and match the cube dimension"
        );
        self.sides[side.index()] = image;
    }

    /// Nearest sample in the given direction via the largest-magnitude-axis
    /// side test.
    pub fn texel_uvw(&self, direction: DVec3) -> Color {
        let (side, uv) = uvw_to_cube_uv(direction);
        self.side(side).texel_uv(uv)
    }

    pub fn scale(&self, new_size: usize) -> CubeImage {
        let mut result = CubeImage::new(new_size);
        for side in CubeSide::ALL {
            result.set_side(side, self.side(side).scale(new_size, new_size));
        }
        result
    }
}

/// Maps a direction to the cube side it pierces plus the in-side UV. The
/// exact inverse of `cube_uv_to_uvw` away from side seams.
pub fn uvw_to_cube_uv(uvw: DVec3) -> (CubeSide, DVec2) {
    let abs_x = uvw.x.abs();
    let abs_y = uvw.y.abs();
    let abs_z = uvw.z.abs();
    if abs_x >= abs_y && abs_x >= abs_z {
        if uvw.x > 0.0 {
            (CubeSide::Right, half_shift(-uvw.z / abs_x, uvw.y / abs_x))
        } else {
            (CubeSide::Left, half_shift(uvw.z / abs_x, uvw.y / abs_x))
        }
    } else if abs_y >= abs_z {
        if uvw.y > 0.0 {
            (CubeSide::Top, half_shift(uvw.x / abs_y, -uvw.z / abs_y))
        } else {
            (CubeSide::Bottom, half_shift(uvw.x / abs_y, uvw.z / abs_y))
        }
    } else if uvw.z > 0.0 {
        (CubeSide::Front, half_shift(uvw.x / abs_z, uvw.y / abs_z))
    } else {
        (CubeSide::Rear, half_shift(-uvw.x / abs_z, uvw.y / abs_z))
    }
}

fn half_shift(a: f64, b: f64) -> DVec2 {
    DVec2::new((a + 1.0) / 2.0, (b + 1.0) / 2.0)
}

/// Unit direction through the given UV of a cube side. V = 1 points up.
pub fn cube_uv_to_uvw(side: CubeSide, uv: DVec2) -> DVec3 {
    let a = 2.0 * uv.x - 1.0;
    let b = 2.0 * uv.y - 1.0;
    match side {
        CubeSide::Front => DVec3::new(a, b, 1.0),
        CubeSide::Rear => DVec3::new(-a, b, -1.0),
        CubeSide::Left => DVec3::new(-1.0, b, a),
        CubeSide::Right => DVec3::new(1.0, b, -a),
        CubeSide::Top => DVec3::new(a, 1.0, -b),
        CubeSide::Bottom => DVec3::new(a, -1.0, b),
    }
    .normalize()
}

/// Equirectangular UV of a unit direction.
pub fn uvw_to_equirectangular_uv(uvw: DVec3) -> DVec2 {
    DVec2::new(
        0.5 + uvw.z.atan2(uvw.x) / TAU,
        0.5 + uvw.y.clamp(-1.0, 1.0).asin() / PI,
    )
}

/// Projects one cube side out of an equirectangular panorama. The side
/// dimension is half the source height.
pub fn build_cube_side_from_equirectangular(side: CubeSide, src_image: &Image) -> Image {
    let dimension = src_image.height() / 2;
    let mut dst_image = Image::new(dimension, dimension);
    for y in 0..dimension {
        let v = if dimension > 1 { 1.0 - y as f64 / (dimension - 1) as f64 } else { 0.5 };
        for x in 0..dimension {
            let u = if dimension > 1 { x as f64 / (dimension - 1) as f64 } else { 0.5 };
            let uvw = cube_uv_to_uvw(side, DVec2::new(u, v));
            let equirectangular_uv = uvw_to_equirectangular_uv(uvw);
            dst_image.set_texel(x, y, src_image.texel_uv_bilinear(equirectangular_uv));
        }
    }
    dst_image
}

pub fn build_equirectangular_cube_image(src_image: &Image) -> CubeImage {
    let mut result = CubeImage::new(src_image.height() / 2);
    for side in CubeSide::ALL {
        result.set_side(side, build_cube_side_from_equirectangular(side, src_image));
    }
    result
}

/// Convolves the source cube into a diffuse irradiance cube. Each destination
/// side is computed on its own thread; sides never share mutable state.
///
/// Sampling sweeps latitude in `sample_count` steps and scales the longitude
/// step count with `cos(latitude) + 0.01` to keep sample density roughly
/// uniform on the sphere; the epsilon keeps the longitude step finite at the
/// poles. Accumulated energy is weighted by `2π / positive_samples`, the
/// solid-angle weight for uniform angular sampling over the hemisphere.
pub fn build_irradiance_cube_image(src_image: &CubeImage, sample_count: usize) -> CubeImage {
    assert!(sample_count > 0, "irradiance convolution needs at least one sample step");
    let mut result = CubeImage::new(src_image.size());
    let sides = thread::scope(|scope| {
        let handles = CubeSide::ALL
            .map(|side| scope.spawn(move || convolve_side(src_image, side, sample_count)));
        handles.map(|handle| handle.join().expect("irradiance side worker"))
    });
    for (side, image) in CubeSide::ALL.into_iter().zip(sides) {
        result.set_side(side, image);
    }
    result
}

fn convolve_side(src_image: &CubeImage, side: CubeSide, sample_count: usize) -> Image {
    let size = src_image.size();
    let mut dst_image = Image::new(size, size);
    for y in 0..size {
        let v = if size > 1 { 1.0 - y as f64 / (size - 1) as f64 } else { 0.5 };
        for x in 0..size {
            let u = if size > 1 { x as f64 / (size - 1) as f64 } else { 0.5 };
            let normal = cube_uv_to_uvw(side, DVec2::new(u, v));

            let mut red = 0.0;
            let mut green = 0.0;
            let mut blue = 0.0;
            let mut positive_samples = 0u64;
            for latitude_step in 0..=sample_count {
                let latitude = -FRAC_PI_2 + PI * latitude_step as f64 / sample_count as f64;
                let longitude_count =
                    ((sample_count as f64) * (latitude.cos() + 0.01)).max(1.0) as usize;
                for longitude_step in 0..longitude_count {
                    let longitude = TAU * longitude_step as f64 / longitude_count as f64;
                    let sample_direction = DVec3::new(
                        latitude.cos() * longitude.cos(),
                        latitude.sin(),
                        latitude.cos() * longitude.sin(),
                    );
                    let apex = normal.dot(sample_direction);
                    if apex > 0.0 {
                        let sample = src_image.texel_uvw(sample_direction);
                        red += sample.r * apex;
                        green += sample.g * apex;
                        blue += sample.b * apex;
                        positive_samples += 1;
                    }
                }
            }
            let weight =
                if positive_samples > 0 { TAU / positive_samples as f64 } else { 0.0 };
            dst_image.set_texel(x, y, Color::new(red * weight, green * weight, blue * weight, 1.0));
        }
    }
    dst_image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_uv_round_trips_on_interior_samples() {
        for side in CubeSide::ALL {
            for iy in 1..8 {
                for ix in 1..8 {
                    let uv = DVec2::new(ix as f64 / 8.0, iy as f64 / 8.0);
                    let uvw = cube_uv_to_uvw(side, uv);
                    let (back_side, back_uv) = uvw_to_cube_uv(uvw);
                    assert_eq!(back_side, side, "side changed at uv {uv:?}");
                    assert!(
                        (back_uv - uv).length() < 1e-9,
                        "uv drifted on {side:?}: {uv:?} -> {back_uv:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn cube_directions_are_unit_length() {
        for side in CubeSide::ALL {
            let uvw = cube_uv_to_uvw(side, DVec2::new(0.25, 0.75));
            assert!((uvw.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn equirectangular_uv_matches_axes() {
        let up = uvw_to_equirectangular_uv(DVec3::new(0.0, 1.0, 0.0));
        assert!((up.y - 1.0).abs() < 1e-12);
        let down = uvw_to_equirectangular_uv(DVec3::new(0.0, -1.0, 0.0));
        assert!(down.y.abs() < 1e-12);
        let forward = uvw_to_equirectangular_uv(DVec3::new(1.0, 0.0, 0.0));
        assert!((forward.x - 0.5).abs() < 1e-12);
        assert!((forward.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn equirectangular_side_has_half_source_height() {
        let src = Image::new(32, 16);
        let side = build_cube_side_from_equirectangular(CubeSide::Front, &src);
        assert_eq!(side.width(), 8);
        assert_eq!(side.height(), 8);
    }

    #[test]
    fn irradiance_of_uniform_white_is_uniform_pi() {
        // With the 2π/positive_samples weight, convolving radiance 1 yields
        // the hemisphere cosine integral: π per channel. The π variant of
        // the constant would land at π/2 and fail this.
        let mut src = CubeImage::new(2);
        for side in CubeSide::ALL {
            let mut image = Image::new(2, 2);
            for y in 0..2 {
                for x in 0..2 {
                    image.set_texel(x, y, Color::WHITE);
                }
            }
            src.set_side(side, image);
        }
        let result = build_irradiance_cube_image(&src, 64);
        for side in CubeSide::ALL {
            for y in 0..2 {
                for x in 0..2 {
                    let texel = result.side(side).texel(x, y);
                    assert!(
                        (texel.r - PI).abs() < 0.1,
                        "{side:?} texel ({x},{y}) = {} expected ~π",
                        texel.r
                    );
                    assert!((texel.r - texel.g).abs() < 1e-9);
                    assert!((texel.r - texel.b).abs() < 1e-9);
                    assert!((texel.a - 1.0).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn irradiance_keeps_sides_independent() {
        // A single bright side must tilt destination texels facing it
        // without bleeding uniformly everywhere.
        let mut src = CubeImage::new(2);
        let mut bright = Image::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                bright.set_texel(x, y, Color::new(10.0, 0.0, 0.0, 1.0));
            }
        }
        src.set_side(CubeSide::Top, bright);
        let result = build_irradiance_cube_image(&src, 32);
        let top = result.side(CubeSide::Top).texel(0, 0);
        let bottom = result.side(CubeSide::Bottom).texel(0, 0);
        assert!(top.r > bottom.r, "top-facing texels must receive more of the top light");
    }
}
