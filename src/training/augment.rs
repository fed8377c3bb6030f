//! Random flips, rotations and zooms applied to training images.

use std::f64::consts::TAU;

use burn::config::Config;
use image::{Rgb, RgbImage};
use rand::Rng;

#[derive(Config, Debug)]
pub struct AugmentationConfig {
    #[config(default = true)]
    pub horizontal_flip: bool,
    /// Fraction of a full turn; angles are drawn from `[-factor, factor] * 2π`.
    #[config(default = 0.1)]
    pub rotation_factor: f64,
    /// Scale is drawn from `[1 - factor, 1 + factor]`, above 1 zooming out.
    #[config(default = 0.1)]
    pub zoom_factor: f64,
}

/// One draw of the random parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub flip: bool,
    /// Radians, counter-clockwise.
    pub angle: f64,
    pub zoom: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        flip: false,
        angle: 0.0,
        zoom: 1.0,
    };

    pub fn sample<R: Rng>(config: &AugmentationConfig, rng: &mut R) -> Self {
        Self {
            flip: config.horizontal_flip && rng.gen_bool(0.5),
            angle: symmetric(rng, config.rotation_factor) * TAU,
            zoom: 1.0 + symmetric(rng, config.zoom_factor),
        }
    }

    /// Flips, then rotates and zooms about the center, sampling bilinearly and
    /// reflecting at the borders.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let cx = (f64::from(width) - 1.0) / 2.0;
        let cy = (f64::from(height) - 1.0) / 2.0;
        let (sin, cos) = self.angle.sin_cos();

        RgbImage::from_fn(width, height, |x, y| {
            let dx = f64::from(x) - cx;
            let dy = f64::from(y) - cy;

            let mut sx = cx + self.zoom * (cos * dx + sin * dy);
            let sy = cy + self.zoom * (cos * dy - sin * dx);
            if self.flip {
                sx = f64::from(width) - 1.0 - sx;
            }

            sample_bilinear(image, sx, sy)
        })
    }
}

fn symmetric<R: Rng>(rng: &mut R, factor: f64) -> f64 {
    if factor > 0.0 {
        rng.gen_range(-factor..=factor)
    } else {
        0.0
    }
}

/// Mirrors a continuous coordinate into `[0, size - 1]` (edge pixel repeated,
/// `d c b a | a b c d | d c b a`).
fn reflect(coord: f64, size: u32) -> f64 {
    let n = f64::from(size);
    let period = 2.0 * n;
    let mut t = (coord + 0.5).rem_euclid(period);
    if t >= n {
        t = period - t;
    }
    (t - 0.5).clamp(0.0, n - 1.0)
}

fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    let x = reflect(x, width);
    let y = reflect(y, height);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
