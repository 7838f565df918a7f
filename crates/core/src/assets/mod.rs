use std::{f32::consts::TAU, fmt, path::Path, sync::Arc};

use image::{Rgba, RgbaImage};

use crate::{tint::TintSpec, Result};

/// Edge length of the built-in square assets.
pub const BUILTIN_ASSET_SIZE: u32 = 256;

/// Shared, immutable handle to an image used for a face or hand.
///
/// Cloning the handle shares the pixels; composition always works on a copy.
#[derive(Clone, PartialEq)]
pub struct BaseImage {
    pixels: Arc<RgbaImage>,
    stateful: bool,
}

impl BaseImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
            stateful: false,
        }
    }

    /// Marks the image as reacting to interaction state.
    pub fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }

    /// Decodes an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pixels = image::open(path)?.into_rgba8();
        tracing::debug!(
            ?path,
            width = pixels.width(),
            height = pixels.height(),
            "loaded image asset"
        );
        Ok(Self::new(pixels))
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    /// Intrinsic width and height.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Whether both handles point at the same pixel buffer.
    pub fn shares_pixels(&self, other: &BaseImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for BaseImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseImage")
            .field("dimensions", &self.dimensions())
            .field("stateful", &self.stateful)
            .finish()
    }
}

/// Image and tint configured for one element of the clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetSpec {
    pub image: Option<BaseImage>,
    pub tint: TintSpec,
}

impl AssetSpec {
    pub fn new(image: Option<BaseImage>, tint: TintSpec) -> Self {
        Self { image, tint }
    }

    pub fn from_image(image: BaseImage) -> Self {
        Self {
            image: Some(image),
            tint: TintSpec::default(),
        }
    }
}

/// Procedurally drawn stand-ins for packaged default artwork.
pub mod builtin {
    use super::*;

    const INK: Rgba<u8> = Rgba([33, 33, 33, 255]);
    const PAPER: Rgba<u8> = Rgba([250, 250, 250, 255]);
    const ACCENT: Rgba<u8> = Rgba([211, 47, 47, 255]);

    /// White dial with a dark rim and twelve hour marks.
    pub fn face() -> BaseImage {
        let size = BUILTIN_ASSET_SIZE as f32;
        let center = size / 2.0;
        let radius = center - 2.0;
        let mut image = RgbaImage::new(BUILTIN_ASSET_SIZE, BUILTIN_ASSET_SIZE);

        for (x, y, px) in image.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= radius - 6.0 {
                *px = PAPER;
            } else if dist <= radius {
                *px = INK;
            }
        }

        for mark in 0..12 {
            let angle = mark as f32 / 12.0 * TAU;
            let length = if mark % 3 == 0 { 22.0 } else { 12.0 };
            let outer = radius - 12.0;
            let (sin, cos) = angle.sin_cos();
            draw_segment(
                &mut image,
                (center + sin * (outer - length), center - cos * (outer - length)),
                (center + sin * outer, center - cos * outer),
                if mark % 3 == 0 { 3.5 } else { 2.0 },
                INK,
            );
        }

        BaseImage::new(image)
    }

    pub fn hour_hand() -> BaseImage {
        hand(0.45, 5.0, INK)
    }

    pub fn minute_hand() -> BaseImage {
        hand(0.68, 3.5, INK)
    }

    pub fn second_hand() -> BaseImage {
        hand(0.80, 1.5, ACCENT)
    }

    /// A hand pointing at 12 o'clock from the centre of a square canvas, so
    /// rotating the canvas about its centre rotates the hand about its pivot.
    fn hand(reach: f32, half_width: f32, color: Rgba<u8>) -> BaseImage {
        let size = BUILTIN_ASSET_SIZE as f32;
        let center = size / 2.0;
        let mut image = RgbaImage::new(BUILTIN_ASSET_SIZE, BUILTIN_ASSET_SIZE);
        draw_segment(
            &mut image,
            (center, center + size * 0.08),
            (center, center - center * reach),
            half_width,
            color,
        );
        BaseImage::new(image)
    }

    fn draw_segment(
        image: &mut RgbaImage,
        from: (f32, f32),
        to: (f32, f32),
        half_width: f32,
        color: Rgba<u8>,
    ) {
        let (vx, vy) = (to.0 - from.0, to.1 - from.1);
        let len_sq = (vx * vx + vy * vy).max(f32::EPSILON);

        for (x, y, px) in image.enumerate_pixels_mut() {
            let (px_x, px_y) = (x as f32 + 0.5, y as f32 + 0.5);
            let t = (((px_x - from.0) * vx + (px_y - from.1) * vy) / len_sq).clamp(0.0, 1.0);
            let (cx, cy) = (from.0 + vx * t, from.1 + vy * t);
            let (dx, dy) = (px_x - cx, px_y - cy);
            if dx * dx + dy * dy <= half_width * half_width {
                *px = color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_pixels() {
        let image = BaseImage::new(RgbaImage::new(4, 2));
        let copy = image.clone();
        assert!(image.shares_pixels(&copy));
        assert!(!image.shares_pixels(&BaseImage::new(RgbaImage::new(4, 2))));
        assert_eq!(copy.dimensions(), (4, 2));
    }

    #[test]
    fn builtin_hands_point_up_from_the_centre() {
        let hand = builtin::minute_hand();
        let pixels = hand.pixels();
        let center = BUILTIN_ASSET_SIZE / 2;

        assert_eq!(pixels.get_pixel(center, center / 2)[3], 255);
        assert_eq!(pixels.get_pixel(center, BUILTIN_ASSET_SIZE - 10)[3], 0);
        assert_eq!(pixels.get_pixel(10, center)[3], 0);
    }

    #[test]
    fn builtin_face_is_a_disc() {
        let face = builtin::face();
        let pixels = face.pixels();
        let center = BUILTIN_ASSET_SIZE / 2;

        assert_eq!(pixels.get_pixel(center, center)[3], 255);
        assert_eq!(pixels.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(BaseImage::open("does/not/exist.png").is_err());
    }
}
