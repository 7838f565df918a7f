use image::{Rgba, RgbaImage};
use kurbo::{Affine, Point};

use crate::{
    clock::ClockState,
    tint::{premultiply, unpremultiply, BlendMode},
};

/// Drawable parts of the clock, in painter's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Face,
    Hour,
    Minute,
    Second,
}

impl Element {
    /// Draw order: later elements are painted on top.
    pub const ALL: [Element; 4] = [
        Element::Face,
        Element::Hour,
        Element::Minute,
        Element::Second,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Element::Face => 0,
            Element::Hour => 1,
            Element::Minute => 2,
            Element::Second => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Face => "face",
            Element::Hour => "hour",
            Element::Minute => "minute",
            Element::Second => "second",
        }
    }
}

/// Hand rotations in degrees, clockwise from 12 o'clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hour: f32,
    pub minute: f32,
    pub second: f32,
}

impl HandAngles {
    pub fn from_state(state: &ClockState) -> Self {
        let hour = f32::from(state.hour);
        let minute = f32::from(state.minute);
        let second = f32::from(state.second);
        Self {
            hour: (hour + minute / 60.0) * 360.0 / 12.0,
            minute: (minute + second / 60.0) * 360.0 / 60.0,
            second: second * 360.0 / 60.0,
        }
    }

    pub fn for_element(&self, element: Element) -> f32 {
        match element {
            Element::Face => 0.0,
            Element::Hour => self.hour,
            Element::Minute => self.minute,
            Element::Second => self.second,
        }
    }
}

/// Integer pixel rectangle, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Scales an image to fit the container while keeping its aspect ratio, and
/// centres it along the axis with slack. Returns `None` for degenerate sizes.
pub fn fit_center(image: (u32, u32), container: (u32, u32)) -> Option<Bounds> {
    let (image_w, image_h) = image;
    let (box_w, box_h) = container;
    if image_w == 0 || image_h == 0 || box_w == 0 || box_h == 0 {
        return None;
    }

    let image_ratio = image_w as f32 / image_h as f32;
    let box_ratio = box_w as f32 / box_h as f32;
    let (box_w, box_h) = (box_w as i32, box_h as i32);

    let bounds = if image_ratio > box_ratio {
        let scaled_height = (box_w as f32 / image_ratio) as i32;
        let top = (box_h - scaled_height) / 2;
        Bounds {
            left: 0,
            top,
            right: box_w,
            bottom: top + scaled_height,
        }
    } else {
        let scaled_width = (box_h as f32 * image_ratio) as i32;
        let left = (box_w - scaled_width) / 2;
        Bounds {
            left,
            top: 0,
            right: left + scaled_width,
            bottom: box_h,
        }
    };
    Some(bounds)
}

/// One element to draw: placed by aspect-fit, then rotated about the pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub element: Element,
    pub bounds: Bounds,
    pub rotation_degrees: f32,
    pub pivot: (f32, f32),
}

/// Ordered draw list for a single frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPlan {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
}

impl RenderPlan {
    /// Builds the draw list for a `width` x `height` container.
    ///
    /// `image_size` reports the intrinsic size of each element's image, or
    /// `None` when the element has nothing to draw. Hands are only placed when
    /// `angles` is known.
    pub fn build<F>(width: u32, height: u32, angles: Option<HandAngles>, image_size: F) -> Self
    where
        F: Fn(Element) -> Option<(u32, u32)>,
    {
        let pivot = (width as f32 / 2.0, height as f32 / 2.0);
        let layers = Element::ALL
            .into_iter()
            .filter_map(|element| {
                let rotation_degrees = match (element, angles) {
                    (Element::Face, _) => 0.0,
                    (_, Some(angles)) => angles.for_element(element),
                    (_, None) => return None,
                };
                let bounds = fit_center(image_size(element)?, (width, height))?;
                Some(Layer {
                    element,
                    bounds,
                    rotation_degrees,
                    pivot,
                })
            })
            .collect();

        Self {
            width,
            height,
            layers,
        }
    }

    pub fn layer(&self, element: Element) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.element == element)
    }

    /// Paints every layer onto a transparent canvas.
    pub fn rasterize<'a, F>(&self, image_for: F) -> RgbaImage
    where
        F: Fn(Element) -> Option<&'a RgbaImage>,
    {
        let mut canvas = RgbaImage::new(self.width, self.height);
        for layer in &self.layers {
            if let Some(image) = image_for(layer.element) {
                draw_layer(&mut canvas, image, layer);
            }
        }
        canvas
    }
}

/// Samples `image` through the inverse of the layer transform, nearest pixel.
fn draw_layer(canvas: &mut RgbaImage, image: &RgbaImage, layer: &Layer) {
    let bounds = layer.bounds;
    if bounds.width() <= 0 || bounds.height() <= 0 {
        return;
    }

    let pivot = Point::new(f64::from(layer.pivot.0), f64::from(layer.pivot.1));
    let radians = f64::from(layer.rotation_degrees).to_radians();
    let to_layer = Affine::rotate_about(radians, pivot).inverse();
    let scale_x = f64::from(image.width()) / f64::from(bounds.width());
    let scale_y = f64::from(image.height()) / f64::from(bounds.height());

    for (x, y, dst) in canvas.enumerate_pixels_mut() {
        let local = to_layer * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
        let u = (local.x - f64::from(bounds.left)) * scale_x;
        let v = (local.y - f64::from(bounds.top)) * scale_y;
        if u < 0.0 || v < 0.0 || u >= f64::from(image.width()) || v >= f64::from(image.height()) {
            continue;
        }

        let src = image.get_pixel(u as u32, v as u32);
        if src[3] == 0 {
            continue;
        }
        *dst = over(*dst, *src);
    }
}

fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src = premultiply(src.0);
    let dst = premultiply(dst.0);
    Rgba(unpremultiply(BlendMode::SourceOver.apply(src, dst)))
}
