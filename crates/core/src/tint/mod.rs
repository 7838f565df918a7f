//! Tint composition for clock face and hand images.
//!
//! Composing never touches the shared base image: every [`ComposedAsset`] owns
//! a private copy of the pixels with the tint already applied.

use std::fmt;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{assets::BaseImage, ClockError};

/// Blend mode used when a colour set is present but no usable mode is.
pub const DEFAULT_TINT_MODE: BlendMode = BlendMode::SourceIn;

/// Straight-alpha RGBA colour, written as `#RRGGBB` or `#AARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn parse_hex(value: &str) -> Result<Self, ClockError> {
        let digits = value
            .strip_prefix('#')
            .ok_or_else(|| ClockError::msg(format!("colour `{value}` must start with `#`")))?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ClockError::msg(format!("colour `{value}` is not hexadecimal")));
        }
        let packed = u32::from_str_radix(digits, 16)
            .map_err(|_| ClockError::msg(format!("colour `{value}` is not hexadecimal")))?;

        match digits.len() {
            6 => Ok(Self::rgb((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)),
            8 => Ok(Self::rgba(
                (packed >> 16) as u8,
                (packed >> 8) as u8,
                packed as u8,
                (packed >> 24) as u8,
            )),
            _ => Err(ClockError::msg(format!(
                "colour `{value}` must have 6 or 8 hex digits"
            ))),
        }
    }

    fn premultiplied(self) -> [u8; 4] {
        premultiply([self.r, self.g, self.b, self.a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Interaction flags of the hosting component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionState {
    pub pressed: bool,
    pub focused: bool,
    pub hovered: bool,
    pub enabled: bool,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            pressed: false,
            focused: false,
            hovered: false,
            enabled: true,
        }
    }
}

/// Condition on [`InteractionState`]; unset flags match anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMatcher {
    pub pressed: Option<bool>,
    pub focused: Option<bool>,
    pub hovered: Option<bool>,
    pub enabled: Option<bool>,
}

impl StateMatcher {
    pub fn matches(&self, state: &InteractionState) -> bool {
        fn check(want: Option<bool>, actual: bool) -> bool {
            want.map_or(true, |want| want == actual)
        }

        check(self.pressed, state.pressed)
            && check(self.focused, state.focused)
            && check(self.hovered, state.hovered)
            && check(self.enabled, state.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    #[serde(default)]
    pub when: StateMatcher,
    pub color: Color,
}

/// Colours keyed by interaction state. The first matching entry wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSet {
    #[serde(default)]
    pub entries: Vec<ColorEntry>,
    pub default: Color,
}

impl ColorSet {
    pub fn solid(color: Color) -> Self {
        Self {
            entries: Vec::new(),
            default: color,
        }
    }

    pub fn with_entry(mut self, when: StateMatcher, color: Color) -> Self {
        self.entries.push(ColorEntry { when, color });
        self
    }

    pub fn color_for(&self, state: &InteractionState) -> Color {
        self.entries
            .iter()
            .find(|entry| entry.when.matches(state))
            .map(|entry| entry.color)
            .unwrap_or(self.default)
    }

    /// Whether the resolved colour can change with the interaction state.
    pub fn is_stateful(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Porter-Duff style rules for combining the tint colour with image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    SourceOver,
    SourceIn,
    SourceAtop,
    Modulate,
    Screen,
    Plus,
}

impl BlendMode {
    /// Maps the legacy integer attribute codes; unknown codes mean "no mode".
    pub fn from_attribute(code: i32) -> Option<Self> {
        match code {
            3 => Some(Self::SourceOver),
            5 => Some(Self::SourceIn),
            9 => Some(Self::SourceAtop),
            14 => Some(Self::Modulate),
            15 => Some(Self::Screen),
            16 => Some(Self::Plus),
            _ => None,
        }
    }

    /// Combines premultiplied tint `src` with premultiplied pixel `dst`.
    pub fn apply(self, src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
        let sa = u16::from(src[3]);
        let da = u16::from(dst[3]);
        let mut out = [0u8; 4];
        match self {
            BlendMode::SourceOver => {
                for i in 0..4 {
                    out[i] = add_sat(src[i], mul_div255(u16::from(dst[i]), 255 - sa));
                }
            }
            BlendMode::SourceIn => {
                for i in 0..4 {
                    out[i] = mul_div255(u16::from(src[i]), da);
                }
            }
            BlendMode::SourceAtop => {
                for i in 0..3 {
                    out[i] = add_sat(
                        mul_div255(u16::from(src[i]), da),
                        mul_div255(u16::from(dst[i]), 255 - sa),
                    );
                }
                out[3] = dst[3];
            }
            BlendMode::Modulate => {
                for i in 0..4 {
                    out[i] = mul_div255(u16::from(src[i]), u16::from(dst[i]));
                }
            }
            BlendMode::Screen => {
                for i in 0..4 {
                    let product = u16::from(mul_div255(u16::from(src[i]), u16::from(dst[i])));
                    out[i] = (u16::from(src[i]) + u16::from(dst[i]) - product).min(255) as u8;
                }
            }
            BlendMode::Plus => {
                for i in 0..4 {
                    out[i] = add_sat(src[i], dst[i]);
                }
            }
        }
        out
    }
}

/// What the running platform can do when composing tints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    blend_modes: bool,
}

impl Capabilities {
    /// Every blend mode is available.
    pub const fn full() -> Self {
        Self { blend_modes: true }
    }

    /// Only the default tint behaviour is available.
    pub const fn without_blend_modes() -> Self {
        Self { blend_modes: false }
    }

    pub fn supports(&self, _mode: BlendMode) -> bool {
        self.blend_modes
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Optional colour set and blend mode applied to one element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TintSpec {
    #[serde(default)]
    pub colors: Option<ColorSet>,
    #[serde(default)]
    pub blend_mode: Option<BlendMode>,
}

impl TintSpec {
    pub fn new(colors: Option<ColorSet>, blend_mode: Option<BlendMode>) -> Self {
        Self { colors, blend_mode }
    }
}

/// A base image with its tint applied, owned by a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedAsset {
    image: RgbaImage,
    state: Option<InteractionState>,
    color: Option<Color>,
    blend_mode: Option<BlendMode>,
}

impl ComposedAsset {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Interaction state carried by a stateful asset.
    pub fn state(&self) -> Option<InteractionState> {
        self.state
    }

    /// Tint colour that was applied, if any.
    pub fn applied_color(&self) -> Option<Color> {
        self.color
    }

    /// Blend mode that was actually used for the tint.
    pub fn applied_blend_mode(&self) -> Option<BlendMode> {
        self.blend_mode
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Applies `tint` to a private copy of `base`.
///
/// A blend mode the platform cannot honour is dropped in favour of
/// [`DEFAULT_TINT_MODE`]; the colour is still applied.
pub fn compose(
    base: &BaseImage,
    tint: &TintSpec,
    state: InteractionState,
    capabilities: &Capabilities,
) -> ComposedAsset {
    let mut image = base.pixels().clone();
    let mut applied = None;
    let mut blend_mode = None;

    if let Some(colors) = &tint.colors {
        let color = colors.color_for(&state);
        let mode = match tint.blend_mode {
            Some(mode) if capabilities.supports(mode) => mode,
            Some(mode) => {
                tracing::debug!(?mode, "blend mode unsupported, using default tint mode");
                DEFAULT_TINT_MODE
            }
            None => DEFAULT_TINT_MODE,
        };
        tint_in_place(&mut image, color, mode);
        applied = Some(color);
        blend_mode = Some(mode);
    }

    let stateful = base.is_stateful() || tint.colors.as_ref().is_some_and(ColorSet::is_stateful);

    ComposedAsset {
        image,
        state: stateful.then_some(state),
        color: applied,
        blend_mode,
    }
}

fn tint_in_place(image: &mut RgbaImage, color: Color, mode: BlendMode) {
    let src = color.premultiplied();
    for pixel in image.pixels_mut() {
        let dst = premultiply(pixel.0);
        pixel.0 = unpremultiply(mode.apply(src, dst));
    }
}

pub(crate) fn premultiply(px: [u8; 4]) -> [u8; 4] {
    let a = u16::from(px[3]);
    [
        mul_div255(u16::from(px[0]), a),
        mul_div255(u16::from(px[1]), a),
        mul_div255(u16::from(px[2]), a),
        px[3],
    ]
}

pub(crate) fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let channel = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [channel(px[0]), channel(px[1]), channel(px[2]), px[3]]
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
