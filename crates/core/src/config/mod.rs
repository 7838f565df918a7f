use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    assets::{builtin, AssetSpec, BaseImage},
    tint::{BlendMode, ColorSet, TintSpec},
    Result,
};

/// Externally settable configuration of one clock component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentConfig {
    /// Zone id; `None` selects the system zone.
    pub zone_id: Option<String>,
    pub face: AssetSpec,
    pub hour: AssetSpec,
    pub minute: AssetSpec,
    pub second: AssetSpec,
}

impl ComponentConfig {
    /// System zone with the built-in face and hands, untinted.
    pub fn with_builtin_assets() -> Self {
        Self {
            zone_id: None,
            face: AssetSpec::from_image(builtin::face()),
            hour: AssetSpec::from_image(builtin::hour_hand()),
            minute: AssetSpec::from_image(builtin::minute_hand()),
            second: AssetSpec::from_image(builtin::second_hand()),
        }
    }
}

/// On-disk configuration read by the command line host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub zone_id: Option<String>,
    pub size: SizeConfig,
    pub face: ElementConfig,
    pub hour: ElementConfig,
    pub minute: ElementConfig,
    pub second: ElementConfig,
}

impl ClockConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Loads every configured image, substituting built-in artwork for
    /// elements without an image path.
    pub fn into_component_config(self) -> Result<ComponentConfig> {
        Ok(ComponentConfig {
            zone_id: self.zone_id,
            face: self.face.into_asset_spec(builtin::face)?,
            hour: self.hour.into_asset_spec(builtin::hour_hand)?,
            minute: self.minute.into_asset_spec(builtin::minute_hand)?,
            second: self.second.into_asset_spec(builtin::second_hand)?,
        })
    }
}

/// Render target dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementConfig {
    pub image: Option<PathBuf>,
    pub tint: Option<ColorSet>,
    /// Kebab-case mode name, or one of the legacy integer attribute codes.
    #[serde(deserialize_with = "blend_mode_or_code")]
    pub blend_mode: Option<BlendMode>,
    /// Whether the image reacts to interaction state.
    pub stateful: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlendModeRepr {
    Named(BlendMode),
    Code(i32),
}

fn blend_mode_or_code<'de, D>(deserializer: D) -> std::result::Result<Option<BlendMode>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<BlendModeRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BlendModeRepr::Named(mode)) => Ok(Some(mode)),
        Some(BlendModeRepr::Code(code)) => BlendMode::from_attribute(code)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown blend mode code {code}"))),
    }
}

impl ElementConfig {
    fn into_asset_spec(self, fallback: fn() -> BaseImage) -> Result<AssetSpec> {
        let image = match &self.image {
            Some(path) => BaseImage::open(path)?,
            None => fallback(),
        };
        let image = if self.stateful { image.stateful() } else { image };
        Ok(AssetSpec::new(Some(image), TintSpec::new(self.tint, self.blend_mode)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tint::Color;

    #[test]
    fn parses_a_full_config() {
        let raw = r##"{
            "zone_id": "Europe/Berlin",
            "size": { "width": 320, "height": 200 },
            "second": {
                "tint": {
                    "default": "#FF0000",
                    "entries": [{ "when": { "pressed": true }, "color": "#80FFFFFF" }]
                },
                "blend_mode": "source-atop"
            }
        }"##;

        let config: ClockConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.zone_id.as_deref(), Some("Europe/Berlin"));
        assert_eq!(config.size.width, 320);
        assert_eq!(config.second.blend_mode, Some(BlendMode::SourceAtop));

        let tint = config.second.tint.as_ref().unwrap();
        assert_eq!(tint.default, Color::rgb(255, 0, 0));
        assert_eq!(tint.entries[0].color, Color::rgba(255, 255, 255, 128));
        assert_eq!(tint.entries[0].when.pressed, Some(true));
        assert_eq!(config.face, ElementConfig::default());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: ClockConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ClockConfig::default());
        assert_eq!(config.size, SizeConfig::default());
    }

    #[test]
    fn rejects_unknown_blend_modes() {
        let raw = r#"{ "hour": { "blend_mode": "overlay" } }"#;
        assert!(serde_json::from_str::<ClockConfig>(raw).is_err());
    }

    #[test]
    fn accepts_legacy_blend_mode_codes() {
        let raw = r#"{
            "face": { "blend_mode": 16 },
            "hour": { "blend_mode": 5 },
            "minute": { "blend_mode": "screen" },
            "second": { "blend_mode": null }
        }"#;

        let config: ClockConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.face.blend_mode, Some(BlendMode::Plus));
        assert_eq!(config.hour.blend_mode, Some(BlendMode::SourceIn));
        assert_eq!(config.minute.blend_mode, Some(BlendMode::Screen));
        assert_eq!(config.second.blend_mode, None);

        let unknown = r#"{ "hour": { "blend_mode": 7 } }"#;
        assert!(serde_json::from_str::<ClockConfig>(unknown).is_err());
    }

    #[test]
    fn missing_images_fall_back_to_builtin_assets() {
        let component = ClockConfig {
            zone_id: Some("UTC".into()),
            second: ElementConfig {
                blend_mode: Some(BlendMode::Plus),
                ..Default::default()
            },
            ..Default::default()
        }
        .into_component_config()
        .unwrap();

        assert_eq!(component.zone_id.as_deref(), Some("UTC"));
        assert!(component.face.image.is_some());
        assert_eq!(component.second.tint.blend_mode, Some(BlendMode::Plus));
    }

    #[test]
    fn unreadable_image_paths_are_errors() {
        let config = ClockConfig {
            face: ElementConfig {
                image: Some("missing/face.png".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.into_component_config().is_err());
    }
}
