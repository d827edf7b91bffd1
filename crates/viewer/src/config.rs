use foundation::math::Vec3;
use runtime::scroll::{ScrollEdge, Scrub};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::DeviceProfiles;
use crate::error::ConfigError;

/// A rendering capability (engine plugin) to install, with optional
/// constructor options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    #[serde(default)]
    pub options: Value,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// A setting applied to an installed capability once the scene is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySetting {
    pub capability: String,
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub duration_s: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(13.04, -2.01, 2.29),
            target: Vec3::new(0.11, 0.0, 0.0),
            duration_s: 2.0,
        }
    }
}

/// Trigger shape shared by every scroll-bound camera tween.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub start_edge: String,
    pub end_edge: String,
    pub scrub: f64,
    pub immediate_render: bool,
    /// Section whose scroll range drives the return from preview.
    pub exit_section: String,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            start_edge: "top bottom".to_string(),
            end_edge: "top top".to_string(),
            scrub: 2.0,
            immediate_render: false,
            exit_section: ".display-section".to_string(),
        }
    }
}

impl TimelineConfig {
    pub fn edges(&self) -> Result<(ScrollEdge, ScrollEdge), ConfigError> {
        let parse = |s: &str| {
            s.parse::<ScrollEdge>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))
        };
        Ok((parse(&self.start_edge)?, parse(&self.end_edge)?))
    }

    pub fn scrub(&self) -> Scrub {
        Scrub(self.scrub)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub canvas_id: String,
    pub scene_path: String,
    /// Installed in order after the asset manager.
    pub capabilities: Vec<CapabilitySpec>,
    pub post_load: Vec<CapabilitySetting>,
    pub preview: PreviewConfig,
    pub timeline: TimelineConfig,
    pub devices: DeviceProfiles,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            canvas_id: "webgi-canvas".to_string(),
            scene_path: "scene-black.glb".to_string(),
            capabilities: vec![
                CapabilitySpec::new("GBuffer"),
                CapabilitySpec::with_options("Progressive", serde_json::json!({ "maxFrameCount": 32 })),
                CapabilitySpec::with_options("Tonemap", serde_json::json!({ "enabled": true })),
                CapabilitySpec::new("GammaCorrection"),
                CapabilitySpec::new("SSR"),
                CapabilitySpec::new("SSAO"),
                CapabilitySpec::new("Bloom"),
            ],
            post_load: vec![CapabilitySetting {
                capability: "Tonemap".to_string(),
                key: "clipBackground".to_string(),
                value: Value::Bool(true),
            }],
            preview: PreviewConfig::default(),
            timeline: TimelineConfig::default(),
            devices: DeviceProfiles::default(),
        }
    }
}

impl ViewerConfig {
    /// Parses and validates; missing fields take their defaults.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig =
            serde_json::from_str(payload).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.canvas_id.trim().is_empty() {
            return invalid("canvas_id is empty".into());
        }
        if self.scene_path.trim().is_empty() {
            return invalid("scene_path is empty".into());
        }
        if let Some(cap) = self.capabilities.iter().find(|c| c.name.trim().is_empty()) {
            return invalid(format!("capability with empty name: {cap:?}"));
        }

        let preview = &self.preview;
        if !preview.duration_s.is_finite() || preview.duration_s < 0.0 {
            return invalid(format!("preview.duration_s must be >= 0, got {}", preview.duration_s));
        }
        if !preview.position.is_finite() || !preview.target.is_finite() {
            return invalid("preview pose must be finite".into());
        }

        let timeline = &self.timeline;
        if !timeline.scrub.is_finite() || timeline.scrub < 0.0 {
            return invalid(format!("timeline.scrub must be >= 0, got {}", timeline.scrub));
        }
        if timeline.exit_section.trim().is_empty() {
            return invalid("timeline.exit_section is empty".into());
        }
        timeline.edges()?;

        self.devices
            .desktop
            .validate("devices.desktop")
            .map_err(ConfigError::Invalid)?;
        self.devices
            .mobile_or_tablet
            .validate("devices.mobile_or_tablet")
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Every section selector the page must measure, in first-seen order.
    pub fn tracked_sections(&self) -> Vec<String> {
        let keyframes = self
            .devices
            .desktop
            .keyframes
            .iter()
            .chain(&self.devices.mobile_or_tablet.keyframes)
            .map(|k| k.selector.as_str());
        let mut out: Vec<String> = Vec::new();
        for selector in keyframes.chain(std::iter::once(self.timeline.exit_section.as_str())) {
            if !out.iter().any(|s| s == selector) {
                out.push(selector.to_string());
            }
        }
        out
    }
}
