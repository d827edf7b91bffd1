use foundation::math::Vec3;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::engine::DeviceClassifier;

/// Coarse device class, decided once per session.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    MobileOrTablet,
}

/// User-agent fragments (lowercase) that mark a phone or tablet.
const MOBILE_UA_MARKERS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "bb10",
    "iemobile",
    "opera mini",
    "opera mobi",
    "windows phone",
    "webos",
    "silk/",
    "kindle",
    "playbook",
    "mobile",
    "tablet",
];

impl DeviceClass {
    /// Asks the classifier once. A failing classifier falls back to
    /// `Desktop` so the first render is never blocked.
    pub fn detect(classifier: &dyn DeviceClassifier) -> Self {
        match classifier.is_mobile_or_tablet() {
            Ok(true) => DeviceClass::MobileOrTablet,
            Ok(false) => DeviceClass::Desktop,
            Err(err) => {
                warn!("device classification failed, assuming desktop: {err}");
                DeviceClass::Desktop
            }
        }
    }

    /// Classifies a browser user agent. iPadOS reports a desktop Safari UA,
    /// so a Macintosh UA with a multi-point touch screen counts as a tablet.
    pub fn from_user_agent(user_agent: &str, max_touch_points: u32) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        let class = if MOBILE_UA_MARKERS.iter().any(|m| ua.contains(m))
            || (ua.contains("macintosh") && max_touch_points > 1)
        {
            DeviceClass::MobileOrTablet
        } else {
            DeviceClass::Desktop
        };
        debug!("user agent classified as {class:?}");
        class
    }

    pub fn is_mobile_or_tablet(self) -> bool {
        self == DeviceClass::MobileOrTablet
    }
}

/// Camera pose snapped to at startup, plus the layout class the page
/// content switches to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Framing {
    pub position: Vec3,
    pub target: Vec3,
    pub layout_class: String,
}

/// Camera destinations for one scroll section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionKeyframe {
    pub selector: String,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub target: Option<Vec3>,
}

impl SectionKeyframe {
    pub fn new(selector: impl Into<String>, position: Vec3, target: Vec3) -> Self {
        Self {
            selector: selector.into(),
            position: Some(position),
            target: Some(target),
        }
    }
}

/// Everything that differs between device classes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProfile {
    pub initial_framing: Option<Framing>,
    pub controls_on_start: bool,
    /// In page order.
    pub keyframes: Vec<SectionKeyframe>,
    pub exit_position: Vec3,
    pub exit_target: Vec3,
}

/// A JSON override of one profile. Missing fields keep the built-in value;
/// `"initial_framing": null` turns framing off.
#[derive(Debug, Default, Deserialize)]
struct ProfileOverride {
    #[serde(default, deserialize_with = "present")]
    initial_framing: Option<Option<Framing>>,
    #[serde(default)]
    controls_on_start: Option<bool>,
    #[serde(default)]
    keyframes: Option<Vec<SectionKeyframe>>,
    #[serde(default)]
    exit_position: Option<Vec3>,
    #[serde(default)]
    exit_target: Option<Vec3>,
}

/// Distinguishes an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ProfileOverride {
    fn apply(self, base: DeviceProfile) -> DeviceProfile {
        DeviceProfile {
            initial_framing: self.initial_framing.unwrap_or(base.initial_framing),
            controls_on_start: self.controls_on_start.unwrap_or(base.controls_on_start),
            keyframes: self.keyframes.unwrap_or(base.keyframes),
            exit_position: self.exit_position.unwrap_or(base.exit_position),
            exit_target: self.exit_target.unwrap_or(base.exit_target),
        }
    }
}

impl DeviceProfile {
    pub fn desktop() -> Self {
        Self {
            initial_framing: None,
            controls_on_start: true,
            keyframes: vec![
                SectionKeyframe::new(
                    ".sound-section",
                    Vec3::new(-3.38, -10.74, -5.93),
                    Vec3::new(1.52, 0.77, -1.08),
                ),
                SectionKeyframe::new(
                    ".display-section",
                    Vec3::new(1.56, 5.0, 0.01),
                    Vec3::new(-0.55, 0.32, 0.0),
                ),
            ],
            exit_position: Vec3::new(1.56, 5.0, 0.01),
            exit_target: Vec3::new(-0.5, 0.32, 0.0),
        }
    }

    pub fn mobile_or_tablet() -> Self {
        Self {
            initial_framing: Some(Framing {
                position: Vec3::new(-16.7, 1.17, 11.7),
                target: Vec3::new(0.0, 1.37, 0.0),
                layout_class: "mobile-or-tablate".to_string(),
            }),
            controls_on_start: true,
            keyframes: vec![
                SectionKeyframe::new(
                    ".sound-section",
                    Vec3::new(-7.0, -12.2, -6.0),
                    Vec3::new(0.7, 1.9, 0.7),
                ),
                SectionKeyframe::new(
                    ".display-section",
                    Vec3::new(9.36, 10.95, 0.09),
                    Vec3::new(-1.62, 0.02, -0.06),
                ),
            ],
            exit_position: Vec3::new(1.56, 5.0, 0.01),
            exit_target: Vec3::new(-1.62, 0.02, 0.06),
        }
    }

    fn vectors(&self) -> impl Iterator<Item = Vec3> + '_ {
        let framing = self
            .initial_framing
            .iter()
            .flat_map(|f| [f.position, f.target]);
        let keyframes = self
            .keyframes
            .iter()
            .flat_map(|k| k.position.into_iter().chain(k.target));
        framing
            .chain(keyframes)
            .chain([self.exit_position, self.exit_target])
    }

    pub(crate) fn validate(&self, label: &str) -> Result<(), String> {
        if let Some(bad) = self.vectors().find(|v| !v.is_finite()) {
            return Err(format!("{label}: non-finite vector {bad:?}"));
        }
        if let Some(k) = self.keyframes.iter().find(|k| k.selector.trim().is_empty()) {
            return Err(format!("{label}: keyframe with empty selector {k:?}"));
        }
        Ok(())
    }
}

/// The device-keyed table, looked up once per session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProfiles {
    pub desktop: DeviceProfile,
    pub mobile_or_tablet: DeviceProfile,
}

impl Default for DeviceProfiles {
    fn default() -> Self {
        Self {
            desktop: DeviceProfile::desktop(),
            mobile_or_tablet: DeviceProfile::mobile_or_tablet(),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceProfiles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Overrides {
            #[serde(default)]
            desktop: ProfileOverride,
            #[serde(default)]
            mobile_or_tablet: ProfileOverride,
        }

        let overrides = Overrides::deserialize(deserializer)?;
        Ok(Self {
            desktop: overrides.desktop.apply(DeviceProfile::desktop()),
            mobile_or_tablet: overrides
                .mobile_or_tablet
                .apply(DeviceProfile::mobile_or_tablet()),
        })
    }
}

impl DeviceProfiles {
    pub fn resolve(&self, device: DeviceClass) -> &DeviceProfile {
        match device {
            DeviceClass::Desktop => &self.desktop,
            DeviceClass::MobileOrTablet => &self.mobile_or_tablet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    struct Fixed(Result<bool, EngineError>);

    impl DeviceClassifier for Fixed {
        fn is_mobile_or_tablet(&self) -> Result<bool, EngineError> {
            self.0.clone()
        }
    }

    #[test]
    fn failing_classifier_fails_open_to_desktop() {
        assert_eq!(
            DeviceClass::detect(&Fixed(Err(EngineError::new("navigator unavailable")))),
            DeviceClass::Desktop
        );
        assert_eq!(DeviceClass::detect(&Fixed(Ok(true))), DeviceClass::MobileOrTablet);
        assert_eq!(DeviceClass::detect(&Fixed(Ok(false))), DeviceClass::Desktop);
    }

    #[test]
    fn classifies_common_user_agents() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
        let android_tablet = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Version/17.0 Safari/605.1.15";
        let windows = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";

        assert_eq!(DeviceClass::from_user_agent(iphone, 5), DeviceClass::MobileOrTablet);
        assert_eq!(DeviceClass::from_user_agent(android_tablet, 10), DeviceClass::MobileOrTablet);
        assert_eq!(DeviceClass::from_user_agent(mac, 0), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_user_agent(mac, 5), DeviceClass::MobileOrTablet);
        assert_eq!(DeviceClass::from_user_agent(windows, 0), DeviceClass::Desktop);
    }

    #[test]
    fn exit_targets_differ_per_device() {
        let table = DeviceProfiles::default();
        assert_eq!(
            table.resolve(DeviceClass::MobileOrTablet).exit_target,
            Vec3::new(-1.62, 0.02, 0.06)
        );
        assert_eq!(table.resolve(DeviceClass::Desktop).exit_target, Vec3::new(-0.5, 0.32, 0.0));
    }

    #[test]
    fn only_mobile_has_initial_framing() {
        let table = DeviceProfiles::default();
        assert!(table.resolve(DeviceClass::Desktop).initial_framing.is_none());
        let framing = table
            .resolve(DeviceClass::MobileOrTablet)
            .initial_framing
            .as_ref()
            .expect("mobile framing");
        assert_eq!(framing.position, Vec3::new(-16.7, 1.17, 11.7));
        assert_eq!(framing.target, Vec3::new(0.0, 1.37, 0.0));
    }

    #[test]
    fn partial_profile_override_keeps_builtin_values() {
        let table: DeviceProfiles =
            serde_json::from_str(r#"{ "desktop": { "controls_on_start": false } }"#).unwrap();
        let desktop = DeviceProfile {
            controls_on_start: false,
            ..DeviceProfile::desktop()
        };
        assert_eq!(table.desktop, desktop);
        assert_eq!(table.mobile_or_tablet, DeviceProfile::mobile_or_tablet());
    }

    #[test]
    fn null_framing_turns_mobile_framing_off() {
        let table: DeviceProfiles = serde_json::from_str(
            r#"{ "mobile_or_tablet": { "initial_framing": null, "exit_target": { "x": 0.0, "y": 1.0, "z": 0.0 } } }"#,
        )
        .unwrap();
        let mobile = table.resolve(DeviceClass::MobileOrTablet);
        assert!(mobile.initial_framing.is_none());
        assert_eq!(mobile.exit_target, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(mobile.keyframes, DeviceProfile::mobile_or_tablet().keyframes);
    }
}
