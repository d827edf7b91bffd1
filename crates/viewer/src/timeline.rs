//! Scroll timeline: the ordered, section-bound camera keyframes for one
//! device class, and their attachment to the tween engine.

use std::rc::Rc;

use foundation::math::Vec3;
use runtime::scroll::{ScrollEdge, ScrollTrigger, Scrub};
use runtime::tween::{TweenEngine, TweenId, TweenSpec, UpdateCallback};
use tracing::debug;

use crate::camera::{CameraBinding, CameraProperty};
use crate::config::TimelineConfig;
use crate::device::{DeviceClass, DeviceProfiles};
use crate::error::ConfigError;

/// One scroll-bound move of the camera position or the camera target.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTransition {
    pub trigger_selector: String,
    pub start_edge: ScrollEdge,
    pub end_edge: ScrollEdge,
    pub scrub: Scrub,
    pub position_target: Option<Vec3>,
    pub camera_target: Option<Vec3>,
    pub immediate_render_on_bind: bool,
}

impl KeyframeTransition {
    pub fn trigger(&self) -> ScrollTrigger {
        ScrollTrigger::new(
            self.trigger_selector.clone(),
            self.start_edge,
            self.end_edge,
            self.scrub,
        )
    }
}

struct TimelineBindings {
    position: CameraBinding,
    target: CameraBinding,
    on_update: UpdateCallback,
}

/// Built transitions together with the camera they will drive.
pub struct ScrollTimeline {
    transitions: Vec<KeyframeTransition>,
    bindings: Option<TimelineBindings>,
}

impl ScrollTimeline {
    fn empty() -> Self {
        Self {
            transitions: Vec::new(),
            bindings: None,
        }
    }

    pub fn transitions(&self) -> &[KeyframeTransition] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Registers every transition as a scroll-bound tween. Each step writes
    /// the camera through its binding and then calls `on_update`.
    pub fn attach(self, tweens: &mut TweenEngine) -> Vec<TweenId> {
        let Some(bindings) = self.bindings else {
            return Vec::new();
        };
        let mut ids = Vec::with_capacity(self.transitions.len());
        for transition in &self.transitions {
            let moves = [
                (transition.position_target, &bindings.position),
                (transition.camera_target, &bindings.target),
            ];
            for (destination, binding) in moves {
                let Some(to) = destination else { continue };
                let spec = TweenSpec::scroll(Rc::new(binding.clone()), to, transition.trigger())
                    .immediate_render(transition.immediate_render_on_bind)
                    .on_update(bindings.on_update.clone());
                ids.push(tweens.add(spec));
            }
        }
        debug!("scroll timeline attached: {} tween(s)", ids.len());
        ids
    }
}

#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    start_edge: ScrollEdge,
    end_edge: ScrollEdge,
    scrub: Scrub,
    immediate_render: bool,
    profiles: DeviceProfiles,
}

impl TimelineBuilder {
    pub fn new(config: &TimelineConfig, profiles: DeviceProfiles) -> Result<Self, ConfigError> {
        let (start_edge, end_edge) = config.edges()?;
        Ok(Self {
            start_edge,
            end_edge,
            scrub: config.scrub(),
            immediate_render: config.immediate_render,
            profiles,
        })
    }

    /// Builds the timeline for `device`. Without a position binding, a
    /// target binding and an update callback the camera is not ready yet,
    /// and the result is empty; the caller builds again once it is.
    pub fn build(
        &self,
        device: DeviceClass,
        position: Option<CameraBinding>,
        target: Option<CameraBinding>,
        on_update: Option<UpdateCallback>,
    ) -> ScrollTimeline {
        let (Some(position), Some(target), Some(on_update)) = (position, target, on_update) else {
            debug!("scroll timeline skipped: camera not bound yet");
            return ScrollTimeline::empty();
        };
        debug_assert_eq!(position.property(), CameraProperty::Position);
        debug_assert_eq!(target.property(), CameraProperty::Target);

        let profile = self.profiles.resolve(device);
        let mut transitions = Vec::with_capacity(profile.keyframes.len() * 2);
        for keyframe in &profile.keyframes {
            if let Some(p) = keyframe.position {
                transitions.push(self.transition(&keyframe.selector, Some(p), None));
            }
            if let Some(t) = keyframe.target {
                transitions.push(self.transition(&keyframe.selector, None, Some(t)));
            }
        }

        ScrollTimeline {
            transitions,
            bindings: Some(TimelineBindings {
                position,
                target,
                on_update,
            }),
        }
    }

    /// The trigger shape applied to a single section.
    pub fn section_trigger(&self, selector: &str) -> ScrollTrigger {
        ScrollTrigger::new(selector, self.start_edge, self.end_edge, self.scrub)
    }

    fn transition(
        &self,
        selector: &str,
        position_target: Option<Vec3>,
        camera_target: Option<Vec3>,
    ) -> KeyframeTransition {
        KeyframeTransition {
            trigger_selector: selector.to_string(),
            start_edge: self.start_edge,
            end_edge: self.end_edge,
            scrub: self.scrub,
            position_target,
            camera_target,
            immediate_render_on_bind: self.immediate_render,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraState, SharedCamera};
    use runtime::frame::Frame;
    use runtime::scroll::{LayoutSnapshot, SectionBounds};
    use std::cell::Cell;

    fn builder() -> TimelineBuilder {
        TimelineBuilder::new(&TimelineConfig::default(), DeviceProfiles::default()).unwrap()
    }

    fn camera() -> SharedCamera {
        SharedCamera::new(CameraState::new(Vec3::new(4.0, 1.0, 6.0), Vec3::ZERO))
    }

    fn noop() -> UpdateCallback {
        Rc::new(|| {})
    }

    #[test]
    fn builds_nothing_until_everything_is_bound() {
        let b = builder();
        let cam = camera();
        for device in [DeviceClass::Desktop, DeviceClass::MobileOrTablet] {
            let pos = || Some(cam.binding(CameraProperty::Position));
            let tgt = || Some(cam.binding(CameraProperty::Target));
            assert!(b.build(device, None, tgt(), Some(noop())).is_empty());
            assert!(b.build(device, pos(), None, Some(noop())).is_empty());
            assert!(b.build(device, pos(), tgt(), None).is_empty());
            assert!(!b.build(device, pos(), tgt(), Some(noop())).is_empty());
        }
    }

    #[test]
    fn unbound_timeline_attaches_nothing() {
        let mut tweens = TweenEngine::new();
        let ids = builder().build(DeviceClass::Desktop, None, None, None).attach(&mut tweens);
        assert!(ids.is_empty());
        assert!(tweens.is_empty());
    }

    #[test]
    fn transitions_follow_page_order_with_device_values() {
        let cam = camera();
        let timeline = builder().build(
            DeviceClass::MobileOrTablet,
            Some(cam.binding(CameraProperty::Position)),
            Some(cam.binding(CameraProperty::Target)),
            Some(noop()),
        );
        let t = timeline.transitions();
        assert_eq!(t.len(), 4);
        assert_eq!(t[0].trigger_selector, ".sound-section");
        assert_eq!(t[0].position_target, Some(Vec3::new(-7.0, -12.2, -6.0)));
        assert_eq!(t[1].camera_target, Some(Vec3::new(0.7, 1.9, 0.7)));
        assert_eq!(t[2].trigger_selector, ".display-section");
        assert_eq!(t[3].camera_target, Some(Vec3::new(-1.62, 0.02, -0.06)));
        for transition in t {
            assert_eq!(transition.start_edge, ScrollEdge::TOP_BOTTOM);
            assert_eq!(transition.end_edge, ScrollEdge::TOP_TOP);
            assert_eq!(transition.scrub, Scrub(2.0));
            assert!(!transition.immediate_render_on_bind);
        }
    }

    #[test]
    fn attached_timeline_moves_camera_and_reports_every_step() {
        let cam = camera();
        let steps = Rc::new(Cell::new(0));
        let counter = steps.clone();
        let on_update: UpdateCallback = Rc::new(move || counter.set(counter.get() + 1));

        let timeline = builder().build(
            DeviceClass::Desktop,
            Some(cam.binding(CameraProperty::Position)),
            Some(cam.binding(CameraProperty::Target)),
            Some(on_update),
        );
        let mut tweens = TweenEngine::new();
        assert_eq!(timeline.attach(&mut tweens).len(), 4);

        let layout = LayoutSnapshot::new(800.0)
            .with_section(".sound-section", SectionBounds::new(800.0, 800.0))
            .with_section(".display-section", SectionBounds::new(1600.0, 800.0));
        tweens.set_scroll(800.0);

        let mut frame = Frame::origin();
        for _ in 0..600 {
            frame = frame.advance(1.0 / 60.0);
            tweens.step(frame, &layout);
        }
        assert!(cam.position().approx_eq(Vec3::new(-3.38, -10.74, -5.93), 1e-9));
        assert!(cam.target().approx_eq(Vec3::new(1.52, 0.77, -1.08), 1e-9));
        assert!(steps.get() > 2);
    }
}
