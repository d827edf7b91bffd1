//! Seams to the outside world: the rendering engine, the page hosting the
//! canvas, and the device check. The browser front end implements these
//! against real JS objects; tests implement them with recorders.

use std::rc::Rc;

use foundation::math::Vec3;
use futures_util::future::LocalBoxFuture;
use runtime::scroll::LayoutSnapshot;

use crate::config::{CapabilitySetting, CapabilitySpec};
use crate::error::EngineError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FrameEvent {
    /// Before the engine renders a frame.
    PreFrame,
}

pub type FrameListener = Box<dyn FnMut()>;

pub trait RenderEngine {
    fn create(&self, canvas_id: &str) -> Result<Rc<dyn ViewerHandle>, EngineError>;
}

/// A live viewer instance.
pub trait ViewerHandle {
    fn active_camera(&self) -> Rc<dyn CameraHandle>;

    /// Installs the asset manager and returns its loader.
    fn asset_manager(&self) -> LocalBoxFuture<'_, Result<Rc<dyn AssetLoader>, EngineError>>;

    fn add_capability<'a>(
        &'a self,
        capability: &'a CapabilitySpec,
    ) -> LocalBoxFuture<'a, Result<(), EngineError>>;

    fn configure_capability(&self, setting: &CapabilitySetting) -> Result<(), EngineError>;

    fn refresh_pipeline(&self);

    /// Request a redraw on the next frame.
    fn set_dirty(&self);

    fn add_frame_listener(&self, event: FrameEvent, listener: FrameListener);
}

pub trait CameraHandle {
    fn position(&self) -> Vec3;
    fn target(&self) -> Vec3;

    /// Copy a pose into the engine's camera.
    fn set_pose(&self, position: Vec3, target: Vec3);

    /// Recompute the look-at transform from the current pose.
    fn position_target_updated(&self, force_recompute: bool);

    fn set_controls_enabled(&self, enabled: bool);
}

pub trait AssetLoader {
    fn add_from_path<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<(), EngineError>>;
}

/// The marketing page around the canvas.
pub trait HostPage {
    /// Whether the canvas container receives pointer events.
    fn set_canvas_interactive(&self, interactive: bool);
    fn set_content_opacity(&self, opacity: f64);
    fn set_content_layout_class(&self, class_name: &str);
    fn set_exit_control_visible(&self, visible: bool);
    fn scroll_to_top(&self);
    /// Measure the scroll sections and the viewport.
    fn layout(&self) -> LayoutSnapshot;
}

pub trait DeviceClassifier {
    fn is_mobile_or_tablet(&self) -> Result<bool, EngineError>;
}

/// Everything a session needs from outside, bundled for `initialize`.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Rc<dyn RenderEngine>,
    pub host: Rc<dyn HostPage>,
    pub classifier: Rc<dyn DeviceClassifier>,
}
