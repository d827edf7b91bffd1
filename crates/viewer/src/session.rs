//! Viewer session lifecycle and the preview state machine.
//!
//! `Initializing -> Ready(Normal) <-> Ready(Preview)`. A [`ViewerSession`]
//! only exists once initialization has fully succeeded; the host-facing
//! [`ViewerController`] covers the time before that.

use std::rc::Rc;

use foundation::math::Vec3;
use runtime::dirty::DirtyFlag;
use runtime::frame::Frame;
use runtime::scroll::LayoutSnapshot;
use runtime::tween::{StepSummary, TweenEngine, TweenSpec, UpdateCallback};
use tracing::{debug, info};

use crate::camera::{CameraProperty, CameraState, SharedCamera};
use crate::config::ViewerConfig;
use crate::device::{DeviceClass, DeviceProfile};
use crate::engine::{CameraHandle, Collaborators, FrameEvent, HostPage, ViewerHandle};
use crate::error::{InitStep, SessionError};
use crate::timeline::TimelineBuilder;

const PREVIEW_POSITION: &str = "preview.position";
const PREVIEW_TARGET: &str = "preview.target";
const EXIT_POSITION: &str = "exit.position";
const EXIT_TARGET: &str = "exit.target";

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum SessionMode {
    #[default]
    Normal,
    Preview,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotReady,
    AlreadyInPreview,
    AlreadyNormal,
}

/// Outcome of a mode change request. Redundant or premature requests are
/// ignored rather than treated as errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(IgnoreReason),
}

pub struct ViewerSession {
    device: DeviceClass,
    profile: DeviceProfile,
    config: ViewerConfig,
    timeline: TimelineBuilder,
    viewer: Rc<dyn ViewerHandle>,
    camera_handle: Rc<dyn CameraHandle>,
    camera: SharedCamera,
    dirty: DirtyFlag,
    /// Set while the shared camera holds a write the engine has not seen.
    unpushed: DirtyFlag,
    on_update: UpdateCallback,
    host: Rc<dyn HostPage>,
    tweens: TweenEngine,
    layout: LayoutSnapshot,
    frame: Frame,
    mode: SessionMode,
}

impl ViewerSession {
    /// Runs the setup pipeline in order. Any failing step aborts the whole
    /// session; nothing partially initialized escapes.
    pub async fn initialize(
        collaborators: Collaborators,
        config: ViewerConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let timeline = TimelineBuilder::new(&config.timeline, config.devices.clone())?;
        let Collaborators {
            engine,
            host,
            classifier,
        } = collaborators;

        let viewer = engine
            .create(&config.canvas_id)
            .map_err(|e| SessionError::step(InitStep::CreateViewer, e))?;

        let device = DeviceClass::detect(&*classifier);
        let profile = config.devices.resolve(device).clone();
        info!("viewer created for {device:?}");

        let assets = viewer
            .asset_manager()
            .await
            .map_err(|e| SessionError::step(InitStep::AssetManager, e))?;

        let camera_handle = viewer.active_camera();
        let camera = SharedCamera::new(CameraState::new(
            camera_handle.position(),
            camera_handle.target(),
        ));

        for capability in &config.capabilities {
            viewer
                .add_capability(capability)
                .await
                .map_err(|e| SessionError::step(InitStep::Capability(capability.name.clone()), e))?;
            debug!("capability {} installed", capability.name);
        }
        viewer.refresh_pipeline();

        assets
            .add_from_path(&config.scene_path)
            .await
            .map_err(|e| SessionError::step(InitStep::LoadScene(config.scene_path.clone()), e))?;
        info!("scene {} loaded", config.scene_path);

        for setting in &config.post_load {
            viewer.configure_capability(setting).map_err(|e| {
                SessionError::step(InitStep::ConfigureCapability(setting.capability.clone()), e)
            })?;
        }

        camera_handle.set_controls_enabled(profile.controls_on_start);

        let unpushed = DirtyFlag::new();
        if let Some(framing) = &profile.initial_framing {
            camera.set_position(framing.position);
            camera.set_target(framing.target);
            unpushed.set();
            host.set_content_layout_class(&framing.layout_class);
        }

        host.scroll_to_top();
        let mut tweens = TweenEngine::new();
        tweens.set_scroll(0.0);

        let dirty = DirtyFlag::new_dirty();
        viewer.add_frame_listener(
            FrameEvent::PreFrame,
            pre_frame_hook(
                dirty.clone(),
                unpushed.clone(),
                camera.clone(),
                camera_handle.clone(),
            ),
        );

        let on_update: UpdateCallback = {
            let dirty = dirty.clone();
            let unpushed = unpushed.clone();
            let viewer = viewer.clone();
            Rc::new(move || {
                unpushed.set();
                dirty.set();
                viewer.set_dirty();
            })
        };

        let ids = timeline
            .build(
                device,
                Some(camera.binding(CameraProperty::Position)),
                Some(camera.binding(CameraProperty::Target)),
                Some(on_update.clone()),
            )
            .attach(&mut tweens);
        info!("viewer ready: {} scroll keyframe tween(s)", ids.len());

        let layout = host.layout();
        Ok(Self {
            device,
            profile,
            config,
            timeline,
            viewer,
            camera_handle,
            camera,
            dirty,
            unpushed,
            on_update,
            host,
            tweens,
            layout,
            frame: Frame::origin(),
            mode: SessionMode::Normal,
        })
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn camera(&self) -> CameraState {
        self.camera.snapshot()
    }

    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }

    pub fn tweens(&self) -> &TweenEngine {
        &self.tweens
    }

    pub fn viewer(&self) -> &Rc<dyn ViewerHandle> {
        &self.viewer
    }

    /// Page scrolled to `scroll_y` (CSS pixels from the top).
    pub fn on_scroll(&mut self, scroll_y: f64) {
        self.tweens.set_scroll(scroll_y);
    }

    /// Re-measure the page sections, e.g. after a resize.
    pub fn relayout(&mut self) {
        self.layout = self.host.layout();
    }

    /// Advance tweens by one animation frame of `dt_s` seconds.
    pub fn advance(&mut self, dt_s: f64) -> StepSummary {
        adopt_engine_pose(&self.unpushed, &self.camera, &*self.camera_handle);
        self.frame = self.frame.advance(dt_s);
        self.tweens.step(self.frame, &self.layout)
    }

    pub fn enter_preview(&mut self) -> Transition {
        if self.mode == SessionMode::Preview {
            debug!("enter_preview ignored: already in preview");
            return Transition::Ignored(IgnoreReason::AlreadyInPreview);
        }
        self.mode = SessionMode::Preview;
        self.tweens.set_scroll_suspended(true);
        self.tweens.cancel_channel(EXIT_POSITION);
        self.tweens.cancel_channel(EXIT_TARGET);

        self.host.set_canvas_interactive(true);
        self.host.set_content_opacity(0.0);
        self.host.set_exit_control_visible(true);

        let preview = &self.config.preview;
        let position = self.timed(
            CameraProperty::Position,
            preview.position,
            preview.duration_s,
            PREVIEW_POSITION,
        );
        let target = self.timed(
            CameraProperty::Target,
            preview.target,
            preview.duration_s,
            PREVIEW_TARGET,
        );
        self.tweens.add(position);
        self.tweens.add(target);

        self.camera_handle.set_controls_enabled(true);
        info!("entered preview");
        Transition::Applied
    }

    pub fn exit_preview(&mut self) -> Transition {
        if self.mode == SessionMode::Normal {
            debug!("exit_preview ignored: not in preview");
            return Transition::Ignored(IgnoreReason::AlreadyNormal);
        }
        self.mode = SessionMode::Normal;

        self.host.set_canvas_interactive(false);
        self.host.set_content_opacity(1.0);
        self.host.set_exit_control_visible(false);
        self.camera_handle.set_controls_enabled(false);

        self.tweens.cancel_channel(PREVIEW_POSITION);
        self.tweens.cancel_channel(PREVIEW_TARGET);
        self.tweens.set_scroll_suspended(false);
        let section = &self.config.timeline.exit_section;
        let position = self.scrolled(
            CameraProperty::Position,
            self.profile.exit_position,
            section,
            EXIT_POSITION,
        );
        let target = self.scrolled(
            CameraProperty::Target,
            self.profile.exit_target,
            section,
            EXIT_TARGET,
        );
        self.tweens.add(position);
        self.tweens.add(target);
        info!("exited preview");
        Transition::Applied
    }

    fn timed(
        &self,
        property: CameraProperty,
        to: Vec3,
        duration_s: f64,
        channel: &'static str,
    ) -> TweenSpec {
        TweenSpec::timed(Rc::new(self.camera.binding(property)), to, duration_s)
            .channel(channel)
            .on_update(self.on_update.clone())
    }

    fn scrolled(
        &self,
        property: CameraProperty,
        to: Vec3,
        section: &str,
        channel: &'static str,
    ) -> TweenSpec {
        let trigger = self.timeline.section_trigger(section);
        TweenSpec::scroll(Rc::new(self.camera.binding(property)), to, trigger)
            .immediate_render(self.config.timeline.immediate_render)
            .channel(channel)
            .on_update(self.on_update.clone())
    }
}

/// Once per engine frame: a pending camera write is pushed to the engine,
/// otherwise the engine pose (possibly moved by the user's controls) is
/// taken over. A dirty frame recomputes the look-at exactly once.
fn pre_frame_hook(
    dirty: DirtyFlag,
    unpushed: DirtyFlag,
    camera: SharedCamera,
    handle: Rc<dyn CameraHandle>,
) -> Box<dyn FnMut()> {
    Box::new(move || {
        if unpushed.test_and_clear() {
            let pose = camera.snapshot();
            handle.set_pose(pose.position(), pose.target());
        } else {
            adopt_engine_pose(&unpushed, &camera, &*handle);
        }
        if dirty.test_and_clear() {
            handle.position_target_updated(true);
        }
    })
}

/// Copies the engine camera into the shared state unless a write of ours is
/// still waiting to be pushed.
fn adopt_engine_pose(unpushed: &DirtyFlag, camera: &SharedCamera, handle: &dyn CameraHandle) {
    if unpushed.is_set() {
        return;
    }
    camera.set_position(handle.position());
    camera.set_target(handle.target());
}

/// Host-facing wrapper that exists before the session does.
#[derive(Default)]
pub enum ViewerController {
    #[default]
    Initializing,
    Ready(Box<ViewerSession>),
    Failed(SessionError),
}

impl ViewerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of [`ViewerSession::initialize`].
    pub fn install(
        &mut self,
        result: Result<ViewerSession, SessionError>,
    ) -> Result<(), SessionError> {
        match result {
            Ok(session) => {
                *self = ViewerController::Ready(Box::new(session));
                Ok(())
            }
            Err(err) => {
                *self = ViewerController::Failed(err.clone());
                Err(err)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewerController::Ready(_))
    }

    pub fn session(&self) -> Option<&ViewerSession> {
        match self {
            ViewerController::Ready(session) => Some(session.as_ref()),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut ViewerSession> {
        match self {
            ViewerController::Ready(session) => Some(session.as_mut()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            ViewerController::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn trigger_preview(&mut self) -> Transition {
        match self.session_mut() {
            Some(session) => session.enter_preview(),
            None => {
                debug!("trigger_preview ignored: viewer not ready");
                Transition::Ignored(IgnoreReason::NotReady)
            }
        }
    }

    pub fn exit_preview(&mut self) -> Transition {
        match self.session_mut() {
            Some(session) => session.exit_preview(),
            None => Transition::Ignored(IgnoreReason::NotReady),
        }
    }

    pub fn on_scroll(&mut self, scroll_y: f64) {
        if let Some(session) = self.session_mut() {
            session.on_scroll(scroll_y);
        }
    }

    pub fn relayout(&mut self) {
        if let Some(session) = self.session_mut() {
            session.relayout();
        }
    }

    pub fn is_preview(&self) -> bool {
        self.session()
            .is_some_and(|s| s.mode() == SessionMode::Preview)
    }

    pub fn advance(&mut self, dt_s: f64) -> StepSummary {
        self.session_mut()
            .map(|s| s.advance(dt_s))
            .unwrap_or_default()
    }
}
