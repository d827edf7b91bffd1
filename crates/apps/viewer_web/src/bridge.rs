use std::cell::RefCell;
use std::rc::Rc;

use foundation::math::Vec3;
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use viewer::{
    AssetLoader, CameraHandle, CapabilitySetting, CapabilitySpec, EngineError, FrameEvent,
    FrameListener, RenderEngine, ViewerHandle,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

// Thin glue over the webgi module. Everything crossing the boundary is a
// plain number, string, or opaque handle.
#[wasm_bindgen(inline_js = "
import {
    ViewerApp,
    AssetManagerPlugin,
    GBufferPlugin,
    ProgressivePlugin,
    TonemapPlugin,
    GammaCorrectionPlugin,
    SSRPlugin,
    SSAOPlugin,
    BloomPlugin,
} from 'webgi';

const CAPABILITIES = {
    GBuffer: () => GBufferPlugin,
    Progressive: (o) => new ProgressivePlugin(o.maxFrameCount ?? 32),
    Tonemap: (o) => new TonemapPlugin(o.enabled ?? true),
    GammaCorrection: () => GammaCorrectionPlugin,
    SSR: () => SSRPlugin,
    SSAO: () => SSAOPlugin,
    Bloom: () => BloomPlugin,
};

const CONFIGURABLE = {
    Tonemap: TonemapPlugin,
    Progressive: ProgressivePlugin,
    GBuffer: GBufferPlugin,
    GammaCorrection: GammaCorrectionPlugin,
    SSR: SSRPlugin,
    SSAO: SSAOPlugin,
    Bloom: BloomPlugin,
};

export function scroll_viewer_create(canvasId) {
    const canvas = document.getElementById(canvasId);
    if (!canvas) throw new Error(`canvas '${canvasId}' not found`);
    return new ViewerApp({ canvas });
}

export function scroll_viewer_add_asset_manager(viewer) {
    return viewer.addPlugin(AssetManagerPlugin);
}

export function scroll_viewer_add_capability(viewer, name, optionsJson) {
    const make = CAPABILITIES[name];
    if (!make) return Promise.reject(new Error(`unknown capability '${name}'`));
    const options = optionsJson ? JSON.parse(optionsJson) ?? {} : {};
    return viewer.addPlugin(make(options));
}

export function scroll_viewer_configure(viewer, name, key, valueJson) {
    const plugin = CONFIGURABLE[name] ? viewer.getPlugin(CONFIGURABLE[name]) : null;
    if (!plugin) throw new Error(`capability '${name}' is not installed`);
    plugin.config[key] = JSON.parse(valueJson);
}

export function scroll_viewer_refresh_pipeline(viewer) {
    viewer.renderer.refreshPipeline();
}

export function scroll_viewer_set_dirty(viewer) {
    viewer.setDirty();
}

export function scroll_viewer_on_frame(viewer, event, callback) {
    viewer.addEventListener(event, () => callback());
}

export function scroll_viewer_active_camera(viewer) {
    return viewer.scene.activeCamera;
}

export function scroll_viewer_load(manager, path) {
    return manager.addFromPath(path);
}

export function scroll_camera_pose(camera) {
    const p = camera.position;
    const t = camera.target;
    return new Float64Array([p.x, p.y, p.z, t.x, t.y, t.z]);
}

export function scroll_camera_set_pose(camera, px, py, pz, tx, ty, tz) {
    camera.position.set(px, py, pz);
    camera.target.set(tx, ty, tz);
}

export function scroll_camera_position_target_updated(camera, force) {
    camera.positionTargetUpdated(force);
}

export function scroll_camera_set_controls_enabled(camera, enabled) {
    camera.setCameraOptions({ controlsEnabled: enabled });
}
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn scroll_viewer_create(canvas_id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    fn scroll_viewer_add_asset_manager(viewer: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch)]
    fn scroll_viewer_add_capability(
        viewer: &JsValue,
        name: &str,
        options_json: &str,
    ) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch)]
    fn scroll_viewer_configure(
        viewer: &JsValue,
        name: &str,
        key: &str,
        value_json: &str,
    ) -> Result<(), JsValue>;

    fn scroll_viewer_refresh_pipeline(viewer: &JsValue);
    fn scroll_viewer_set_dirty(viewer: &JsValue);
    fn scroll_viewer_on_frame(viewer: &JsValue, event: &str, callback: &Closure<dyn FnMut()>);
    fn scroll_viewer_active_camera(viewer: &JsValue) -> JsValue;

    #[wasm_bindgen(catch)]
    fn scroll_viewer_load(manager: &JsValue, path: &str) -> Result<js_sys::Promise, JsValue>;

    fn scroll_camera_pose(camera: &JsValue) -> Vec<f64>;
    fn scroll_camera_set_pose(camera: &JsValue, px: f64, py: f64, pz: f64, tx: f64, ty: f64, tz: f64);
    fn scroll_camera_position_target_updated(camera: &JsValue, force: bool);
    fn scroll_camera_set_controls_enabled(camera: &JsValue, enabled: bool);
}

fn engine_error(context: &str, err: JsValue) -> EngineError {
    let detail = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    EngineError::new(format!("{context}: {detail}"))
}

fn frame_event_name(event: FrameEvent) -> &'static str {
    match event {
        FrameEvent::PreFrame => "preFrame",
    }
}

pub struct JsEngine;

impl RenderEngine for JsEngine {
    fn create(&self, canvas_id: &str) -> Result<Rc<dyn ViewerHandle>, EngineError> {
        let raw = scroll_viewer_create(canvas_id).map_err(|e| engine_error("create viewer", e))?;
        Ok(Rc::new(JsViewer {
            raw,
            listeners: RefCell::new(Vec::new()),
        }))
    }
}

pub struct JsViewer {
    raw: JsValue,
    // The JS side keeps calling these for the life of the page.
    listeners: RefCell<Vec<Closure<dyn FnMut()>>>,
}

impl ViewerHandle for JsViewer {
    fn active_camera(&self) -> Rc<dyn CameraHandle> {
        Rc::new(JsCamera {
            raw: scroll_viewer_active_camera(&self.raw),
        })
    }

    fn asset_manager(&self) -> LocalBoxFuture<'_, Result<Rc<dyn AssetLoader>, EngineError>> {
        async move {
            let promise = scroll_viewer_add_asset_manager(&self.raw)
                .map_err(|e| engine_error("asset manager", e))?;
            let raw = JsFuture::from(promise)
                .await
                .map_err(|e| engine_error("asset manager", e))?;
            Ok(Rc::new(JsAssetLoader { raw }) as Rc<dyn AssetLoader>)
        }
        .boxed_local()
    }

    fn add_capability<'a>(
        &'a self,
        capability: &'a CapabilitySpec,
    ) -> LocalBoxFuture<'a, Result<(), EngineError>> {
        async move {
            let options = if capability.options.is_null() {
                String::new()
            } else {
                capability.options.to_string()
            };
            let promise = scroll_viewer_add_capability(&self.raw, &capability.name, &options)
                .map_err(|e| engine_error(&capability.name, e))?;
            JsFuture::from(promise)
                .await
                .map_err(|e| engine_error(&capability.name, e))?;
            Ok(())
        }
        .boxed_local()
    }

    fn configure_capability(&self, setting: &CapabilitySetting) -> Result<(), EngineError> {
        scroll_viewer_configure(
            &self.raw,
            &setting.capability,
            &setting.key,
            &setting.value.to_string(),
        )
        .map_err(|e| engine_error(&setting.capability, e))
    }

    fn refresh_pipeline(&self) {
        scroll_viewer_refresh_pipeline(&self.raw);
    }

    fn set_dirty(&self) {
        scroll_viewer_set_dirty(&self.raw);
    }

    fn add_frame_listener(&self, event: FrameEvent, listener: FrameListener) {
        let closure = Closure::wrap(listener);
        scroll_viewer_on_frame(&self.raw, frame_event_name(event), &closure);
        self.listeners.borrow_mut().push(closure);
    }
}

pub struct JsCamera {
    raw: JsValue,
}

impl JsCamera {
    fn pose(&self) -> (Vec3, Vec3) {
        match scroll_camera_pose(&self.raw).as_slice() {
            [px, py, pz, tx, ty, tz] => (Vec3::new(*px, *py, *pz), Vec3::new(*tx, *ty, *tz)),
            other => {
                tracing::warn!(len = other.len(), "unexpected camera pose shape");
                (Vec3::ZERO, Vec3::ZERO)
            }
        }
    }
}

impl CameraHandle for JsCamera {
    fn position(&self) -> Vec3 {
        self.pose().0
    }

    fn target(&self) -> Vec3 {
        self.pose().1
    }

    fn set_pose(&self, position: Vec3, target: Vec3) {
        scroll_camera_set_pose(
            &self.raw, position.x, position.y, position.z, target.x, target.y, target.z,
        );
    }

    fn position_target_updated(&self, force_recompute: bool) {
        scroll_camera_position_target_updated(&self.raw, force_recompute);
    }

    fn set_controls_enabled(&self, enabled: bool) {
        scroll_camera_set_controls_enabled(&self.raw, enabled);
    }
}

pub struct JsAssetLoader {
    raw: JsValue,
}

impl AssetLoader for JsAssetLoader {
    fn add_from_path<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<(), EngineError>> {
        async move {
            let promise =
                scroll_viewer_load(&self.raw, path).map_err(|e| engine_error(path, e))?;
            JsFuture::from(promise)
                .await
                .map_err(|e| engine_error(path, e))?;
            Ok(())
        }
        .boxed_local()
    }
}
