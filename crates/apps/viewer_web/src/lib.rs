use std::cell::{Cell, RefCell};
use std::rc::Rc;

use console_error_panic_hook::set_once;
use viewer::{
    Collaborators, InitStep, SessionError, Transition, ViewerConfig, ViewerController,
    ViewerSession,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod bridge;
mod dom;
mod logging;

use bridge::JsEngine;
use dom::{DomHost, UserAgentClassifier};

/// Longest step the animation loop will integrate after a stalled tab.
const MAX_FRAME_DT_S: f64 = 0.1;

thread_local! {
    static VIEWER: RefCell<ViewerController> = RefCell::new(ViewerController::new());
    // Page callbacks stay registered for the life of the page.
    static LISTENERS: RefCell<Vec<Closure<dyn FnMut()>>> = const { RefCell::new(Vec::new()) };
}

fn init_panic_hook() {
    set_once();
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    init_panic_hook();
    logging::init(tracing::Level::INFO);
    Ok(())
}

/// Boots the viewer into `#{canvas_id}` (from the config) and wires the page.
///
/// `config_json` may be omitted or partial; unspecified fields keep their
/// defaults.
#[wasm_bindgen(js_name = startViewer)]
pub fn start_viewer(
    container_id: String,
    content_id: String,
    exit_control_id: Option<String>,
    config_json: Option<String>,
) {
    spawn_local(async move {
        if let Err(err) =
            start_viewer_inner(&container_id, &content_id, exit_control_id.as_deref(), config_json)
                .await
        {
            tracing::error!(%err, "viewer failed to start");
            web_sys::console::error_1(&JsValue::from_str(&format!("viewer init error: {err}")));
        }
    });
}

async fn start_viewer_inner(
    container_id: &str,
    content_id: &str,
    exit_control_id: Option<&str>,
    config_json: Option<String>,
) -> Result<(), String> {
    let result = match prepare_host(container_id, content_id, exit_control_id, config_json) {
        Ok((host, config)) => {
            let collaborators = Collaborators {
                engine: Rc::new(JsEngine),
                host: host.clone(),
                classifier: Rc::new(UserAgentClassifier),
            };
            ViewerSession::initialize(collaborators, config)
                .await
                .map(|session| (host, session))
        }
        Err(err) => Err(err),
    };

    // Every outcome lands in the controller so `lastError()` can report it.
    let host = match result {
        Ok((host, session)) => {
            VIEWER
                .with(|v| v.borrow_mut().install(Ok(session)))
                .map_err(|e| e.to_string())?;
            host
        }
        Err(err) => {
            return VIEWER
                .with(|v| v.borrow_mut().install(Err(err)))
                .map_err(|e| e.to_string());
        }
    };

    wire_page(&host)?;
    start_animation_loop()?;
    Ok(())
}

fn prepare_host(
    container_id: &str,
    content_id: &str,
    exit_control_id: Option<&str>,
    config_json: Option<String>,
) -> Result<(Rc<DomHost>, ViewerConfig), SessionError> {
    let config = match config_json.as_deref() {
        Some(json) => ViewerConfig::from_json(json)?,
        None => ViewerConfig::default(),
    };
    let host = DomHost::new(container_id, content_id, exit_control_id, config.tracked_sections())
        .map_err(|e| SessionError::step(InitStep::HostPage, e))?;
    Ok((Rc::new(host), config))
}

fn keep(closure: Closure<dyn FnMut()>) {
    LISTENERS.with(|l| l.borrow_mut().push(closure));
}

fn wire_page(host: &Rc<DomHost>) -> Result<(), String> {
    let window = host.window();

    let scroll_host = host.clone();
    let on_scroll = Closure::wrap(Box::new(move || {
        let scroll_y = scroll_host.scroll_y();
        VIEWER.with(|v| v.borrow_mut().on_scroll(scroll_y));
    }) as Box<dyn FnMut()>);
    window
        .add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())
        .map_err(|e| format!("scroll listener: {e:?}"))?;
    keep(on_scroll);

    let on_resize = Closure::wrap(Box::new(move || {
        VIEWER.with(|v| v.borrow_mut().relayout());
    }) as Box<dyn FnMut()>);
    window
        .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
        .map_err(|e| format!("resize listener: {e:?}"))?;
    keep(on_resize);

    if let Some(button) = host.exit_control() {
        let on_exit = Closure::wrap(Box::new(move || {
            VIEWER.with(|v| v.borrow_mut().exit_preview());
        }) as Box<dyn FnMut()>);
        button
            .add_event_listener_with_callback("click", on_exit.as_ref().unchecked_ref())
            .map_err(|e| format!("exit listener: {e:?}"))?;
        keep(on_exit);
    }

    // Seed scroll progress for pages restored mid-scroll.
    let scroll_y = host.scroll_y();
    VIEWER.with(|v| v.borrow_mut().on_scroll(scroll_y));
    Ok(())
}

fn request_animation_frame(callback: &Closure<dyn FnMut(f64)>) -> Result<(), String> {
    let window = web_sys::window().ok_or("no window")?;
    window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|e| format!("requestAnimationFrame: {e:?}"))?;
    Ok(())
}

fn start_animation_loop() -> Result<(), String> {
    let slot: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = slot.clone();
    let last_ms: Rc<Cell<Option<f64>>> = Rc::new(Cell::new(None));

    *slot.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
        let dt_s = match last_ms.replace(Some(now_ms)) {
            Some(prev) => ((now_ms - prev) / 1000.0).clamp(0.0, MAX_FRAME_DT_S),
            None => 0.0,
        };
        VIEWER.with(|v| v.borrow_mut().advance(dt_s));
        if let Some(cb) = next.borrow().as_ref() {
            if let Err(err) = request_animation_frame(cb) {
                tracing::error!(%err, "animation loop stopped");
            }
        }
    }) as Box<dyn FnMut(f64)>));

    match slot.borrow().as_ref() {
        Some(cb) => request_animation_frame(cb),
        None => Ok(()),
    }
}

/// Enters preview mode. Returns false while the viewer is loading or
/// already previewing.
#[wasm_bindgen(js_name = triggerPreview)]
pub fn trigger_preview() -> bool {
    VIEWER.with(|v| v.borrow_mut().trigger_preview()) == Transition::Applied
}

#[wasm_bindgen(js_name = exitPreview)]
pub fn exit_preview() -> bool {
    VIEWER.with(|v| v.borrow_mut().exit_preview()) == Transition::Applied
}

#[wasm_bindgen(js_name = isPreviewMode)]
pub fn is_preview_mode() -> bool {
    VIEWER.with(|v| v.borrow().is_preview())
}

#[wasm_bindgen(js_name = isReady)]
pub fn is_ready() -> bool {
    VIEWER.with(|v| v.borrow().is_ready())
}

/// The initialization error, if startup failed.
#[wasm_bindgen(js_name = lastError)]
pub fn last_error() -> Option<String> {
    VIEWER.with(|v| v.borrow().error().map(|e| e.to_string()))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn malformed_config_is_reported_as_failed_start() {
        let result =
            start_viewer_inner("viewer-container", "content", None, Some("{bad".to_string())).await;
        assert!(result.is_err());
        assert!(!is_ready());
        assert!(last_error().is_some_and(|e| e.contains("parse error")));
    }

    #[wasm_bindgen_test]
    async fn missing_page_elements_are_reported_as_failed_start() {
        let result = start_viewer_inner("no-such-container", "no-such-content", None, None).await;
        assert!(result.is_err());
        assert!(!is_ready());
        assert!(last_error().is_some_and(|e| e.contains("find host page elements")));
    }

    #[wasm_bindgen_test]
    fn logging_init_is_idempotent() {
        logging::init(tracing::Level::DEBUG);
        logging::init(tracing::Level::DEBUG);
    }
}
