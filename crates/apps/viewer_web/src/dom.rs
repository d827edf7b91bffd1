use runtime::scroll::{LayoutSnapshot, SectionBounds};
use viewer::{DeviceClass, DeviceClassifier, EngineError, HostPage};
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, Window};

/// The page elements the session toggles, looked up once by id.
pub struct DomHost {
    window: Window,
    document: Document,
    canvas_container: HtmlElement,
    content: HtmlElement,
    exit_control: Option<HtmlElement>,
    tracked_sections: Vec<String>,
}

impl DomHost {
    pub fn new(
        container_id: &str,
        content_id: &str,
        exit_control_id: Option<&str>,
        tracked_sections: Vec<String>,
    ) -> Result<Self, EngineError> {
        let window = web_sys::window().ok_or_else(|| EngineError::new("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| EngineError::new("no document"))?;
        let canvas_container = element_by_id(&document, container_id)?;
        let content = element_by_id(&document, content_id)?;
        let exit_control = exit_control_id
            .map(|id| element_by_id(&document, id))
            .transpose()?;
        Ok(Self {
            window,
            document,
            canvas_container,
            content,
            exit_control,
            tracked_sections,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn exit_control(&self) -> Option<&HtmlElement> {
        self.exit_control.as_ref()
    }

    pub fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn set_style(&self, el: &HtmlElement, property: &str, value: &str) {
        if let Err(err) = el.style().set_property(property, value) {
            tracing::warn!(property, value, ?err, "failed to set style");
        }
    }
}

fn element_by_id(document: &Document, id: &str) -> Result<HtmlElement, EngineError> {
    document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        .ok_or_else(|| EngineError::new(format!("element '#{id}' not found")))
}

impl HostPage for DomHost {
    fn set_canvas_interactive(&self, interactive: bool) {
        let value = if interactive { "all" } else { "none" };
        self.set_style(&self.canvas_container, "pointer-events", value);
    }

    fn set_content_opacity(&self, opacity: f64) {
        self.set_style(&self.content, "opacity", &opacity.to_string());
    }

    fn set_content_layout_class(&self, class_name: &str) {
        self.content.set_class_name(class_name);
    }

    fn set_exit_control_visible(&self, visible: bool) {
        if let Some(el) = &self.exit_control {
            el.set_hidden(!visible);
        }
    }

    fn scroll_to_top(&self) {
        self.window.scroll_to_with_x_and_y(0.0, 0.0);
    }

    fn layout(&self) -> LayoutSnapshot {
        let viewport_height = self
            .window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let scroll_y = self.scroll_y();
        let mut snapshot = LayoutSnapshot::new(viewport_height);
        for selector in &self.tracked_sections {
            match self.document.query_selector(selector) {
                Ok(Some(el)) => {
                    let rect = el.get_bounding_client_rect();
                    snapshot.insert(
                        selector.clone(),
                        SectionBounds::new(rect.top() + scroll_y, rect.height()),
                    );
                }
                Ok(None) => tracing::debug!(selector, "section not on page"),
                Err(err) => tracing::warn!(selector, ?err, "bad section selector"),
            }
        }
        snapshot
    }
}

/// Classifies by user agent and touch support.
pub struct UserAgentClassifier;

impl DeviceClassifier for UserAgentClassifier {
    fn is_mobile_or_tablet(&self) -> Result<bool, EngineError> {
        let window = web_sys::window().ok_or_else(|| EngineError::new("no window"))?;
        let navigator = window.navigator();
        let user_agent = navigator
            .user_agent()
            .map_err(|_| EngineError::new("user agent unavailable"))?;
        let touch_points = navigator.max_touch_points().max(0) as u32;
        Ok(DeviceClass::from_user_agent(&user_agent, touch_points).is_mobile_or_tablet())
    }
}
