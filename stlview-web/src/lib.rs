/// stlview web host - STL viewing in the browser
///
/// Draws into a `<canvas>` with the 2D context and drives the frame loop
/// from `requestAnimationFrame`. JavaScript talks to [`WebViewer`].
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Once;

use js_sys::{Function, Promise, Uint8Array};
use stlview_core::{loader, LoadFailure, Mesh, StlViewer, Texture, ViewerConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{HtmlCanvasElement, Response, Window};

mod callbacks;
pub mod renderer;
pub mod scheduler;

use callbacks::CallbackTriggers;

pub use renderer::CanvasRenderer;
pub use scheduler::AnimationFrameScheduler;

type Viewer = StlViewer<CanvasRenderer>;

static LOGGING: Once = Once::new();

fn init_logging_once() {
    LOGGING.call_once(|| {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    });
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))
}

/// Viewport size of the canvas as laid out by the page
fn layout_size(canvas: &HtmlCanvasElement) -> (u32, u32) {
    let (w, h) = (canvas.client_width(), canvas.client_height());
    if w > 0 && h > 0 {
        (w as u32, h as u32)
    } else {
        (canvas.width(), canvas.height())
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, LoadFailure> {
    let fail = |reason: String| LoadFailure::Fetch {
        source_id: url.to_string(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| fail("no global window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .and_then(|value| value.dyn_into())
        .map_err(|e| fail(format!("{e:?}")))?;
    if !response.ok() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let body = response.array_buffer().map_err(|e| fail(format!("{e:?}")))?;
    let buffer = JsFuture::from(body)
        .await
        .map_err(|e| fail(format!("{e:?}")))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

async fn fetch_model(url: &str) -> Result<Mesh, LoadFailure> {
    let bytes = fetch_bytes(url).await?;
    loader::load_mesh_bytes(url, &bytes)
}

async fn fetch_matcap(url: &str) -> Result<Texture, LoadFailure> {
    let bytes = fetch_bytes(url).await?;
    loader::decode_texture(url, &bytes)
}

/// JS-facing viewer bound to one canvas
#[wasm_bindgen]
pub struct WebViewer {
    viewer: Rc<RefCell<Viewer>>,
    window: Window,
    /// JS functions registered through `addTrigger`
    js_triggers: CallbackTriggers<Function>,
    on_resize: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl WebViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebViewer, JsValue> {
        Self::build(canvas_id, ViewerConfig::default())
    }

    /// Build a viewer with settings given as TOML
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(canvas_id: &str, config_toml: &str) -> Result<WebViewer, JsValue> {
        let config = ViewerConfig::from_toml_str(config_toml).map_err(js_error)?;
        config.validate().map_err(js_error)?;
        Self::build(canvas_id, config)
    }

    /// Fetch an STL (and optionally a matcap image) and show it.
    ///
    /// The promise rejects with the load failure; the scene keeps rendering.
    #[wasm_bindgen(js_name = loadModel)]
    pub fn load_model(&self, url: String, matcap_url: Option<String>) -> Promise {
        let viewer = Rc::downgrade(&self.viewer);
        future_to_promise(async move {
            let model = fetch_model(&url).await;
            let matcap = match matcap_url {
                Some(matcap_url) => Some(fetch_matcap(&matcap_url).await.map_err(js_error)?),
                None => None,
            };

            let viewer = viewer
                .upgrade()
                .ok_or_else(|| JsValue::from_str("viewer was freed during loading"))?;
            let mut viewer = viewer.borrow_mut();
            viewer.attach_model(model, matcap).map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn start(&self) -> Result<(), JsValue> {
        self.viewer.borrow().start().map_err(js_error)
    }

    pub fn stop(&self) {
        self.viewer.borrow().stop();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.viewer.borrow().is_running()
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.viewer.borrow_mut().resize(width, height);
    }

    pub fn orbit(&self, d_azimuth: f32, d_polar: f32) {
        self.viewer.borrow_mut().orbit(d_azimuth, d_polar);
    }

    pub fn zoom(&self, factor: f32) {
        self.viewer.borrow_mut().zoom(factor);
    }

    #[wasm_bindgen(js_name = setLightY)]
    pub fn set_light_y(&self, y: f32) -> f32 {
        self.viewer.borrow_mut().set_light_y(y)
    }

    #[wasm_bindgen(js_name = lightY)]
    pub fn light_y(&self) -> f32 {
        self.viewer.borrow().light_y()
    }

    /// Run `callback` once per frame before drawing. Anything that is not a
    /// function is ignored.
    #[wasm_bindgen(js_name = addTrigger)]
    pub fn add_trigger(&mut self, callback: JsValue) {
        self.js_triggers.add(callback);
    }

    /// Remove the first registration of `callback`, if any
    #[wasm_bindgen(js_name = offTrigger)]
    pub fn off_trigger(&mut self, callback: JsValue) {
        self.js_triggers.off(&callback);
    }

    #[wasm_bindgen(js_name = triggerCount)]
    pub fn trigger_count(&self) -> usize {
        self.viewer.borrow().frame_loop().triggers().len()
    }
}

impl WebViewer {
    fn build(canvas_id: &str, config: ViewerConfig) -> Result<WebViewer, JsValue> {
        init_logging_once();

        let window = window()?;
        let canvas = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id '{canvas_id}'")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str(&format!("'{canvas_id}' is not a canvas")))?;

        let (width, height) = layout_size(&canvas);
        let renderer = CanvasRenderer::new(canvas).map_err(js_error)?;
        let scheduler = Rc::new(AnimationFrameScheduler::new(window.clone()));
        let viewer = Rc::new(RefCell::new(StlViewer::new(
            config, renderer, scheduler, width, height,
        )));

        let js_triggers = CallbackTriggers::new(viewer.borrow().triggers());
        let on_resize = resize_listener(Rc::downgrade(&viewer));
        window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;

        log::info!("viewer attached to #{canvas_id} at {width}x{height}");
        Ok(WebViewer {
            viewer,
            window,
            js_triggers,
            on_resize,
        })
    }
}

impl Drop for WebViewer {
    fn drop(&mut self) {
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref())
        {
            log::warn!("failed to remove resize listener: {e:?}");
        }
    }
}

fn resize_listener(viewer: Weak<RefCell<Viewer>>) -> Closure<dyn FnMut()> {
    Closure::new(move || {
        let Some(viewer) = viewer.upgrade() else {
            return;
        };
        let Ok(mut viewer) = viewer.try_borrow_mut() else {
            return;
        };
        let (width, height) = layout_size(viewer.renderer().borrow().canvas());
        viewer.resize(width, height);
    })
}

#[wasm_bindgen(start)]
pub fn main() {
    init_logging_once();
}
