//! Browser editing session
//!
//! Wraps [`Editor`] for JavaScript. Page rendering is delegated to a renderer
//! callback (typically PDF.js) with the signature
//! `(bytes: Uint8Array, pageNumber: number, scale: number) => Promise<HTMLCanvasElement>`.
//! The returned canvas is copied onto the visible canvas only if nothing has
//! changed since the render was requested.

use crate::validation::{summarize, DocumentSummary};
use js_sys::{Array, Function, Promise, Uint8Array};
use pdfedit_core::{
    Editor, EditorConfig, PdfEditError, PendingPlacement, PickedImage, RefreshTicket, ScreenPoint,
    ScreenRect, Tool, Viewport,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorTool {
    Text,
    Image,
}

impl From<EditorTool> for Tool {
    fn from(tool: EditorTool) -> Self {
        match tool {
            EditorTool::Text => Tool::Text,
            EditorTool::Image => Tool::Image,
        }
    }
}

#[wasm_bindgen]
pub struct EditorSession {
    editor: Rc<RefCell<Editor>>,
    pending: Option<PendingPlacement>,
    renderer: Option<Function>,
    canvas: Option<HtmlCanvasElement>,
    change_callback: Option<Function>,
}

#[wasm_bindgen]
impl EditorSession {
    /// Create a session. `config` is an optional partial `EditorConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<EditorSession, JsValue> {
        let config: EditorConfig = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };
        Ok(Self::with_config(config))
    }

    /// Renderer callback used for every refresh
    #[wasm_bindgen(js_name = setRenderer)]
    pub fn set_renderer(&mut self, renderer: Function) {
        self.renderer = Some(renderer);
    }

    /// Visible canvas that rendered pages are copied onto
    #[wasm_bindgen(js_name = setCanvas)]
    pub fn set_canvas(&mut self, canvas: HtmlCanvasElement) {
        self.canvas = Some(canvas);
    }

    /// Called with no arguments whenever page, zoom, tool or document change.
    /// Calls are queued as microtasks, so the callback may read the session.
    #[wasm_bindgen(js_name = setChangeCallback)]
    pub fn set_change_callback(&mut self, callback: Function) {
        self.change_callback = Some(callback);
    }

    pub fn upload(&mut self, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let (ticket, summary) = self.upload_internal(bytes).map_err(to_js)?;
        self.schedule(ticket);
        serde_wasm_bindgen::to_value(&summary)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Merge an array of `Uint8Array`s, in order, into the active document
    #[wasm_bindgen(js_name = mergeFiles)]
    pub fn merge_files(&mut self, files: Array) -> Result<(), JsValue> {
        let files: Vec<Vec<u8>> = files
            .iter()
            .map(|file| Uint8Array::new(&file).to_vec())
            .collect();
        if let Some(ticket) = self.merge_internal(&files).map_err(to_js)? {
            self.schedule(ticket);
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&mut self, tool: EditorTool) {
        self.editor.borrow_mut().select_tool(tool.into());
        self.pending = None;
        self.notify();
    }

    /// Record a click at client coordinates. Returns true when the click
    /// started a placement and the UI should ask for text or an image.
    #[wasm_bindgen(js_name = clickCanvas)]
    pub fn click_canvas(&mut self, client_x: f64, client_y: f64) -> Result<bool, JsValue> {
        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| JsValue::from_str("No canvas set"))?;
        let bounds = canvas.get_bounding_client_rect();
        let rect = ScreenRect {
            left: bounds.left(),
            top: bounds.top(),
            width: bounds.width(),
            height: bounds.height(),
        };
        Ok(self.click_internal(
            ScreenPoint {
                x: client_x,
                y: client_y,
            },
            rect,
        ))
    }

    /// Complete a pending text placement; `undefined` or "" cancels it
    #[wasm_bindgen(js_name = placeText)]
    pub fn place_text(&mut self, text: Option<String>) -> Result<(), JsValue> {
        if let Some(ticket) = self.place_text_internal(text.as_deref()).map_err(to_js)? {
            self.schedule(ticket);
        }
        Ok(())
    }

    /// Complete a pending image placement; `undefined` bytes cancel it
    #[wasm_bindgen(js_name = placeImage)]
    pub fn place_image(
        &mut self,
        bytes: Option<Vec<u8>>,
        media_type: Option<String>,
    ) -> Result<(), JsValue> {
        let image = bytes.map(|bytes| PickedImage {
            bytes,
            media_type: media_type.unwrap_or_default(),
        });
        if let Some(ticket) = self.place_image_internal(image).map_err(to_js)? {
            self.schedule(ticket);
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = changePage)]
    pub fn change_page(&mut self, delta: i32) {
        let ticket = self.editor.borrow_mut().change_page(delta);
        if let Some(ticket) = ticket {
            self.schedule(ticket);
        }
    }

    #[wasm_bindgen(js_name = changeZoom)]
    pub fn change_zoom(&mut self, scale: f32) {
        let ticket = self.editor.borrow_mut().change_zoom(scale);
        if let Some(ticket) = ticket {
            self.schedule(ticket);
        }
    }

    /// Re-render the current view
    pub fn refresh(&self) {
        let ticket = self.editor.borrow().refresh();
        if let Some(ticket) = ticket {
            self.schedule(ticket);
        }
    }

    /// Bytes of the current document, or `undefined` when nothing is loaded
    pub fn download(&self) -> Option<Uint8Array> {
        self.editor
            .borrow()
            .download()
            .map(|download| Uint8Array::from(download.bytes.as_bytes()))
    }

    #[wasm_bindgen(getter, js_name = downloadName)]
    pub fn download_name(&self) -> String {
        self.editor.borrow().config().download_name.clone()
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.editor.borrow().current_page()
    }

    #[wasm_bindgen(getter, js_name = totalPages)]
    pub fn total_pages(&self) -> Option<u32> {
        self.editor.borrow().total_pages()
    }

    #[wasm_bindgen(getter)]
    pub fn zoom(&self) -> f32 {
        self.editor.borrow().zoom()
    }

    /// "text", "image", or `undefined` when no tool is active
    #[wasm_bindgen(getter)]
    pub fn tool(&self) -> Option<String> {
        self.editor.borrow().tool().map(|tool| tool.to_string())
    }

    #[wasm_bindgen(getter, js_name = hasDocument)]
    pub fn has_document(&self) -> bool {
        self.editor.borrow().buffer().is_some()
    }

    #[wasm_bindgen(getter, js_name = lastError)]
    pub fn last_error(&self) -> Option<String> {
        self.editor.borrow().last_error().map(|e| e.to_string())
    }
}

impl EditorSession {
    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            editor: Rc::new(RefCell::new(Editor::new(config))),
            pending: None,
            renderer: None,
            canvas: None,
            change_callback: None,
        }
    }

    /// Summarize first so a file the UI cannot describe is never committed
    fn upload_internal(
        &mut self,
        bytes: &[u8],
    ) -> Result<(RefreshTicket, DocumentSummary), PdfEditError> {
        let summary = summarize(bytes)?;
        let ticket = self.editor.borrow_mut().upload(bytes)?;
        self.pending = None;
        Ok((ticket, summary))
    }

    fn merge_internal(&mut self, files: &[Vec<u8>]) -> Result<Option<RefreshTicket>, PdfEditError> {
        let ticket = self.editor.borrow_mut().merge_files(files)?;
        if ticket.is_some() {
            self.pending = None;
        }
        Ok(ticket)
    }

    fn click_internal(&mut self, click: ScreenPoint, rect: ScreenRect) -> bool {
        self.pending = self.editor.borrow().click_canvas(click, rect);
        self.pending.is_some()
    }

    fn place_text_internal(
        &mut self,
        text: Option<&str>,
    ) -> Result<Option<RefreshTicket>, PdfEditError> {
        let Some(pending) = self.pending else {
            return Ok(None);
        };
        let ticket = self.editor.borrow_mut().place_text(&pending, text)?;
        if ticket.is_some() {
            self.pending = None;
        }
        Ok(ticket)
    }

    fn place_image_internal(
        &mut self,
        image: Option<PickedImage>,
    ) -> Result<Option<RefreshTicket>, PdfEditError> {
        let Some(pending) = self.pending else {
            return Ok(None);
        };
        let ticket = self.editor.borrow_mut().place_image(&pending, image)?;
        if ticket.is_some() {
            self.pending = None;
        }
        Ok(ticket)
    }

    /// Queue the change callback. wasm-bindgen holds a borrow of the session
    /// for the duration of the current call, so the callback cannot run inline.
    fn notify(&self) {
        if let Some(callback) = self.change_callback.clone() {
            spawn_local(async move { notify(Some(&callback)) });
        }
    }

    /// Count and render `ticket` in the background, applying results only if
    /// they are still current when they arrive
    fn schedule(&self, ticket: RefreshTicket) {
        self.notify();
        let Some(renderer) = self.renderer.clone() else {
            return;
        };

        let editor = Rc::clone(&self.editor);
        let canvas = self.canvas.clone();
        let on_change = self.change_callback.clone();

        spawn_local(async move {
            let count = pdfedit_core::get_page_count(&ticket.buffer);
            editor.borrow_mut().apply_page_count(ticket.tag(), count);

            let rendered = render_offscreen(&renderer, &ticket).await;
            let viewport = rendered.as_ref().map(|offscreen| Viewport {
                width: offscreen.width(),
                height: offscreen.height(),
                scale: ticket.key.scale,
            });
            let applied = editor
                .borrow_mut()
                .apply_render(ticket.key, viewport.map_err(Clone::clone));

            match (applied, rendered, canvas) {
                (true, Ok(offscreen), Some(canvas)) => {
                    if let Err(e) = copy_canvas(&offscreen, &canvas) {
                        web_sys::console::warn_1(&e);
                    }
                }
                (true, Err(e), _) => {
                    web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
                }
                _ => {}
            }
            notify(on_change.as_ref());
        });
    }
}

async fn render_offscreen(
    renderer: &Function,
    ticket: &RefreshTicket,
) -> Result<HtmlCanvasElement, PdfEditError> {
    let bytes = Uint8Array::from(ticket.buffer.as_bytes());
    let value = renderer
        .call3(
            &JsValue::NULL,
            &bytes,
            &JsValue::from_f64(ticket.key.page_number as f64),
            &JsValue::from_f64(ticket.key.scale as f64),
        )
        .map_err(js_render_error)?;

    let value = match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await.map_err(js_render_error)?,
        Err(value) => value,
    };

    value
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| PdfEditError::Render("Renderer did not return a canvas".into()))
}

fn copy_canvas(from: &HtmlCanvasElement, to: &HtmlCanvasElement) -> Result<(), JsValue> {
    to.set_width(from.width());
    to.set_height(from.height());
    let context = to
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    context.draw_image_with_html_canvas_element(from, 0.0, 0.0)
}

fn notify(callback: Option<&Function>) {
    if let Some(callback) = callback {
        if let Err(e) = callback.call0(&JsValue::NULL) {
            web_sys::console::warn_1(&e);
        }
    }
}

fn js_render_error(err: JsValue) -> PdfEditError {
    PdfEditError::Render(format!("{:?}", err))
}

fn to_js(err: PdfEditError) -> JsValue {
    JsValue::from_str(&err.to_string())
}


#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use crate::validation::tests::create_test_pdf;
    use std::cell::Cell;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn attached_canvas() -> HtmlCanvasElement {
        let document = web_sys::window().unwrap().document().unwrap();
        let canvas = document
            .create_element("canvas")
            .unwrap()
            .dyn_into::<HtmlCanvasElement>()
            .unwrap();
        canvas.set_width(612);
        canvas.set_height(792);
        document.body().unwrap().append_child(&canvas).unwrap();
        canvas
    }

    /// Let queued microtasks run
    async fn next_tick() {
        for _ in 0..2 {
            JsFuture::from(Promise::resolve(&JsValue::NULL)).await.unwrap();
        }
    }

    #[wasm_bindgen_test]
    fn test_click_canvas_uses_bounding_rect() {
        let canvas = attached_canvas();
        let bounds = canvas.get_bounding_client_rect();
        let mut session = EditorSession::with_config(EditorConfig::default());
        session.set_canvas(canvas.clone());
        session.upload_internal(&create_test_pdf(1)).unwrap();

        assert!(!session.click_canvas(bounds.left() + 10.0, bounds.top() + 10.0).unwrap());

        session.select_tool(EditorTool::Text);
        assert!(session.click_canvas(bounds.left() + 100.0, bounds.top() + 100.0).unwrap());
        let pending = session.pending.unwrap();
        assert_eq!(pending.rect.width, bounds.width());
        assert_eq!(pending.click.x - pending.rect.left, 100.0);

        session.place_text(Some("Hi".into())).unwrap();
        assert_eq!(session.tool(), None);
        canvas.remove();
    }

    #[wasm_bindgen_test]
    fn test_click_canvas_without_canvas_fails() {
        let mut session = EditorSession::with_config(EditorConfig::default());
        assert!(session.click_canvas(1.0, 1.0).is_err());
    }

    #[wasm_bindgen_test]
    async fn test_change_callback_runs_after_the_call_returns() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let callback = Closure::<dyn FnMut()>::new(move || counter.set(counter.get() + 1));

        let mut session = EditorSession::with_config(EditorConfig::default());
        session.set_change_callback(callback.as_ref().unchecked_ref::<Function>().clone());
        session.upload_internal(&create_test_pdf(1)).unwrap();

        session.select_tool(EditorTool::Image);
        assert_eq!(calls.get(), 0);

        next_tick().await;
        assert_eq!(calls.get(), 1);
        assert_eq!(session.tool().as_deref(), Some("image"));
    }
}
