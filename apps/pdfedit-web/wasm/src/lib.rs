//! WASM bindings for the PDF editor
//!
//! Document state lives in Rust inside an `EditorSession`; JavaScript handles
//! DOM events, file pickers and page rasterization (PDF.js).
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { EditorSession, EditorTool } from './pkg/pdfedit_wasm.js';
//!
//! await init();
//!
//! const session = new EditorSession({ vertical_offset: 225 });
//! session.setCanvas(document.getElementById('pdf-canvas'));
//! session.setRenderer(renderWithPdfJs); // (bytes, page, scale) => Promise<canvas>
//! session.setChangeCallback(updateToolbar);
//! session.upload(new Uint8Array(await file.arrayBuffer()));
//!
//! session.selectTool(EditorTool.Text);
//! canvas.onclick = (e) => {
//!     if (session.clickCanvas(e.clientX, e.clientY)) {
//!         session.placeText(prompt('Enter text'));
//!     }
//! };
//!
//! downloadBlob(session.download(), session.downloadName);
//! ```

pub mod editor_session;
pub mod validation;

use wasm_bindgen::prelude::*;

pub use editor_session::{EditorSession, EditorTool};
pub use validation::DocumentSummary;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Quick validation check for a PDF file
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Page count and per-page sizes without creating a session
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let summary = validation::summarize(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&summary)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Get page count from PDF bytes
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfedit_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}
