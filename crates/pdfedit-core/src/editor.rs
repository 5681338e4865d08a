//! Interaction controller
//!
//! `Editor` owns the document store and turns user actions into mutations.
//! Anything slow (counting pages, rasterizing) is handed out as a
//! [`RefreshTicket`] that the caller runs wherever it likes; results come back
//! through [`Editor::apply_page_count`] and [`Editor::apply_render`], which
//! drop anything computed for a buffer or view that is no longer current.

use crate::buffer::{BufferId, PdfBuffer};
use crate::config::EditorConfig;
use crate::coords::{CoordinateMapper, PdfPoint, ScreenPoint, ScreenRect};
use crate::edit::{add_image_sized, add_text_styled, TextStyle};
use crate::error::PdfEditError;
use crate::image::ImageKind;
use crate::merge::merge_documents;
use crate::page_info::page_size;
use crate::render::{self, Rasterizer, RenderSurface, Viewport};
use crate::store::DocumentStore;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Text,
    Image,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Text => f.write_str("text"),
            Tool::Image => f.write_str("image"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// No document loaded
    Empty,
    /// Document loaded, no tool selected
    Loaded,
    /// Waiting for a canvas click to place with the given tool
    Placing(Tool),
}

/// What is (or should be) on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewKey {
    pub buffer: BufferId,
    pub page_number: u32,
    pub scale: f32,
}

/// Work needed to bring the view up to date with one buffer snapshot
#[derive(Debug, Clone)]
pub struct RefreshTicket {
    pub buffer: PdfBuffer,
    pub key: ViewKey,
}

impl RefreshTicket {
    pub fn tag(&self) -> BufferId {
        self.key.buffer
    }

    pub fn count_pages(&self, rasterizer: &dyn Rasterizer) -> Result<u32, PdfEditError> {
        render::get_page_count(rasterizer, &self.buffer)
    }

    pub fn render(
        &self,
        rasterizer: &dyn Rasterizer,
        surface: &mut dyn RenderSurface,
    ) -> Result<Viewport, PdfEditError> {
        render::render_page(
            rasterizer,
            &self.buffer,
            self.key.page_number,
            surface,
            self.key.scale,
        )
    }
}

/// A canvas click waiting for its text or image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingPlacement {
    pub tool: Tool,
    pub click: ScreenPoint,
    pub rect: ScreenRect,
    pub page_number: u32,
    pub buffer: BufferId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Source of the content for a placement, for callers that can ask synchronously
pub trait PlacementPrompt {
    fn prompt_text(&mut self) -> Option<String>;
    fn pick_image(&mut self) -> Option<PickedImage>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: PdfBuffer,
}

#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    mapper: CoordinateMapper,
    store: DocumentStore,
    state: EditorState,
    zoom: f32,
    last_error: Option<PdfEditError>,
    rendered: Option<ViewKey>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let zoom = config.clamp_zoom(config.default_zoom);
        Self {
            mapper: CoordinateMapper::new(config.vertical_offset),
            config,
            store: DocumentStore::new(),
            state: EditorState::Empty,
            zoom,
            last_error: None,
            rendered: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn tool(&self) -> Option<Tool> {
        match self.state {
            EditorState::Placing(tool) => Some(tool),
            _ => None,
        }
    }

    pub fn buffer(&self) -> Option<&PdfBuffer> {
        self.store.buffer()
    }

    pub fn current_page(&self) -> u32 {
        self.store.current_page()
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.store.total_pages()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn last_error(&self) -> Option<&PdfEditError> {
        self.last_error.as_ref()
    }

    /// The view that should be on screen now
    pub fn view_key(&self) -> Option<ViewKey> {
        self.store.buffer_id().map(|buffer| ViewKey {
            buffer,
            page_number: self.store.current_page(),
            scale: self.zoom,
        })
    }

    /// The last view whose render was applied
    pub fn rendered_view(&self) -> Option<ViewKey> {
        self.rendered
    }

    /// Ticket for the current view, if a document is loaded
    pub fn refresh(&self) -> Option<RefreshTicket> {
        let key = self.view_key()?;
        let buffer = self.store.buffer()?.clone();
        Some(RefreshTicket { buffer, key })
    }

    /// Make `bytes` the active document.
    ///
    /// The file is parsed before anything changes; on failure the previous
    /// document (if any) stays active.
    pub fn upload(&mut self, bytes: impl Into<PdfBuffer>) -> Result<RefreshTicket, PdfEditError> {
        let buffer = bytes.into();
        let page_count = self.track(crate::get_page_count(&buffer))?;

        let id = self.store.load(buffer, page_count);
        self.state = EditorState::Loaded;
        info!(buffer = %id, page_count, "document loaded");
        self.committed()
    }

    /// Toggle `tool`; selecting a different tool while placing switches to it
    pub fn select_tool(&mut self, tool: Tool) {
        self.state = match self.state {
            EditorState::Empty => EditorState::Empty,
            EditorState::Placing(current) if current == tool => EditorState::Loaded,
            EditorState::Loaded | EditorState::Placing(_) => EditorState::Placing(tool),
        };
    }

    /// Record a click on the canvas while a tool is active
    pub fn click_canvas(&self, click: ScreenPoint, rect: ScreenRect) -> Option<PendingPlacement> {
        let EditorState::Placing(tool) = self.state else {
            return None;
        };
        Some(PendingPlacement {
            tool,
            click,
            rect,
            page_number: self.store.current_page(),
            buffer: self.store.buffer_id()?,
        })
    }

    /// Finish a text placement. `None` or empty text leaves the tool active.
    pub fn place_text(
        &mut self,
        pending: &PendingPlacement,
        text: Option<&str>,
    ) -> Result<Option<RefreshTicket>, PdfEditError> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(buffer) = self.placement_target(pending, Tool::Text) else {
            return Ok(None);
        };

        let style = TextStyle {
            font_size: self.config.font_size,
            ..TextStyle::default()
        };
        let result = self.map_click(&buffer, pending).and_then(|point| {
            add_text_styled(&buffer, text, point, pending.page_number - 1, &style)
        });
        let bytes = self.track(result)?;
        self.commit_edit(bytes).map(Some)
    }

    /// Finish an image placement. `None` leaves the tool active.
    pub fn place_image(
        &mut self,
        pending: &PendingPlacement,
        image: Option<PickedImage>,
    ) -> Result<Option<RefreshTicket>, PdfEditError> {
        let Some(image) = image else {
            return Ok(None);
        };
        let Some(buffer) = self.placement_target(pending, Tool::Image) else {
            return Ok(None);
        };

        let size = self.config.image_size;
        let result = ImageKind::from_media_type(&image.media_type).and_then(|kind| {
            let point = self.map_click(&buffer, pending)?;
            add_image_sized(
                &buffer,
                &image.bytes,
                point,
                pending.page_number - 1,
                kind,
                size,
            )
        });
        let bytes = self.track(result)?;
        self.commit_edit(bytes).map(Some)
    }

    /// Click and place in one step, asking `prompt` for the content
    pub fn click_canvas_with(
        &mut self,
        click: ScreenPoint,
        rect: ScreenRect,
        prompt: &mut impl PlacementPrompt,
    ) -> Result<Option<RefreshTicket>, PdfEditError> {
        let Some(pending) = self.click_canvas(click, rect) else {
            return Ok(None);
        };
        match pending.tool {
            Tool::Text => {
                let text = prompt.prompt_text();
                self.place_text(&pending, text.as_deref())
            }
            Tool::Image => {
                let image = prompt.pick_image();
                self.place_image(&pending, image)
            }
        }
    }

    /// Merge `files` in order and make the result the active document.
    /// An empty list changes nothing.
    pub fn merge_files<B: AsRef<[u8]>>(
        &mut self,
        files: &[B],
    ) -> Result<Option<RefreshTicket>, PdfEditError> {
        if files.is_empty() {
            return Ok(None);
        }

        let merged = self.track(merge_documents(files))?;
        let page_count = self.track(crate::get_page_count(&merged))?;

        let id = self.store.load(merged.into(), page_count);
        self.state = EditorState::Loaded;
        info!(buffer = %id, inputs = files.len(), page_count, "documents merged");
        self.committed().map(Some)
    }

    pub fn download(&self) -> Option<Download> {
        Some(Download {
            file_name: self.config.download_name.clone(),
            media_type: PDF_MEDIA_TYPE,
            bytes: self.store.buffer()?.clone(),
        })
    }

    /// Move by `delta` pages; returns a ticket only if the page changed
    pub fn change_page(&mut self, delta: i32) -> Option<RefreshTicket> {
        if self.store.step_page(delta) {
            self.refresh()
        } else {
            None
        }
    }

    /// Set the zoom (clamped and snapped); returns a ticket only if it changed
    pub fn change_zoom(&mut self, scale: f32) -> Option<RefreshTicket> {
        let zoom = self.config.clamp_zoom(scale);
        if zoom == self.zoom {
            return None;
        }
        self.zoom = zoom;
        self.refresh()
    }

    /// Apply a page count computed for buffer `tag`. Returns false if discarded.
    pub fn apply_page_count(&mut self, tag: BufferId, result: Result<u32, PdfEditError>) -> bool {
        if !self.store.is_current(tag) {
            debug!(buffer = %tag, "discarding stale page count");
            return false;
        }
        match result {
            Ok(count) => self.store.set_total_pages(Some(count)),
            Err(err) => {
                warn!(buffer = %tag, error = %err, "page count failed");
                self.store.set_total_pages(None);
                self.last_error = Some(err);
            }
        }
        true
    }

    /// Apply a render for `key`. Returns false if the view has moved on.
    pub fn apply_render(&mut self, key: ViewKey, result: Result<Viewport, PdfEditError>) -> bool {
        if self.view_key() != Some(key) {
            debug!(buffer = %key.buffer, page = key.page_number, "discarding stale render");
            return false;
        }
        match result {
            Ok(_) => self.rendered = Some(key),
            Err(err) => {
                warn!(buffer = %key.buffer, error = %err, "render failed");
                self.last_error = Some(err);
            }
        }
        true
    }

    /// Buffer the placement applies to, or `None` if it is stale or the tool
    /// was put down since the click
    fn placement_target(&self, pending: &PendingPlacement, tool: Tool) -> Option<PdfBuffer> {
        if pending.tool != tool
            || self.state != EditorState::Placing(tool)
            || !self.store.is_current(pending.buffer)
        {
            debug!(buffer = %pending.buffer, tool = %pending.tool, "dropping stale placement");
            return None;
        }
        self.store.buffer().cloned()
    }

    fn map_click(
        &self,
        buffer: &PdfBuffer,
        pending: &PendingPlacement,
    ) -> Result<PdfPoint, PdfEditError> {
        let doc = Document::load_mem(buffer).map_err(PdfEditError::load)?;
        let page = page_size(&doc, pending.page_number)?;
        self.mapper.screen_to_pdf(pending.click, pending.rect, page)
    }

    fn commit_edit(&mut self, bytes: Vec<u8>) -> Result<RefreshTicket, PdfEditError> {
        let id = self.store.replace(bytes.into());
        self.state = EditorState::Loaded;
        info!(buffer = %id, page = self.store.current_page(), "document edited");
        self.committed()
    }

    fn committed(&mut self) -> Result<RefreshTicket, PdfEditError> {
        self.last_error = None;
        self.refresh()
            .ok_or_else(|| PdfEditError::Operation("No document loaded".into()))
    }

    /// Remember a failure as the last error before propagating it
    fn track<T>(&mut self, result: Result<T, PdfEditError>) -> Result<T, PdfEditError> {
        if let Err(err) = &result {
            self.last_error = Some(err.clone());
        }
        result
    }
}
