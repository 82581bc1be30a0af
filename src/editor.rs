//! The per-instance editor the host UI talks to.

use std::borrow::Cow;
use std::path::Path;

use image::RgbaImage;
use uuid::Uuid;

use crate::color::{Swatch, hex2rgb};
use crate::compositor::{self, StateEntry};
use crate::config::EditorParams;
use crate::error::{EditorError, Result};
use crate::gesture::{EditorEnv, GestureDispatcher, GestureOutcome, PointerInput};
use crate::io;
use crate::layers::LayerStore;
use crate::surface::{CompositeOp, DrawContext, RasterSurface};
use crate::tools::{Cursor, Overlays, Paint, ToolKind, ToolSizes};
use crate::{log_err, log_info};

/// Pen pressure provider. `None` (or no provider at all) means full
/// pressure.
pub trait PressureSource: Send {
    fn pressure(&self) -> Option<f32>;
}

impl<F> PressureSource for F
where
    F: Fn() -> Option<f32> + Send,
{
    fn pressure(&self) -> Option<f32> {
        self()
    }
}

pub struct Editor {
    id: Uuid,
    params: EditorParams,
    layers: LayerStore,
    dispatcher: GestureDispatcher,
    sizes: ToolSizes,
    active_swatch: Swatch,
    swatches: Vec<Swatch>,
    pressure: Option<Box<dyn PressureSource>>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("id", &self.id)
            .field("tool", &self.dispatcher.tool_kind())
            .field("active_layer", &self.layers.active_index())
            .field("active_swatch", &self.active_swatch)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Background plus one empty raster layer, with the default tool and
    /// swatch active.
    pub fn new(params: EditorParams) -> Self {
        let mut editor = Self::bare(params);
        let ctx = editor.tool_context();
        editor.layers.create_layer(&ctx);
        log_info!("Editor {} created ({}x{})", editor.id, editor.params.width, editor.params.height);
        editor
    }

    /// Editor holding only the background layer.
    fn bare(params: EditorParams) -> Self {
        let env = EditorEnv { grid_snap: params.grid_enabled, tablet_support: params.tablet_support };
        let dispatcher = GestureDispatcher::new(
            params.width,
            params.height,
            params.origin,
            params.grid_step,
            env,
            params.default_tool,
        );
        Self {
            id: Uuid::new_v4(),
            layers: LayerStore::new(params.width, params.height, params.background_color),
            dispatcher,
            sizes: ToolSizes::new(params.default_tool),
            active_swatch: params.default_swatch,
            swatches: params.swatches.clone(),
            pressure: None,
            params,
        }
    }

    /// Rebuild an editor from an exported state sequence. The composite
    /// entry is skipped; the topmost raster layer ends up active.
    pub fn from_state(params: EditorParams, entries: &[StateEntry]) -> Result<Self> {
        let mut editor = Self::bare(params);
        for entry in entries {
            match entry {
                StateEntry::Composite { .. } => {}
                StateEntry::Background { color } => {
                    editor.layers.set_background_color(Swatch(hex2rgb(color)?));
                }
                StateEntry::Raster { data } => {
                    let pixels = io::decode_png(data)?;
                    if pixels.dimensions() != (editor.params.width, editor.params.height) {
                        return Err(EditorError::InvalidFormat(format!(
                            "layer is {}x{}, drawing area is {}x{}",
                            pixels.width(),
                            pixels.height(),
                            editor.params.width,
                            editor.params.height
                        )));
                    }
                    editor.layers.restore_layer(RasterSurface::from_image(pixels), false);
                }
            }
        }

        let ctx = editor.tool_context();
        let top = editor.layers.iter().filter(|l| !l.is_background()).map(|l| l.index).last();
        match top {
            Some(index) => editor.layers.activate(index, &ctx)?,
            None => {
                editor.layers.create_layer(&ctx);
            }
        }
        log_info!("Editor {} restored with {} layers", editor.id, editor.layers.raster_count());
        Ok(editor)
    }

    /// Load a state file written by [`Editor::save`]. The drawing-area size
    /// comes from the file.
    pub fn open(params: EditorParams, path: &Path) -> Result<Self> {
        let loaded = io::load_state(path)?;
        let params = EditorParams { width: loaded.width, height: loaded.height, ..params };
        Self::from_state(params, &loaded.entries)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let entries = self.state()?;
        io::save_state(path, self.params.width, self.params.height, &entries)?;
        log_info!("Editor {} saved to {}", self.id, path.display());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn params(&self) -> &EditorParams {
        &self.params
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    pub fn overlays(&self) -> &Overlays {
        self.dispatcher.overlays()
    }

    pub fn dispatcher(&self) -> &GestureDispatcher {
        &self.dispatcher
    }

    pub fn active_tool(&self) -> ToolKind {
        self.dispatcher.tool_kind()
    }

    pub fn active_swatch(&self) -> Swatch {
        self.active_swatch
    }

    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    pub fn cursor(&self) -> Cursor {
        self.dispatcher.cursor()
    }

    pub fn env(&self) -> EditorEnv {
        self.dispatcher.env
    }

    /// The grid overlay is shown exactly when snapping is on.
    pub fn is_grid_visible(&self) -> bool {
        self.dispatcher.env.grid_snap
    }

    pub fn flatten(&self) -> RgbaImage {
        compositor::flatten(&self.layers)
    }

    fn tool_context(&self) -> DrawContext {
        let kind = self.dispatcher.tool_kind();
        kind.descriptor().context(self.sizes.own(kind))
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    pub fn create_empty_layer(&mut self) -> usize {
        self.dispatcher.blur(&mut self.layers);
        let ctx = self.tool_context();
        self.layers.create_layer(&ctx)
    }

    pub fn delete_active_layer(&mut self) -> Result<bool> {
        let index = self.layers.active_index().ok_or_else(|| {
            log_err!("Editor {}: delete with no active layer", self.id);
            EditorError::NoActiveLayer
        })?;
        self.delete_layer(index)
    }

    /// Returns `Ok(false)` when the layer is kept (locked, background, or
    /// the last raster layer).
    pub fn delete_layer(&mut self, index: usize) -> Result<bool> {
        self.check_layer(index)?;
        // A removal reactivates the nearest layer even when `index` was not
        // the active one.
        self.dispatcher.blur(&mut self.layers);
        let ctx = self.tool_context();
        self.layers.delete_layer(index, &ctx)
    }

    pub fn activate_layer(&mut self, index: usize) -> Result<()> {
        self.check_layer(index)?;
        self.dispatcher.blur(&mut self.layers);
        let ctx = self.tool_context();
        self.layers.activate(index, &ctx)
    }

    pub fn lock_layer(&mut self, index: usize) -> Result<()> {
        self.check_layer(index)?;
        if self.layers.active_index() == Some(index) {
            self.dispatcher.blur(&mut self.layers);
        }
        self.layers.lock(index)
    }

    pub fn unlock_layer(&mut self, index: usize) -> Result<()> {
        self.check_layer(index)?;
        self.layers.unlock(index)
    }

    pub fn set_background_color(&mut self, color: Swatch) {
        self.layers.set_background_color(color);
    }

    fn check_layer(&self, index: usize) -> Result<()> {
        self.layers.get(index).map(|_| ()).inspect_err(|e| log_err!("Editor {}: {}", self.id, e))
    }

    // ------------------------------------------------------------------
    // Tools, swatches, toggles
    // ------------------------------------------------------------------

    pub fn activate_tool(&mut self, kind: ToolKind) {
        self.dispatcher.switch_tool(kind, &mut self.layers);
        let ctx = self.tool_context();
        self.layers.apply_context(&ctx);
    }

    pub fn activate_tool_by_name(&mut self, name: &str) -> Result<()> {
        let kind = name.parse::<ToolKind>().inspect_err(|e| log_err!("Editor {}: {}", self.id, e))?;
        self.activate_tool(kind);
        Ok(())
    }

    /// Select a swatch from a `#RRGGBB` / `RRGGBB` string.
    pub fn activate_swatch(&mut self, hex: &str) -> Result<()> {
        let rgb = hex2rgb(hex).inspect_err(|e| log_err!("Editor {}: {}", self.id, e))?;
        self.active_swatch = Swatch(rgb);
        Ok(())
    }

    pub fn activate_swatch_rgb(&mut self, rgb: [u8; 3]) {
        self.active_swatch = Swatch(rgb);
    }

    /// Flip or set a named toggle (`grid`, `tablet`). `None` flips the
    /// current value. Returns the new value.
    pub fn toggle(&mut self, name: &str, value: Option<bool>) -> Result<bool> {
        let env = &mut self.dispatcher.env;
        let flag = match name {
            "grid" => &mut env.grid_snap,
            "tablet" | "wacom-plugin" => &mut env.tablet_support,
            _ => {
                log_err!("Editor {}: undefined toggle \"{}\"", self.id, name);
                return Err(EditorError::UndefinedToggle(name.to_string()));
            }
        };
        *flag = value.unwrap_or(!*flag);
        let active = *flag;
        log_info!("Toggle {} = {}", name, active);
        Ok(active)
    }

    pub fn toggle_grid_snap(&mut self, enabled: bool) {
        self.dispatcher.env.grid_snap = enabled;
    }

    /// Size the active tool draws with, `None` for the marquee.
    pub fn active_tool_size(&self) -> Option<f32> {
        self.sizes.effective(self.dispatcher.tool_kind())
    }

    /// Returns `false` when the active tool has no adjustable size.
    pub fn set_active_tool_size(&mut self, value: f32) -> bool {
        if !self.sizes.set(self.dispatcher.tool_kind(), value) {
            return false;
        }
        let ctx = self.tool_context();
        self.layers.apply_context(&ctx);
        true
    }

    pub fn set_pressure_source(&mut self, source: Option<Box<dyn PressureSource>>) {
        self.pressure = source;
    }

    fn paint(&self) -> Paint {
        let pressure = if self.dispatcher.env.tablet_support {
            self.pressure.as_ref().and_then(|p| p.pressure()).map_or(1.0, |p| p.clamp(0.0, 1.0))
        } else {
            1.0
        };
        Paint {
            color: self.active_swatch,
            pressure,
            size: self.active_tool_size().unwrap_or(1.0),
        }
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, input: PointerInput) -> GestureOutcome {
        let paint = self.paint();
        self.dispatcher.press(&input, &mut self.layers, paint)
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> GestureOutcome {
        let paint = self.paint();
        self.dispatcher.drag(&input, &mut self.layers, paint)
    }

    pub fn pointer_up(&mut self, input: PointerInput) -> GestureOutcome {
        let paint = self.paint();
        self.dispatcher.release(&input, &mut self.layers, paint)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Encode the composite and every layer, then call `callback` with the
    /// ordered entries or the first failure. Pixels lifted by the marquee
    /// are exported on the active layer at their current position.
    pub fn get_state<F>(&self, callback: F)
    where
        F: FnOnce(Result<Vec<StateEntry>>),
    {
        compositor::get_state(&self.export_layers(), callback);
    }

    pub fn state(&self) -> Result<Vec<StateEntry>> {
        compositor::collect_state(&self.export_layers())
    }

    /// The layer stack as the user sees it, with any floating selection
    /// blitted onto a copy of the active layer.
    fn export_layers(&self) -> Cow<'_, LayerStore> {
        let lifted = self.dispatcher.tool().marquee().is_some_and(|m| m.is_lifted());
        if !lifted {
            return Cow::Borrowed(&self.layers);
        }
        let mut layers = self.layers.clone();
        match layers.active_surface_mut() {
            Some(surface) => {
                surface.draw_surface(&self.dispatcher.overlays().selection_content, CompositeOp::SourceOver);
                Cow::Owned(layers)
            }
            None => Cow::Borrowed(&self.layers),
        }
    }
}
