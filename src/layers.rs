//! Layer stack: one background fill at slot 0 plus raster layers.
//!
//! Layers are addressed by a stable slot index. Deleting a layer leaves a
//! hole rather than renumbering, and new layers always take the next index
//! at the end.

use crate::color::Swatch;
use crate::error::{EditorError, Result};
use crate::surface::{DrawContext, RasterSurface};
use crate::{log_info, log_warn};

pub const BACKGROUND_INDEX: usize = 0;

#[derive(Clone, Debug)]
pub enum LayerKind {
    Background { color: Swatch },
    Raster { surface: RasterSurface },
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub index: usize,
    pub kind: LayerKind,
    pub locked: bool,
    pub name: String,
}

impl Layer {
    pub fn is_background(&self) -> bool {
        matches!(self.kind, LayerKind::Background { .. })
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        match &self.kind {
            LayerKind::Raster { surface } => Some(surface),
            LayerKind::Background { .. } => None,
        }
    }

    pub fn surface_mut(&mut self) -> Option<&mut RasterSurface> {
        match &mut self.kind {
            LayerKind::Raster { surface } => Some(surface),
            LayerKind::Background { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayerStore {
    slots: Vec<Option<Layer>>,
    active: Option<usize>,
    width: u32,
    height: u32,
}

impl LayerStore {
    /// A store holding only the background layer. Nothing is active yet.
    pub fn new(width: u32, height: u32, background: Swatch) -> Self {
        let bg = Layer {
            index: BACKGROUND_INDEX,
            kind: LayerKind::Background { color: background },
            locked: false,
            name: "Background".to_string(),
        };
        Self { slots: vec![Some(bg)], active: None, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Append a blank raster layer and make it active.
    pub fn create_layer(&mut self, context: &DrawContext) -> usize {
        let mut surface = RasterSurface::new(self.width, self.height);
        surface.context = *context;
        let index = self.push_raster(surface, false);
        self.active = Some(index);
        log_info!("Layer {} created", index);
        index
    }

    /// Append a raster layer built from existing pixels. The active layer is
    /// left unchanged.
    pub fn restore_layer(&mut self, surface: RasterSurface, locked: bool) -> usize {
        self.push_raster(surface, locked)
    }

    fn push_raster(&mut self, surface: RasterSurface, locked: bool) -> usize {
        let index = self.slots.len();
        self.slots.push(Some(Layer {
            index,
            kind: LayerKind::Raster { surface },
            locked,
            name: format!("Layer {}", index),
        }));
        index
    }

    pub fn get(&self, index: usize) -> Result<&Layer> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(EditorError::UndefinedLayer(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Layer> {
        self.slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(EditorError::UndefinedLayer(index))
    }

    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_ok()
    }

    /// Remove a layer.
    ///
    /// Returns `Ok(false)` without touching anything when the layer is
    /// locked, is the background, or is the last raster layer. After a
    /// removal the nearest remaining layer becomes active: first scanning
    /// up from `index`, then down toward the background.
    pub fn delete_layer(&mut self, index: usize, context: &DrawContext) -> Result<bool> {
        let layer = self.get(index)?;
        if layer.locked || layer.is_background() || self.raster_count() <= 1 {
            log_warn!("Layer {} cannot be deleted", index);
            return Ok(false);
        }

        self.slots[index] = None;
        self.active = None;
        match self.nearest_layer(index) {
            Some(next) => self.activate(next, context)?,
            None => log_warn!("No layer left to activate after deleting {}", index),
        }
        log_info!("Layer {} deleted", index);
        Ok(true)
    }

    fn nearest_layer(&self, index: usize) -> Option<usize> {
        let above = (index + 1..self.slots.len()).find(|&i| self.slots[i].is_some());
        above.or_else(|| (0..index.min(self.slots.len())).rev().find(|&i| self.slots[i].is_some()))
    }

    pub fn lock(&mut self, index: usize) -> Result<()> {
        self.get_mut(index)?.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self, index: usize) -> Result<()> {
        self.get_mut(index)?.locked = false;
        Ok(())
    }

    /// Make `index` active and apply the current tool's drawing context to
    /// its surface.
    pub fn activate(&mut self, index: usize, context: &DrawContext) -> Result<()> {
        self.get(index)?;
        self.active = Some(index);
        self.apply_context(context);
        Ok(())
    }

    /// Overwrite the active raster layer's drawing context.
    pub fn apply_context(&mut self, context: &DrawContext) {
        if let Some(surface) = self.active_surface_mut() {
            surface.context = *context;
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Layer> {
        self.active.and_then(|i| self.get(i).ok())
    }

    /// Whether pointer input may draw on the active layer.
    pub fn is_active_drawable(&self) -> bool {
        self.active().is_some_and(|l| !l.locked && !l.is_background())
    }

    /// Active raster surface, ignoring the lock. Used when a tool has to
    /// flush pending content back onto its layer.
    pub fn active_surface_mut(&mut self) -> Option<&mut RasterSurface> {
        let index = self.active?;
        self.slots.get_mut(index)?.as_mut()?.surface_mut()
    }

    /// Active raster surface, only when it accepts drawing.
    pub fn drawable_surface_mut(&mut self) -> Option<&mut RasterSurface> {
        if !self.is_active_drawable() {
            return None;
        }
        self.active_surface_mut()
    }

    pub fn background_color(&self) -> Swatch {
        match self.slots.first().and_then(Option::as_ref).map(|l| &l.kind) {
            Some(LayerKind::Background { color }) => *color,
            _ => Swatch::WHITE,
        }
    }

    pub fn set_background_color(&mut self, color: Swatch) {
        if let Some(Some(Layer { kind: LayerKind::Background { color: c }, .. })) = self.slots.first_mut() {
            *c = color;
        }
    }

    /// Live layers, bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.slots.iter().flatten()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.iter().map(|l| l.index).collect()
    }

    pub fn raster_count(&self) -> usize {
        self.iter().filter(|l| !l.is_background()).count()
    }
}
