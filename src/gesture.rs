//! Pointer gesture dispatch.
//!
//! One pointer at a time owns the gesture. Its press decides whether the
//! gesture may draw at all; accepted events are normalized into drawing-area
//! coordinates, optionally snapped to the grid, and handed to the active
//! tool together with the active layer's surface.

use crate::geometry::{Point, snap_to_grid};
use crate::layers::LayerStore;
use crate::tools::{Cursor, Overlays, Paint, ToolContext, ToolKind, ToolState};
use crate::{log_info, log_warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PointerId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// Raw pointer input as delivered by the host, in page coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    pub pointer: PointerId,
    pub page: Point,
    pub button: u8,
    pub modifiers: Modifiers,
}

impl PointerInput {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            pointer: PointerId::default(),
            page: Point::new(x, y),
            button: 0,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_pointer(mut self, pointer: PointerId) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn with_button(mut self, button: u8) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// A pointer event in drawing-area coordinates, after grid snapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub pos: Point,
    pub button: u8,
    pub modifiers: Modifiers,
}

/// Per-editor switches set through toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorEnv {
    pub grid_snap: bool,
    pub tablet_support: bool,
}

impl Default for EditorEnv {
    fn default() -> Self {
        Self { grid_snap: false, tablet_support: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Pressed,
    Dragging,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Handed to the active tool.
    Accepted,
    /// The active layer does not accept drawing.
    Rejected,
    /// Not part of the captured gesture.
    Ignored,
}

#[derive(Clone, Copy, Debug)]
struct Capture {
    pointer: PointerId,
    phase: PointerPhase,
}

#[derive(Debug)]
pub struct GestureDispatcher {
    pub env: EditorEnv,
    origin: Point,
    grid_step: f32,
    capture: Option<Capture>,
    /// Pointer whose press was rejected; its release restores the cursor.
    rejected: Option<PointerId>,
    last_event: Option<PointerEvent>,
    tool: ToolState,
    overlays: Overlays,
    cursor: Cursor,
}

impl GestureDispatcher {
    pub fn new(width: u32, height: u32, origin: Point, grid_step: f32, env: EditorEnv, tool: ToolKind) -> Self {
        let mut overlays = Overlays::new(width, height);
        overlays.render_grid(grid_step);
        Self {
            env,
            origin,
            grid_step,
            capture: None,
            rejected: None,
            last_event: None,
            tool: ToolState::new(tool),
            overlays,
            cursor: tool.descriptor().cursor,
        }
    }

    pub fn tool(&self) -> &ToolState {
        &self.tool
    }

    pub fn tool_kind(&self) -> ToolKind {
        self.tool.kind()
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn last_event(&self) -> Option<&PointerEvent> {
        self.last_event.as_ref()
    }

    pub fn grid_step(&self) -> f32 {
        self.grid_step
    }

    /// Pointer currently owning the gesture and how far along it is.
    pub fn captured(&self) -> Option<(PointerId, PointerPhase)> {
        self.capture.map(|c| (c.pointer, c.phase))
    }

    /// Drawing-area coordinates for `input`, snapped when the grid is on and
    /// the active tool allows it.
    pub fn normalize(&self, input: &PointerInput) -> PointerEvent {
        let mut pos = Point::new(input.page.x - self.origin.x, input.page.y - self.origin.y);
        if self.env.grid_snap && self.tool.kind().descriptor().grid_snap {
            pos = snap_to_grid(pos, self.grid_step);
        }
        PointerEvent { pos, button: input.button, modifiers: input.modifiers }
    }

    pub fn press(&mut self, input: &PointerInput, layers: &mut LayerStore, paint: Paint) -> GestureOutcome {
        if self.capture.is_some() || self.rejected.is_some() {
            return GestureOutcome::Ignored;
        }
        if !layers.is_active_drawable() {
            log_warn!("Press rejected: active layer {:?} is not drawable", layers.active_index());
            self.cursor = Cursor::NotAllowed;
            self.rejected = Some(input.pointer);
            return GestureOutcome::Rejected;
        }
        let Some(surface) = layers.drawable_surface_mut() else { return GestureOutcome::Rejected };

        let ev = self.normalize(input);
        let mut cx = ToolContext { surface, overlays: &mut self.overlays, paint };
        self.tool.handler_mut().on_start(&ev, &mut cx);
        self.last_event = Some(ev);
        self.capture = Some(Capture { pointer: input.pointer, phase: PointerPhase::Pressed });
        GestureOutcome::Accepted
    }

    pub fn drag(&mut self, input: &PointerInput, layers: &mut LayerStore, paint: Paint) -> GestureOutcome {
        let Some(capture) = self.capture.as_mut() else { return GestureOutcome::Ignored };
        if capture.pointer != input.pointer {
            return GestureOutcome::Ignored;
        }
        let Some(surface) = layers.drawable_surface_mut() else { return GestureOutcome::Ignored };
        capture.phase = PointerPhase::Dragging;

        let ev = self.normalize(input);
        let mut cx = ToolContext { surface, overlays: &mut self.overlays, paint };
        self.tool.handler_mut().on_move(&ev, &mut cx);
        self.last_event = Some(ev);
        GestureOutcome::Accepted
    }

    pub fn release(&mut self, input: &PointerInput, layers: &mut LayerStore, paint: Paint) -> GestureOutcome {
        match self.capture {
            Some(capture) if capture.pointer == input.pointer => {
                self.capture = None;
                self.cursor = self.tool.kind().descriptor().cursor;
                let ev = self.normalize(input);
                if let Some(surface) = layers.drawable_surface_mut() {
                    let mut cx = ToolContext { surface, overlays: &mut self.overlays, paint };
                    self.tool.handler_mut().on_end(&ev, &mut cx);
                }
                self.last_event = Some(ev);
                GestureOutcome::Accepted
            }
            Some(_) => GestureOutcome::Ignored,
            None if self.rejected == Some(input.pointer) => {
                self.rejected = None;
                self.cursor = self.tool.kind().descriptor().cursor;
                GestureOutcome::Rejected
            }
            None => GestureOutcome::Ignored,
        }
    }

    /// Let the active tool flush its state onto the active layer and drop
    /// any gesture in flight.
    pub fn blur(&mut self, layers: &mut LayerStore) {
        let surface = layers.active_surface_mut();
        self.tool.handler_mut().on_blur(surface, &mut self.overlays);
        self.capture = None;
    }

    /// Blur the outgoing tool, then start `kind` from fresh state.
    pub fn switch_tool(&mut self, kind: ToolKind, layers: &mut LayerStore) {
        self.blur(layers);
        let from = self.tool.kind();
        self.tool = ToolState::new(kind);
        self.tool.handler_mut().on_focus(&mut self.overlays);
        self.rejected = None;
        self.cursor = kind.descriptor().cursor;
        log_info!("Tool switched: {} -> {}", from, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Swatch;
    use crate::surface::DrawContext;

    fn paint() -> Paint {
        Paint { color: Swatch([255, 0, 0]), pressure: 1.0, size: 2.0 }
    }

    fn setup(tool: ToolKind) -> (GestureDispatcher, LayerStore) {
        let mut layers = LayerStore::new(100, 100, Swatch::WHITE);
        layers.create_layer(&tool.descriptor().context(Some(2.0)));
        let d = GestureDispatcher::new(100, 100, Point::new(0.0, 0.0), 20.0, EditorEnv::default(), tool);
        (d, layers)
    }

    #[test]
    fn locked_layer_rejects_and_release_restores_cursor() {
        let (mut d, mut layers) = setup(ToolKind::Brush);
        layers.lock(1).unwrap();
        let input = PointerInput::new(10.0, 10.0);

        assert_eq!(d.press(&input, &mut layers, paint()), GestureOutcome::Rejected);
        assert_eq!(d.cursor(), Cursor::NotAllowed);
        assert!(d.captured().is_none());
        assert_eq!(d.drag(&input, &mut layers, paint()), GestureOutcome::Ignored);
        assert_eq!(d.release(&input, &mut layers, paint()), GestureOutcome::Rejected);
        assert_eq!(d.cursor(), Cursor::Crosshair);
        assert!(layers.get(1).unwrap().surface().unwrap().is_blank());
    }

    #[test]
    fn background_rejects() {
        let (mut d, mut layers) = setup(ToolKind::Brush);
        layers.activate(0, &DrawContext::default()).unwrap();
        assert_eq!(d.press(&PointerInput::new(5.0, 5.0), &mut layers, paint()), GestureOutcome::Rejected);
    }

    #[test]
    fn press_drag_release_cycle() {
        let (mut d, mut layers) = setup(ToolKind::Brush);
        let input = PointerInput::new(10.0, 10.0);
        assert_eq!(d.press(&input, &mut layers, paint()), GestureOutcome::Accepted);
        assert_eq!(d.captured().map(|c| c.1), Some(PointerPhase::Pressed));
        d.drag(&PointerInput::new(30.0, 10.0), &mut layers, paint());
        assert_eq!(d.captured().map(|c| c.1), Some(PointerPhase::Dragging));
        assert_eq!(d.release(&PointerInput::new(30.0, 10.0), &mut layers, paint()), GestureOutcome::Accepted);
        assert!(d.captured().is_none());
        let surface = layers.get(1).unwrap().surface().unwrap();
        assert_eq!(surface.pixel(20, 10)[3], 255);
    }

    #[test]
    fn other_pointers_wait_for_release() {
        let (mut d, mut layers) = setup(ToolKind::Brush);
        let first = PointerInput::new(10.0, 10.0);
        let second = PointerInput::new(60.0, 60.0).with_pointer(PointerId(7));
        d.press(&first, &mut layers, paint());
        assert_eq!(d.press(&second, &mut layers, paint()), GestureOutcome::Ignored);
        assert_eq!(d.drag(&second, &mut layers, paint()), GestureOutcome::Ignored);
        assert_eq!(d.release(&second, &mut layers, paint()), GestureOutcome::Ignored);
        assert!(layers.get(1).unwrap().surface().unwrap().pixel(60, 60)[3] == 0);
    }

    #[test]
    fn coordinates_are_relative_to_origin_and_snapped() {
        let (mut d, _) = setup(ToolKind::Brush);
        d.origin = Point::new(100.0, 50.0);
        assert_eq!(d.normalize(&PointerInput::new(129.0, 81.0)).pos, Point::new(29.0, 31.0));
        d.env.grid_snap = true;
        assert_eq!(d.normalize(&PointerInput::new(129.0, 81.0)).pos, Point::new(20.0, 40.0));
    }

    #[test]
    fn eraser_is_never_snapped() {
        let (mut d, _) = setup(ToolKind::Eraser);
        d.env.grid_snap = true;
        assert_eq!(d.normalize(&PointerInput::new(29.0, 31.0)).pos, Point::new(29.0, 31.0));
    }

    #[test]
    fn switch_tool_resets_capture() {
        let (mut d, mut layers) = setup(ToolKind::Line);
        d.press(&PointerInput::new(10.0, 10.0), &mut layers, paint());
        d.drag(&PointerInput::new(50.0, 10.0), &mut layers, paint());
        assert!(!d.overlays().scratch.is_blank());
        d.switch_tool(ToolKind::Marquee, &mut layers);
        assert!(d.captured().is_none());
        assert!(d.overlays().scratch.is_blank());
        assert_eq!(d.tool_kind(), ToolKind::Marquee);
    }

    #[test]
    fn grid_overlay_is_rendered_up_front() {
        let (d, _) = setup(ToolKind::Brush);
        assert!(!d.overlays().grid.is_blank());
    }
}
