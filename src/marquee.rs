//! Rectangular select-and-move.
//!
//! ```text
//! Idle --press--> Selecting --release--> Selected --press inside--> Moving
//!  ^                  |                     |  ^                       |
//!  +--- zero drag ----+    press outside ---+  +------- release -------+
//!                          (commit, then Selecting)
//! ```
//!
//! The first press inside a selection lifts its pixels off the layer onto the
//! selection-content overlay. They stay there while the selection is dragged
//! around and go back onto the layer on commit: a press outside the
//! selection, or the tool losing focus.

use image::{Rgba, RgbaImage};

use crate::geometry::{Point, RectF, SelectionRect};
use crate::gesture::PointerEvent;
use crate::log_warn;
use crate::surface::{CompositeOp, DrawContext, RasterSurface};
use crate::tools::{Overlays, ToolContext, ToolHandler};

const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MarqueePhase {
    #[default]
    Idle,
    Selecting,
    Selected,
    Moving,
}

#[derive(Clone, Debug, Default)]
pub struct Marquee {
    phase: MarqueePhase,
    selection: Option<SelectionRect>,
    start: Point,
    last: Point,
    /// Set once this selection's pixels have been cut from the layer.
    lifted: bool,
    content: Option<RgbaImage>,
}

impl Marquee {
    pub fn phase(&self) -> MarqueePhase {
        self.phase
    }

    /// Current selection as dragged, extents possibly negative.
    pub fn selection(&self) -> Option<SelectionRect> {
        self.selection
    }

    pub fn is_lifted(&self) -> bool {
        self.lifted
    }

    fn begin_selecting(&mut self, pos: Point) {
        let (x, y) = pos.to_pixel();
        self.phase = MarqueePhase::Selecting;
        self.start = pos;
        self.last = pos;
        self.selection = Some(SelectionRect::new(x, y, 0, 0));
    }

    fn drag_extent(&self, pos: Point) -> (i32, i32) {
        let (sx, sy) = self.start.to_pixel();
        let (px, py) = pos.to_pixel();
        (px - sx, py - sy)
    }

    /// Cut the selected pixels out of the layer onto the content overlay.
    fn lift(&mut self, rect: SelectionRect, surface: &mut RasterSurface, overlays: &mut Overlays) {
        let rect = rect.normalized();
        let pixels = surface.get_region(rect);
        surface.erase_rect(rect);
        overlays.selection_content.clear();
        overlays.selection_content.put_image(&pixels, rect.x, rect.y);
        self.content = Some(pixels);
        self.lifted = true;
    }

    fn translate_to(&mut self, pos: Point, overlays: &mut Overlays) {
        let (lx, ly) = self.last.to_pixel();
        let (px, py) = pos.to_pixel();
        if let Some(sel) = self.selection.as_mut() {
            sel.translate(px - lx, py - ly);
        }
        self.last = pos;
        self.render_content(overlays);
    }

    fn render_content(&self, overlays: &mut Overlays) {
        if let (Some(pixels), Some(sel)) = (&self.content, self.selection) {
            let r = sel.normalized();
            overlays.selection_content.clear();
            overlays.selection_content.put_image(pixels, r.x, r.y);
        }
    }

    fn render_outline(&self, overlays: &mut Overlays) {
        let outline = &mut overlays.selection_outline;
        outline.clear();
        let Some(sel) = self.selection else { return };
        let r = sel.normalized();
        outline.context = DrawContext::default();
        outline.stroke_rect(
            RectF::new(r.x as f32 + 0.5, r.y as f32 + 0.5, r.width as f32, r.height as f32),
            OUTLINE_COLOR,
        );
    }

    /// Put lifted pixels back onto `surface` at the current position and
    /// drop the selection.
    fn commit(&mut self, surface: Option<&mut RasterSurface>, overlays: &mut Overlays) {
        if self.lifted {
            match surface {
                Some(surface) => surface.draw_surface(&overlays.selection_content, CompositeOp::SourceOver),
                None => log_warn!("Marquee content dropped: no layer to commit onto"),
            }
        }
        overlays.selection_content.clear();
        overlays.selection_outline.clear();
        *self = Self::default();
    }
}

impl ToolHandler for Marquee {
    fn on_start(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        if ev.button != 0 {
            return;
        }
        if self.phase == MarqueePhase::Selected
            && let Some(sel) = self.selection
        {
            if sel.contains(ev.pos) {
                if !self.lifted {
                    self.lift(sel, cx.surface, cx.overlays);
                }
                self.phase = MarqueePhase::Moving;
                self.start = ev.pos;
                self.last = ev.pos;
                return;
            }
            self.commit(Some(&mut *cx.surface), cx.overlays);
        }
        self.begin_selecting(ev.pos);
    }

    fn on_move(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        match self.phase {
            MarqueePhase::Selecting => {
                let (w, h) = self.drag_extent(ev.pos);
                if let Some(sel) = self.selection.as_mut() {
                    sel.width = w;
                    sel.height = h;
                }
            }
            MarqueePhase::Moving => self.translate_to(ev.pos, cx.overlays),
            MarqueePhase::Idle | MarqueePhase::Selected => return,
        }
        self.render_outline(cx.overlays);
    }

    fn on_end(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        match self.phase {
            MarqueePhase::Selecting => {
                let (w, h) = self.drag_extent(ev.pos);
                if w == 0 || h == 0 {
                    self.selection = None;
                    self.phase = MarqueePhase::Idle;
                    cx.overlays.selection_outline.clear();
                    return;
                }
                if let Some(sel) = self.selection.as_mut() {
                    sel.width = w;
                    sel.height = h;
                }
                self.phase = MarqueePhase::Selected;
                self.render_outline(cx.overlays);
            }
            MarqueePhase::Moving => {
                self.translate_to(ev.pos, cx.overlays);
                self.render_outline(cx.overlays);
                self.phase = MarqueePhase::Selected;
            }
            MarqueePhase::Idle | MarqueePhase::Selected => {}
        }
    }

    fn on_blur(&mut self, surface: Option<&mut RasterSurface>, overlays: &mut Overlays) {
        self.commit(surface, overlays);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Swatch;
    use crate::gesture::Modifiers;
    use crate::tools::Paint;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn ev(x: f32, y: f32) -> PointerEvent {
        PointerEvent { pos: Point::new(x, y), button: 0, modifiers: Modifiers::default() }
    }

    fn paint() -> Paint {
        Paint { color: Swatch::BLACK, pressure: 1.0, size: 1.0 }
    }

    /// 80x80 layer with a red square covering [10, 50).
    fn red_square() -> RasterSurface {
        let mut s = RasterSurface::new(80, 80);
        for y in 10..50 {
            for x in 10..50 {
                s.pixels_mut().put_pixel(x, y, RED);
            }
        }
        s
    }

    fn gesture(m: &mut Marquee, cx: &mut ToolContext<'_>, from: (f32, f32), to: (f32, f32)) {
        m.on_start(&ev(from.0, from.1), cx);
        m.on_move(&ev(to.0, to.1), cx);
        m.on_end(&ev(to.0, to.1), cx);
    }

    #[test]
    fn zero_width_drag_returns_to_idle() {
        let mut layer = RasterSurface::new(80, 80);
        let mut overlays = Overlays::new(80, 80);
        let mut cx = ToolContext { surface: &mut layer, overlays: &mut overlays, paint: paint() };
        let mut m = Marquee::default();
        gesture(&mut m, &mut cx, (10.0, 10.0), (10.0, 30.0));
        assert_eq!(m.phase(), MarqueePhase::Idle);
        assert!(m.selection().is_none());
        assert!(cx.overlays.selection_outline.is_blank());
    }

    #[test]
    fn reverse_drag_normalizes() {
        let mut layer = RasterSurface::new(80, 80);
        let mut overlays = Overlays::new(80, 80);
        let mut cx = ToolContext { surface: &mut layer, overlays: &mut overlays, paint: paint() };
        let mut m = Marquee::default();
        gesture(&mut m, &mut cx, (50.0, 50.0), (10.0, 10.0));
        assert_eq!(m.phase(), MarqueePhase::Selected);
        let sel = m.selection().unwrap();
        assert_eq!(sel.as_array(), [50, 50, -40, -40]);
        assert_eq!(sel.normalized().as_array(), [10, 10, 40, 40]);
        assert!(!cx.overlays.selection_outline.is_blank());
    }

    #[test]
    fn pixels_are_lifted_once_per_selection() {
        let mut layer = red_square();
        let mut overlays = Overlays::new(80, 80);
        let mut m = Marquee::default();
        {
            let mut cx = ToolContext { surface: &mut layer, overlays: &mut overlays, paint: paint() };
            gesture(&mut m, &mut cx, (10.0, 10.0), (50.0, 50.0));
            m.on_start(&ev(30.0, 30.0), &mut cx);
            assert_eq!(m.phase(), MarqueePhase::Moving);
            assert!(m.is_lifted());
            m.on_end(&ev(30.0, 30.0), &mut cx);
            assert_eq!(m.phase(), MarqueePhase::Selected);
        }
        assert_eq!(layer.pixel(20, 20)[3], 0);
        assert_eq!(overlays.selection_content.pixel(20, 20), RED);

        layer.pixels_mut().put_pixel(20, 20, BLUE);
        let mut cx = ToolContext { surface: &mut layer, overlays: &mut overlays, paint: paint() };
        m.on_start(&ev(30.0, 30.0), &mut cx);
        assert_eq!(m.phase(), MarqueePhase::Moving);
        assert_eq!(layer.pixel(20, 20), BLUE);
    }

    #[test]
    fn press_outside_commits_moved_content() {
        let mut layer = red_square();
        let mut overlays = Overlays::new(80, 80);
        let mut m = Marquee::default();
        {
            let mut cx = ToolContext { surface: &mut layer, overlays: &mut overlays, paint: paint() };
            gesture(&mut m, &mut cx, (10.0, 10.0), (50.0, 50.0));
            gesture(&mut m, &mut cx, (30.0, 30.0), (35.0, 35.0));
            assert_eq!(m.selection().unwrap().as_array(), [15, 15, 40, 40]);
            m.on_start(&ev(75.0, 75.0), &mut cx);
            assert_eq!(m.phase(), MarqueePhase::Selecting);
            assert!(!m.is_lifted());
        }
        assert_eq!(layer.pixel(52, 52), RED);
        assert_eq!(layer.pixel(12, 12)[3], 0);
        assert!(overlays.selection_content.is_blank());
    }

    #[test]
    fn blur_commits_and_resets() {
        let mut layer = red_square();
        let mut overlays = Overlays::new(80, 80);
        let mut m = Marquee::default();
        {
            let mut cx = ToolContext { surface: &mut layer, overlays: &mut overlays, paint: paint() };
            gesture(&mut m, &mut cx, (10.0, 10.0), (50.0, 50.0));
            m.on_start(&ev(30.0, 30.0), &mut cx);
            m.on_move(&ev(40.0, 40.0), &mut cx);
        }
        m.on_blur(Some(&mut layer), &mut overlays);
        assert_eq!(m.phase(), MarqueePhase::Idle);
        assert!(m.selection().is_none());
        assert_eq!(layer.pixel(55, 55), RED);
        assert_eq!(layer.pixel(15, 15)[3], 0);
        assert!(overlays.selection_content.is_blank());
        assert!(overlays.selection_outline.is_blank());
    }

    #[test]
    fn blur_without_selection_leaves_layer_alone() {
        let mut layer = red_square();
        let mut overlays = Overlays::new(80, 80);
        let mut m = Marquee::default();
        m.on_blur(Some(&mut layer), &mut overlays);
        assert_eq!(layer.pixel(20, 20), RED);
    }
}
