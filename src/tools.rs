//! Tool registry and the per-tool gesture handlers.
//!
//! Descriptors are immutable statics. Everything a tool remembers between
//! pointer events lives in its [`ToolState`] variant, which the dispatcher
//! rebuilds on every tool switch.

use std::fmt;
use std::str::FromStr;

use image::Rgba;

use crate::color::Swatch;
use crate::error::{EditorError, Result};
use crate::geometry::{Point, constrain_square, drag_bounds};
use crate::gesture::PointerEvent;
use crate::marquee::Marquee;
use crate::surface::{CompositeOp, DrawContext, LineCap, LineJoin, RasterSurface};

/// Grid overlay stroke: black at 5% opacity.
pub const GRID_COLOR: Rgba<u8> = Rgba([0, 0, 0, 13]);
pub const GRID_LINE_WIDTH: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Line,
    Rectangle,
    Ellipse,
    Marquee,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Brush,
        ToolKind::Eraser,
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::Ellipse,
        ToolKind::Marquee,
    ];

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn descriptor(self) -> &'static ToolDescriptor {
        match self {
            ToolKind::Brush => &BRUSH,
            ToolKind::Eraser => &ERASER,
            ToolKind::Line => &LINE,
            ToolKind::Rectangle => &RECTANGLE,
            ToolKind::Ellipse => &ELLIPSE,
            ToolKind::Marquee => &MARQUEE,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl FromStr for ToolKind {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| EditorError::UndefinedTool(s.to_string()))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a tool's stroke size is chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizePolicy {
    /// Adjustable, starting at the given size.
    Fixed(f32),
    /// Borrows the default tool's current size.
    DeferToDefault,
    NotAdjustable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Cursor {
    Crosshair,
    #[default]
    Default,
    NotAllowed,
}

#[derive(Debug)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: &'static str,
    pub title: &'static str,
    pub mode: CompositeOp,
    pub cursor: Cursor,
    pub size: SizePolicy,
    pub grid_snap: bool,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
}

impl ToolDescriptor {
    /// Drawing context applied to the active layer while this tool is
    /// selected. `size` is the tool's current adjustable size, if any.
    pub fn context(&self, size: Option<f32>) -> DrawContext {
        DrawContext {
            composite_op: self.mode,
            line_width: size.filter(|s| *s > 0.0).unwrap_or(1.0),
            line_cap: self.line_cap,
            line_join: self.line_join,
        }
    }
}

static BRUSH: ToolDescriptor = ToolDescriptor {
    kind: ToolKind::Brush,
    name: "brush",
    title: "Brush",
    mode: CompositeOp::SourceOver,
    cursor: Cursor::Crosshair,
    size: SizePolicy::Fixed(2.0),
    grid_snap: true,
    line_cap: LineCap::Round,
    line_join: LineJoin::Round,
};

static ERASER: ToolDescriptor = ToolDescriptor {
    kind: ToolKind::Eraser,
    name: "eraser",
    title: "Eraser",
    mode: CompositeOp::DestinationOut,
    cursor: Cursor::Crosshair,
    size: SizePolicy::Fixed(20.0),
    grid_snap: false,
    line_cap: LineCap::Round,
    line_join: LineJoin::Round,
};

static LINE: ToolDescriptor = ToolDescriptor {
    kind: ToolKind::Line,
    name: "line",
    title: "Line",
    mode: CompositeOp::SourceOver,
    cursor: Cursor::Crosshair,
    size: SizePolicy::DeferToDefault,
    grid_snap: true,
    line_cap: LineCap::Round,
    line_join: LineJoin::Round,
};

static RECTANGLE: ToolDescriptor = ToolDescriptor {
    kind: ToolKind::Rectangle,
    name: "rectangle",
    title: "Rectangle",
    mode: CompositeOp::SourceOver,
    cursor: Cursor::Crosshair,
    size: SizePolicy::DeferToDefault,
    grid_snap: true,
    line_cap: LineCap::Butt,
    line_join: LineJoin::Miter,
};

static ELLIPSE: ToolDescriptor = ToolDescriptor {
    kind: ToolKind::Ellipse,
    name: "ellipse",
    title: "Ellipse",
    mode: CompositeOp::SourceOver,
    cursor: Cursor::Crosshair,
    size: SizePolicy::DeferToDefault,
    grid_snap: true,
    line_cap: LineCap::Round,
    line_join: LineJoin::Round,
};

static MARQUEE: ToolDescriptor = ToolDescriptor {
    kind: ToolKind::Marquee,
    name: "marquee",
    title: "Selection",
    mode: CompositeOp::SourceOver,
    cursor: Cursor::Crosshair,
    size: SizePolicy::NotAdjustable,
    grid_snap: true,
    line_cap: LineCap::Round,
    line_join: LineJoin::Round,
};

/// Current adjustable sizes, one set per editor.
#[derive(Clone, Debug)]
pub struct ToolSizes {
    sizes: [Option<f32>; ToolKind::ALL.len()],
    default_tool: ToolKind,
}

impl ToolSizes {
    pub fn new(default_tool: ToolKind) -> Self {
        let mut sizes = [None; ToolKind::ALL.len()];
        for kind in ToolKind::ALL {
            if let SizePolicy::Fixed(n) = kind.descriptor().size {
                sizes[kind.slot()] = Some(n);
            }
        }
        Self { sizes, default_tool }
    }

    pub fn default_tool(&self) -> ToolKind {
        self.default_tool
    }

    /// The tool's own stored size; `None` unless its policy is `Fixed`.
    pub fn own(&self, kind: ToolKind) -> Option<f32> {
        self.sizes[kind.slot()]
    }

    /// Size used when `kind` draws. Deferring tools resolve through the
    /// default tool; a non-adjustable tool has none.
    pub fn effective(&self, kind: ToolKind) -> Option<f32> {
        match kind.descriptor().size {
            SizePolicy::Fixed(_) => self.own(kind),
            SizePolicy::DeferToDefault => self.own(self.default_tool).or(Some(1.0)),
            SizePolicy::NotAdjustable => None,
        }
    }

    /// Store a new size for `kind`. Returns `false` when the tool is not
    /// adjustable. Deferring tools write through to the default tool.
    pub fn set(&mut self, kind: ToolKind, value: f32) -> bool {
        let target = match kind.descriptor().size {
            SizePolicy::Fixed(_) => kind,
            SizePolicy::DeferToDefault => self.default_tool,
            SizePolicy::NotAdjustable => return false,
        };
        if !matches!(target.descriptor().size, SizePolicy::Fixed(_)) {
            return false;
        }
        self.sizes[target.slot()] = Some(value.max(0.0));
        true
    }
}

/// What the active tool paints with for the current event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: Swatch,
    /// Stroke alpha, from the pressure provider.
    pub pressure: f32,
    pub size: f32,
}

impl Paint {
    pub fn stroke_color(&self) -> Rgba<u8> {
        self.color.to_rgba(self.pressure)
    }

    pub fn opaque_color(&self) -> Rgba<u8> {
        self.color.to_rgba(1.0)
    }
}

/// Editor-owned surfaces drawn above the layer stack. They never reach the
/// layer list or the exported state.
#[derive(Clone, Debug)]
pub struct Overlays {
    pub scratch: RasterSurface,
    pub selection_outline: RasterSurface,
    pub selection_content: RasterSurface,
    pub grid: RasterSurface,
}

impl Overlays {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            scratch: RasterSurface::new(width, height),
            selection_outline: RasterSurface::new(width, height),
            selection_content: RasterSurface::new(width, height),
            grid: RasterSurface::new(width, height),
        }
    }

    pub fn render_grid(&mut self, step: f32) {
        self.grid.clear();
        self.grid.context.line_width = GRID_LINE_WIDTH;
        self.grid.stroke_grid(step, GRID_COLOR);
    }
}

/// Everything a handler may touch while processing one event.
pub struct ToolContext<'a> {
    pub surface: &'a mut RasterSurface,
    pub overlays: &'a mut Overlays,
    pub paint: Paint,
}

pub trait ToolHandler {
    fn on_start(&mut self, _ev: &PointerEvent, _cx: &mut ToolContext<'_>) {}
    fn on_move(&mut self, _ev: &PointerEvent, _cx: &mut ToolContext<'_>) {}
    fn on_end(&mut self, _ev: &PointerEvent, _cx: &mut ToolContext<'_>) {}
    fn on_focus(&mut self, _overlays: &mut Overlays) {}
    /// Called before the tool loses its layer (tool switch, layer change).
    /// `surface` is the active raster surface, if there is one.
    fn on_blur(&mut self, _surface: Option<&mut RasterSurface>, _overlays: &mut Overlays) {}
}

// ============================================================================
// Brush / eraser
// ============================================================================

/// Freehand stroke: a disc on press, round-capped segments on drag.
#[derive(Clone, Debug, Default)]
pub struct StrokeTool {
    erase: bool,
    last: Option<Point>,
}

impl StrokeTool {
    pub fn brush() -> Self {
        Self { erase: false, last: None }
    }

    pub fn eraser() -> Self {
        Self { erase: true, last: None }
    }

    fn color(&self, paint: &Paint) -> Rgba<u8> {
        // destination-out only reads source alpha
        if self.erase { Rgba([0, 0, 0, 255]) } else { paint.stroke_color() }
    }
}

impl ToolHandler for StrokeTool {
    fn on_start(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        if ev.button != 0 {
            return;
        }
        let color = self.color(&cx.paint);
        cx.surface.context.line_width = cx.paint.size;
        cx.surface.fill_disc(ev.pos, cx.paint.size, color);
        self.last = Some(ev.pos);
    }

    fn on_move(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        if ev.button != 0 {
            return;
        }
        let Some(last) = self.last else { return };
        let color = self.color(&cx.paint);
        cx.surface.context.line_width = cx.paint.size;
        cx.surface.stroke_segment(last, ev.pos, color);
        self.last = Some(ev.pos);
    }

    fn on_end(&mut self, _ev: &PointerEvent, _cx: &mut ToolContext<'_>) {
        self.last = None;
    }

    fn on_blur(&mut self, _surface: Option<&mut RasterSurface>, _overlays: &mut Overlays) {
        self.last = None;
    }
}

// ============================================================================
// Line / rectangle / ellipse
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Line,
    Rectangle,
    Ellipse,
}

/// Drag-to-size shape: 1px preview on the scratch overlay, committed to the
/// layer with the tool size on release.
#[derive(Clone, Debug)]
pub struct ShapeTool {
    shape: Shape,
    start: Option<Point>,
}

impl ShapeTool {
    pub fn new(shape: Shape) -> Self {
        Self { shape, start: None }
    }

    pub fn is_drawing(&self) -> bool {
        self.start.is_some()
    }

    fn line_end(start: Point, ev: &PointerEvent) -> Point {
        let (mut dx, mut dy) = ev.pos.delta_from(start);
        if ev.modifiers.shift {
            (dx, dy) = constrain_square(dx, dy);
        }
        Point::new(start.x + dx, start.y + dy)
    }

    fn draw(&self, target: &mut RasterSurface, start: Point, ev: &PointerEvent, color: Rgba<u8>, inset: f32) {
        match self.shape {
            Shape::Line => target.stroke_segment(start, Self::line_end(start, ev), color),
            Shape::Rectangle => {
                let bounds = drag_bounds(start, ev.pos, ev.modifiers.shift, ev.modifiers.alt);
                target.stroke_rect(bounds.inset(inset), color);
            }
            Shape::Ellipse => {
                let bounds = drag_bounds(start, ev.pos, ev.modifiers.shift, ev.modifiers.alt);
                target.stroke_ellipse(bounds.inset(inset), color);
            }
        }
    }
}

impl ToolHandler for ShapeTool {
    fn on_start(&mut self, ev: &PointerEvent, _cx: &mut ToolContext<'_>) {
        if ev.button != 0 {
            return;
        }
        self.start = Some(ev.pos);
    }

    fn on_move(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        if ev.button != 0 {
            return;
        }
        let Some(start) = self.start else { return };
        let scratch = &mut cx.overlays.scratch;
        scratch.clear();
        scratch.context = DrawContext::default();
        self.draw(scratch, start, ev, cx.paint.opaque_color(), 0.0);
    }

    fn on_end(&mut self, ev: &PointerEvent, cx: &mut ToolContext<'_>) {
        let Some(start) = self.start.take() else { return };
        cx.overlays.scratch.clear();
        cx.surface.context.line_width = cx.paint.size;
        let inset = match self.shape {
            Shape::Line => 0.0,
            Shape::Rectangle | Shape::Ellipse => cx.paint.size / 2.0,
        };
        self.draw(cx.surface, start, ev, cx.paint.opaque_color(), inset);
    }

    fn on_blur(&mut self, _surface: Option<&mut RasterSurface>, overlays: &mut Overlays) {
        self.start = None;
        overlays.scratch.clear();
    }
}

// ============================================================================
// Per-editor gesture state
// ============================================================================

/// The active tool together with its private drag state.
#[derive(Clone, Debug)]
pub enum ToolState {
    Brush(StrokeTool),
    Eraser(StrokeTool),
    Line(ShapeTool),
    Rectangle(ShapeTool),
    Ellipse(ShapeTool),
    Marquee(Marquee),
}

impl ToolState {
    pub fn new(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Brush => ToolState::Brush(StrokeTool::brush()),
            ToolKind::Eraser => ToolState::Eraser(StrokeTool::eraser()),
            ToolKind::Line => ToolState::Line(ShapeTool::new(Shape::Line)),
            ToolKind::Rectangle => ToolState::Rectangle(ShapeTool::new(Shape::Rectangle)),
            ToolKind::Ellipse => ToolState::Ellipse(ShapeTool::new(Shape::Ellipse)),
            ToolKind::Marquee => ToolState::Marquee(Marquee::default()),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolState::Brush(_) => ToolKind::Brush,
            ToolState::Eraser(_) => ToolKind::Eraser,
            ToolState::Line(_) => ToolKind::Line,
            ToolState::Rectangle(_) => ToolKind::Rectangle,
            ToolState::Ellipse(_) => ToolKind::Ellipse,
            ToolState::Marquee(_) => ToolKind::Marquee,
        }
    }

    pub fn handler_mut(&mut self) -> &mut dyn ToolHandler {
        match self {
            ToolState::Brush(t) | ToolState::Eraser(t) => t as &mut dyn ToolHandler,
            ToolState::Line(t) | ToolState::Rectangle(t) | ToolState::Ellipse(t) => t as &mut dyn ToolHandler,
            ToolState::Marquee(m) => m as &mut dyn ToolHandler,
        }
    }

    pub fn marquee(&self) -> Option<&Marquee> {
        match self {
            ToolState::Marquee(m) => Some(m),
            _ => None,
        }
    }
}
