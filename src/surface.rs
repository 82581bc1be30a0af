//! RGBA pixel buffer with its own drawing context.
//!
//! Shapes are rasterized as signed-distance bands: every pixel inside the
//! shape's bounding box is sampled at its center, the distance to the stroke
//! edge is turned into coverage with a half-pixel smoothstep, and the result is
//! blended with the surface's current composite operation. Rows run in
//! parallel on the rayon pool.

use std::ops::Range;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::geometry::{Point, RectF, SelectionRect, ellipse_outline};

const ELLIPSE_SEGMENTS_PER_QUADRANT: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompositeOp {
    /// Paint over existing pixels.
    #[default]
    SourceOver,
    /// Remove destination alpha where the source is opaque.
    DestinationOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Round,
    Butt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Round,
    Miter,
}

/// Per-surface drawing state, re-applied whenever a tool or layer becomes
/// active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawContext {
    pub composite_op: CompositeOp,
    pub line_width: f32,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
}

impl Default for DrawContext {
    fn default() -> Self {
        Self {
            composite_op: CompositeOp::SourceOver,
            line_width: 1.0,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RasterSurface {
    pixels: RgbaImage,
    pub context: DrawContext,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            context: DrawContext::default(),
        }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels, context: DrawContext::default() }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel at `(x, y)`; transparent outside the surface.
    pub fn pixel(&self, x: i32, y: i32) -> Rgba<u8> {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return Rgba([0, 0, 0, 0]);
        }
        *self.pixels.get_pixel(x as u32, y as u32)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Whether any pixel has non-zero alpha.
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    // ------------------------------------------------------------------
    // Stroke / fill primitives
    // ------------------------------------------------------------------

    pub fn fill_disc(&mut self, center: Point, diameter: f32, color: Rgba<u8>) {
        let r = diameter.max(0.0) / 2.0;
        let bounds = [center.x - r - 1.0, center.y - r - 1.0, center.x + r + 1.0, center.y + r + 1.0];
        self.paint_coverage(bounds, color, |x, y| {
            let dx = x - center.x;
            let dy = y - center.y;
            smoothstep(0.5, -0.5, (dx * dx + dy * dy).sqrt() - r)
        });
    }

    /// Stroke `a → b` with the context's width and cap.
    pub fn stroke_segment(&mut self, a: Point, b: Point, color: Rgba<u8>) {
        let half = self.context.line_width.max(0.0) / 2.0;
        let cap = self.context.line_cap;
        let pad = half + 1.0;
        let bounds = [a.x.min(b.x) - pad, a.y.min(b.y) - pad, a.x.max(b.x) + pad, a.y.max(b.y) + pad];
        self.paint_coverage(bounds, color, |x, y| {
            smoothstep(0.5, -0.5, segment_band(Point::new(x, y), a, b, half, cap))
        });
    }

    /// Stroke an open polyline. Joins between segments are always round.
    pub fn stroke_polyline(&mut self, points: &[Point], color: Rgba<u8>) {
        if points.len() < 2 {
            return;
        }
        let half = self.context.line_width.max(0.0) / 2.0;
        let pad = half + 1.0;
        let mut bounds = [f32::MAX, f32::MAX, f32::MIN, f32::MIN];
        for p in points {
            bounds[0] = bounds[0].min(p.x - pad);
            bounds[1] = bounds[1].min(p.y - pad);
            bounds[2] = bounds[2].max(p.x + pad);
            bounds[3] = bounds[3].max(p.y + pad);
        }
        self.paint_coverage(bounds, color, |x, y| {
            let p = Point::new(x, y);
            let band = points
                .windows(2)
                .map(|s| segment_band(p, s[0], s[1], half, LineCap::Round))
                .fold(f32::MAX, f32::min);
            smoothstep(0.5, -0.5, band)
        });
    }

    /// Stroke the outline of `rect`, centered on its edges.
    pub fn stroke_rect(&mut self, rect: RectF, color: Rgba<u8>) {
        let r = rect.normalized();
        let half = self.context.line_width.max(0.0) / 2.0;
        let join = self.context.line_join;
        let c = r.center();
        let (hx, hy) = (r.w / 2.0, r.h / 2.0);
        let pad = half + 1.0;
        let bounds = [r.x - pad, r.y - pad, r.x + r.w + pad, r.y + r.h + pad];
        self.paint_coverage(bounds, color, |x, y| {
            let dx = (x - c.x).abs() - hx;
            let dy = (y - c.y).abs() - hy;
            let d = match join {
                LineJoin::Miter => dx.max(dy),
                LineJoin::Round => {
                    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
                    outside + dx.max(dy).min(0.0)
                }
            };
            smoothstep(0.5, -0.5, d.abs() - half)
        });
    }

    /// Stroke the ellipse inscribed in `rect`.
    pub fn stroke_ellipse(&mut self, rect: RectF, color: Rgba<u8>) {
        let outline = ellipse_outline(rect, ELLIPSE_SEGMENTS_PER_QUADRANT);
        self.stroke_polyline(&outline, color);
    }

    /// Stroke every vertical and horizontal line at multiples of `step` as
    /// one path, so crossings are not painted twice.
    pub fn stroke_grid(&mut self, step: f32, color: Rgba<u8>) {
        if step <= 0.0 {
            return;
        }
        let half = self.context.line_width.max(0.0) / 2.0;
        let bounds = [0.0, 0.0, self.width() as f32, self.height() as f32];
        self.paint_coverage(bounds, color, |x, y| {
            let dx = (x - (x / step).round() * step).abs();
            let dy = (y - (y / step).round() * step).abs();
            smoothstep(0.5, -0.5, dx.min(dy) - half)
        });
    }

    // ------------------------------------------------------------------
    // Region access
    // ------------------------------------------------------------------

    /// Make every pixel under `rect` transparent, regardless of the
    /// composite operation.
    pub fn erase_rect(&mut self, rect: SelectionRect) {
        let r = rect.normalized();
        let (xs, ys) = self.clip(r);
        for y in ys {
            for x in xs.clone() {
                self.pixels.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }

    /// Copy of the pixels under `rect`. Parts outside the surface read back
    /// transparent.
    pub fn get_region(&self, rect: SelectionRect) -> RgbaImage {
        let r = rect.normalized();
        let mut out = RgbaImage::new(r.width.max(0) as u32, r.height.max(0) as u32);
        let (xs, ys) = self.clip(r);
        for y in ys {
            for x in xs.clone() {
                let ox = (x as i32 - r.x) as u32;
                let oy = (y as i32 - r.y) as u32;
                out.put_pixel(ox, oy, *self.pixels.get_pixel(x, y));
            }
        }
        out
    }

    /// Replace pixels with `img` placed at `(x, y)`, no blending.
    pub fn put_image(&mut self, img: &RgbaImage, x: i32, y: i32) {
        self.for_each_overlap(img, x, y, |dst, src| *dst = src);
    }

    /// Blend `img` placed at `(x, y)` with `op`.
    pub fn draw_image(&mut self, img: &RgbaImage, x: i32, y: i32, op: CompositeOp) {
        self.for_each_overlap(img, x, y, |dst, src| *dst = blend_pixel(*dst, src, op, 1.0));
    }

    /// Blend another surface of any size onto this one at the origin.
    pub fn draw_surface(&mut self, other: &RasterSurface, op: CompositeOp) {
        self.draw_image(&other.pixels, 0, 0, op);
    }

    fn for_each_overlap(&mut self, img: &RgbaImage, x: i32, y: i32, mut f: impl FnMut(&mut Rgba<u8>, Rgba<u8>)) {
        let rect = SelectionRect::new(x, y, img.width() as i32, img.height() as i32);
        let (xs, ys) = self.clip(rect);
        for dy in ys {
            for dx in xs.clone() {
                let src = *img.get_pixel((dx as i32 - x) as u32, (dy as i32 - y) as u32);
                f(self.pixels.get_pixel_mut(dx, dy), src);
            }
        }
    }

    /// Surface pixel ranges covered by a normalized rectangle.
    fn clip(&self, r: SelectionRect) -> (Range<u32>, Range<u32>) {
        let x0 = r.x.clamp(0, self.width() as i32) as u32;
        let y0 = r.y.clamp(0, self.height() as i32) as u32;
        let x1 = (r.x + r.width).clamp(0, self.width() as i32) as u32;
        let y1 = (r.y + r.height).clamp(0, self.height() as i32) as u32;
        (x0..x1.max(x0), y0..y1.max(y0))
    }

    /// Blend `color` into every pixel of `bounds` (`[x0, y0, x1, y1]`) with
    /// the coverage `coverage(cx, cy)` sampled at the pixel center.
    fn paint_coverage<F>(&mut self, bounds: [f32; 4], color: Rgba<u8>, coverage: F)
    where
        F: Fn(f32, f32) -> f32 + Sync,
    {
        let (w, h) = self.pixels.dimensions();
        let xs = pixel_span(bounds[0], bounds[2], w);
        let ys = pixel_span(bounds[1], bounds[3], h);
        if xs.is_empty() || ys.is_empty() {
            return;
        }
        let op = self.context.composite_op;
        let stride = w as usize * 4;
        let buf: &mut [u8] = &mut self.pixels;

        buf.par_chunks_mut(stride)
            .enumerate()
            .skip(ys.start)
            .take(ys.len())
            .for_each(|(y, row)| {
                let cy = y as f32 + 0.5;
                for x in xs.clone() {
                    let cov = coverage(x as f32 + 0.5, cy);
                    if cov <= 0.0 {
                        continue;
                    }
                    let i = x * 4;
                    let base = Rgba([row[i], row[i + 1], row[i + 2], row[i + 3]]);
                    let out = blend_pixel(base, color, op, cov);
                    row[i..i + 4].copy_from_slice(&out.0);
                }
            });
    }
}

fn pixel_span(lo: f32, hi: f32, limit: u32) -> Range<usize> {
    let start = lo.floor().max(0.0) as usize;
    let end = (hi.ceil().max(0.0) as usize).min(limit as usize);
    start..end.max(start)
}

/// Signed distance from `p` to the edge of a stroke of half-width `half`
/// along `a → b`; negative inside.
fn segment_band(p: Point, a: Point, b: Point, half: f32, cap: LineCap) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let (apx, apy) = (p.x - a.x, p.y - a.y);
    let len2 = abx * abx + aby * aby;

    if len2 <= f32::EPSILON {
        return match cap {
            LineCap::Round => (apx * apx + apy * apy).sqrt() - half,
            LineCap::Butt => f32::MAX,
        };
    }

    let t = (apx * abx + apy * aby) / len2;
    match cap {
        LineCap::Round => {
            let t = t.clamp(0.0, 1.0);
            let dx = apx - abx * t;
            let dy = apy - aby * t;
            (dx * dx + dy * dy).sqrt() - half
        }
        LineCap::Butt => {
            let len = len2.sqrt();
            let perp = (apx * aby - apy * abx).abs() / len;
            let along = (-t * len).max((t - 1.0) * len);
            (perp - half).max(along)
        }
    }
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Composite `top` onto `base` with straight alpha. `coverage` scales the
/// source alpha.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, op: CompositeOp, coverage: f32) -> Rgba<u8> {
    let top_a = (top[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if top_a <= 0.0 {
        return base;
    }
    let base_a = base[3] as f32 / 255.0;

    match op {
        CompositeOp::SourceOver => {
            if top_a >= 1.0 {
                return Rgba([top[0], top[1], top[2], 255]);
            }
            let out_a = top_a + base_a * (1.0 - top_a);
            if out_a <= 0.0 {
                return Rgba([0, 0, 0, 0]);
            }
            let mix = |t: u8, b: u8| {
                let v = (t as f32 * top_a + b as f32 * base_a * (1.0 - top_a)) / out_a;
                v.round().clamp(0.0, 255.0) as u8
            };
            Rgba([
                mix(top[0], base[0]),
                mix(top[1], base[1]),
                mix(top[2], base[2]),
                (out_a * 255.0).round() as u8,
            ])
        }
        CompositeOp::DestinationOut => {
            let out_a = base_a * (1.0 - top_a);
            let a = (out_a * 255.0).round() as u8;
            if a == 0 {
                return Rgba([0, 0, 0, 0]);
            }
            Rgba([base[0], base[1], base[2], a])
        }
    }
}
