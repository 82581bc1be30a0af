//! Points, rectangles and the small bits of plane geometry the tools share.

/// Control-point offset (as a fraction of the radius) that makes a cubic
/// Bézier quadrant approximate a circle.
pub const KAPPA: f32 = 0.552_284_8;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Pixel cell containing this point.
    pub fn to_pixel(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    pub fn delta_from(self, origin: Point) -> (f32, f32) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// Snap `p` to the nearest intersection of a lattice with pitch `step`.
///
/// Each axis rounds independently: the remainder past the lower grid line
/// rounds down below half a step and up from half a step on.
pub fn snap_to_grid(p: Point, step: f32) -> Point {
    if step <= 0.0 {
        return p;
    }
    Point::new(snap_axis(p.x, step), snap_axis(p.y, step))
}

fn snap_axis(v: f32, step: f32) -> f32 {
    let lower = (v / step).floor() * step;
    let rem = v - lower;
    if rem < step / 2.0 { lower } else { lower + step }
}

/// Axis-aligned rectangle in canvas space. Width and height may be negative,
/// in which case `(x, y)` is the far corner.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn normalized(self) -> Self {
        let (x, w) = if self.w < 0.0 { (self.x + self.w, -self.w) } else { (self.x, self.w) };
        let (y, h) = if self.h < 0.0 { (self.y + self.h, -self.h) } else { (self.y, self.h) };
        Self { x, y, w, h }
    }

    pub fn center(self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Move each edge inward by `amount`, following the sign of the extents
    /// so a rectangle dragged up or left shrinks toward its own interior.
    pub fn inset(self, amount: f32) -> Self {
        let sx = if self.w > 0.0 { 1.0 } else { -1.0 };
        let sy = if self.h > 0.0 { 1.0 } else { -1.0 };
        Self {
            x: self.x + sx * amount,
            y: self.y + sy * amount,
            w: self.w - sx * amount * 2.0,
            h: self.h - sy * amount * 2.0,
        }
    }
}

/// Apply the shift constraint to a drag delta: the horizontal extent takes
/// the vertical magnitude while keeping its own direction.
pub fn constrain_square(dx: f32, dy: f32) -> (f32, f32) {
    let dx = if dx > 0.0 { dy.abs() } else { -dy.abs() };
    (dx, dy)
}

/// Bounds of a rectangle/ellipse drag from `start` to `current`.
///
/// `shift` squares the delta, `alt` treats `start` as the center.
pub fn drag_bounds(start: Point, current: Point, shift: bool, alt: bool) -> RectF {
    let (mut dx, dy) = current.delta_from(start);
    if shift {
        dx = constrain_square(dx, dy).0;
    }
    if alt {
        RectF::new(start.x - dx, start.y - dy, 2.0 * dx, 2.0 * dy)
    } else {
        RectF::new(start.x, start.y, dx, dy)
    }
}

/// Closed outline of the ellipse inscribed in `bounds`, built from four cubic
/// Bézier quadrants and flattened to `segments_per_quadrant` pieces each.
pub fn ellipse_outline(bounds: RectF, segments_per_quadrant: usize) -> Vec<Point> {
    let RectF { x, y, w, h } = bounds;
    let hb = (w / 2.0) * KAPPA;
    let vb = (h / 2.0) * KAPPA;
    let ex = x + w;
    let ey = y + h;
    let mx = x + w / 2.0;
    let my = y + h / 2.0;

    let quadrants = [
        [Point::new(x, my), Point::new(x, my - vb), Point::new(mx - hb, y), Point::new(mx, y)],
        [Point::new(mx, y), Point::new(mx + hb, y), Point::new(ex, my - vb), Point::new(ex, my)],
        [Point::new(ex, my), Point::new(ex, my + vb), Point::new(mx + hb, ey), Point::new(mx, ey)],
        [Point::new(mx, ey), Point::new(mx - hb, ey), Point::new(x, my + vb), Point::new(x, my)],
    ];

    let n = segments_per_quadrant.max(1);
    let mut points = Vec::with_capacity(n * 4 + 1);
    points.push(quadrants[0][0]);
    for [p0, p1, p2, p3] in quadrants {
        for i in 1..=n {
            points.push(bezier_point(p0, p1, p2, p3, i as f32 / n as f32));
        }
    }
    points
}

fn bezier_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    Point::new(
        mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x,
        mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y,
    )
}

/// Marquee rectangle in whole pixels, `[x, y, width, height]`.
/// Extents are negative while the user drags up or left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SelectionRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SelectionRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn as_array(self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0 { (self.x + self.width, -self.width) } else { (self.x, self.width) };
        let (y, height) = if self.height < 0 { (self.y + self.height, -self.height) } else { (self.y, self.height) };
        Self { x, y, width, height }
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Hit test on the normalized rectangle. The leading edges get one pixel
    /// of slack so clicks right on the outline still count as inside.
    pub fn contains(self, p: Point) -> bool {
        let r = self.normalized();
        let (left, top) = (r.x as f32, r.y as f32);
        p.x >= left - 1.0
            && p.x <= left + r.width as f32
            && p.y >= top - 1.0
            && p.y <= top + r.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_rounds_each_axis_at_half_step() {
        let p = snap_to_grid(Point::new(9.9, 10.0), 20.0);
        assert_eq!(p, Point::new(0.0, 20.0));
        let p = snap_to_grid(Point::new(31.0, 47.0), 20.0);
        assert_eq!(p, Point::new(40.0, 40.0));
    }

    #[test]
    fn snap_is_idempotent_and_near() {
        let step = 20.0;
        for ix in -30..30 {
            for iy in -30..30 {
                let p = Point::new(ix as f32 * 3.7, iy as f32 * 2.3);
                let s = snap_to_grid(p, step);
                assert_eq!(snap_to_grid(s, step), s);
                assert_eq!(s.x.rem_euclid(step), 0.0);
                assert_eq!(s.y.rem_euclid(step), 0.0);
                let (dx, dy) = s.delta_from(p);
                assert!((dx * dx + dy * dy).sqrt() <= step / 2.0_f32.sqrt() + 1e-3);
            }
        }
    }

    #[test]
    fn selection_normalizes_negative_drag() {
        let r = SelectionRect::new(50, 50, -40, -40).normalized();
        assert_eq!(r.as_array(), [10, 10, 40, 40]);
    }

    #[test]
    fn selection_hit_test_has_leading_slack() {
        let r = SelectionRect::new(10, 10, 40, 40);
        assert!(r.contains(Point::new(9.0, 9.0)));
        assert!(r.contains(Point::new(50.0, 50.0)));
        assert!(!r.contains(Point::new(8.5, 20.0)));
        assert!(!r.contains(Point::new(50.5, 20.0)));
        assert!(SelectionRect::new(50, 50, -40, -40).contains(Point::new(30.0, 30.0)));
    }

    #[test]
    fn shift_keeps_horizontal_sign_and_vertical_magnitude() {
        assert_eq!(constrain_square(100.0, 30.0), (30.0, 30.0));
        assert_eq!(constrain_square(-100.0, 30.0), (-30.0, 30.0));
        assert_eq!(constrain_square(5.0, -60.0), (60.0, -60.0));

        let r = drag_bounds(Point::new(0.0, 0.0), Point::new(100.0, 30.0), true, false);
        assert_eq!(r, RectF::new(0.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn alt_centers_on_start() {
        let r = drag_bounds(Point::new(50.0, 50.0), Point::new(60.0, 70.0), false, true);
        assert_eq!(r, RectF::new(40.0, 30.0, 20.0, 40.0));
        assert_eq!(r.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn inset_follows_drag_direction() {
        assert_eq!(RectF::new(10.0, 10.0, 40.0, 30.0).inset(2.0), RectF::new(12.0, 12.0, 36.0, 26.0));
        assert_eq!(RectF::new(50.0, 40.0, -40.0, -30.0).inset(2.0), RectF::new(48.0, 38.0, -36.0, -26.0));
    }

    #[test]
    fn ellipse_outline_is_closed_and_hits_extremes() {
        let pts = ellipse_outline(RectF::new(0.0, 0.0, 40.0, 20.0), 8);
        assert_eq!(pts.len(), 33);
        assert_eq!(pts.first(), pts.last());
        assert!(pts.contains(&Point::new(20.0, 0.0)));
        assert!(pts.contains(&Point::new(40.0, 10.0)));
        assert!(pts.contains(&Point::new(20.0, 20.0)));
    }
}
