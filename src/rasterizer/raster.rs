//! Scanline triangle rasterizer
//!
//! Triangles are sorted by Y and classified as flat-top, flat-bottom or
//! generic. A generic triangle is split at the middle vertex's scanline into
//! a flat-bottom and a flat-top half. Each half walks its two edges with
//! 16.16 fixed-point deltas for X, Z, U and V.
//!
//! Fill convention: a pixel at integer (x, y) belongs to a triangle when
//! `ceil(top) <= y < ceil(bottom)` and `ceil(left) <= x < ceil(right)`.
//! Triangles sharing an edge never write the same pixel twice.

use super::fixed::Fixed;
use super::framebuffer::Framebuffer;
use super::span::{Gradients, SpanStart, SpanWriter};

/// Coordinates beyond this are clipped in screen space before edge walking,
/// keeping every value well inside the 16.16 integer range
pub const GUARD_BAND: f32 = 8_192.0;

/// Screen-space vertex: pixel position, camera-space depth and normalized UV
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
}

impl ScreenVertex {
    pub const fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self { x, y, z, u, v }
    }

    fn lerp(&self, other: &ScreenVertex, t: f32) -> ScreenVertex {
        ScreenVertex {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
            u: self.u + (other.u - self.u) * t,
            v: self.v + (other.v - self.v) * t,
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Shape of a Y-sorted triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleClass {
    /// Two top vertices share a scanline
    FlatTop,
    /// Two bottom vertices share a scanline
    FlatBottom,
    /// Split at the middle vertex
    Generic,
    /// Zero area or all three on one scanline
    Degenerate,
}

fn signed_area2(a: &ScreenVertex, b: &ScreenVertex, c: &ScreenVertex) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

fn sort_by_y(v: [ScreenVertex; 3]) -> [ScreenVertex; 3] {
    let mut s = v;
    if s[1].y < s[0].y {
        s.swap(0, 1);
    }
    if s[2].y < s[1].y {
        s.swap(1, 2);
    }
    if s[1].y < s[0].y {
        s.swap(0, 1);
    }
    s
}

/// Classify a triangle already sorted by ascending Y
pub fn classify(sorted: &[ScreenVertex; 3]) -> TriangleClass {
    let [a, b, c] = sorted;
    if a.y == c.y || signed_area2(a, b, c).abs() < 1e-6 {
        TriangleClass::Degenerate
    } else if a.y == b.y {
        TriangleClass::FlatTop
    } else if b.y == c.y {
        TriangleClass::FlatBottom
    } else {
        TriangleClass::Generic
    }
}

/// Constant per-pixel attribute deltas across the triangle plane
fn gradients(t: &[ScreenVertex; 3], su: f32, sv: f32) -> Gradients {
    let [a, b, c] = t;
    let area = signed_area2(a, b, c);
    let d = |a0: f32, a1: f32, a2: f32| ((a1 - a0) * (c.y - a.y) - (a2 - a0) * (b.y - a.y)) / area;
    Gradients {
        dz: Fixed::from_f32(d(a.z, b.z, c.z)),
        du: Fixed::from_f32(d(a.u * su, b.u * su, c.u * su)),
        dv: Fixed::from_f32(d(a.v * sv, b.v * sv, c.v * sv)),
    }
}

/// One edge being walked downward, one scanline per step
struct Edge {
    x: Fixed,
    dx: Fixed,
    z: Fixed,
    dz: Fixed,
    u: Fixed,
    du: Fixed,
    v: Fixed,
    dv: Fixed,
}

impl Edge {
    /// Edge from `top` to `bottom`, prestepped to scanline `first_row`
    fn new(top: &ScreenVertex, bottom: &ScreenVertex, first_row: i32, su: f32, sv: f32) -> Self {
        let dy = bottom.y - top.y;
        let step = |a: f32, b: f32| Fixed::from_f32((b - a) / dy);
        let pre = Fixed::from_f32(first_row as f32 - top.y);
        let dx = step(top.x, bottom.x);
        let dz = step(top.z, bottom.z);
        let du = step(top.u * su, bottom.u * su);
        let dv = step(top.v * sv, bottom.v * sv);
        Edge {
            x: Fixed::from_f32(top.x) + dx.mul_fixed(pre),
            dx,
            z: Fixed::from_f32(top.z) + dz.mul_fixed(pre),
            dz,
            u: Fixed::from_f32(top.u * su) + du.mul_fixed(pre),
            du,
            v: Fixed::from_f32(top.v * sv) + dv.mul_fixed(pre),
            dv,
        }
    }

    #[inline]
    fn step(&mut self) {
        self.x += self.dx;
        self.z += self.dz;
        self.u += self.du;
        self.v += self.dv;
    }
}

/// Rasterize one triangle through `writer`. Returns the number of pixels
/// written; degenerate and fully off-screen triangles write none.
pub fn rasterize_triangle<W: SpanWriter>(
    fb: &mut Framebuffer,
    tri: [ScreenVertex; 3],
    writer: &W,
    depth_test: bool,
) -> u32 {
    if !tri.iter().all(ScreenVertex::is_finite) {
        return 0;
    }
    let (w, h) = (fb.width as f32, fb.height as f32);
    let outside = tri.iter().all(|v| v.x < 0.0)
        || tri.iter().all(|v| v.x >= w)
        || tri.iter().all(|v| v.y < 0.0)
        || tri.iter().all(|v| v.y >= h);
    if outside {
        return 0;
    }

    let in_guard = tri.iter().all(|v| v.x.abs() <= GUARD_BAND && v.y.abs() <= GUARD_BAND);
    if in_guard {
        return rasterize_sorted(fb, sort_by_y(tri), writer, depth_test);
    }

    let poly = clip_to_guard_band(&tri);
    let mut written = 0;
    for i in 1..poly.len().saturating_sub(1) {
        let fan = [poly[0], poly[i], poly[i + 1]];
        written += rasterize_sorted(fb, sort_by_y(fan), writer, depth_test);
    }
    written
}

fn rasterize_sorted<W: SpanWriter>(
    fb: &mut Framebuffer,
    t: [ScreenVertex; 3],
    writer: &W,
    depth_test: bool,
) -> u32 {
    let class = classify(&t);
    if class == TriangleClass::Degenerate {
        return 0;
    }
    let (su, sv) = writer.texel_scale();
    let grad = gradients(&t, su, sv);
    let [a, b, c] = t;

    match class {
        TriangleClass::FlatTop => fill_half(fb, &a, &c, &b, &c, &grad, writer, depth_test, su, sv),
        TriangleClass::FlatBottom => fill_half(fb, &a, &b, &a, &c, &grad, writer, depth_test, su, sv),
        TriangleClass::Generic => {
            let t_split = (b.y - a.y) / (c.y - a.y);
            let mut split = a.lerp(&c, t_split);
            split.y = b.y;
            fill_half(fb, &a, &b, &a, &split, &grad, writer, depth_test, su, sv)
                + fill_half(fb, &b, &c, &split, &c, &grad, writer, depth_test, su, sv)
        }
        TriangleClass::Degenerate => 0,
    }
}

/// Fill the rows between two edges (e1_top→e1_bottom and e2_top→e2_bottom)
/// that share the same vertical extent
#[allow(clippy::too_many_arguments)]
fn fill_half<W: SpanWriter>(
    fb: &mut Framebuffer,
    e1_top: &ScreenVertex,
    e1_bottom: &ScreenVertex,
    e2_top: &ScreenVertex,
    e2_bottom: &ScreenVertex,
    grad: &Gradients,
    writer: &W,
    depth_test: bool,
    su: f32,
    sv: f32,
) -> u32 {
    let top = e1_top.y;
    let bottom = e1_bottom.y;
    if bottom <= top {
        return 0;
    }
    let first = (top.ceil() as i32).max(0);
    let last = (bottom.ceil() as i32).min(fb.height as i32);
    if first >= last {
        return 0;
    }

    let mut e1 = Edge::new(e1_top, e1_bottom, first, su, sv);
    let mut e2 = Edge::new(e2_top, e2_bottom, first, su, sv);
    // Order edges left/right at the midpoint, where they are farthest apart
    let mid = (top + bottom) * 0.5;
    let x_at = |t: &ScreenVertex, b: &ScreenVertex| t.x + (b.x - t.x) * (mid - t.y) / (b.y - t.y);
    if x_at(e1_top, e1_bottom) > x_at(e2_top, e2_bottom) {
        std::mem::swap(&mut e1, &mut e2);
    }
    let (left, right) = (&mut e1, &mut e2);

    let width = fb.width as i32;
    let mut written = 0;
    for y in first..last {
        let xs = left.x.ceil().max(0);
        let xe = right.x.ceil().min(width);
        if xs < xe {
            let pre = Fixed::from_int(xs) - left.x;
            let start = SpanStart {
                z: left.z + grad.dz.mul_fixed(pre),
                u: left.u + grad.du.mul_fixed(pre),
                v: left.v + grad.dv.mul_fixed(pre),
            };
            written += writer.write_span(fb, y as usize, xs as usize, xe as usize, start, grad, depth_test);
        }
        left.step();
        right.step();
    }
    written
}

/// Clip a triangle to the guard-band square (Sutherland–Hodgman). Returns
/// the clipped convex polygon, possibly empty.
fn clip_to_guard_band(tri: &[ScreenVertex; 3]) -> Vec<ScreenVertex> {
    let planes: [(fn(&ScreenVertex) -> f32, f32); 4] = [
        (|v| v.x, -GUARD_BAND),
        (|v| -v.x, -GUARD_BAND),
        (|v| v.y, -GUARD_BAND),
        (|v| -v.y, -GUARD_BAND),
    ];
    let mut poly: Vec<ScreenVertex> = tri.to_vec();
    for (coord, limit) in planes {
        if poly.is_empty() {
            break;
        }
        let mut out = Vec::with_capacity(poly.len() + 1);
        for i in 0..poly.len() {
            let p = poly[i];
            let q = poly[(i + 1) % poly.len()];
            let (dp, dq) = (coord(&p) - limit, coord(&q) - limit);
            if dp >= 0.0 {
                out.push(p);
            }
            if (dp >= 0.0) != (dq >= 0.0) {
                out.push(p.lerp(&q, dp / (dp - dq)));
            }
        }
        poly = out;
    }
    poly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::span::{DirectWriter, Rgba8888, SpanSource};
    use crate::rasterizer::{Color, PixelFormat};

    fn flat(c: Color) -> DirectWriter<'static, Rgba8888> {
        DirectWriter::new(SpanSource::Flat(c), false)
    }

    fn sv(x: f32, y: f32, z: f32) -> ScreenVertex {
        ScreenVertex::new(x, y, z, 0.0, 0.0)
    }

    fn count(fb: &Framebuffer, c: Color) -> usize {
        (0..fb.height)
            .flat_map(|y| (0..fb.width).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.get_pixel(x, y) == Some(c))
            .count()
    }

    #[test]
    fn test_classify() {
        let s = |a, b, c| sort_by_y([a, b, c]);
        assert_eq!(classify(&s(sv(0.0, 0.0, 1.0), sv(10.0, 0.0, 1.0), sv(5.0, 10.0, 1.0))), TriangleClass::FlatTop);
        assert_eq!(classify(&s(sv(5.0, 0.0, 1.0), sv(0.0, 10.0, 1.0), sv(10.0, 10.0, 1.0))), TriangleClass::FlatBottom);
        assert_eq!(classify(&s(sv(5.0, 0.0, 1.0), sv(0.0, 4.0, 1.0), sv(10.0, 10.0, 1.0))), TriangleClass::Generic);
        assert_eq!(classify(&s(sv(0.0, 3.0, 1.0), sv(5.0, 3.0, 1.0), sv(9.0, 3.0, 1.0))), TriangleClass::Degenerate);
        assert_eq!(classify(&s(sv(0.0, 0.0, 1.0), sv(1.0, 1.0, 1.0), sv(2.0, 2.0, 1.0))), TriangleClass::Degenerate);
    }

    #[test]
    fn test_square_fill_is_exact() {
        // Two triangles covering [2,10) x [2,10) fill exactly 64 pixels, none twice
        let mut fb = Framebuffer::new(16, 16, PixelFormat::Rgba8888);
        let w = flat(Color::RED);
        let a = rasterize_triangle(&mut fb, [sv(2.0, 2.0, 5.0), sv(10.0, 2.0, 5.0), sv(2.0, 10.0, 5.0)], &w, true);
        let b = rasterize_triangle(&mut fb, [sv(10.0, 2.0, 5.0), sv(10.0, 10.0, 5.0), sv(2.0, 10.0, 5.0)], &w, false);
        assert_eq!(a + b, 64);
        assert_eq!(count(&fb, Color::RED), 64);
    }

    #[test]
    fn test_offscreen_triangle_writes_nothing() {
        let mut fb = Framebuffer::new(32, 32, PixelFormat::Rgba8888);
        let w = flat(Color::RED);
        let cases = [
            [sv(-20.0, 0.0, 1.0), sv(-1.0, 5.0, 1.0), sv(-10.0, 30.0, 1.0)],
            [sv(40.0, 0.0, 1.0), sv(33.0, 5.0, 1.0), sv(50.0, 30.0, 1.0)],
            [sv(0.0, -5.0, 1.0), sv(30.0, -5.0, 1.0), sv(15.0, -0.5, 1.0)],
            [sv(0.0, 32.0, 1.0), sv(30.0, 40.0, 1.0), sv(15.0, 60.0, 1.0)],
        ];
        for tri in cases {
            assert_eq!(rasterize_triangle(&mut fb, tri, &w, true), 0);
        }
        assert_eq!(count(&fb, Color::RED), 0);
    }

    #[test]
    fn test_zbuffer_order_independence() {
        let near = [sv(2.0, 2.0, 10.0), sv(28.0, 4.0, 10.0), sv(6.0, 28.0, 10.0)];
        let far = [sv(4.0, 1.0, 20.0), sv(30.0, 20.0, 20.0), sv(1.0, 30.0, 20.0)];

        let mut fb1 = Framebuffer::new(32, 32, PixelFormat::Rgb565);
        rasterize_triangle(&mut fb1, near, &flat(Color::RED), true);
        rasterize_triangle(&mut fb1, far, &flat(Color::BLUE), true);

        let mut fb2 = Framebuffer::new(32, 32, PixelFormat::Rgb565);
        rasterize_triangle(&mut fb2, far, &flat(Color::BLUE), true);
        rasterize_triangle(&mut fb2, near, &flat(Color::RED), true);

        assert_eq!(fb1.pixels, fb2.pixels);
        assert_eq!(fb1.zbuffer, fb2.zbuffer);
    }

    #[test]
    fn test_huge_triangle_is_clipped_to_guard_band() {
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba8888);
        let tri = [sv(-90_000.0, -70_000.0, 1.0), sv(110_000.0, -50_000.0, 1.0), sv(3_000.0, 95_000.0, 1.0)];
        rasterize_triangle(&mut fb, tri, &flat(Color::GREEN), true);
        assert_eq!(count(&fb, Color::GREEN), 64);
    }

    #[test]
    fn test_texture_coordinates_map_texels() {
        use crate::texture::Texture;
        let tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK).unwrap();
        let w: DirectWriter<Rgba8888> = DirectWriter::new(SpanSource::Textured(&tex), false);
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba8888);
        let tri_a = [ScreenVertex::new(0.0, 0.0, 1.0, 0.0, 0.0), ScreenVertex::new(8.0, 0.0, 1.0, 1.0, 0.0), ScreenVertex::new(0.0, 8.0, 1.0, 0.0, 1.0)];
        let tri_b = [ScreenVertex::new(8.0, 0.0, 1.0, 1.0, 0.0), ScreenVertex::new(8.0, 8.0, 1.0, 1.0, 1.0), ScreenVertex::new(0.0, 8.0, 1.0, 0.0, 1.0)];
        rasterize_triangle(&mut fb, tri_a, &w, true);
        rasterize_triangle(&mut fb, tri_b, &w, true);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(fb.get_pixel(x, y), Some(tex.color_at(x, y)), "texel {},{}", x, y);
            }
        }
    }
}
