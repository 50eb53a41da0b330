//! Triangle scan conversion with barycentric coverage and line drawing.
//!
//! Screen space has its origin in the bottom left corner, pixel (x, y) covers
//! [x, x + 1) x [y, y + 1) and is sampled at its center.

use crate::color::Color;
use crate::depth::DepthTest;
use crate::error::ShaderError;
use crate::math::{Vec2f, Vec2i, Vec3f, Vec4f};
use crate::shader::{
    Fragment, FragmentInput, FragmentStage, Interpolation, InterpolationMode, ShaderContext,
    Varyings,
};
use crate::texture::Texture;

use nalgebra::vector;

/// Twice the screen area under which a triangle is skipped.
const MIN_AREA: f32 = 1e-6;

/// Three homogeneous vertices after the viewport transform and the face they belong to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec4f; 3],
    pub face: usize,
}

impl Triangle {
    /// Any vertex at or behind the camera plane. Such triangles are dropped, there is no clipping.
    pub fn is_behind_camera(&self) -> bool {
        return self.vertices.iter().any(|v| v.w <= 0.0);
    }
}

/// Signed doubled area of (a, b, p): positive when p lies left of a -> b.
fn edge(a: Vec2f, b: Vec2f, p: Vec2f) -> f32 {
    return (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
}

/// Barycentric coordinates of `p` in triangle (a, b, c), `None` for degenerate triangles.
/// All weights are non-negative exactly when `p` is inside or on the border.
pub fn barycentric(a: Vec2f, b: Vec2f, c: Vec2f, p: Vec2f) -> Option<Vec3f> {
    let area = edge(a, b, c);
    if area.abs() < MIN_AREA {
        return None;
    }
    return Some(vector![edge(b, c, p), edge(c, a, p), edge(a, b, p)] / area);
}

/// Edge a -> b of a counter-clockwise triangle is a top edge (horizontal, interior below)
/// or a left edge (interior to its right).
fn is_top_left(a: Vec2f, b: Vec2f) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    return dy < 0.0 || (dy == 0.0 && dx < 0.0);
}

/// Coverage of an edge value. Pixels on an edge belong to the triangle only for top-left edges.
fn covers(edge_value: f32, top_left: bool) -> bool {
    return edge_value > 0.0 || (edge_value == 0.0 && top_left);
}

/// Rasterizes one triangle, shading every covered pixel that passes the depth test.
///
/// Depth is the interpolated 1/w, larger wins. It is only stored once the fragment
/// stage keeps the pixel, a discard leaves both depth and color untouched.
/// Returns the number of pixels written.
pub fn draw_triangle(
    triangle: &Triangle,
    ctx: &ShaderContext,
    varyings: &Varyings,
    fragment: &dyn FragmentStage,
    depth: &mut dyn DepthTest,
    target: &mut Texture,
    mode: InterpolationMode,
) -> Result<usize, ShaderError> {
    if triangle.is_behind_camera() || target.width() == 0 || target.height() == 0 {
        return Ok(0);
    }

    let mut screen = [Vec2f::zeros(); 3];
    let mut inverse_w = Vec3f::zeros();
    for (i, v) in triangle.vertices.iter().enumerate() {
        inverse_w[i] = 1.0 / v.w;
        screen[i] = vector![v.x * inverse_w[i], v.y * inverse_w[i]];
    }

    let area = edge(screen[0], screen[1], screen[2]);
    // Written this way round so NaN areas are skipped too.
    if !(area.abs() >= MIN_AREA) {
        return Ok(0);
    }
    // Walk the vertices counter-clockwise, `order[k]` is the input slot of the k-th one.
    let order = if area > 0.0 { [0, 1, 2] } else { [0, 2, 1] };
    let [a, b, c] = order.map(|slot| screen[slot]);
    let area = area.abs();
    let top_left = [is_top_left(b, c), is_top_left(c, a), is_top_left(a, b)];

    let min = screen[0].inf(&screen[1]).inf(&screen[2]);
    let max = screen[0].sup(&screen[1]).sup(&screen[2]);
    let x_start = (min.x.floor() as i32).max(0);
    let y_start = (min.y.floor() as i32).max(0);
    let x_end = (max.x.ceil() as i32).min(target.width() as i32 - 1);
    let y_end = (max.y.ceil() as i32).min(target.height() as i32 - 1);

    let mut written = 0;
    for y in y_start..=y_end {
        for x in x_start..=x_end {
            let p = vector![x as f32 + 0.5, y as f32 + 0.5];
            let edges = [edge(b, c, p), edge(c, a, p), edge(a, b, p)];
            if !(0..3).all(|k| covers(edges[k], top_left[k])) {
                continue;
            }

            let mut weights = Vec3f::zeros();
            for k in 0..3 {
                weights[order[k]] = edges[k] / area;
            }
            let interpolation = Interpolation {
                barycentric: weights,
                inverse_w,
                mode,
            };
            let z = interpolation.depth();
            if !depth.test(x, y, z) {
                continue;
            }

            let input = FragmentInput {
                pixel: vector![x, y],
                face: triangle.face,
                interpolation,
                varyings,
            };
            if let Fragment::Keep(color) = fragment.fragment(ctx, &input)? {
                depth.test_and_write(x, y, z);
                target.set_pixel(x, y, Color::from_float(color));
                written += 1;
            }
        }
    }
    return Ok(written);
}

/// Part of the segment a -> b inside a `width` x `height` pixel grid (Liang-Barsky),
/// `None` when the segment misses it. Endpoints already inside are kept exactly.
fn clip_line(a: Vec2i, b: Vec2i, width: u32, height: u32) -> Option<(Vec2i, Vec2i)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x0, y0) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - x0, b.y as f64 - y0);
    let x_max = (width - 1) as f64;
    let y_max = (height - 1) as f64;

    let mut t_in = 0.0f64;
    let mut t_out = 1.0f64;
    for (p, q) in [(-dx, x0), (dx, x_max - x0), (-dy, y0), (dy, y_max - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t_in = t_in.max(t);
        } else {
            t_out = t_out.min(t);
        }
        if t_in > t_out {
            return None;
        }
    }

    let at = |t: f64| {
        vector![
            (x0 + t * dx).round().clamp(0.0, x_max) as i32,
            (y0 + t * dy).round().clamp(0.0, y_max) as i32
        ]
    };
    return Some((at(t_in), at(t_out)));
}

/// Draws a line between `a` and `b` via Bresenham's algorithm as presented in
/// https://en.wikipedia.org/wiki/Bresenham%27s_line_algorithm
/// The segment is clipped to the target first, so far away endpoints cost nothing.
pub fn draw_line(target: &mut Texture, a: Vec2i, b: Vec2i, color: Color) {
    let Some((a, b)) = clip_line(a, b, target.width(), target.height()) else {
        return;
    };
    let (ax, ay) = (a.x as i64, a.y as i64);
    let (bx, by) = (b.x as i64, b.y as i64);
    let dx = (bx - ax).abs();
    let dy = -(by - ay).abs();
    let sx = if ax < bx { 1 } else { -1 };
    let sy = if ay < by { 1 } else { -1 };
    let mut error = dx + dy;
    let (mut x, mut y) = (ax, ay);

    loop {
        target.set_pixel(x as i32, y as i32, color);
        if x == bx && y == by {
            break;
        }
        let e2 = 2 * error;
        if e2 >= dy {
            error += dy;
            x += sx;
        }
        if e2 <= dx {
            error += dx;
            y += sy;
        }
    }
}

/// Outline of a triangle.
pub fn draw_triangle_wired(target: &mut Texture, vertices: [Vec2i; 3], color: Color) {
    for i in 0..3 {
        draw_line(target, vertices[i], vertices[(i + 1) % 3], color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, GREEN, RED};
    use crate::depth::{DepthBuffer, NoDepthTest};
    use crate::model::Model;
    use crate::shader::builtin::FlatColor;
    use crate::shader::{Light, Materials};
    use crate::texture::TextureFormat;
    use crate::transform::TransformSet;

    fn screen_triangle(points: [(f32, f32); 3]) -> Triangle {
        Triangle {
            vertices: points.map(|(x, y)| vector![x, y, 0.0, 1.0]),
            face: 0,
        }
    }

    fn with_ctx<R>(f: impl FnOnce(&ShaderContext) -> R) -> R {
        let model = Model::default();
        let transforms = TransformSet::identity();
        let materials = Materials::default();
        let ctx = ShaderContext {
            model: &model,
            transforms: &transforms,
            light: Light {
                position: Vec3f::zeros(),
                color: Vec3f::repeat(1.0),
            },
            eye: Vec3f::zeros(),
            materials: &materials,
        };
        return f(&ctx);
    }

    fn fill(triangle: &Triangle, color: Color, target: &mut Texture) -> usize {
        with_ctx(|ctx| {
            draw_triangle(
                triangle,
                ctx,
                &Varyings::new(),
                &FlatColor(color),
                &mut NoDepthTest,
                target,
                InterpolationMode::ScreenSpace,
            )
            .unwrap()
        })
    }

    #[test]
    fn barycentric_inside_and_outside() {
        let a = vector![0.0, 0.0];
        let b = vector![4.0, 0.0];
        let c = vector![0.0, 4.0];
        let inside = barycentric(a, b, c, vector![1.0, 1.0]).unwrap();
        assert!(inside.iter().all(|&w| w > 0.0));
        assert!((inside.sum() - 1.0).abs() < 1e-6);
        let outside = barycentric(a, b, c, vector![3.0, 3.0]).unwrap();
        assert!(outside.iter().any(|&w| w < 0.0));
        // Orientation of the input does not matter.
        let swapped = barycentric(a, c, b, vector![1.0, 1.0]).unwrap();
        assert!((swapped - vector![inside.x, inside.z, inside.y]).norm() < 1e-6);
    }

    #[test]
    fn degenerate_triangles_draw_nothing() {
        assert!(barycentric(Vec2f::zeros(), vector![1.0, 1.0], vector![2.0, 2.0], Vec2f::zeros()).is_none());
        let mut target = Texture::new(8, 8, TextureFormat::Rgb);
        let collinear = screen_triangle([(0.0, 0.0), (4.0, 4.0), (8.0, 8.0)]);
        assert_eq!(fill(&collinear, RED, &mut target), 0);
        let point = screen_triangle([(3.0, 3.0), (3.0, 3.0), (3.0, 3.0)]);
        assert_eq!(fill(&point, RED, &mut target), 0);
        assert!(target.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn shared_edges_are_covered_exactly_once() {
        let mut target = Texture::new(8, 8, TextureFormat::Rgb);
        let lower = screen_triangle([(0.0, 0.0), (8.0, 0.0), (8.0, 8.0)]);
        let upper = screen_triangle([(0.0, 0.0), (8.0, 8.0), (0.0, 8.0)]);
        let count = fill(&lower, RED, &mut target) + fill(&upper, GREEN, &mut target);
        assert_eq!(count, 64);
        for y in 0..8 {
            for x in 0..8 {
                assert_ne!(target.pixel(x, y), BLACK, "({x}, {y})");
            }
        }
    }

    #[test]
    fn winding_does_not_matter() {
        let mut ccw = Texture::new(16, 16, TextureFormat::Rgb);
        let mut cw = Texture::new(16, 16, TextureFormat::Rgb);
        let n_ccw = fill(&screen_triangle([(1.0, 1.0), (14.0, 3.0), (6.0, 13.0)]), RED, &mut ccw);
        let n_cw = fill(&screen_triangle([(1.0, 1.0), (6.0, 13.0), (14.0, 3.0)]), RED, &mut cw);
        assert_eq!(n_ccw, n_cw);
        assert_eq!(ccw, cw);
    }

    #[test]
    fn triangles_behind_the_camera_are_dropped() {
        let mut target = Texture::new(8, 8, TextureFormat::Rgb);
        let mut triangle = screen_triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)]);
        triangle.vertices[2].w = -1.0;
        assert!(triangle.is_behind_camera());
        assert_eq!(fill(&triangle, RED, &mut target), 0);
    }

    #[test]
    fn nearer_fragment_wins_in_either_order() {
        // Same screen footprint, the second triangle is twice as far away.
        let near = screen_triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)]);
        let mut far = near;
        for v in &mut far.vertices {
            *v *= 2.0;
        }

        for order in [[(near, RED), (far, GREEN)], [(far, GREEN), (near, RED)]] {
            let mut target = Texture::new(8, 8, TextureFormat::Rgb);
            let mut depth = DepthBuffer::new(8, 8);
            with_ctx(|ctx| {
                for (triangle, color) in order {
                    draw_triangle(
                        &triangle,
                        ctx,
                        &Varyings::new(),
                        &FlatColor(color),
                        &mut depth,
                        &mut target,
                        InterpolationMode::ScreenSpace,
                    )
                    .unwrap();
                }
            });
            assert_eq!(target.pixel(2, 2), RED);
            let stored = depth.get(2, 2).unwrap();
            assert!((stored - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bresenham_line_endpoints_and_clipping() {
        let mut target = Texture::new(10, 10, TextureFormat::Rgb);
        draw_line(&mut target, vector![0, 0], vector![9, 3], RED);
        assert_eq!(target.pixel(0, 0), RED);
        assert_eq!(target.pixel(9, 3), RED);
        let lit = (0..10).filter(|&x| (0..10).any(|y| target.pixel(x, y) == RED)).count();
        assert_eq!(lit, 10);

        // Partially outside, must not panic.
        draw_line(&mut target, vector![-5, 5], vector![20, 5], GREEN);
        assert_eq!(target.pixel(0, 5), GREEN);
        assert_eq!(target.pixel(9, 5), GREEN);
    }

    #[test]
    fn extreme_endpoints_are_clipped() {
        let mut target = Texture::new(8, 8, TextureFormat::Rgb);
        draw_line(&mut target, vector![i32::MIN, 0], vector![i32::MAX, 3], RED);
        let lit = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .filter(|&(x, y)| target.pixel(x, y) == RED)
            .count();
        assert_eq!(lit, 8);

        draw_line(&mut target, vector![i32::MIN, i32::MIN], vector![i32::MAX, i32::MAX], GREEN);
        assert_eq!(target.pixel(4, 4), GREEN);
    }

    #[test]
    fn lines_missing_the_target_draw_nothing() {
        let mut target = Texture::new(8, 8, TextureFormat::Rgb);
        draw_line(&mut target, vector![-10, -3], vector![20, -1], RED);
        draw_line(&mut target, vector![9, 0], vector![9, 7], RED);
        draw_line(&mut target, vector![-100, 50], vector![50, -100], RED);
        assert!(target.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn wired_triangle_touches_all_corners() {
        let mut target = Texture::new(10, 10, TextureFormat::Rgb);
        draw_triangle_wired(&mut target, [vector![1, 1], vector![8, 2], vector![4, 8]], RED);
        for (x, y) in [(1, 1), (8, 2), (4, 8)] {
            assert_eq!(target.pixel(x, y), RED);
        }
        assert_eq!(target.pixel(4, 4), Color::rgb(0, 0, 0));
    }
}
