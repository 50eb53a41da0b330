//! Frame driver: runs every face of the mesh through the shader program and rasterizer.

use crate::color::Color;
use crate::depth::{DepthBuffer, DepthTest};
use crate::error::ShaderError;
use crate::math::{from_homogeneous, to_direction, to_point, truncate, Mat3, Vec2i, Vec4f};
use crate::raster::{draw_triangle, draw_triangle_wired, Triangle};
use crate::shader::{InterpolationMode, ShaderContext, ShaderProgram, Varyings};
use crate::texture::{Texture, TextureFormat};

/// Color and depth storage of one frame.
#[derive(Debug, Clone)]
pub struct FrameTarget {
    pub color: Texture,
    pub depth: DepthBuffer,
}

impl FrameTarget {
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            color: Texture::new(width, height, TextureFormat::Rgb),
            depth: DepthBuffer::new(width, height),
        };
    }

    pub fn width(&self) -> u32 {
        return self.color.width();
    }

    pub fn height(&self) -> u32 {
        return self.color.height();
    }

    /// Black color, depth at "infinitely far".
    pub fn clear(&mut self) {
        self.color.clear();
        self.depth.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub interpolation: InterpolationMode,
    /// Skip faces turned away from the camera before any shading work.
    pub cull_backfaces: bool,
    /// Outline every drawn face in this color.
    pub wireframe: Option<Color>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        return Self {
            interpolation: InterpolationMode::ScreenSpace,
            cull_backfaces: true,
            wireframe: None,
        };
    }
}

/// What happened to the faces of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub faces: usize,
    /// Faces skipped by backface culling.
    pub culled: usize,
    /// Faces with a vertex behind the camera.
    pub dropped: usize,
    /// Pixels written.
    pub pixels: usize,
}

/// Face turned away from the eye, judged in world space.
fn is_backface(ctx: &ShaderContext, face: usize) -> bool {
    let model = &ctx.transforms.model;
    let world = |slot: usize| from_homogeneous(model * to_point(ctx.model.vertex(face, slot)));
    let centroid = (world(0) + world(1) + world(2)) / 3.0;
    // The normal matrix keeps the direction of a cross product up to the sign of det(model).
    let mut normal = truncate(ctx.transforms.normal_matrix * to_direction(ctx.model.face_normal(face)));
    if Mat3::from_fn(|r, c| model[(r, c)]).determinant() < 0.0 {
        normal = -normal;
    }
    return normal.dot(&(ctx.eye - centroid)) < 0.0;
}

/// Draws every face of `ctx.model` in mesh order into `target`.
/// The target is not cleared, so several models can share a frame.
pub fn draw_model(
    ctx: &ShaderContext,
    program: &ShaderProgram,
    target: &mut FrameTarget,
    settings: &RenderSettings,
) -> Result<FrameStats, ShaderError> {
    let mut stats = FrameStats::default();
    let mut varyings = Varyings::new();

    for face in 0..ctx.model.nfaces() {
        stats.faces += 1;
        if settings.cull_backfaces && is_backface(ctx, face) {
            stats.culled += 1;
            continue;
        }

        varyings.begin_triangle();
        let mut triangle = Triangle {
            vertices: [Vec4f::zeros(); 3],
            face,
        };
        for slot in 0..3 {
            let clip = program.vertex.vertex(ctx, face, slot, &mut varyings)?;
            triangle.vertices[slot] = ctx.transforms.viewport * clip;
        }
        if triangle.is_behind_camera() {
            stats.dropped += 1;
            continue;
        }

        stats.pixels += draw_triangle(
            &triangle,
            ctx,
            &varyings,
            program.fragment.as_ref(),
            &mut target.depth,
            &mut target.color,
            settings.interpolation,
        )?;

        if let Some(color) = settings.wireframe {
            let corners = triangle.vertices.map(|v| {
                let p = from_homogeneous(v);
                Vec2i::new(p.x.floor() as i32, p.y.floor() as i32)
            });
            draw_triangle_wired(&mut target.color, corners, color);
        }
    }

    log::debug!(
        "frame: {} faces, {} culled, {} dropped, {} pixels",
        stats.faces,
        stats.culled,
        stats.dropped,
        stats.pixels
    );
    return Ok(stats);
}
