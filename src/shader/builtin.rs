//! Built-in vertex and fragment stages.

use nalgebra::vector;

use super::{
    Fragment, FragmentInput, FragmentStage, ShaderContext, Varyings, VaryingTag, VertexStage,
};
use crate::color::Color;
use crate::error::ShaderError;
use crate::math::{from_homogeneous, to_direction, to_point, truncate, Vec2f, Vec3f, Vec4f};
use crate::texture::Texture;

/// Tinted albedo at `uv` as floats, the bare tint when no albedo is bound.
fn albedo(ctx: &ShaderContext, uv: Vec2f) -> Vec4f {
    let tint = ctx.materials.tint;
    match &ctx.materials.albedo {
        Some(texture) => texture.sample(uv).modulate(tint).to_float(),
        None => tint.to_float(),
    }
}

/// Multiplies the rgb part by `scale` (per channel), keeping alpha.
fn lit(color: Vec4f, scale: Vec3f) -> Vec4f {
    return vector![color.x * scale.x, color.y * scale.y, color.z * scale.z, color.w];
}

fn unit(v: Vec3f) -> Vec3f {
    return v.try_normalize(f32::EPSILON).unwrap_or(v);
}

/// World space position and normal of a vertex.
fn world_vertex(ctx: &ShaderContext, face: usize, slot: usize) -> (Vec3f, Vec3f) {
    let position = from_homogeneous(ctx.transforms.model * to_point(ctx.model.vertex(face, slot)));
    let normal = truncate(ctx.transforms.normal_matrix * to_direction(ctx.model.normal(face, slot)));
    return (position, unit(normal));
}

/// Transforms the vertex and hands normal, uv and world position to the fragment stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenSpaceVertex;

impl VertexStage for ScreenSpaceVertex {
    fn vertex(
        &self,
        ctx: &ShaderContext,
        face: usize,
        slot: usize,
        varyings: &mut Varyings,
    ) -> Result<Vec4f, ShaderError> {
        let (world, normal) = world_vertex(ctx, face, slot);
        varyings.set(VaryingTag::NORMAL, slot, normal);
        varyings.set(VaryingTag::UV, slot, ctx.model.uv(face, slot));
        varyings.set(VaryingTag::WORLD_POSITION, slot, world);
        return Ok(ctx.transforms.mvp * to_point(ctx.model.vertex(face, slot)));
    }
}

/// Evaluates the diffuse term once per vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct GouraudVertex;

impl VertexStage for GouraudVertex {
    fn vertex(
        &self,
        ctx: &ShaderContext,
        face: usize,
        slot: usize,
        varyings: &mut Varyings,
    ) -> Result<Vec4f, ShaderError> {
        let (world, normal) = world_vertex(ctx, face, slot);
        let intensity = normal.dot(&ctx.light.direction_from(world)).max(0.0);
        varyings.set(VaryingTag::INTENSITY, slot, intensity);
        varyings.set(VaryingTag::UV, slot, ctx.model.uv(face, slot));
        return Ok(ctx.transforms.mvp * to_point(ctx.model.vertex(face, slot)));
    }
}

/// Same color for every pixel. Reads no varyings.
#[derive(Debug, Clone, Copy)]
pub struct FlatColor(pub Color);

impl FragmentStage for FlatColor {
    fn fragment(&self, _ctx: &ShaderContext, _input: &FragmentInput) -> Result<Fragment, ShaderError> {
        return Ok(Fragment::Keep(self.0.to_float()));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Unlit;

impl FragmentStage for Unlit {
    fn fragment(&self, ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        let uv: Vec2f = input.varyings.interpolate(VaryingTag::UV, &input.interpolation)?;
        return Ok(Fragment::Keep(albedo(ctx, uv)));
    }
}

/// Interpolated normal and world position, shared by the per-pixel lighting stages.
fn surface(input: &FragmentInput) -> Result<(Vec3f, Vec3f), ShaderError> {
    let normal: Vec3f = input.varyings.interpolate(VaryingTag::NORMAL, &input.interpolation)?;
    let world: Vec3f = input
        .varyings
        .interpolate(VaryingTag::WORLD_POSITION, &input.interpolation)?;
    return Ok((unit(normal), world));
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Lambert;

impl FragmentStage for Lambert {
    fn fragment(&self, ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        let uv: Vec2f = input.varyings.interpolate(VaryingTag::UV, &input.interpolation)?;
        let (normal, world) = surface(input)?;
        let diffuse = normal.dot(&ctx.light.direction_from(world)).max(0.0);
        return Ok(Fragment::Keep(lit(albedo(ctx, uv), ctx.light.color * diffuse)));
    }
}

/// Posterized diffuse: the intensity snaps down to one of `levels` bands.
#[derive(Debug, Clone, Copy)]
pub struct Toon {
    levels: u32,
    tint: Color,
}

impl Toon {
    /// At least one band is always used.
    pub fn new(levels: u32, tint: Color) -> Self {
        return Self {
            levels: levels.max(1),
            tint,
        };
    }
}

impl FragmentStage for Toon {
    fn fragment(&self, ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        let (normal, world) = surface(input)?;
        let diffuse = normal.dot(&ctx.light.direction_from(world)).clamp(0.0, 1.0);
        let levels = self.levels as f32;
        let banded = (diffuse * levels).floor() / levels;
        return Ok(Fragment::Keep(lit(self.tint.to_float(), ctx.light.color * banded)));
    }
}

/// Albedo scaled by the per-vertex intensity from `GouraudVertex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gouraud;

impl FragmentStage for Gouraud {
    fn fragment(&self, ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        let uv: Vec2f = input.varyings.interpolate(VaryingTag::UV, &input.interpolation)?;
        let intensity: f32 = input
            .varyings
            .interpolate(VaryingTag::INTENSITY, &input.interpolation)?;
        return Ok(Fragment::Keep(lit(albedo(ctx, uv), ctx.light.color * intensity)));
    }
}

/// Blinn-Phong with the normal taken from a tangent space normal map.
///
/// The tangent frame is rebuilt for every triangle from the world positions and
/// uv coordinates of its vertices, then orthogonalized against the interpolated
/// normal. Without a normal map the interpolated normal is used as is, without a
/// specular map there is no specular term.
#[derive(Debug, Clone, Copy)]
pub struct NormalMapped {
    pub shininess: f32,
}

impl NormalMapped {
    fn mapped_normal(
        &self,
        normal_map: &Texture,
        input: &FragmentInput,
        normal: Vec3f,
        uv: Vec2f,
    ) -> Result<Vec3f, ShaderError> {
        let mut positions = [Vec3f::zeros(); 3];
        let mut uvs = [Vec2f::zeros(); 3];
        for slot in 0..3 {
            positions[slot] = input.varyings.vertex(VaryingTag::WORLD_POSITION, slot)?;
            uvs[slot] = input.varyings.vertex(VaryingTag::UV, slot)?;
        }
        let Some((tangent, bitangent)) = tangent_frame(positions, uvs, normal) else {
            return Ok(normal);
        };

        let texel = normal_map.sample(uv).to_float();
        let local = vector![texel.x, texel.y, texel.z] * 2.0 - Vec3f::repeat(1.0);
        return Ok(unit(tangent * local.x + bitangent * local.y + normal * local.z));
    }
}

/// Unit tangent and bitangent orthogonal to `normal`, `None` for degenerate uv mappings.
pub fn tangent_frame(positions: [Vec3f; 3], uvs: [Vec2f; 3], normal: Vec3f) -> Option<(Vec3f, Vec3f)> {
    let edge_1 = positions[1] - positions[0];
    let edge_2 = positions[2] - positions[0];
    let duv_1 = uvs[1] - uvs[0];
    let duv_2 = uvs[2] - uvs[0];
    let det = duv_1.x * duv_2.y - duv_2.x * duv_1.y;
    if det.abs() < 1e-12 {
        return None;
    }
    let tangent = (edge_1 * duv_2.y - edge_2 * duv_1.y) / det;
    let bitangent = (edge_2 * duv_1.x - edge_1 * duv_2.x) / det;

    // Gram-Schmidt against the shading normal.
    let tangent = (tangent - normal * normal.dot(&tangent)).try_normalize(1e-12)?;
    let mut ortho_bitangent = normal.cross(&tangent);
    if ortho_bitangent.dot(&bitangent) < 0.0 {
        // Mirrored uv mapping.
        ortho_bitangent = -ortho_bitangent;
    }
    return Some((tangent, ortho_bitangent));
}

impl FragmentStage for NormalMapped {
    fn fragment(&self, ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        let uv: Vec2f = input.varyings.interpolate(VaryingTag::UV, &input.interpolation)?;
        let (normal, world) = surface(input)?;
        let normal = match &ctx.materials.normal {
            Some(normal_map) => self.mapped_normal(normal_map, input, normal, uv)?,
            None => normal,
        };

        let to_light = ctx.light.direction_from(world);
        let to_eye = unit(ctx.eye - world);
        let diffuse = normal.dot(&to_light).max(0.0);
        let specular = match &ctx.materials.specular {
            Some(map) if diffuse > 0.0 => {
                let half = unit(to_light + to_eye);
                let strength = map.sample(uv).to_float().x;
                strength * normal.dot(&half).max(0.0).powf(self.shininess)
            }
            _ => 0.0,
        };

        let base = albedo(ctx, uv);
        let rgb = vector![base.x, base.y, base.z] * diffuse + Vec3f::repeat(specular);
        let color = ctx.light.color.component_mul(&rgb);
        return Ok(Fragment::Keep(vector![color.x, color.y, color.z, base.w]));
    }
}
