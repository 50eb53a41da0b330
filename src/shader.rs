//! Shader interface: the vertex and fragment stage contracts, the varying store
//! that carries per-vertex values between them and the built-in programs.

pub mod builtin;

use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{Color, WHITE};
use crate::error::ShaderError;
use crate::math::{Vec2f, Vec2i, Vec3f, Vec4f};
use crate::model::Model;
use crate::texture::Texture;
use crate::transform::TransformSet;

use builtin::{
    Gouraud, GouraudVertex, Lambert, NormalMapped, ScreenSpaceVertex, Toon, Unlit,
};

/// Key under which a vertex stage stores a value for the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaryingTag(pub u8);

impl VaryingTag {
    /// World space normal.
    pub const NORMAL: VaryingTag = VaryingTag(0);
    pub const UV: VaryingTag = VaryingTag(1);
    pub const WORLD_POSITION: VaryingTag = VaryingTag(2);
    /// Light intensity computed per vertex.
    pub const INTENSITY: VaryingTag = VaryingTag(3);
}

/// The three per-vertex values of one tag and which of them were written.
#[derive(Debug, Clone, Copy)]
pub struct SlotTable<T> {
    values: [T; 3],
    written: u8,
}

const ALL_SLOTS: u8 = 0b111;

/// Value types that can be stored as varyings and interpolated.
pub trait Varying: Copy + Add<Output = Self> + Mul<f32, Output = Self> {
    const KIND: &'static str;
    fn zero() -> Self;
    fn table(varyings: &Varyings) -> &Vec<SlotTable<Self>>;
    fn table_mut(varyings: &mut Varyings) -> &mut Vec<SlotTable<Self>>;
}

macro_rules! impl_varying {
    ($ty:ty, $field:ident, $kind:literal, $zero:expr) => {
        impl Varying for $ty {
            const KIND: &'static str = $kind;

            fn zero() -> Self {
                $zero
            }

            fn table(varyings: &Varyings) -> &Vec<SlotTable<Self>> {
                &varyings.$field
            }

            fn table_mut(varyings: &mut Varyings) -> &mut Vec<SlotTable<Self>> {
                &mut varyings.$field
            }
        }
    };
}

impl_varying!(f32, scalars, "f32", 0.0);
impl_varying!(Vec2f, vec2s, "Vec2f", Vec2f::zeros());
impl_varying!(Vec3f, vec3s, "Vec3f", Vec3f::zeros());
impl_varying!(Vec4f, vec4s, "Vec4f", Vec4f::zeros());

/// Per-triangle store of vertex stage outputs, indexed by tag and vertex slot.
#[derive(Debug, Clone, Default)]
pub struct Varyings {
    scalars: Vec<SlotTable<f32>>,
    vec2s: Vec<SlotTable<Vec2f>>,
    vec3s: Vec<SlotTable<Vec3f>>,
    vec4s: Vec<SlotTable<Vec4f>>,
}

fn forget<T>(table: &mut [SlotTable<T>]) {
    for entry in table {
        entry.written = 0;
    }
}

impl Varyings {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Forgets every value. Called before the vertex stage runs for a new triangle.
    pub fn begin_triangle(&mut self) {
        forget(&mut self.scalars);
        forget(&mut self.vec2s);
        forget(&mut self.vec3s);
        forget(&mut self.vec4s);
    }

    /// Stores `value` for vertex `slot` (0..3). A slot outside of the triangle is a bug in the caller.
    pub fn set<T: Varying>(&mut self, tag: VaryingTag, slot: usize, value: T) {
        assert!(slot < 3, "varying slot {slot} out of range, a triangle has 3 vertices");
        let table = T::table_mut(self);
        let index = tag.0 as usize;
        if table.len() <= index {
            table.resize(
                index + 1,
                SlotTable {
                    values: [T::zero(); 3],
                    written: 0,
                },
            );
        }
        table[index].values[slot] = value;
        table[index].written |= 1 << slot;
    }

    fn complete<T: Varying>(&self, tag: VaryingTag) -> Result<&[T; 3], ShaderError> {
        match T::table(self).get(tag.0 as usize) {
            Some(entry) if entry.written == ALL_SLOTS => Ok(&entry.values),
            _ => Err(ShaderError::UnsetVarying {
                tag: tag.0,
                kind: T::KIND,
            }),
        }
    }

    /// Value a single vertex stored under `tag`.
    pub fn vertex<T: Varying>(&self, tag: VaryingTag, slot: usize) -> Result<T, ShaderError> {
        assert!(slot < 3, "varying slot {slot} out of range, a triangle has 3 vertices");
        return Ok(self.complete::<T>(tag)?[slot]);
    }

    /// Weighted sum of the three vertex values of `tag`.
    pub fn interpolate<T: Varying>(
        &self,
        tag: VaryingTag,
        interpolation: &Interpolation,
    ) -> Result<T, ShaderError> {
        let values = self.complete::<T>(tag)?;
        let w = interpolation.weights();
        return Ok(values[0] * w.x + values[1] * w.y + values[2] * w.z);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Weights linear in screen space.
    #[default]
    ScreenSpace,
    /// Weights corrected by the per-vertex 1/w.
    PerspectiveCorrect,
}

/// Where inside the current triangle a fragment lies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolation {
    /// Screen space barycentric coordinates, summing to 1.
    pub barycentric: Vec3f,
    /// 1/w of each vertex before the perspective divide.
    pub inverse_w: Vec3f,
    pub mode: InterpolationMode,
}

impl Interpolation {
    pub fn screen_space(barycentric: Vec3f) -> Self {
        return Self {
            barycentric,
            inverse_w: Vec3f::repeat(1.0),
            mode: InterpolationMode::ScreenSpace,
        };
    }

    /// Weights applied to vertex values.
    pub fn weights(&self) -> Vec3f {
        match self.mode {
            InterpolationMode::ScreenSpace => self.barycentric,
            InterpolationMode::PerspectiveCorrect => {
                let weighted = self.barycentric.component_mul(&self.inverse_w);
                let sum = weighted.sum();
                if sum.abs() < f32::EPSILON {
                    return self.barycentric;
                }
                weighted / sum
            }
        }
    }

    /// Interpolated 1/w, the depth the rasterizer tests. Larger is nearer.
    pub fn depth(&self) -> f32 {
        return self.barycentric.dot(&self.inverse_w);
    }
}

/// Result of the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fragment {
    /// RGBA in [0, 1], saturated when written.
    Keep(Vec4f),
    Discard,
}

/// What the rasterizer knows about the pixel being shaded.
#[derive(Debug, Clone, Copy)]
pub struct FragmentInput<'a> {
    pub pixel: Vec2i,
    pub face: usize,
    pub interpolation: Interpolation,
    pub varyings: &'a Varyings,
}

/// Point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3f,
    /// Linear RGB multiplier.
    pub color: Vec3f,
}

impl Light {
    /// Unit vector from `point` towards the light.
    pub fn direction_from(&self, point: Vec3f) -> Vec3f {
        return (self.position - point)
            .try_normalize(f32::EPSILON)
            .unwrap_or(Vec3f::zeros());
    }
}

/// Textures bound to the mesh. Only the albedo is mandatory for a scene, the shaders cope with any missing.
#[derive(Debug, Clone)]
pub struct Materials {
    pub albedo: Option<Texture>,
    /// Multiplies every albedo texel.
    pub tint: Color,
    /// Tangent space normal map.
    pub normal: Option<Texture>,
    /// Specular strength in the red channel. Greyscale maps carry it in every channel.
    pub specular: Option<Texture>,
}

impl Default for Materials {
    fn default() -> Self {
        return Self {
            albedo: None,
            tint: WHITE,
            normal: None,
            specular: None,
        };
    }
}

/// Read-only state of the frame shared by every shader invocation.
#[derive(Clone, Copy)]
pub struct ShaderContext<'a> {
    pub model: &'a Model,
    pub transforms: &'a TransformSet,
    pub light: Light,
    /// Camera position in world space.
    pub eye: Vec3f,
    pub materials: &'a Materials,
}

pub trait VertexStage {
    /// Clip space position of vertex `slot` of `face`. Stores whatever the fragment stage will read.
    fn vertex(
        &self,
        ctx: &ShaderContext,
        face: usize,
        slot: usize,
        varyings: &mut Varyings,
    ) -> Result<Vec4f, ShaderError>;
}

pub trait FragmentStage {
    fn fragment(&self, ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError>;
}

/// Which built-in program to render with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShaderKind {
    /// Albedo only.
    Unlit,
    /// Per-pixel diffuse.
    Lambert,
    /// Diffuse quantized to `levels` bands.
    Toon { levels: u32, tint: Color },
    /// Diffuse and specular with normals from a tangent space normal map.
    NormalMapped { shininess: f32 },
    /// Diffuse computed per vertex and interpolated.
    Gouraud,
}

impl Default for ShaderKind {
    fn default() -> Self {
        return ShaderKind::Lambert;
    }
}

impl FromStr for ShaderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unlit" => Ok(ShaderKind::Unlit),
            "lambert" => Ok(ShaderKind::Lambert),
            "toon" => Ok(ShaderKind::Toon {
                levels: 4,
                tint: Color::rgb(255, 155, 0),
            }),
            "normal-mapped" | "normal_mapped" => Ok(ShaderKind::NormalMapped { shininess: 32.0 }),
            "gouraud" => Ok(ShaderKind::Gouraud),
            other => Err(format!(
                "unknown shader '{other}', expected one of unlit, lambert, toon, normal-mapped, gouraud"
            )),
        }
    }
}

/// A vertex stage paired with a fragment stage.
pub struct ShaderProgram {
    pub vertex: Box<dyn VertexStage>,
    pub fragment: Box<dyn FragmentStage>,
}

impl ShaderProgram {
    pub fn new(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Unlit => Self::from_stages(ScreenSpaceVertex, Unlit),
            ShaderKind::Lambert => Self::from_stages(ScreenSpaceVertex, Lambert),
            ShaderKind::Toon { levels, tint } => {
                Self::from_stages(ScreenSpaceVertex, Toon::new(levels, tint))
            }
            ShaderKind::NormalMapped { shininess } => {
                Self::from_stages(ScreenSpaceVertex, NormalMapped { shininess })
            }
            ShaderKind::Gouraud => Self::from_stages(GouraudVertex, Gouraud),
        }
    }

    pub fn from_stages(
        vertex: impl VertexStage + 'static,
        fragment: impl FragmentStage + 'static,
    ) -> Self {
        return Self {
            vertex: Box::new(vertex),
            fragment: Box::new(fragment),
        };
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram").finish_non_exhaustive()
    }
}
