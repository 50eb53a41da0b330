//! Builders for the model, view, projection and viewport matrices and the
//! per-frame set composed from them.

use nalgebra as na;
use na::vector;

use crate::error::MathError;
use crate::math::{mat4_from_rows, Mat4, RotationExt, SquareMatrixExt, Vec2f, Vec3f};

/// Up direction of the world, used to build the camera basis.
pub fn world_up() -> Vec3f {
    return Vec3f::y();
}

/// z resolution handed to `viewport` by the frame driver.
pub const DEPTH_RESOLUTION: f32 = 255.0;

/// Perspective matrix. After it, w holds the view-space depth along the camera's
/// forward axis, so the later division by w performs the perspective divide.
pub fn projection(near: f32, far: f32) -> Mat4 {
    return mat4_from_rows([
        vector![near, 0.0, 0.0, 0.0],
        vector![0.0, near, 0.0, 0.0],
        vector![0.0, 0.0, near + far, -far * near],
        vector![0.0, 0.0, 1.0, 0.0],
    ]);
}

/// Maps x, y in [-1, 1] onto a `width` x `height` pixel area starting at `offset` pixels,
/// and z in [-1, 1] onto [0, depth].
pub fn viewport(offset: Vec2f, width: f32, height: f32, depth: f32) -> Mat4 {
    let half_w = width * 0.5;
    let half_h = height * 0.5;
    let half_d = depth * 0.5;
    return mat4_from_rows([
        vector![half_w, 0.0, 0.0, offset.x + half_w],
        vector![0.0, half_h, 0.0, offset.y + half_h],
        vector![0.0, 0.0, half_d, half_d],
        vector![0.0, 0.0, 0.0, 1.0],
    ]);
}

/// World to camera transform.
///
/// The basis rows are `right = up x forward`, `up = forward x right` and `forward`,
/// so the rotation part is the transpose of the camera orientation. Translation by
/// `-eye` is applied first.
pub fn look_at(eye: Vec3f, target: Vec3f) -> Mat4 {
    let forward = (target - eye).normalize();
    let mut right = world_up().cross(&forward);
    if right.norm_squared() < 1e-12 {
        // Looking straight up or down, any horizontal axis will do.
        right = Vec3f::z().cross(&forward);
    }
    let right = right.normalize();
    let up = forward.cross(&right);

    let rotation = mat4_from_rows([
        vector![right.x, right.y, right.z, 0.0],
        vector![up.x, up.y, up.z, 0.0],
        vector![forward.x, forward.y, forward.z, 0.0],
        vector![0.0, 0.0, 0.0, 1.0],
    ]);
    let translation = Mat4::new_translation(&-eye);
    return rotation * translation;
}

/// Object to world transform: scale, then rotate around Y, then translate.
pub fn model_matrix(scale: f32, position: Vec3f, yaw: f32) -> Mat4 {
    let mut rotation = Mat4::identity();
    rotation.set_yaw(yaw);
    return Mat4::new_translation(&position) * rotation * Mat4::new_scaling(scale);
}

/// Camera placement and lens used to build a `TransformSet`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3f,
    pub target: Vec3f,
    pub near: f32,
    pub far: f32,
}

/// All matrices the shader stages need during one frame.
#[derive(Debug, Clone, Copy)]
pub struct TransformSet {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
    /// projection * view * model
    pub mvp: Mat4,
    /// Inverse transpose of the model matrix, applied to normals.
    pub normal_matrix: Mat4,
}

impl TransformSet {
    /// Every matrix is the identity, clip space is screen space.
    pub fn identity() -> Self {
        return Self {
            model: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            viewport: Mat4::identity(),
            mvp: Mat4::identity(),
            normal_matrix: Mat4::identity(),
        };
    }

    pub fn new(model: Mat4, camera: &Camera, width: u32, height: u32) -> Result<Self, MathError> {
        let view = look_at(camera.position, camera.target);
        let projection = projection(camera.near, camera.far);
        let viewport = viewport(Vec2f::zeros(), width as f32, height as f32, DEPTH_RESOLUTION);
        let normal_matrix = model.checked_inverse()?.transpose();
        return Ok(Self {
            model,
            view,
            projection,
            viewport,
            mvp: projection * view * model,
            normal_matrix,
        });
    }
}
