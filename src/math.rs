//! Vector and matrix helpers on top of nalgebra.
//!
//! Storage, arithmetic, dot/cross products, transposition and row/column access
//! all come from nalgebra. What lives here is the part the pipeline needs with
//! its own semantics: homogeneous conversions, determinant and inverse through
//! cofactor expansion (with an explicit error for singular input) and the
//! pitch/yaw/roll accessors of the rotation block.

use nalgebra as na;
use na::{vector, DMatrix, Matrix3, Matrix4, RowVector4, SMatrix, Vector2, Vector3, Vector4};

use crate::error::MathError;

pub type Vec2f = Vector2<f32>;
pub type Vec3f = Vector3<f32>;
pub type Vec4f = Vector4<f32>;
pub type Vec2i = Vector2<i32>;
pub type Mat3 = Matrix3<f32>;
pub type Mat4 = Matrix4<f32>;

/// Below this magnitude w is treated as zero by `from_homogeneous`.
const W_EPSILON: f32 = 1e-6;

/// Transformation of a point to homogeneous coordinates.
pub fn to_point(v: Vec3f) -> Vec4f {
    return vector![v.x, v.y, v.z, 1.0];
}

/// Transformation of a direction to homogeneous coordinates.
pub fn to_direction(v: Vec3f) -> Vec4f {
    return vector![v.x, v.y, v.z, 0.0];
}

/// Perspective division. A (near) zero w is replaced by 1 so directions pass through unchanged.
pub fn from_homogeneous(v: Vec4f) -> Vec3f {
    let w = if v.w.abs() < W_EPSILON { 1.0 } else { v.w };
    return vector![v.x / w, v.y / w, v.z / w];
}

/// Drops the w component without dividing.
pub fn truncate(v: Vec4f) -> Vec3f {
    return vector![v.x, v.y, v.z];
}

/// Builds a 4x4 matrix from its rows.
pub fn mat4_from_rows(rows: [Vec4f; 4]) -> Mat4 {
    return Mat4::from_rows(&[
        RowVector4::new(rows[0].x, rows[0].y, rows[0].z, rows[0].w),
        RowVector4::new(rows[1].x, rows[1].y, rows[1].z, rows[1].w),
        RowVector4::new(rows[2].x, rows[2].y, rows[2].z, rows[2].w),
        RowVector4::new(rows[3].x, rows[3].y, rows[3].z, rows[3].w),
    ]);
}

/// Matrix without the given row and column.
fn minor(m: &DMatrix<f32>, row: usize, col: usize) -> DMatrix<f32> {
    let n = m.nrows();
    return DMatrix::from_fn(n - 1, n - 1, |r, c| {
        let src_r = if r < row { r } else { r + 1 };
        let src_c = if c < col { c } else { c + 1 };
        m[(src_r, src_c)]
    });
}

fn cofactor_sign(row: usize, col: usize) -> f32 {
    if (row + col) % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Laplace expansion along the first row.
fn laplace(m: &DMatrix<f32>) -> f32 {
    match m.nrows() {
        0 => 1.0,
        1 => m[(0, 0)],
        n => (0..n)
            .map(|col| cofactor_sign(0, col) * m[(0, col)] * laplace(&minor(m, 0, col)))
            .sum(),
    }
}

/// Determinant, adjugate and inverse of square matrices by cofactor expansion.
pub trait SquareMatrixExt: Sized {
    fn laplace_determinant(&self) -> f32;
    /// Signed minor for the element at (row, col).
    fn cofactor(&self, row: usize, col: usize) -> f32;
    /// Transposed cofactor matrix.
    fn adjugate(&self) -> Self;
    /// Inverse as adjugate / determinant; fails instead of dividing by zero.
    fn checked_inverse(&self) -> Result<Self, MathError>;
}

impl<const N: usize> SquareMatrixExt for SMatrix<f32, N, N> {
    fn laplace_determinant(&self) -> f32 {
        return laplace(&DMatrix::from_column_slice(N, N, self.as_slice()));
    }

    fn cofactor(&self, row: usize, col: usize) -> f32 {
        let dynamic = DMatrix::from_column_slice(N, N, self.as_slice());
        return cofactor_sign(row, col) * laplace(&minor(&dynamic, row, col));
    }

    fn adjugate(&self) -> Self {
        if N == 1 {
            return Self::from_element(1.0);
        }
        let dynamic = DMatrix::from_column_slice(N, N, self.as_slice());
        // adj[i][j] is the cofactor of element (j, i).
        return Self::from_fn(|r, c| cofactor_sign(c, r) * laplace(&minor(&dynamic, c, r)));
    }

    fn checked_inverse(&self) -> Result<Self, MathError> {
        let determinant = self.laplace_determinant();
        let magnitude = self.amax();
        let tolerance = f32::EPSILON * magnitude.powi(N as i32);
        if !determinant.is_finite() || magnitude == 0.0 || determinant.abs() <= tolerance {
            return Err(MathError::Singular { determinant });
        }
        return Ok(self.adjugate() / determinant);
    }
}

/// Euler angle access to the rotation block of a 4x4 matrix.
///
/// Setters overwrite the upper-left 3x3 block with a single axis rotation and leave
/// the translation column alone. Getters read the angles back assuming the block is
/// `yaw * pitch * roll` (Y, then X, then Z).
pub trait RotationExt {
    /// Rotation around X.
    fn set_pitch(&mut self, angle: f32);
    /// Rotation around Y.
    fn set_yaw(&mut self, angle: f32);
    /// Rotation around Z.
    fn set_roll(&mut self, angle: f32);
    fn pitch(&self) -> f32;
    fn yaw(&self) -> f32;
    fn roll(&self) -> f32;
}

fn set_rotation_block(m: &mut Mat4, block: Mat3) {
    for r in 0..3 {
        for c in 0..3 {
            m[(r, c)] = block[(r, c)];
        }
    }
}

impl RotationExt for Mat4 {
    fn set_pitch(&mut self, angle: f32) {
        let (sin_a, cos_a) = angle.sin_cos();
        set_rotation_block(
            self,
            Mat3::new(1.0, 0.0, 0.0, 0.0, cos_a, -sin_a, 0.0, sin_a, cos_a),
        );
    }

    fn set_yaw(&mut self, angle: f32) {
        let (sin_a, cos_a) = angle.sin_cos();
        set_rotation_block(
            self,
            Mat3::new(cos_a, 0.0, sin_a, 0.0, 1.0, 0.0, -sin_a, 0.0, cos_a),
        );
    }

    fn set_roll(&mut self, angle: f32) {
        let (sin_a, cos_a) = angle.sin_cos();
        set_rotation_block(
            self,
            Mat3::new(cos_a, -sin_a, 0.0, sin_a, cos_a, 0.0, 0.0, 0.0, 1.0),
        );
    }

    fn pitch(&self) -> f32 {
        return (-self[(1, 2)]).clamp(-1.0, 1.0).asin();
    }

    fn yaw(&self) -> f32 {
        return self[(0, 2)].atan2(self[(2, 2)]);
    }

    fn roll(&self) -> f32 {
        return self[(1, 0)].atan2(self[(1, 1)]);
    }
}
