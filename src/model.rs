//! Triangle mesh with positions, normals and texture coordinates.
//!
//! Parsing is done by `obj-rs`; this module drops the statements it doesn't know,
//! checks that every face is a triangle whose indices resolve, and flattens the
//! result into per-face index triples.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::vector;
use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};

use crate::error::ModelError;
use crate::math::{Vec2f, Vec3f};

/// Statements handed to `obj-rs`. Anything else is skipped.
const KNOWN_STATEMENTS: &[&str] = &["v", "vt", "vn", "vp", "f", "g", "s", "o", "usemtl", "mtllib"];

/// Indices of one face corner into the attribute arrays (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub uv: usize,
    pub normal: usize,
}

pub type Face = [FaceVertex; 3];

#[derive(Debug, Clone, Default)]
pub struct Model {
    positions: Vec<Vec3f>,
    normals: Vec<Vec3f>,
    uvs: Vec<Vec2f>,
    faces: Vec<Face>,
}

impl Model {
    pub fn load(path: impl AsRef<Path>) -> Result<Model, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_owned(),
            source,
        })?;
        let model = Model::from_reader(BufReader::new(file))?;
        log::info!(
            "loaded {}: {} vertices, {} faces",
            path.display(),
            model.nverts(),
            model.nfaces()
        );
        return Ok(model);
    }

    /// Parses OBJ text. Statements other than geometry, grouping and material
    /// references are ignored.
    pub fn from_reader(reader: impl BufRead) -> Result<Model, ModelError> {
        let source = known_statements(reader)?;
        let raw = parse_obj(source.as_bytes())?;
        return Model::from_raw(raw);
    }

    fn from_raw(raw: RawObj) -> Result<Model, ModelError> {
        let positions: Vec<Vec3f> = raw
            .positions
            .iter()
            .map(|&(x, y, z, _)| vector![x, y, z])
            .collect();
        let normals: Vec<Vec3f> = raw
            .normals
            .iter()
            .map(|&(x, y, z)| vector![x, y, z])
            .collect();
        let uvs: Vec<Vec2f> = raw
            .tex_coords
            .iter()
            .map(|&(u, v, _)| vector![u, v])
            .collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        for (face, polygon) in raw.polygons.iter().enumerate() {
            let corners: Vec<FaceVertex> = match polygon {
                Polygon::PTN(v) => v
                    .iter()
                    .map(|&(position, uv, normal)| FaceVertex { position, uv, normal })
                    .collect(),
                // Without explicit normals the normal array is indexed like the positions.
                Polygon::PT(v) => {
                    if normals.is_empty() {
                        return Err(ModelError::MissingNormals { face });
                    }
                    v.iter()
                        .map(|&(position, uv)| FaceVertex { position, uv, normal: position })
                        .collect()
                }
                Polygon::P(_) | Polygon::PN(_) => return Err(ModelError::MissingUv { face }),
            };
            if corners.len() != 3 {
                return Err(ModelError::NotTriangle {
                    face,
                    vertices: corners.len(),
                });
            }

            for corner in &corners {
                check_index(face, "position", corner.position, positions.len())?;
                check_index(face, "texture coordinate", corner.uv, uvs.len())?;
                check_index(face, "normal", corner.normal, normals.len())?;
            }
            faces.push([corners[0], corners[1], corners[2]]);
        }

        return Ok(Model {
            positions,
            normals,
            uvs,
            faces,
        });
    }

    pub fn nverts(&self) -> usize {
        return self.positions.len();
    }

    pub fn nfaces(&self) -> usize {
        return self.faces.len();
    }

    pub fn face(&self, face: usize) -> &Face {
        return &self.faces[face];
    }

    fn corner(&self, face: usize, slot: usize) -> FaceVertex {
        assert!(slot < 3, "vertex slot {slot} out of range, a face has 3 vertices");
        return self.faces[face][slot];
    }

    /// Object space position of the vertex in `slot` (0..3) of `face`.
    pub fn vertex(&self, face: usize, slot: usize) -> Vec3f {
        return self.positions[self.corner(face, slot).position];
    }

    pub fn normal(&self, face: usize, slot: usize) -> Vec3f {
        return self.normals[self.corner(face, slot).normal];
    }

    pub fn uv(&self, face: usize, slot: usize) -> Vec2f {
        return self.uvs[self.corner(face, slot).uv];
    }

    /// Geometric normal `(v1 - v0) x (v2 - v0)`, not normalized.
    pub fn face_normal(&self, face: usize) -> Vec3f {
        let v0 = self.vertex(face, 0);
        let v1 = self.vertex(face, 1);
        let v2 = self.vertex(face, 2);
        return (v1 - v0).cross(&(v2 - v0));
    }
}

/// Copies the lines `obj-rs` understands, including their `\` continuations.
fn known_statements(reader: impl BufRead) -> Result<String, ModelError> {
    let mut source = String::new();
    let mut skipped = 0;
    let mut continued = None;
    for line in reader.lines() {
        let line = line?;
        let keep = match continued {
            Some(keep) => keep,
            None => match line.split_whitespace().next() {
                None => true,
                Some(word) => word.starts_with('#') || KNOWN_STATEMENTS.contains(&word),
            },
        };
        continued = line.trim_end().ends_with('\\').then_some(keep);
        if keep {
            source.push_str(&line);
            source.push('\n');
        } else if continued.is_none() {
            skipped += 1;
        }
    }
    if skipped > 0 {
        log::debug!("ignored {} unsupported OBJ statements", skipped);
    }
    return Ok(source);
}

fn check_index(
    face: usize,
    attribute: &'static str,
    index: usize,
    count: usize,
) -> Result<(), ModelError> {
    if index >= count {
        return Err(ModelError::IndexOutOfRange {
            face,
            attribute,
            index,
            count,
        });
    }
    return Ok(());
}
