use std::path::PathBuf;

/// Failures of the linear algebra layer.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MathError {
    /// Inverse requested for a matrix whose determinant is zero.
    #[error("matrix is singular (determinant {determinant})")]
    Singular { determinant: f32 },
}

/// Errors produced while loading a mesh.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("can't open mesh {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't read mesh data: {0}")]
    Read(#[from] std::io::Error),

    /// Syntax errors, including malformed numeric fields.
    #[error("malformed OBJ data: {0}")]
    Obj(#[from] obj::ObjError),

    #[error("face {face} has {vertices} vertices, only triangles are supported")]
    NotTriangle { face: usize, vertices: usize },

    #[error("face {face} references {attribute} {index}, but only {count} exist")]
    IndexOutOfRange {
        face: usize,
        attribute: &'static str,
        index: usize,
        count: usize,
    },

    #[error("face {face} has no texture coordinates")]
    MissingUv { face: usize },

    #[error("face {face} has no normal and the mesh has no per-position normals")]
    MissingNormals { face: usize },
}

/// Errors of the TGA codec.
#[derive(Debug, thiserror::Error)]
pub enum TgaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),

    #[error("bad image dimensions {width}x{height}")]
    BadDimensions { width: u32, height: u32 },

    #[error("unsupported bits per pixel: {0}")]
    UnsupportedDepth(u8),

    #[error("unsupported image type code: {0}")]
    UnsupportedType(u8),

    #[error("run-length data overflows the image ({expected} pixels)")]
    RleOverflow { expected: usize },
}

/// Errors of texture loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("TGA {path}: {source}")]
    Tga {
        path: PathBuf,
        #[source]
        source: TgaError,
    },

    #[error("image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture of {width}x{height} does not fit into an image buffer")]
    Conversion { width: u32, height: u32 },
}

/// Contract violations between the vertex and fragment stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("varying {tag} of type {kind} was not written for every vertex of the triangle")]
    UnsetVarying { tag: u8, kind: &'static str },
}

/// Errors while reading a scene description.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse scene file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("invalid scene: {0}")]
    Invalid(String),
}

/// Errors writing a profiling trace.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("can't create trace file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't write trace: {0}")]
    Json(#[from] serde_json::Error),
}

/// Any failure the renderer can report to its driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}
