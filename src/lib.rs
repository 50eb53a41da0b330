//! CPU triangle rasterizer with a programmable vertex/fragment shader pipeline.
//!
//! A frame goes mesh → [`shader::VertexStage`] → [`raster::draw_triangle`] →
//! [`shader::FragmentStage`] → [`texture::Texture`], driven per face by [`render::draw_model`].

pub mod app;
pub mod color;
pub mod config;
pub mod depth;
pub mod error;
pub mod input;
pub mod math;
pub mod model;
pub mod profile;
pub mod raster;
pub mod render;
pub mod shader;
pub mod texture;
pub mod tga;
pub mod transform;

pub use error::Error;
