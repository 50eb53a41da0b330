use std::fs;

use soft_rasterizer::color::Color;
use soft_rasterizer::config::{SceneConfig, ScenePreset};
use soft_rasterizer::error::{ModelError, TextureError};
use soft_rasterizer::model::Model;
use soft_rasterizer::texture::{Texture, TextureFormat};

const PYRAMID: &str = "\
# square based pyramid
v 0 1 0
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
vt 0.5 1
vt 0 0
vt 1 0
vn 0 1 0
vn 0 -1 0
vn 1 0 0
vn -1 0 0
vn 0 0 1
f 1/1/1 2/2/2 3/3/3
f 1/1/1 3/2/3 4/3/4
f 1/1/1 4/2/4 5/3/5
f 1/1/1 5/2/5 2/3/2
f 2/2/2 4/3/4 3/1/3
f 2/2/2 5/3/5 4/1/4
";

#[test]
fn mesh_from_disk_has_every_face_in_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pyramid.obj");
    fs::write(&path, PYRAMID).unwrap();

    let model = Model::load(&path).unwrap();
    assert_eq!(model.nfaces(), 6);
    assert_eq!(model.nverts(), 5);
    for face in 0..model.nfaces() {
        let corners = model.face(face);
        assert_eq!(corners.len(), 3);
        for corner in corners {
            assert!(corner.position < 5);
            assert!(corner.uv < 3);
            assert!(corner.normal < 5);
        }
    }
    assert_eq!(model.vertex(0, 0), nalgebra::vector![0.0, 1.0, 0.0]);
}

#[test]
fn missing_mesh_is_an_io_error() {
    assert!(matches!(
        Model::load("does/not/exist.obj"),
        Err(ModelError::Io { .. })
    ));
}

fn gradient(format: TextureFormat) -> Texture {
    let mut texture = Texture::new(13, 7, format);
    for y in 0..7 {
        for x in 0..13 {
            let color = if x < 5 {
                Color::rgba(200, 100, 50, 255)
            } else {
                Color::rgba((x * 19) as u8, (y * 31) as u8, 90, 255)
            };
            texture.set_pixel(x, y, color);
        }
    }
    return texture;
}

#[test]
fn tga_files_round_trip_through_texture() {
    let dir = tempfile::tempdir().unwrap();
    for format in [TextureFormat::Greyscale, TextureFormat::Rgb, TextureFormat::Rgba] {
        for rle in [false, true] {
            let texture = gradient(format);
            let path = dir.path().join(format!("image_{}_{}.tga", format.bytes_per_pixel(), rle));
            texture.save(&path, rle).unwrap();
            let back = Texture::load(&path).unwrap();
            assert_eq!(back, texture, "{format:?} rle={rle}");
        }
    }
}

#[test]
fn png_output_keeps_the_bottom_row_at_the_bottom() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    let mut texture = Texture::new(4, 4, TextureFormat::Rgb);
    texture.set_pixel(0, 0, Color::rgb(255, 0, 0));
    texture.save(&path, false).unwrap();

    let decoded = image::open(&path).unwrap().to_rgb8();
    // Image files store the top row first.
    assert_eq!(decoded.get_pixel(0, 3).0, [255, 0, 0]);
    assert_eq!(Texture::load(&path).unwrap().pixel(0, 0), Color::rgb(255, 0, 0));
}

#[test]
fn missing_texture_reports_its_path() {
    let err = Texture::load("nowhere/diffuse.tga").unwrap_err();
    assert!(matches!(err, TextureError::Tga { .. }));
    assert!(err.to_string().contains("nowhere/diffuse.tga"));
}

#[test]
fn scene_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.ron");
    let config = ScenePreset::HeadNormalMapped.config();
    fs::write(&path, config.to_ron().unwrap()).unwrap();
    assert_eq!(SceneConfig::load(&path).unwrap(), config);
}
