use std::cell::Cell;

use nalgebra::vector;

use soft_rasterizer::color::{Color, BLACK, BLUE, GREEN, RED};
use soft_rasterizer::depth::{DepthBuffer, DepthTest, NoDepthTest};
use soft_rasterizer::error::ShaderError;
use soft_rasterizer::math::{Mat4, Vec2i, Vec3f};
use soft_rasterizer::model::Model;
use soft_rasterizer::raster::{barycentric, draw_triangle, Triangle};
use soft_rasterizer::render::{draw_model, FrameTarget, RenderSettings};
use soft_rasterizer::shader::builtin::FlatColor;
use soft_rasterizer::shader::{
    Fragment, FragmentInput, FragmentStage, InterpolationMode, Light, Materials, ShaderContext,
    ShaderKind, ShaderProgram, VaryingTag, Varyings,
};
use soft_rasterizer::texture::{Texture, TextureFormat};
use soft_rasterizer::transform::{Camera, TransformSet};

struct Frame {
    model: Model,
    transforms: TransformSet,
    materials: Materials,
}

impl Frame {
    fn empty() -> Frame {
        Frame {
            model: Model::default(),
            transforms: TransformSet::identity(),
            materials: Materials::default(),
        }
    }

    fn ctx(&self) -> ShaderContext<'_> {
        ShaderContext {
            model: &self.model,
            transforms: &self.transforms,
            light: Light {
                position: vector![0.0, 0.0, 5.0],
                color: Vec3f::repeat(1.0),
            },
            eye: vector![0.0, 0.0, 3.0],
            materials: &self.materials,
        }
    }
}

fn triangle(points: [(f32, f32); 3], w: f32) -> Triangle {
    Triangle {
        vertices: points.map(|(x, y)| vector![x * w, y * w, 0.0, w]),
        face: 0,
    }
}

fn fill(
    frame: &Frame,
    triangle: &Triangle,
    stage: &dyn FragmentStage,
    depth: &mut dyn DepthTest,
    target: &mut Texture,
) -> usize {
    draw_triangle(
        triangle,
        &frame.ctx(),
        &Varyings::new(),
        stage,
        depth,
        target,
        InterpolationMode::ScreenSpace,
    )
    .unwrap()
}

const SCENARIO_TRIANGLE: [(f32, f32); 3] = [(10.0, 70.0), (50.0, 160.0), (70.0, 80.0)];

#[test]
fn flat_triangle_covers_its_centroid() {
    let frame = Frame::empty();
    let background = Color::rgb(10, 20, 30);
    let mut target = Texture::new(200, 200, TextureFormat::Rgb);
    target.fill(background);

    let written = fill(
        &frame,
        &triangle(SCENARIO_TRIANGLE, 1.0),
        &FlatColor(RED),
        &mut NoDepthTest,
        &mut target,
    );
    assert!(written > 0);
    // Centroid is (43.3, 103.3).
    assert_eq!(target.pixel(43, 103), RED);
    assert_eq!(target.pixel(150, 20), background);
    assert_eq!(target.pixel(5, 5), background);
}

#[test]
fn triangle_overhanging_the_buffer_is_clipped() {
    let frame = Frame::empty();
    let mut target = Texture::new(100, 100, TextureFormat::Rgb);
    let written = fill(
        &frame,
        &triangle(SCENARIO_TRIANGLE, 1.0),
        &FlatColor(RED),
        &mut NoDepthTest,
        &mut target,
    );
    assert!(written > 0);
    assert_eq!(target.pixel(45, 95), RED);
    assert_eq!(target.pixel(90, 10), BLACK);
    assert_eq!(target.pixel(45, 120), Color::default());
}

#[test]
fn nearer_triangle_wins_regardless_of_order() {
    let frame = Frame::empty();
    let near = triangle([(0.0, 0.0), (40.0, 0.0), (0.0, 40.0)], 1.0);
    let far = triangle([(10.0, 10.0), (60.0, 10.0), (10.0, 60.0)], 3.0);

    for order in [[(near, RED), (far, GREEN)], [(far, GREEN), (near, RED)]] {
        let mut target = Texture::new(64, 64, TextureFormat::Rgb);
        let mut depth = DepthBuffer::new(64, 64);
        for (triangle, color) in order {
            fill(&frame, &triangle, &FlatColor(color), &mut depth, &mut target);
        }
        // Overlap.
        assert_eq!(target.pixel(15, 15), RED);
        // Only the far triangle.
        assert_eq!(target.pixel(40, 15), GREEN);
        // Only the near one.
        assert_eq!(target.pixel(3, 3), RED);
    }
}

/// Discards the left half of the screen.
struct DiscardLeft;

impl FragmentStage for DiscardLeft {
    fn fragment(&self, _ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        if input.pixel.x < 8 {
            return Ok(Fragment::Discard);
        }
        return Ok(Fragment::Keep(BLUE.to_float()));
    }
}

#[test]
fn discard_leaves_depth_and_color_untouched() {
    let frame = Frame::empty();
    let mut target = Texture::new(16, 16, TextureFormat::Rgb);
    target.fill(RED);
    let mut depth = DepthBuffer::new(16, 16);

    let square = triangle([(0.0, 0.0), (32.0, 0.0), (0.0, 32.0)], 1.0);
    let written = fill(&frame, &square, &DiscardLeft, &mut depth, &mut target);
    assert!(written > 0);

    assert_eq!(target.pixel(2, 2), RED);
    assert_eq!(depth.get(2, 2), Some(f32::NEG_INFINITY));
    assert_eq!(target.pixel(10, 2), BLUE);
    assert!(depth.get(10, 2).unwrap() > 0.0);

    // A later triangle farther away still fills the discarded pixels.
    let far = triangle([(0.0, 0.0), (32.0, 0.0), (0.0, 32.0)], 4.0);
    fill(&frame, &far, &FlatColor(GREEN), &mut depth, &mut target);
    assert_eq!(target.pixel(2, 2), GREEN);
    assert_eq!(target.pixel(10, 2), BLUE);
}

/// An unset varying read by the fragment stage is reported, not read as garbage.
#[test]
fn unset_varyings_surface_as_errors() {
    let frame = Frame::empty();
    let mut target = Texture::new(8, 8, TextureFormat::Rgb);
    let program = ShaderProgram::new(ShaderKind::Unlit);
    let result = draw_triangle(
        &triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)], 1.0),
        &frame.ctx(),
        &Varyings::new(),
        program.fragment.as_ref(),
        &mut NoDepthTest,
        &mut target,
        InterpolationMode::ScreenSpace,
    );
    assert!(matches!(result, Err(ShaderError::UnsetVarying { .. })));
}

const FAR_SQUARE: &str = "\
f 1/1/1 2/1/1 3/1/1
f 1/1/1 3/1/1 4/1/1
";
const NEAR_SQUARE: &str = "\
f 5/2/1 6/2/1 7/2/1
f 5/2/1 7/2/1 8/2/1
";
const SQUARES: &str = "\
v -0.5 -0.5 0
v 0.5 -0.5 0
v 0.5 0.5 0
v -0.5 0.5 0
v -0.2 -0.2 1
v 0.2 -0.2 1
v 0.2 0.2 1
v -0.2 0.2 1
vt 0.25 0.5
vt 0.75 0.5
vn 0 0 1
";

#[test]
fn full_pipeline_keeps_the_nearer_square_in_either_face_order() {
    // Left texel green for the far square, right texel red for the near one.
    let mut albedo = Texture::new(2, 1, TextureFormat::Rgb);
    albedo.set_pixel(0, 0, GREEN);
    albedo.set_pixel(1, 0, RED);
    let materials = Materials {
        albedo: Some(albedo),
        ..Materials::default()
    };
    let camera = Camera {
        position: vector![0.0, 0.0, 3.0],
        target: Vec3f::zeros(),
        near: 1.0,
        far: 10.0,
    };
    let transforms = TransformSet::new(Mat4::identity(), &camera, 64, 64).unwrap();
    let program = ShaderProgram::new(ShaderKind::Unlit);
    let settings = RenderSettings {
        cull_backfaces: false,
        ..RenderSettings::default()
    };

    for faces in [[FAR_SQUARE, NEAR_SQUARE], [NEAR_SQUARE, FAR_SQUARE]] {
        let obj = format!("{SQUARES}{}{}", faces[0], faces[1]);
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        let ctx = ShaderContext {
            model: &model,
            transforms: &transforms,
            light: Light {
                position: camera.position,
                color: Vec3f::repeat(1.0),
            },
            eye: camera.position,
            materials: &materials,
        };
        let mut target = FrameTarget::new(64, 64);
        let stats = draw_model(&ctx, &program, &mut target, &settings).unwrap();
        assert_eq!(stats.faces, 4);

        assert_eq!(target.color.pixel(32, 32), RED);
        assert_eq!(target.color.pixel(36, 32), GREEN);
        assert_eq!(target.color.pixel(2, 2), BLACK);
    }
}

#[test]
fn flat_color_keeps_alpha_out_of_rgb_targets() {
    let frame = Frame::empty();
    let mut target = Texture::new(4, 4, TextureFormat::Rgb);
    let translucent = Color::rgba(0, 0, 255, 10);
    fill(
        &frame,
        &triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)], 1.0),
        &FlatColor(translucent),
        &mut NoDepthTest,
        &mut target,
    );
    assert_eq!(target.pixel(0, 0), BLUE);
}

/// Writes the interpolated intensity as grey and remembers it at one pixel.
struct RecordIntensity {
    at: Vec2i,
    seen: Cell<Option<f32>>,
}

impl FragmentStage for RecordIntensity {
    fn fragment(&self, _ctx: &ShaderContext, input: &FragmentInput) -> Result<Fragment, ShaderError> {
        let intensity: f32 = input
            .varyings
            .interpolate(VaryingTag::INTENSITY, &input.interpolation)?;
        if input.pixel == self.at {
            self.seen.set(Some(intensity));
        }
        return Ok(Fragment::Keep(vector![intensity, intensity, intensity, 1.0]));
    }
}

#[test]
fn perspective_correction_divides_varyings_by_w() {
    let frame = Frame::empty();
    // Clockwise on screen, the far corner carries all of the intensity.
    let screen: [(f32, f32); 3] = [(0.0, 0.0), (0.0, 32.0), (32.0, 0.0)];
    let w: [f32; 3] = [1.0, 4.0, 1.0];
    let values: [f32; 3] = [0.0, 1.0, 0.0];
    let triangle = Triangle {
        vertices: [0usize, 1, 2].map(|i| vector![screen[i].0 * w[i], screen[i].1 * w[i], 0.0, w[i]]),
        face: 0,
    };
    let mut varyings = Varyings::new();
    for slot in 0..3 {
        varyings.set(VaryingTag::INTENSITY, slot, values[slot]);
    }

    let at = vector![8, 8];
    let shade = |mode: InterpolationMode| {
        let stage = RecordIntensity {
            at,
            seen: Cell::new(None),
        };
        let mut target = Texture::new(32, 32, TextureFormat::Rgb);
        let written = draw_triangle(
            &triangle,
            &frame.ctx(),
            &varyings,
            &stage,
            &mut NoDepthTest,
            &mut target,
            mode,
        )
        .unwrap();
        assert!(written > 0);
        return stage.seen.get().unwrap();
    };
    let linear = shade(InterpolationMode::ScreenSpace);
    let corrected = shade(InterpolationMode::PerspectiveCorrect);

    let centre = vector![8.5, 8.5];
    let corners = screen.map(|(x, y)| vector![x, y]);
    let bary = barycentric(corners[0], corners[1], corners[2], centre).unwrap();
    let expected_linear: f32 = (0..3).map(|i| bary[i] * values[i]).sum();
    let numerator: f32 = (0..3).map(|i| bary[i] * values[i] / w[i]).sum();
    let denominator: f32 = (0..3).map(|i| bary[i] / w[i]).sum();

    assert!((linear - expected_linear).abs() < 1e-5, "{linear} vs {expected_linear}");
    assert!((corrected - numerator / denominator).abs() < 1e-5);
    // The far vertex pulls less once its 1/w is taken into account.
    assert!(corrected < linear - 0.1);
}
