use std::thread;
use std::time::{Duration, Instant};

use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

use crate::color::{Color, GREEN};
use crate::config::SceneConfig;
use crate::error::Error;
use crate::input::{InputState, Key, MouseButton};
use crate::math::Vec2f;
use crate::model::Model;
use crate::profile::ScopeTimer;
use crate::render::{draw_model, FrameStats, FrameTarget, RenderSettings};
use crate::shader::{Materials, ShaderContext, ShaderProgram};
use crate::texture::Texture;
use crate::transform::TransformSet;

const TARGET_FPS: f64 = 60.0;
/// Radians per second while an arrow key is held.
const KEY_ROTATION_SPEED: f32 = 1.5;
/// Radians per second of the idle spin.
const SPIN_SPEED: f32 = 0.5;
/// Radians per pixel of mouse drag.
const MOUSE_SENSITIVITY: f32 = 0.01;
const WIREFRAME_COLOR: Color = GREEN;

pub struct Context {
    pub config: SceneConfig,
    pub window: bool,
    pub wireframe: bool,
    pub print_fps: bool,
}

/// Everything loaded from disk for one scene.
pub struct Scene {
    pub config: SceneConfig,
    pub model: Model,
    pub materials: Materials,
}

impl Scene {
    /// Mesh and albedo are required. Normal and specular maps that fail to load are skipped with a warning.
    pub fn load(config: SceneConfig) -> Result<Scene, Error> {
        let _timer = ScopeTimer::new("scene load");
        let model = Model::load(&config.mesh_path)?;
        let albedo = Texture::load(&config.albedo_path)?;
        let materials = Materials {
            albedo: Some(albedo),
            tint: config.albedo_tint,
            normal: load_optional(config.normal_path.as_deref(), "normal map"),
            specular: load_optional(config.specular_path.as_deref(), "specular map"),
        };

        return Ok(Scene {
            config,
            model,
            materials,
        });
    }

    /// Clears `target` and draws the model turned by `extra_yaw` on top of its configured pose.
    pub fn render(
        &self,
        target: &mut FrameTarget,
        program: &ShaderProgram,
        settings: &RenderSettings,
        extra_yaw: f32,
    ) -> Result<FrameStats, Error> {
        let _timer = ScopeTimer::new("frame");
        target.clear();

        let camera = self.config.camera();
        let transforms = TransformSet::new(
            self.config.model_matrix(extra_yaw),
            &camera,
            target.width(),
            target.height(),
        )?;
        let ctx = ShaderContext {
            model: &self.model,
            transforms: &transforms,
            light: self.config.light(),
            eye: camera.position,
            materials: &self.materials,
        };

        return Ok(draw_model(&ctx, program, target, settings)?);
    }
}

fn load_optional(path: Option<&std::path::Path>, what: &str) -> Option<Texture> {
    let path = path?;
    return match Texture::load(path) {
        Ok(texture) => Some(texture),
        Err(err) => {
            log::warn!("{} disabled: {}", what, err);
            None
        }
    };
}

fn render_settings(config: &SceneConfig, wireframe: bool) -> RenderSettings {
    return RenderSettings {
        interpolation: config.interpolation,
        cull_backfaces: config.cull_backfaces,
        wireframe: wireframe.then_some(WIREFRAME_COLOR),
    };
}

/// Renders one frame and writes it to `config.output_path`.
pub fn render_to_file(context: &Context) -> Result<FrameStats, Error> {
    let config = &context.config;
    let scene = Scene::load(config.clone())?;
    let program = ShaderProgram::new(config.shader);
    let settings = render_settings(config, context.wireframe);

    let mut target = FrameTarget::new(config.width, config.height);
    let stats = scene.render(&mut target, &program, &settings, 0.0)?;
    target.color.save(&config.output_path, config.rle)?;

    log::info!(
        "{} of {} faces drawn ({} culled, {} behind the camera), {} pixels written to {}",
        stats.faces - stats.culled - stats.dropped,
        stats.faces,
        stats.culled,
        stats.dropped,
        stats.pixels,
        config.output_path.display()
    );
    return Ok(stats);
}

fn key_of(key_code: event::VirtualKeyCode) -> Option<Key> {
    return match key_code {
        event::VirtualKeyCode::Left => Some(Key::Left),
        event::VirtualKeyCode::Right => Some(Key::Right),
        event::VirtualKeyCode::Space => Some(Key::Space),
        event::VirtualKeyCode::Escape => Some(Key::Escape),
        event::VirtualKeyCode::W => Some(Key::W),
        event::VirtualKeyCode::Z => Some(Key::Z),
        _ => None,
    };
}

/// Feeds the window events the viewer cares about into `input`.
fn record_event(input: &mut InputState, window_event: event::WindowEvent) {
    match window_event {
        event::WindowEvent::KeyboardInput(event) => {
            if let Some(key) = event.input.key_code.and_then(key_of) {
                if event.input.state.is_pressed() {
                    input.press(key);
                } else {
                    input.release(key);
                }
            }
        }
        event::WindowEvent::MouseMove(event) => {
            input.move_cursor(Vec2f::new(event.position.x, event.position.y));
        }
        event::WindowEvent::MouseButton(event) => {
            let button = match event.button {
                event::MouseButton::Left => MouseButton::Left,
                event::MouseButton::Right => MouseButton::Right,
                _ => return,
            };
            if event.state.is_pressed() {
                input.press_button(button);
            } else {
                input.release_button(button);
            }
        }
        _ => (),
    }
}

/// Yaw change for a frame lasting `dt` seconds.
pub fn yaw_step(input: &InputState, spin: bool, dt: f32) -> f32 {
    let mut step = 0.0;
    if input.is_down(Key::Left) {
        step -= KEY_ROTATION_SPEED * dt;
    }
    if input.is_down(Key::Right) {
        step += KEY_ROTATION_SPEED * dt;
    }
    if input.is_button_down(MouseButton::Left) {
        step += input.mouse_delta().x * MOUSE_SENSITIVITY;
    } else if spin {
        step += SPIN_SPEED * dt;
    }
    return step;
}

/// Opens a window and redraws the scene every frame until Escape is released.
///
/// Arrows or a left-button drag turn the model, Space toggles the idle spin,
/// W the wireframe overlay and Z the depth buffer view.
pub fn run_window(context: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = &context.config;
    let scene = Scene::load(config.clone())?;
    let program = ShaderProgram::new(config.shader);
    let mut settings = render_settings(config, context.wireframe);
    let mut target = FrameTarget::new(config.width, config.height);

    let window_options: WindowOptions = WindowOptions {
        size: Some([config.width, config.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let frame_duration = Duration::from_secs_f64(1.0 / TARGET_FPS);
    let mut input = InputState::new();
    let mut yaw = 0.0;
    let mut spin = true;
    let mut show_depth = false;
    let mut last_frame = Instant::now();
    let mut frame_counter_time_begin = Instant::now();
    let mut frame_counter: u32 = 0;
    loop {
        let frame_begin = Instant::now();
        let dt = frame_begin.duration_since(last_frame).as_secs_f32();
        last_frame = frame_begin;

        for window_event in event_channel.try_iter() {
            record_event(&mut input, window_event);
        }
        if input.was_released(Key::Escape) {
            break;
        }
        if input.was_pressed(Key::Space) {
            spin = !spin;
        }
        if input.was_pressed(Key::W) {
            settings.wireframe = match settings.wireframe {
                Some(_) => None,
                None => Some(WIREFRAME_COLOR),
            };
        }
        if input.was_pressed(Key::Z) {
            show_depth = !show_depth;
        }
        yaw += yaw_step(&input, spin, dt);
        input.end_frame();

        scene.render(&mut target, &program, &settings, yaw)?;
        let pixels = if show_depth {
            target.depth.to_grey_texture().to_rgb8_top_down()
        } else {
            target.color.to_rgb8_top_down()
        };
        let image_data = ImageView::new(ImageInfo::rgb8(target.width(), target.height()), &pixels);
        window.set_image("image", image_data)?;

        if context.print_fps {
            frame_counter += 1;
            if frame_counter_time_begin.elapsed().as_secs_f32() > 1.0 {
                log::info!("FPS --- {}", frame_counter);
                frame_counter_time_begin = Instant::now();
                frame_counter = 0;
            }
        }

        if let Some(rest) = frame_duration.checked_sub(frame_begin.elapsed()) {
            thread::sleep(rest);
        }
    }

    return Ok(());
}

pub fn run(context: Context) -> Result<(), Box<dyn std::error::Error>> {
    if context.window {
        return run_window(&context);
    }
    render_to_file(&context)?;
    return Ok(());
}
