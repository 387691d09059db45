use anyhow::{Context, Result};
use cinder_assets::AssetStore;
use cinder_common::Timer;
use cinder_input::{InputState, Key, MouseButton};
use cinder_render_wgpu::{OverlayTarget, WgpuGraphics};
use cinder_world::demo::build_demo_scene;
use cinder_world::{ComponentHandle, EngineConfig, World, WorldInspector, WorldState};
use clap::Parser;
use egui::Context as EguiContext;
use glam::{Vec2, Vec3};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "cinder-desktop", about = "Cinder desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML engine config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window width, overrides the config
    #[arg(long)]
    width: Option<u32>,

    /// Window height, overrides the config
    #[arg(long)]
    height: Option<u32>,

    /// Asset directory, overrides the config
    #[arg(long)]
    assets: Option<PathBuf>,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if let Some(assets) = &self.assets {
            config.asset_dir = assets.clone();
        }
        Ok(config)
    }
}

/// Everything that exists only once the window does.
struct Gpu {
    window: Arc<Window>,
    graphics: WgpuGraphics,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

/// Inspector panel state.
struct Panel {
    visible: bool,
    selected: Option<ComponentHandle>,
}

struct GpuApp {
    config: EngineConfig,
    world: World,
    input: InputState,
    timer: Timer,
    panel: Panel,
    egui_ctx: EguiContext,
    gpu: Option<Gpu>,
    error: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(config: EngineConfig) -> Self {
        let world = World::new(AssetStore::new(&config.asset_dir));
        Self {
            config,
            world,
            input: InputState::new(),
            timer: Timer::new(),
            panel: Panel {
                visible: true,
                selected: None,
            },
            egui_ctx: EguiContext::default(),
            gpu: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);
        let size = window.inner_size();
        let mut graphics = WgpuGraphics::new(window.clone(), size.width, size.height)
            .context("creating graphics device")?;

        build_demo_scene(&mut self.world, &mut graphics, &self.config)
            .context("building demo scene")?;
        self.world
            .on_window_resized(&mut graphics, size.width, size.height)?;
        self.world.level_start(&mut graphics)?;

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(graphics.device(), graphics.surface_format(), None, 1, false);

        self.gpu = Some(Gpu {
            window,
            graphics,
            egui_winit,
            egui_renderer,
        });
        self.timer = Timer::new();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        self.world.close();
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode, pressed: bool) {
        let Some(key) = map_key(code) else {
            return;
        };
        if !pressed {
            self.input.key_up(key);
            return;
        }
        self.input.key_down(key);
        match key {
            Key::F1 => self.panel.visible = !self.panel.visible,
            Key::Escape => {
                self.world.close();
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn frame(&mut self) -> Result<()> {
        if !wants_frame(&self.world) {
            return Ok(());
        }
        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        let delta_time = self.timer.mark().min(0.1);
        self.world
            .tick(delta_time, &self.input, &mut gpu.graphics)?;
        self.input.end_frame();

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let mut edit = None;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            edit = draw_ui(ctx, &self.world, &mut self.panel);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let pixels_per_point = full_output.pixels_per_point;
        let textures = full_output.textures_delta;

        let egui_renderer = &mut gpu.egui_renderer;
        gpu.graphics.end_frame_with(
            |OverlayTarget {
                 device,
                 queue,
                 encoder,
                 view,
                 size,
             }| {
                let screen = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: size,
                    pixels_per_point,
                };
                for (id, image_delta) in &textures.set {
                    egui_renderer.update_texture(device, queue, *id, image_delta);
                }
                egui_renderer.update_buffers(device, queue, encoder, &paint_jobs, &screen);
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                egui_renderer.render(&mut pass, &paint_jobs, &screen);
            },
        )?;
        for id in &textures.free {
            egui_renderer.free_texture(id);
        }

        if let Some((component, location)) = edit {
            let scene = self.world.component_scene(component)?;
            self.world
                .scene_mut()
                .set_world_location(scene, location, false)?;
        }
        Ok(())
    }
}

/// A redraw can still be queued after Escape or a close request.
fn wants_frame(world: &World) -> bool {
    world.state() != WorldState::Closed
}

/// Draw the inspector. Returns a world location typed into the panel.
fn draw_ui(ctx: &EguiContext, world: &World, panel: &mut Panel) -> Option<(ComponentHandle, Vec3)> {
    if !panel.visible {
        return None;
    }
    let mut edit = None;
    let summary = WorldInspector::summary(world);

    egui::SidePanel::left("inspector")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("Cinder");
            ui.separator();
            ui.label(format!("State: {:?}  Frame: {}", summary.state, summary.frame));
            ui.label(format!(
                "Objects: {}  Components: {}",
                summary.object_count, summary.component_count
            ));
            ui.label(format!(
                "Scene nodes: {}  Static data: {}",
                summary.scene_nodes, summary.static_data_entries
            ));
            ui.label(format!(
                "Camera: {}",
                summary.active_camera.as_deref().unwrap_or("none")
            ));
            ui.separator();

            ui.heading("Objects");
            for (handle, object) in world.objects() {
                egui::CollapsingHeader::new(object.name())
                    .id_salt(handle)
                    .default_open(true)
                    .show(ui, |ui| {
                        for &component in object.components() {
                            let Some(c) = world.component(component) else {
                                continue;
                            };
                            let label = format!("{} [{}]", c.name(), c.kind().label());
                            let selected = panel.selected == Some(component);
                            if ui.selectable_label(selected, label).clicked() {
                                panel.selected = Some(component);
                            }
                        }
                    });
            }

            let info = panel
                .selected
                .and_then(|h| WorldInspector::inspect_component(world, h).map(|i| (h, i)));
            if let Some((handle, info)) = info {
                ui.separator();
                ui.heading("Component");
                ui.label(format!("{}.{} [{}]", info.object, info.name, info.kind));

                let mut location = info.location;
                ui.label("Location:");
                ui.horizontal(|ui| {
                    for (axis, value) in ["X: ", "Y: ", "Z: "].into_iter().zip(&mut location) {
                        ui.add(egui::DragValue::new(value).prefix(axis).speed(0.1));
                    }
                });
                if location != info.location {
                    edit = Some((handle, Vec3::from_array(location)));
                }

                let [pitch, yaw, roll] = info.rotation;
                ui.label(format!("Rotation: ({pitch:.1}, {yaw:.1}, {roll:.1})"));
                let [x, y, z] = info.scale;
                ui.label(format!("Scale: ({x:.2}, {y:.2}, {z:.2})"));
                let [x, y, z] = info.relative_location;
                ui.label(format!("Relative location: ({x:.2}, {y:.2}, {z:.2})"));
                ui.label(format!("Attached: {}", info.attached));
            }

            ui.separator();
            ui.small("F1: Toggle Inspector | LMB: Look + WASD/Space/Ctrl | Shift: Fast");
        });
    edit
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::Space => Key::Space,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::Escape => Key::Escape,
        KeyCode::F1 => Key::F1,
        KeyCode::Tab => Key::Tab,
        _ => return None,
    })
}

fn map_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.world.close();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                let Some(gpu) = &mut self.gpu else {
                    return;
                };
                if let Err(e) =
                    self.world
                        .on_window_resized(&mut gpu.graphics, new_size.width, new_size.height)
                {
                    self.fail(event_loop, e.into());
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.handle_key(event_loop, code, state == ElementState::Pressed);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                let Some(button) = map_button(button) else {
                    return;
                };
                match state {
                    ElementState::Pressed => self.input.button_down(button),
                    ElementState::Released => self.input.button_up(button),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Focused(false) => {
                self.input.clear();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input
                .mouse_moved(Vec2::new(delta.0 as f32, delta.1 as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = cli.engine_config()?;
    tracing::info!(
        "cinder-desktop starting ({}x{}, assets in {})",
        config.window.width,
        config.window.height,
        config.asset_dir.display()
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_world_skips_queued_redraws() {
        let mut app = GpuApp::new(EngineConfig::default());
        assert!(wants_frame(&app.world));

        app.world.close();
        assert!(!wants_frame(&app.world));
        assert!(app.frame().is_ok());
        assert!(app.error.is_none());
    }
}
