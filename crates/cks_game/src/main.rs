//! Checkers Scrutator -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. Every
//! `RedrawRequested` runs one variable-length frame:
//!
//!   1. `begin_frame()` -- measure wall-clock delta (capped, see `TimeState`)
//!   2. Discrete actions: quit, overlay, board reload, piece selection and moves
//!   3. Integrate held camera movement and look
//!   4. `evaluate()` the scene graph by the frame's elapsed time (zero while paused)
//!   5. Stream one model matrix per drawable node, draw with depth, composite egui
//!
//! Hot reload: the board file named in the game config is watched via mtime
//! polling and the whole scene is rebuilt from it between frames.

mod board;
mod builder;
mod config;
mod controls;
mod meshes;
mod pieces;
#[cfg(test)]
mod replay;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use board::{load_board_from_path, Board, BoardWatcher};
use builder::{build_scene, BuiltScene};
use cks_core::input::{Action, InputState};
use cks_core::time::TimeState;
use cks_core::{draw_list, evaluate};
use cks_devtools::{DebugOverlay, OverlayStats};
use cks_platform::window::PlatformConfig;
use cks_render::{FlyCamera, GpuContext, InstanceBuffer, InstanceRaw, MeshPipeline, MeshStore};
use config::{load_config_or_default, GameConfig};
use meshes::GpuMeshProvider;
use pieces::{MoveOutcome, PieceController};

const CONFIG_PATH: &str = "assets/config/game.json";

const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.15,
    a: 1.0,
};

/// All mutable engine state lives here. Constructed lazily in
/// `ApplicationHandler::resumed` once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: FlyCamera,
    mesh_pipeline: MeshPipeline,
    debug_overlay: DebugOverlay,
    config: GameConfig,

    // --- Board and scene ---------------------------------------------------------
    board_path: Option<PathBuf>,
    board_watcher: Option<BoardWatcher>,
    board_label: String,
    scene: BuiltScene,
    pieces: PieceController,
    /// Accumulated evaluated time; drives self-rotation and stops while paused.
    scene_time: f32,
    paused: bool,
    /// Set by the overlay; handled at the start of the next frame.
    reload_requested: bool,

    // --- GPU resources -----------------------------------------------------------
    mesh_store: MeshStore,
    instance_buffer: InstanceBuffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

impl EngineState {
    fn new(window: Arc<Window>, config: GameConfig) -> Self {
        let gpu = GpuContext::new(window.clone());
        let mesh_pipeline = MeshPipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let board_path = config.board_path.as_ref().map(PathBuf::from);
        let board_watcher = board_path.clone().map(BoardWatcher::new);
        let board = load_initial_board(board_path.as_deref());

        let mut mesh_store = MeshStore::new();
        let scene = {
            let mut provider = GpuMeshProvider::new(&gpu.device, &mut mesh_store);
            build_scene(&board, &mut provider, &config.pieces)
        };
        let pieces = PieceController::new(scene.pieces.clone(), scene.layout, config.pieces);

        let mut camera = FlyCamera::new(gpu.size.0, gpu.size.1);
        controls::reset_camera(&mut camera, &config.camera);

        let camera_uniform = camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = mesh_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let instance_buffer = InstanceBuffer::new(&gpu.device);

        log_board(&board);

        let mut time = TimeState::new();
        // Setup above may take a while; start the first frame near zero.
        time.reset();

        Self {
            window,
            gpu,
            time,
            input: InputState::new(),
            camera,
            mesh_pipeline,
            debug_overlay,
            config,
            board_path,
            board_watcher,
            board_label: board_label(&board),
            scene,
            pieces,
            scene_time: 0.0,
            paused: false,
            reload_requested: false,
            mesh_store,
            instance_buffer,
            camera_buffer,
            camera_bind_group,
        }
    }

    /// Replace the scene with one built from `board`. Meshes are regenerated.
    fn rebuild_scene(&mut self, board: &Board) {
        self.mesh_store.clear();
        let scene = {
            let mut provider = GpuMeshProvider::new(&self.gpu.device, &mut self.mesh_store);
            build_scene(board, &mut provider, &self.config.pieces)
        };
        self.pieces = PieceController::new(scene.pieces.clone(), scene.layout, self.config.pieces);
        self.scene = scene;
        self.board_label = board_label(board);
    }

    fn reload_board(&mut self, reason: &str) {
        let Some(path) = self.board_path.clone() else {
            log::info!("Board reload ({reason}): no board file configured, using the sample board");
            self.rebuild_scene(&Board::sample());
            return;
        };
        match load_board_from_path(&path) {
            Ok(board) => {
                self.rebuild_scene(&board);
                log::info!(
                    "Board reloaded ({reason}): {} ({} pieces)",
                    board.board_id,
                    board.piece_count()
                );
                log_board(&board);
            }
            Err(err) => {
                log::error!("Board reload failed ({reason}): {err}");
            }
        }
    }

    fn handle_piece_input(&mut self) {
        if self.input.is_just_pressed(Action::NextPiece) {
            self.pieces.select_next(&mut self.scene.graph);
        }
        for &action in Action::PIECE_MOVES {
            if !self.input.is_just_pressed(action) {
                continue;
            }
            let Some((d_col, d_row)) = action.piece_delta() else {
                continue;
            };
            match self.pieces.attempt_move(&mut self.scene.graph, d_col, d_row) {
                MoveOutcome::Moved { from, to } => {
                    log::debug!(
                        "Piece #{} moved {} -> {}",
                        self.pieces.selected_index(),
                        from,
                        to
                    );
                }
                rejected => {
                    log::debug!("Move {:?} rejected: {:?}", action, rejected);
                }
            }
        }
    }

    fn overlay_stats(&self, draw_calls: u32) -> OverlayStats {
        let graph = &self.scene.graph;
        let selected = self.pieces.selected().and_then(|id| {
            graph
                .node(id)
                .piece
                .map(|p| (self.pieces.selected_index(), p.cell.to_string()))
        });
        OverlayStats {
            draw_calls,
            mesh_count: self.mesh_store.len() as u32,
            node_count: graph.len() as u32,
            piece_count: self.pieces.piece_count() as u32,
            selected,
            animating_pieces: self.pieces.animating_count(graph) as u32,
            memory_estimate_mb: self.mesh_store.estimate_memory_mb(),
            board_label: self.board_label.clone(),
            paused: self.paused,
        }
    }
}

fn load_initial_board(path: Option<&Path>) -> Board {
    let Some(path) = path else {
        log::info!("No board file configured, using the sample board.");
        return Board::sample();
    };
    match load_board_from_path(path) {
        Ok(board) => {
            log::info!("Board loaded: {} ({})", board.board_id, path.display());
            board
        }
        Err(err) => {
            log::error!("Failed to load initial board, using the sample board: {err}");
            Board::sample()
        }
    }
}

fn board_label(board: &Board) -> String {
    let layout = board.layout();
    format!("{} ({}x{})", board.board_id, layout.width, layout.height)
}

fn log_board(board: &Board) {
    log::info!(
        "Board '{}' with {} pieces:\n{}",
        board.board_id,
        board.piece_count(),
        board
    );
}

struct App {
    state: Option<EngineState>,
    config: PlatformConfig,
    game_config: GameConfig,
}

impl App {
    fn new(game_config: GameConfig) -> Self {
        Self {
            state: None,
            config: PlatformConfig::default(),
            game_config,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = cks_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(EngineState::new(window, self.game_config.clone()));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            log::info!(
                "Exiting after {} frames, average {:.1} fps",
                state.time.frame_count,
                state.time.average_fps()
            );
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                state.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(action) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.press(action),
                            ElementState::Released => state.input.release(action),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();

                if state.input.is_just_pressed(Action::Quit) {
                    event_loop.exit();
                    return;
                }
                if state.input.is_just_pressed(Action::ToggleOverlay) {
                    state.debug_overlay.toggle();
                }
                if state.input.is_just_pressed(Action::ReloadBoard) {
                    state.reload_board("manual trigger (R)");
                } else if state.reload_requested {
                    state.reload_requested = false;
                    state.reload_board("overlay button");
                } else if state
                    .board_watcher
                    .as_mut()
                    .is_some_and(|w| w.should_reload())
                {
                    state.reload_board("file watcher");
                }

                state.handle_piece_input();

                let frame_dt = state.time.dt();
                controls::update_camera(
                    &mut state.camera,
                    &state.input,
                    &state.config.camera,
                    frame_dt,
                );

                let scene_dt = if state.paused { 0.0 } else { frame_dt };
                state.scene_time += scene_dt;
                evaluate(
                    &mut state.scene.graph,
                    state.scene.root,
                    state.scene.layout,
                    state.config.tuning(),
                    scene_dt,
                );

                let draw_items = draw_list(&state.scene.graph, state.scene.root, state.scene_time);
                let instances: Vec<InstanceRaw> = draw_items
                    .iter()
                    .map(|item| InstanceRaw::from_model(item.model_matrix()))
                    .collect();
                state
                    .instance_buffer
                    .write(&state.gpu.device, &state.gpu.queue, &instances);

                let camera_uniform = state.camera.build_uniform();
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[camera_uniform]),
                );

                let Some((output, view)) = state.gpu.begin_frame() else {
                    state.input.end_frame();
                    return;
                };

                let stats = state.overlay_stats(draw_items.len() as u32);
                let (egui_primitives, egui_textures_delta, overlay_actions) =
                    state
                        .debug_overlay
                        .prepare(&state.window, &state.time, &stats);

                if overlay_actions.toggle_pause {
                    state.paused = !state.paused;
                    log::info!(
                        "Simulation {}",
                        if state.paused { "PAUSED" } else { "RESUMED" }
                    );
                }
                if overlay_actions.reload_board {
                    state.reload_requested = true;
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                {
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Scene Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(CLEAR_COLOUR),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &state.gpu.depth_view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        ..Default::default()
                    });

                    render_pass.set_pipeline(&state.mesh_pipeline.render_pipeline);
                    render_pass.set_bind_group(0, &state.camera_bind_group, &[]);
                    render_pass.set_vertex_buffer(1, state.instance_buffer.buffer.slice(..));

                    for (i, item) in draw_items.iter().enumerate() {
                        let Some(mesh) = state.mesh_store.get(item.mesh.id) else {
                            continue;
                        };
                        let instance = i as u32;
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass
                            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(
                            0..item.mesh.index_count,
                            0,
                            instance..instance + 1,
                        );
                    }
                }

                state.debug_overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
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

                    state
                        .debug_overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.debug_overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                state.input.end_frame();
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Action> {
    match key_code {
        KeyCode::KeyW => Some(Action::MoveForward),
        KeyCode::KeyS => Some(Action::MoveBack),
        KeyCode::KeyA => Some(Action::MoveLeft),
        KeyCode::KeyD => Some(Action::MoveRight),
        KeyCode::ShiftLeft => Some(Action::MoveUp),
        KeyCode::Space => Some(Action::MoveDown),
        KeyCode::ArrowUp => Some(Action::LookUp),
        KeyCode::ArrowDown => Some(Action::LookDown),
        KeyCode::ArrowLeft => Some(Action::LookLeft),
        KeyCode::ArrowRight => Some(Action::LookRight),
        KeyCode::ControlLeft => Some(Action::SpeedModifier),
        KeyCode::Tab => Some(Action::NextPiece),
        KeyCode::KeyI => Some(Action::PieceUp),
        KeyCode::KeyK => Some(Action::PieceDown),
        KeyCode::KeyJ => Some(Action::PieceLeft),
        KeyCode::KeyL => Some(Action::PieceRight),
        KeyCode::Escape => Some(Action::Quit),
        KeyCode::F3 => Some(Action::ToggleOverlay),
        KeyCode::KeyR => Some(Action::ReloadBoard),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Checkers Scrutator starting...");

    let game_config = load_config_or_default(Path::new(CONFIG_PATH)).unwrap_or_else(|err| {
        log::error!("{err}. Using default game config.");
        GameConfig::default()
    });

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(game_config);
    event_loop.run_app(&mut app).expect("Event loop error");
}
