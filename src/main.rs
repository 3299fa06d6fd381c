// Declare modules directly in the binary crate root
pub mod compute;
pub mod config;
pub mod error;
pub mod grid;
pub mod input;
pub mod palette;
pub mod render;
pub mod rules;
pub mod state;

use crate::error::InitError;
use crate::input::Command;
use crate::palette::PALETTES;
use crate::state::State;

use std::sync::Arc;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::Window,
};

async fn run(event_loop: EventLoop<()>, window: Arc<Window>) -> Result<(), InitError> {
    let mut state = State::new(window).await?;

    event_loop.run(move |event, window_target| {
        window_target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, ref event } if window_id == state.window.id() => {
                // The overlay sees window events first.
                let response = state.egui_winit_state.on_window_event(&state.window, event);
                if response.repaint {
                    state.window.request_redraw();
                }
                // Resizes must reach the simulation even when egui claims
                // them.
                let consumed_by_egui =
                    response.consumed && !matches!(event, WindowEvent::Resized(_));
                if consumed_by_egui {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(*new_size);
                    }
                    WindowEvent::KeyboardInput { event: key_event, .. } => {
                        if let Some(command) = input::command_for_event(key_event) {
                            if command == Command::Quit {
                                window_target.exit();
                            } else {
                                state.apply(command);
                            }
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let output_frame = match state.tick() {
                            Ok(frame) => frame,
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory) => {
                                // Lost: resize() was called inside tick().
                                log::warn!("Skipping frame due to surface error.");
                                state.window.request_redraw();
                                return;
                            }
                            Err(e) => {
                                log::warn!("Skipping frame due to surface {:?}", e);
                                state.window.request_redraw();
                                return;
                            }
                        };

                        draw_overlay(&mut state, &output_frame);
                        output_frame.present();
                    }
                    _ => (),
                }
            }
            Event::AboutToWait => {
                state.window.request_redraw();
            }
            _ => (),
        }
    })?;
    Ok(())
}

/// Build and render the egui overlay (help panel, status readout, transient
/// notices) on top of the freshly drawn simulation frame.
fn draw_overlay(state: &mut State, output_frame: &wgpu::SurfaceTexture) {
    // Expired notices disappear on their own.
    if state.notice.as_ref().map_or(false, |n| n.expired()) {
        state.notice = None;
    }

    let output_view = output_frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let raw_input = state.egui_winit_state.take_egui_input(&state.window);
    state.egui_ctx.begin_frame(raw_input);

    if let Some(notice) = &state.notice {
        egui::Area::new(egui::Id::new("notice_area"))
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 16.0))
            .show(&state.egui_ctx, |ui| {
                egui::Frame::popup(&state.egui_ctx.style())
                    .fill(egui::Color32::from_rgba_unmultiplied(70, 45, 10, 230))
                    .show(ui, |ui| {
                        ui.colored_label(
                            egui::Color32::from_rgb(255, 200, 90),
                            &notice.message,
                        );
                    });
            });
    }

    if state.help_open {
        let panel_frame = egui::Frame {
            fill: egui::Color32::from_rgba_unmultiplied(25, 25, 25, 200),
            ..egui::Frame::window(&state.egui_ctx.style())
        };
        egui::Window::new("multilife")
            .frame(panel_frame)
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
            .resizable(false)
            .collapsible(false)
            .show(&state.egui_ctx, |ui| {
                ui.label(format!(
                    "states: {}   range: {} ({})",
                    state.sim.n_states,
                    state.sim.range,
                    state.sim.shape.label()
                ));
                ui.label(format!(
                    "weights: {}   inertia: {:.2}",
                    state.sim.strategy.label(),
                    state.sim.inertia
                ));
                ui.label(format!(
                    "palette: {}   density: {:.3}",
                    PALETTES[state.sim.palette].name,
                    state.sim.resolution_scale
                ));
                if state.paused {
                    ui.label("paused");
                }
                ui.separator();
                egui::Grid::new("bindings").striped(true).show(ui, |ui| {
                    for (key, action) in input::BINDINGS {
                        ui.label(*key);
                        ui.label(*action);
                        ui.end_row();
                    }
                });
            });
    }

    // End egui frame and paint it over the simulation.
    let full_output = state.egui_ctx.end_frame();
    let paint_jobs = state
        .egui_ctx
        .tessellate(full_output.shapes, state.window.scale_factor() as f32);
    let screen_descriptor = egui_wgpu::ScreenDescriptor {
        size_in_pixels: [state.config.width, state.config.height],
        pixels_per_point: state.window.scale_factor() as f32,
    };

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui Encoder"),
        });
    for (id, image_delta) in &full_output.textures_delta.set {
        state
            .egui_renderer
            .update_texture(&state.device, &state.queue, *id, image_delta);
    }
    state.egui_renderer.update_buffers(
        &state.device,
        &state.queue,
        &mut encoder,
        &paint_jobs,
        &screen_descriptor,
    );
    state
        .egui_winit_state
        .handle_platform_output(&state.window, full_output.platform_output);

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("egui Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        state
            .egui_renderer
            .render(&mut render_pass, &paint_jobs, &screen_descriptor);
    }

    for id in &full_output.textures_delta.free {
        state.egui_renderer.free_texture(id);
    }

    state.queue.submit(Some(encoder.finish()));
}

fn start() -> Result<(), InitError> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        winit::window::WindowBuilder::new()
            .with_title("multilife")
            .with_inner_size(winit::dpi::LogicalSize::new(960.0, 640.0))
            .build(&event_loop)?,
    );
    pollster::block_on(run(event_loop, window))
}

fn main() {
    env_logger::init();
    if let Err(e) = start() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
