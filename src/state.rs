use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::thread_rng;
use winit::{dpi::PhysicalSize, window::Window};

use crate::compute::{
    create_compute_bind_group_layout, create_pass_bind_groups, PassParams, SimParams,
    WORKGROUP_SIZE,
};
use crate::config::{SimConfig, MAX_STATES, RULE_CAPACITY};
use crate::error::InitError;
use crate::grid::PingPong;
use crate::input::Command;
use crate::palette::{ColorTable, PALETTES};
use crate::render::{create_render_bind_group_layout, create_render_bind_groups, RenderParams};
use crate::rules::{generate_weights, RuleTable};

// GUI Imports
use egui::Context as EguiContext;
use egui_wgpu::Renderer as EguiWgpuRenderer;
use egui_winit::State as EguiWinitState;

const NOTICE_LIFETIME: Duration = Duration::from_secs(4);

/// A transient on-screen message for recoverable conditions.
pub struct Notice {
    pub message: String,
    shown_at: Instant,
}

impl Notice {
    pub fn new(message: String) -> Self {
        Self {
            message,
            shown_at: Instant::now(),
        }
    }

    pub fn expired(&self) -> bool {
        self.shown_at.elapsed() > NOTICE_LIFETIME
    }
}

pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub window: Arc<Window>,

    /// Simulation configuration, mutated only between ticks by `apply`.
    pub sim: SimConfig,
    weights: Vec<f32>,
    rule_table: RuleTable,
    color_table: ColorTable,

    grid: PingPong,

    sim_param_buffer: wgpu::Buffer,
    weight_buffer: wgpu::Buffer,
    rule_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    render_param_buffer: wgpu::Buffer,

    compute_bind_group_layout: wgpu::BindGroupLayout,
    compute_pipeline: wgpu::ComputePipeline,
    /// Direction-keyed bind groups per stacked pass.
    passes: Vec<[wgpu::BindGroup; 2]>,

    render_bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
    render_bind_groups: [wgpu::BindGroup; 2],

    pub paused: bool,
    pub help_open: bool,
    pub notice: Option<Notice>,

    // GUI state
    pub egui_ctx: EguiContext,
    pub egui_winit_state: EguiWinitState,
    pub egui_renderer: EguiWgpuRenderer,
}

impl State {
    pub async fn new(window: Arc<Window>) -> Result<Self, InitError> {
        let size = window.inner_size();

        log::info!("Initializing wgpu...");

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(InitError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps.formats[0];

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![surface_format],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Generate the initial tables.
        let mut rng = thread_rng();
        let sim = SimConfig::default();
        let weights = generate_weights(sim.strategy, sim.n_states, sim.max_weight, &mut rng);
        let rule_table =
            match RuleTable::generate(&weights, sim.n_states, sim.range, sim.inertia, &mut rng) {
                Ok(table) => table,
                Err(e) => {
                    // The default configuration always fits; ending up here
                    // means the constants changed underneath us. Start
                    // frozen rather than crash.
                    log::warn!("Initial rule table rejected: {}", e);
                    RuleTable {
                        entries: vec![0],
                        min_sum: 0,
                        neighbor_count: 0,
                    }
                }
            };
        let color_table = ColorTable::generate(&PALETTES[sim.palette], sim.n_states, &mut rng);

        // Grid store, seeded with fresh random state.
        let (grid_width, grid_height) = sim.grid_size(config.width, config.height);
        let grid = PingPong::new(&device, grid_width, grid_height);
        grid.seed(&queue, sim.n_states, &mut rng);

        // Table and parameter buffers are fixed-capacity so configuration
        // changes are plain uploads, never reallocations.
        let sim_param_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Simulation Parameters"),
            size: std::mem::size_of::<SimParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let weight_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Weight Table"),
            size: (MAX_STATES * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let rule_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rule Table"),
            size: (RULE_CAPACITY * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let color_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Color Table"),
            size: (MAX_STATES * std::mem::size_of::<[f32; 4]>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let render_param_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Render Parameters"),
            size: std::mem::size_of::<RenderParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Update pipeline: one fixed module; range, shape, and table bounds
        // arrive as uniform data, so no recompilation on config change.
        let update_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Update Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("update.wgsl").into()),
        });
        let compute_bind_group_layout = create_compute_bind_group_layout(&device);
        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_bind_group_layout],
                push_constant_ranges: &[],
            });
        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Update Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &update_module,
            entry_point: "main",
        });

        let passes = build_passes(
            &device,
            &compute_bind_group_layout,
            &grid,
            &sim,
            &sim_param_buffer,
            &weight_buffer,
            &rule_buffer,
        );

        // Display pipeline.
        let display_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("display.wgsl").into()),
        });
        let render_bind_group_layout = create_render_bind_group_layout(&device);
        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&render_bind_group_layout],
                push_constant_ranges: &[],
            });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &display_module,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &display_module,
                entry_point: "fs_main",
                targets: &[Some(config.format.into())],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });
        let render_bind_groups = create_render_bind_groups(
            &device,
            &render_bind_group_layout,
            &grid,
            &sim_param_buffer,
            &color_buffer,
            &render_param_buffer,
        );

        log::info!("Initializing egui...");
        let egui_ctx = EguiContext::default();
        let egui_winit_state =
            EguiWinitState::new(egui_ctx.clone(), egui_ctx.viewport_id(), &window, None, None);
        let egui_renderer = EguiWgpuRenderer::new(&device, config.format, None, 1);

        let state = Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            sim,
            weights,
            rule_table,
            color_table,
            grid,
            sim_param_buffer,
            weight_buffer,
            rule_buffer,
            color_buffer,
            render_param_buffer,
            compute_bind_group_layout,
            compute_pipeline,
            passes,
            render_bind_group_layout,
            render_pipeline,
            render_bind_groups,
            paused: false,
            help_open: true,
            notice: None,
            egui_ctx,
            egui_winit_state,
            egui_renderer,
        };

        state.upload_weights();
        state.upload_rules();
        state.upload_colors();
        state.upload_render_params();

        log::info!(
            "wgpu initialized; {}x{} grid, {} states",
            state.grid.width(),
            state.grid.height(),
            state.sim.n_states
        );
        Ok(state)
    }

    /// Execute a named command. `Quit` is handled by the event loop, not
    /// here. Table regeneration happens between ticks only; the next tick
    /// sees a fully swapped-in table.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::RangeUp => {
                self.sim.step_range(1);
                self.regenerate_rules();
            }
            Command::RangeDown => {
                self.sim.step_range(-1);
                self.regenerate_rules();
            }
            Command::ToggleShape => {
                self.sim.shape = self.sim.shape.toggled();
                self.regenerate_rules();
            }
            Command::NextStrategy => {
                self.sim.strategy = self.sim.strategy.cycled(1);
                self.regenerate_weights();
            }
            Command::PrevStrategy => {
                self.sim.strategy = self.sim.strategy.cycled(-1);
                self.regenerate_weights();
            }
            Command::NextPalette => {
                self.sim.palette = (self.sim.palette + 1) % PALETTES.len();
                self.regenerate_colors();
            }
            Command::PrevPalette => {
                self.sim.palette =
                    (self.sim.palette + PALETTES.len() - 1) % PALETTES.len();
                self.regenerate_colors();
            }
            Command::InertiaUp => {
                self.sim.step_inertia(1);
                self.regenerate_rules();
            }
            Command::InertiaDown => {
                self.sim.step_inertia(-1);
                self.regenerate_rules();
            }
            // Grid reallocation happens at the next tick boundary, where
            // the size check lives.
            Command::DensityUp => self.sim.step_resolution(1),
            Command::DensityDown => self.sim.step_resolution(-1),
            Command::Reseed => {
                self.grid.seed(&self.queue, self.sim.n_states, &mut thread_rng());
                log::info!("Grid reseeded");
            }
            Command::RegenerateRules => self.regenerate_rules(),
            Command::TogglePause => {
                self.paused = !self.paused;
                log::info!("{}", if self.paused { "Paused" } else { "Running" });
            }
            Command::ToggleHelp => self.help_open = !self.help_open,
            Command::Quit => {}
        }
    }

    /// New weights always invalidate the rule table.
    fn regenerate_weights(&mut self) {
        let mut rng = thread_rng();
        self.weights =
            generate_weights(self.sim.strategy, self.sim.n_states, self.sim.max_weight, &mut rng);
        self.upload_weights();
        log::info!("Weights regenerated ({})", self.sim.strategy.label());
        self.regenerate_rules();
    }

    /// Attempt a fresh rule table. On capacity overflow the previous table
    /// stays live (stale but functional) and a notice is surfaced.
    fn regenerate_rules(&mut self) {
        let mut rng = thread_rng();
        match RuleTable::generate(
            &self.weights,
            self.sim.n_states,
            self.sim.range,
            self.sim.inertia,
            &mut rng,
        ) {
            Ok(table) => {
                self.rule_table = table;
                self.upload_rules();
                log::info!(
                    "Rule table regenerated: {} entries, R={}, {}",
                    self.rule_table.len(),
                    self.sim.range,
                    self.sim.shape.label()
                );
            }
            Err(e) => {
                log::warn!("{}", e);
                self.notice = Some(Notice::new(e.to_string()));
            }
        }
    }

    fn regenerate_colors(&mut self) {
        let mut rng = thread_rng();
        self.color_table =
            ColorTable::generate(&PALETTES[self.sim.palette], self.sim.n_states, &mut rng);
        self.upload_colors();
        log::info!("Palette: {}", PALETTES[self.sim.palette].name);
    }

    fn sim_params(&self) -> SimParams {
        SimParams::new(self.grid.width(), self.grid.height(), &self.sim, &self.rule_table)
    }

    fn upload_weights(&self) {
        self.queue
            .write_buffer(&self.weight_buffer, 0, bytemuck::cast_slice(&self.weights));
    }

    fn upload_rules(&self) {
        self.queue.write_buffer(
            &self.rule_buffer,
            0,
            bytemuck::cast_slice(&self.rule_table.entries),
        );
        self.queue
            .write_buffer(&self.sim_param_buffer, 0, bytemuck::bytes_of(&self.sim_params()));
    }

    fn upload_colors(&self) {
        let padded: Vec<[f32; 4]> = self
            .color_table
            .colors
            .iter()
            .map(|c| [c[0], c[1], c[2], 1.0])
            .collect();
        self.queue
            .write_buffer(&self.color_buffer, 0, bytemuck::cast_slice(&padded));
    }

    fn upload_render_params(&self) {
        self.queue.write_buffer(
            &self.render_param_buffer,
            0,
            bytemuck::bytes_of(&RenderParams {
                surface_size: [self.config.width as f32, self.config.height as f32],
                _pad: [0.0; 2],
            }),
        );
    }

    /// Reconfigure the surface. Grid reallocation is deliberately deferred
    /// to the next tick, where size is checked exactly once.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.upload_render_params();
        } else {
            log::warn!(
                "Ignoring resize to zero dimensions: {}x{}",
                new_size.width,
                new_size.height
            );
        }
    }

    /// Tick-start size check: if the surface or resolution multiplier
    /// changed, reallocate both grid buffers with fresh random state and
    /// reset the ping-pong index.
    fn sync_grid(&mut self) {
        let (width, height) = self.sim.grid_size(self.config.width, self.config.height);
        if width == self.grid.width() && height == self.grid.height() {
            return;
        }

        let mut rng = thread_rng();
        self.grid = PingPong::new(&self.device, width, height);
        self.grid.seed(&self.queue, self.sim.n_states, &mut rng);

        self.passes = build_passes(
            &self.device,
            &self.compute_bind_group_layout,
            &self.grid,
            &self.sim,
            &self.sim_param_buffer,
            &self.weight_buffer,
            &self.rule_buffer,
        );
        self.render_bind_groups = create_render_bind_groups(
            &self.device,
            &self.render_bind_group_layout,
            &self.grid,
            &self.sim_param_buffer,
            &self.color_buffer,
            &self.render_param_buffer,
        );
        self.queue
            .write_buffer(&self.sim_param_buffer, 0, bytemuck::bytes_of(&self.sim_params()));

        log::info!("Grid reallocated to {}x{}", width, height);
    }

    /// One frame: resize sync, the stacked update passes (skipped while
    /// paused), then the display pass. Returns the surface texture so the
    /// overlay can draw on top before present.
    pub fn tick(&mut self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.sync_grid();

        if !self.paused {
            self.queue
                .write_buffer(&self.sim_param_buffer, 0, bytemuck::bytes_of(&self.sim_params()));

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Update Encoder"),
                });
            let dispatch_x = (self.grid.width() + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
            let dispatch_y = (self.grid.height() + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
            for i in 0..self.passes.len() {
                let direction = self.grid.index();
                {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("Update Pass"),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&self.compute_pipeline);
                    pass.set_bind_group(0, &self.passes[i][direction], &[]);
                    pass.dispatch_workgroups(dispatch_x, dispatch_y, 1);
                }
                self.grid.swap();
            }
            self.queue.submit(Some(encoder.finish()));
        }

        let output_frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost) => {
                log::warn!("Surface lost, recreating...");
                self.resize(self.size);
                return Err(wgpu::SurfaceError::Lost);
            }
            Err(e) => {
                log::error!("Failed to acquire next surface texture: {:?}", e);
                return Err(e);
            }
        };

        let output_view = output_frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Display Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Display Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.render_pipeline);
            // The active buffer is whatever the last pass wrote.
            render_pass.set_bind_group(0, &self.render_bind_groups[self.grid.index()], &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));

        Ok(output_frame)
    }
}

/// Per-pass uniforms and direction-keyed bind groups for every configured
/// stacked pass.
fn build_passes(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    grid: &PingPong,
    sim: &SimConfig,
    sim_param_buffer: &wgpu::Buffer,
    weight_buffer: &wgpu::Buffer,
    rule_buffer: &wgpu::Buffer,
) -> Vec<[wgpu::BindGroup; 2]> {
    use wgpu::util::DeviceExt;

    sim.passes
        .iter()
        .map(|desc| {
            // The bind group keeps the uniform buffer alive; pass geometry
            // is fixed per descriptor, so it is never rewritten.
            let param_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Pass Parameters"),
                contents: bytemuck::bytes_of(&PassParams {
                    offset: desc.offset,
                    step: desc.step,
                    _pad: 0.0,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            create_pass_bind_groups(
                device,
                layout,
                grid,
                sim_param_buffer,
                &param_buffer,
                weight_buffer,
                rule_buffer,
            )
        })
        .collect()
}
