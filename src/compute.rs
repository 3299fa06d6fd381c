use bytemuck::{Pod, Zeroable};

use crate::config::SimConfig;
use crate::grid::PingPong;
use crate::rules::{NeighborShape, RuleTable};

pub const WORKGROUP_SIZE: u32 = 8;

/// Shader-side view of the simulation configuration and rule-table bounds.
/// Field order and padding must match `SimParams` in `update.wgsl` and
/// `display.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SimParams {
    pub width: u32,
    pub height: u32,
    pub n_states: u32,
    /// 0 = Moore, 1 = von Neumann.
    pub shape: u32,
    pub range: i32,
    pub min_sum: i32,
    pub table_len: u32,
    pub _pad: u32,
}

impl SimParams {
    /// Snapshot the current config and table bounds for upload. The table
    /// may be stale relative to the config after a rejected regeneration;
    /// the shader's index clamp covers the mismatch.
    pub fn new(width: u32, height: u32, config: &SimConfig, table: &RuleTable) -> Self {
        Self {
            width,
            height,
            n_states: config.n_states as u32,
            shape: match config.shape {
                NeighborShape::Moore => 0,
                NeighborShape::VonNeumann => 1,
            },
            range: config.range,
            min_sum: table.min_sum,
            table_len: table.len() as u32,
            _pad: 0,
        }
    }
}

/// Per-pass sampling geometry. Matches `PassParams` in `update.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PassParams {
    /// Fractional texture-space shift of the sampling origin.
    pub offset: [f32; 2],
    /// Scale factor on the sampling step.
    pub step: f32,
    pub _pad: f32,
}

pub fn create_compute_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let uniform = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Compute Bind Group Layout"),
        entries: &[
            uniform(0),        // SimParams
            uniform(1),        // PassParams
            storage(2, true),  // weights
            storage(3, true),  // rule table
            storage(4, true),  // grid in
            storage(5, false), // grid out
        ],
    })
}

/// One bind group per ping-pong direction for a single stacked pass:
/// direction 0 reads buffer 0 and writes buffer 1, direction 1 the reverse.
pub fn create_pass_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    grid: &PingPong,
    sim_param_buffer: &wgpu::Buffer,
    pass_param_buffer: &wgpu::Buffer,
    weight_buffer: &wgpu::Buffer,
    rule_buffer: &wgpu::Buffer,
) -> [wgpu::BindGroup; 2] {
    let pair = grid.pair();
    let make = |direction: usize| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Compute Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: sim_param_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: pass_param_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: weight_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: rule_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: pair[direction].as_entire_binding() },
                wgpu::BindGroupEntry { binding: 5, resource: pair[1 - direction].as_entire_binding() },
            ],
        })
    };
    [make(0), make(1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_structs_have_shader_compatible_sizes() {
        assert_eq!(std::mem::size_of::<SimParams>(), 32);
        assert_eq!(std::mem::size_of::<PassParams>(), 16);
    }

    #[test]
    fn update_shader_validates() {
        let module = naga::front::wgsl::parse_str(include_str!("update.wgsl"))
            .expect("update.wgsl should parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .expect("update.wgsl should validate");
    }
}
