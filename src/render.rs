use bytemuck::{Pod, Zeroable};

use crate::grid::PingPong;

/// Uniforms specific to the display pass. Matches `RenderParams` in
/// `display.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct RenderParams {
    /// Surface size in pixels; the fragment shader maps pixels onto grid
    /// cells with it.
    pub surface_size: [f32; 2],
    pub _pad: [f32; 2],
}

pub fn create_render_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let uniform = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let storage = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Render Bind Group Layout"),
        entries: &[
            uniform(0), // SimParams
            storage(1), // grid state
            storage(2), // color table
            uniform(3), // RenderParams
        ],
    })
}

/// One bind group per grid buffer; the frame driver selects the one for the
/// most recently written buffer each tick.
pub fn create_render_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    grid: &PingPong,
    sim_param_buffer: &wgpu::Buffer,
    color_buffer: &wgpu::Buffer,
    render_param_buffer: &wgpu::Buffer,
) -> [wgpu::BindGroup; 2] {
    let pair = grid.pair();
    let make = |index: usize| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: sim_param_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: pair[index].as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: color_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: render_param_buffer.as_entire_binding() },
            ],
        })
    };
    [make(0), make(1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_params_are_shader_sized() {
        assert_eq!(std::mem::size_of::<RenderParams>(), 16);
    }

    #[test]
    fn display_shader_validates() {
        let module = naga::front::wgsl::parse_str(include_str!("display.wgsl"))
            .expect("display.wgsl should parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .expect("display.wgsl should validate");
    }
}
