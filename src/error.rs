//! Error types for setup and table generation.

use std::fmt;

/// Errors that can occur while bringing up the window and GPU.
#[derive(Debug)]
pub enum InitError {
    /// Failed to create the event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create the window.
    Window(winit::error::OsError),
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create the GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            InitError::Window(e) => write!(f, "Failed to create window: {}", e),
            InitError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            InitError::NoAdapter => write!(
                f,
                "No compatible GPU adapter found. Ensure your system supports Vulkan/Metal/DX12."
            ),
            InitError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::EventLoop(e) => Some(e),
            InitError::Window(e) => Some(e),
            InitError::SurfaceCreation(e) => Some(e),
            InitError::DeviceCreation(e) => Some(e),
            InitError::NoAdapter => None,
        }
    }
}

impl From<winit::error::EventLoopError> for InitError {
    fn from(e: winit::error::EventLoopError) -> Self {
        InitError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for InitError {
    fn from(e: winit::error::OsError) -> Self {
        InitError::Window(e)
    }
}

impl From<wgpu::CreateSurfaceError> for InitError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        InitError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for InitError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        InitError::DeviceCreation(e)
    }
}

/// Recoverable failures during rule-table generation.
///
/// These never terminate the simulation; the frame driver keeps the previous
/// table and surfaces the message as a transient on-screen notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The computed table length exceeds the fixed capacity.
    Capacity { required: usize, capacity: usize },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::Capacity { required, capacity } => write!(
                f,
                "Rule table needs {} entries but capacity is {}; keeping previous table",
                required, capacity
            ),
        }
    }
}

impl std::error::Error for RuleError {}
