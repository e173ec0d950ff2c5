//! Error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] egui_wgpu::wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] egui_wgpu::wgpu::RequestDeviceError),
}

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to open video: {0}")]
    Open(#[from] std::io::Error),
    #[error("decoder error: {0}")]
    Codec(String),
    #[error("no decoder available on this platform")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
}
