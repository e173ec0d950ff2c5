//! wgpu Renderer module
//!
//! Executes a [`FramePlan`]: one render pass over the swapchain image with a
//! viewport per eye view, then the egui overlay on top. Scene meshes and the
//! caption texture are uploaded once; the video texture is refreshed whenever
//! the decoder published a newer frame.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use egui_wgpu::wgpu;
use log::{info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, Device, DeviceDescriptor, Instance, InstanceDescriptor, Queue, RenderPipeline,
    Surface, SurfaceConfiguration, SurfaceTargetUnsafe, TextureUsages,
};
use winit::window::Window;

use crate::config::hex_to_rgb;
use crate::context::FramePlan;
use crate::error::RendererError;
use crate::geometry::Vertex;
use crate::scene::{Scene, TextureBinding};
use crate::video::{VideoFeed, VideoFrame};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// One uniform set per eye view
const VIEW_SLOTS: usize = 2;

#[cfg(target_os = "android")]
const BACKENDS: wgpu::Backends = wgpu::Backends::VULKAN;
#[cfg(not(target_os = "android"))]
const BACKENDS: wgpu::Backends = wgpu::Backends::PRIMARY;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DrawUniforms {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
    /// Texture row mapping: scale, offset, unused, unused
    rows: [f32; 4],
}

/// sRGB transfer function inverse, for colours written to an sRGB target
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn output_rgb(hex: u32, srgb_target: bool) -> [f32; 3] {
    let rgb = hex_to_rgb(hex);
    if srgb_target {
        rgb.map(srgb_to_linear)
    } else {
        rgb
    }
}

struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    /// Per view slot
    uniforms: Vec<(Buffer, BindGroup)>,
}

struct SampledTexture {
    texture: wgpu::Texture,
    bind_group: BindGroup,
}

pub struct Renderer {
    #[allow(dead_code)]
    window: Arc<Window>,
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    srgb_target: bool,

    opaque_pipeline: RenderPipeline,
    transparent_pipeline: RenderPipeline,
    depth_view: wgpu::TextureView,

    meshes: Vec<Mesh>,

    texture_layout: BindGroupLayout,
    sampler: wgpu::Sampler,
    texture_format: wgpu::TextureFormat,
    white: SampledTexture,
    caption: SampledTexture,
    video: SampledTexture,
    video_version: u64,

    // UI Renderer
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self, RendererError> {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: BACKENDS,
            ..Default::default()
        });

        let surface = unsafe {
            let target = SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: window.display_handle()?.as_raw(),
                raw_window_handle: window.window_handle()?.as_raw(),
            };
            instance.create_surface_unsafe(target)?
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;
        info!("GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter.request_device(&DeviceDescriptor::default(), None).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RendererError::NoSurfaceFormat)?;
        let srgb_target = surface_format.is_srgb();
        let texture_format = if srgb_target {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let opaque_pipeline = create_pipeline(&device, &pipeline_layout, &shader, surface_format, false);
        let transparent_pipeline = create_pipeline(&device, &pipeline_layout, &shader, surface_format, true);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let meshes: Vec<Mesh> = scene
            .surfaces()
            .iter()
            .map(|surface| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Plane Vertices"),
                    contents: bytemuck::cast_slice(&surface.geometry.vertices()),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Plane Indices"),
                    contents: bytemuck::cast_slice(surface.geometry.indices()),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let uniforms = (0..VIEW_SLOTS)
                    .map(|_| {
                        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                            label: Some("Draw Uniforms"),
                            size: std::mem::size_of::<DrawUniforms>() as u64,
                            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                            mapped_at_creation: false,
                        });
                        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("Draw Bind Group"),
                            layout: &uniform_layout,
                            entries: &[wgpu::BindGroupEntry {
                                binding: 0,
                                resource: buffer.as_entire_binding(),
                            }],
                        });
                        (buffer, bind_group)
                    })
                    .collect();
                Mesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: surface.geometry.indices().len() as u32,
                    uniforms,
                }
            })
            .collect();

        let make_texture = |label: &str, width: u32, height: u32, pixels: &[u8]| {
            create_sampled_texture(&device, &queue, &texture_layout, &sampler, texture_format, label, width, height, pixels)
        };
        let white = make_texture("White Texture", 1, 1, &[255, 255, 255, 255]);
        // Black until the first decoded frame arrives
        let video = make_texture("Placeholder Video Texture", 1, 1, &[0, 0, 0, 255]);
        let raster = scene.caption_raster();
        let caption = make_texture("Caption Texture", raster.width, raster.height, &raster.pixels);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        info!(
            "Renderer initialized: {}x{} {:?}, {} meshes",
            config.width,
            config.height,
            surface_format,
            meshes.len()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            srgb_target,
            opaque_pipeline,
            transparent_pipeline,
            depth_view,
            meshes,
            texture_layout,
            sampler,
            texture_format,
            white,
            caption,
            video,
            video_version: 0,
            egui_renderer,
        })
    }

    /// Zero-sized surfaces cannot be configured; those resizes are skipped
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            info!("Ignoring zero-sized resize {}x{}", width, height);
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Upload the decoder's latest frame if it is newer than the last one
    pub fn update_video(&mut self, feed: &VideoFeed) {
        let mut latest = None;
        let version = feed.read_if_newer(self.video_version, |frame| latest = Some(self.upload_video(frame)));
        if let Some(version) = version {
            self.video_version = version;
        }
        if let Some(false) = latest {
            warn!("Dropped malformed video frame");
        }
    }

    fn upload_video(&mut self, frame: &VideoFrame) -> bool {
        let (width, height) = (frame.width, frame.height);
        if width == 0 || height == 0 || frame.pixels.len() < (width * height * 4) as usize {
            return false;
        }

        let size = self.video.texture.size();
        if size.width != width || size.height != height {
            info!("Video texture resized to {}x{}", width, height);
            self.video = create_sampled_texture(
                &self.device,
                &self.queue,
                &self.texture_layout,
                &self.sampler,
                self.texture_format,
                "Video Texture",
                width,
                height,
                &frame.pixels,
            );
        } else {
            write_texture(&self.queue, &self.video.texture, width, height, &frame.pixels);
        }
        true
    }

    fn texture_bind_group(&self, binding: TextureBinding) -> &BindGroup {
        match binding {
            TextureBinding::None => &self.white.bind_group,
            TextureBinding::Video => &self.video.bind_group,
            TextureBinding::Caption => &self.caption.bind_group,
        }
    }

    pub fn render(&mut self, plan: &FramePlan, scene: &Scene, ui_data: Option<(&egui::Context, egui::FullOutput)>) {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                warn!("Surface texture unavailable ({:?}), reconfiguring", e);
                self.surface.configure(&self.device, &self.config);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // Per-view uniforms first; each view slot has its own buffers
        for (slot, eye_view) in plan.views.iter().take(VIEW_SLOTS).enumerate() {
            for &index in &eye_view.draws {
                let (Some(surface), Some(mesh)) = (scene.surfaces().get(index), self.meshes.get(index)) else {
                    continue;
                };
                let [r, g, b] = output_rgb(surface.material.color, self.srgb_target);
                let rows = surface.row_mapping();
                let uniforms = DrawUniforms {
                    mvp: (eye_view.view_projection * surface.transform.matrix()).to_cols_array_2d(),
                    color: [r, g, b, 1.0],
                    rows: [rows.scale, rows.offset, 0.0, 0.0],
                };
                self.queue.write_buffer(&mesh.uniforms[slot].0, 0, bytemuck::bytes_of(&uniforms));
            }
        }

        {
            let [r, g, b] = output_rgb(scene.background, self.srgb_target);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (slot, eye_view) in plan.views.iter().take(VIEW_SLOTS).enumerate() {
                let vp = eye_view.viewport;
                if vp.is_empty() || vp.x + vp.width > self.config.width || vp.y + vp.height > self.config.height {
                    continue;
                }
                render_pass.set_viewport(vp.x as f32, vp.y as f32, vp.width as f32, vp.height as f32, 0.0, 1.0);

                for &index in &eye_view.draws {
                    let (Some(surface), Some(mesh)) = (scene.surfaces().get(index), self.meshes.get(index)) else {
                        continue;
                    };
                    let pipeline = if surface.material.transparent {
                        &self.transparent_pipeline
                    } else {
                        &self.opaque_pipeline
                    };
                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(0, &mesh.uniforms[slot].1, &[]);
                    render_pass.set_bind_group(1, self.texture_bind_group(surface.material.map), &[]);
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        let mut ui_commands = Vec::new();
        if let Some((ctx, full_output)) = ui_data {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: full_output.pixels_per_point,
            };

            let paint_jobs = ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

            for (id, delta) in &full_output.textures_delta.set {
                self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
            }

            ui_commands =
                self.egui_renderer
                    .update_buffers(&self.device, &self.queue, &mut encoder, &paint_jobs, &screen_descriptor);

            {
                let mut render_pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("UI Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    })
                    .forget_lifetime();
                self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
            }

            for id in &full_output.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        self.queue.submit(ui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
    }
}

fn create_pipeline(
    device: &Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    transparent: bool,
) -> RenderPipeline {
    let (label, blend) = if transparent {
        ("Transparent Pipeline", wgpu::BlendState::ALPHA_BLENDING)
    } else {
        ("Opaque Pipeline", wgpu::BlendState::REPLACE)
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        // Every material in the scene is double sided
        primitive: wgpu::PrimitiveState {
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !transparent,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_depth_view(device: &Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[allow(clippy::too_many_arguments)]
fn create_sampled_texture(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    sampler: &wgpu::Sampler,
    format: wgpu::TextureFormat,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> SampledTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_texture(queue, &texture, width, height, pixels);

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    SampledTexture { texture, bind_group }
}

fn write_texture(queue: &Queue, texture: &wgpu::Texture, width: u32, height: u32, pixels: &[u8]) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_linearization_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        // 0x40 grey background
        assert!((srgb_to_linear(64.0 / 255.0) - 0.0513).abs() < 1e-3);
    }

    #[test]
    fn output_colour_only_linearized_for_srgb_targets() {
        assert_eq!(output_rgb(0x808080, false), hex_to_rgb(0x808080));
        let linear = output_rgb(0x808080, true);
        assert!(linear[0] > 0.2 && linear[0] < 0.25);
    }

    #[test]
    fn draw_uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<DrawUniforms>() % 16, 0);
    }
}
