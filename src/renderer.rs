//! wgpu side of the sketch: one fixed pipeline layout, a material per
//! shader/input combination, and the thumbnail overlay.
//!
//! Bind group layout shared by every material:
//!
//! - group 0: binding 0 sampler, bindings `1..=MAX_TEXTURE_UNITS` input textures
//! - group 1: binding 0 [`Globals`] uniform

use std::borrow::Cow;
use std::sync::Arc;

use image::RgbaImage;
use winit::window::Window;

use crate::cache::ShaderResource;
use crate::preprocess::{self, ShaderLanguage};
use crate::screenshot::{bgra_to_rgba, unpad_rows};
use crate::sketch::ThumbnailRect;
use crate::{SketchError, MAX_TEXTURE_UNITS};

const FULLSCREEN_SHADER: &str = include_str!("shaders/fullscreen.wgsl");
const THUMBNAIL_SHADER: &str = include_str!("shaders/thumbnail.wgsl");
const QUAD_VERTEX_COUNT: u32 = 6;

/// Per-frame values behind `@engine.*`. Layout matches `SketchGlobals` in the prelude.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Globals {
    pub time: f32,
    pub delta_time: f32,
    pub frame: u32,
    pub input_count: u32,
    pub resolution: [f32; 2],
    pub _padding: [f32; 2],
    /// xy = cursor, zw = left press position or -1
    pub mouse: [f32; 4],
}

/// An input texture on the GPU plus what the overlay needs to draw its thumbnail.
pub struct InputTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    rect_buffer: wgpu::Buffer,
    overlay_bind_group: wgpu::BindGroup,
}

/// Pipeline and input bindings for the current shader.
pub struct Material {
    pipeline: wgpu::RenderPipeline,
    inputs_bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    sampler: wgpu::Sampler,
    inputs_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    fullscreen_module: wgpu::ShaderModule,
    placeholder_view: wgpu::TextureView,
    overlay_layout: wgpu::BindGroupLayout,
    overlay_pipeline: wgpu::RenderPipeline,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, SketchError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| SketchError::Gpu(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| SketchError::Gpu("no compatible adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| SketchError::Gpu(e.to_string()))?;

        // Shader mistakes are expected while sketching; log instead of panicking.
        device.on_uncaptured_error(Box::new(|e: wgpu::Error| log::error!("[gpu] {}", e)));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&surface_caps.formats).ok_or_else(|| {
            SketchError::Gpu(format!("no 8-bit RGBA/BGRA surface format in {:?}", surface_caps.formats))
        })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Input Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // Group 0: sampler + one texture per unit
        let mut inputs_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        for i in 0..MAX_TEXTURE_UNITS {
            inputs_entries.push(texture_layout_entry((i + 1) as u32, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT));
        }
        let inputs_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Inputs Bind Group Layout"),
            entries: &inputs_entries,
        });

        // Group 1: globals
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[uniform_layout_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sketch Pipeline Layout"),
            bind_group_layouts: &[&inputs_layout, &globals_layout],
            push_constant_ranges: &[],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let fullscreen_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fullscreen Quad"),
            source: wgpu::ShaderSource::Wgsl(FULLSCREEN_SHADER.into()),
        });

        // Bound to every unit without an input
        let placeholder = upload_texture(&device, &queue, &RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255])), "Placeholder Texture");
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());

        let overlay_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Thumbnail Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_layout_entry(1, wgpu::ShaderStages::FRAGMENT),
                uniform_layout_entry(2, wgpu::ShaderStages::VERTEX),
            ],
        });
        let overlay_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Thumbnail Pipeline Layout"),
            bind_group_layouts: &[&overlay_layout],
            push_constant_ranges: &[],
        });
        let overlay_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Thumbnail Shader"),
            source: wgpu::ShaderSource::Wgsl(THUMBNAIL_SHADER.into()),
        });
        let overlay_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Thumbnail Pipeline"),
            layout: Some(&overlay_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &overlay_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &overlay_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!("[gpu] {} ({:?}), surface {:?}", adapter.get_info().name, adapter.get_info().backend, surface_format);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            size: winit::dpi::PhysicalSize::new(config.width, config.height),
            config,
            sampler,
            inputs_layout,
            pipeline_layout,
            globals_buffer,
            globals_bind_group,
            fullscreen_module,
            placeholder_view,
            overlay_layout,
            overlay_pipeline,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn update_globals(&self, globals: &Globals) {
        self.queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(globals));
    }

    /// Compiles `shader` and binds `units` (placeholder for `None`).
    pub fn build_material(
        &self,
        shader: &ShaderResource,
        units: &[Option<&InputTexture>; MAX_TEXTURE_UNITS],
    ) -> Result<Material, SketchError> {
        let module_ir = preprocess::validate(&shader.name, &shader.source, shader.language)?;
        let has_entry = |name: &str, stage: naga::ShaderStage| {
            module_ir.entry_points.iter().any(|e| e.name == name && e.stage == stage)
        };

        let (source, fragment_entry) = match shader.language {
            ShaderLanguage::Wgsl => (wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader.source.as_str())), "fs_main"),
            ShaderLanguage::Glsl => (
                wgpu::ShaderSource::Glsl {
                    shader: Cow::Borrowed(shader.source.as_str()),
                    stage: naga::ShaderStage::Fragment,
                    defines: Default::default(),
                },
                "main",
            ),
            ShaderLanguage::Hlsl => return Err(SketchError::UnsupportedLanguage(ShaderLanguage::Hlsl.extension().to_string())),
        };
        if !has_entry(fragment_entry, naga::ShaderStage::Fragment) {
            return Err(SketchError::ShaderCompile {
                name: shader.name.clone(),
                message: format!("no fragment entry point named `{}`", fragment_entry),
            });
        }
        let custom_vertex = has_entry("vs_main", naga::ShaderStage::Vertex);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.name.as_str()),
            source,
        });
        let vertex_module = if custom_vertex { &module } else { &self.fullscreen_module };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sketch Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        for (i, unit) in units.iter().enumerate() {
            let view = unit.map(|input| &input.view).unwrap_or(&self.placeholder_view);
            entries.push(wgpu::BindGroupEntry {
                binding: (i + 1) as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        let inputs_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Inputs Bind Group"),
            layout: &self.inputs_layout,
            entries: &entries,
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(SketchError::ShaderCompile {
                name: shader.name.clone(),
                message: error.to_string(),
            });
        }

        let bound = units.iter().filter(|u| u.is_some()).count();
        log::info!("[shader] built material for {} with {} input(s)", shader.name, bound);
        Ok(Material { pipeline, inputs_bind_group })
    }

    /// Fails without touching the device when the image does not fit a 2D texture.
    pub fn create_input_texture(&self, image: &RgbaImage, label: &str) -> Result<InputTexture, SketchError> {
        let (width, height) = image.dimensions();
        check_texture_size(width, height, self.device.limits().max_texture_dimension_2d)?;

        let texture = upload_texture(&self.device, &self.queue, image, label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let rect_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Thumbnail Rect"),
            size: std::mem::size_of::<[f32; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let overlay_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Thumbnail Bind Group"),
            layout: &self.overlay_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: rect_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(InputTexture {
            _texture: texture,
            view,
            rect_buffer,
            overlay_bind_group,
        })
    }

    pub fn place_thumbnail(&self, input: &InputTexture, rect: ThumbnailRect) {
        let bounds = thumbnail_bounds(rect, self.size.width, self.size.height);
        self.queue.write_buffer(&input.rect_buffer, 0, bytemuck::cast_slice(&bounds));
    }

    /// Draws the sketch (black without a material) and the thumbnails on top.
    pub fn render(&self, material: Option<&Material>, thumbnails: &[&InputTexture]) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = begin_clear_pass(&mut encoder, &view, "Render Pass");
            if let Some(material) = material {
                self.draw_sketch(&mut render_pass, material);
            }
            if !thumbnails.is_empty() {
                render_pass.set_pipeline(&self.overlay_pipeline);
                for thumbnail in thumbnails {
                    render_pass.set_bind_group(0, &thumbnail.overlay_bind_group, &[]);
                    render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Renders the sketch alone, without thumbnails, and reads it back as RGBA.
    pub fn capture(&self, material: Option<&Material>) -> Result<RgbaImage, SketchError> {
        let width = self.config.width;
        let height = self.config.height;

        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Screenshot Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let bytes_per_row = 4 * width;
        let padded_bytes_per_row = (bytes_per_row + 255) & !255; // Align to 256
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Screenshot Buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Screenshot Encoder"),
        });
        {
            let mut render_pass = begin_clear_pass(&mut encoder, &target_view, "Screenshot Pass");
            if let Some(material) = material {
                self.draw_sketch(&mut render_pass, material);
            }
        }
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = output_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match pollster::block_on(rx) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SketchError::Gpu(e.to_string())),
            Err(_) => return Err(SketchError::Gpu("screenshot readback was cancelled".to_string())),
        }

        let mut pixels = {
            let data = slice.get_mapped_range();
            unpad_rows(&data, width, height, padded_bytes_per_row)
        };
        output_buffer.unmap();

        if is_bgra(self.config.format) {
            bgra_to_rgba(&mut pixels);
        }

        RgbaImage::from_raw(width, height, pixels).ok_or_else(|| SketchError::Gpu("screenshot size mismatch".to_string()))
    }

    fn draw_sketch(&self, render_pass: &mut wgpu::RenderPass<'_>, material: &Material) {
        render_pass.set_pipeline(&material.pipeline);
        render_pass.set_bind_group(0, &material.inputs_bind_group, &[]);
        render_pass.set_bind_group(1, &self.globals_bind_group, &[]);
        render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
    }
}

/// First 8-bit RGBA/BGRA format in `formats`, preferring non-sRGB ones.
/// Screenshots read the surface format back as 4 bytes per pixel.
pub fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat::*;
    let eight_bit = |f: &&wgpu::TextureFormat| matches!(f, Rgba8Unorm | Bgra8Unorm | Rgba8UnormSrgb | Bgra8UnormSrgb);
    formats
        .iter()
        .filter(eight_bit)
        .find(|f| !f.is_srgb())
        .or_else(|| formats.iter().find(eight_bit))
        .copied()
}

fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(format, wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb)
}

/// Rejects images that cannot become a 2D texture of at most `max` texels per side.
pub fn check_texture_size(width: u32, height: u32, max: u32) -> Result<(), SketchError> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(SketchError::TextureSize { width, height, max });
    }
    Ok(())
}

/// Thumbnail square in clip space: `[left, top, right, bottom]`.
pub fn thumbnail_bounds(rect: ThumbnailRect, width: u32, height: u32) -> [f32; 4] {
    let to_x = |px: i32| px as f32 / width.max(1) as f32 * 2.0 - 1.0;
    let to_y = |px: i32| 1.0 - px as f32 / height.max(1) as f32 * 2.0;
    let size = rect.size as i32;
    [to_x(rect.x), to_y(rect.y), to_x(rect.x + size), to_y(rect.y + size)]
}

fn begin_clear_pass<'a>(encoder: &'a mut wgpu::CommandEncoder, view: &wgpu::TextureView, label: &str) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

fn texture_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage, label: &str) -> wgpu::Texture {
    let dimensions = image.dimensions();
    let texture_size = wgpu::Extent3d {
        width: dimensions.0,
        height: dimensions.1,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * dimensions.0),
            rows_per_image: Some(dimensions.1),
        },
        texture_size,
    );

    texture
}
