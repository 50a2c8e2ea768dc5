use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use bytemuck::{bytes_of, Pod};
use glam::{Vec3, Vec4};
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::mesh::{marker_cube, vertex_layout, MeshBuffers};
use super::shader::{self, MARKER_SHADER, MODEL_SHADER};
use super::texture::{create_sampler, DepthBuffer, Texture};
use super::uniforms::{FrameUniform, LightsUniform, MaterialUniform, ObjectUniform};
use crate::app::FrameParams;
use crate::error::StartupError;
use crate::material::Material;
use crate::model::Model;
use crate::scene::ShaderPaths;

const MARKER_COLOR: Vec4 = Vec4::ONE;

/// A GPU mesh paired with the bind group of its material.
struct DrawMesh {
    buffers: MeshBuffers,
    material: wgpu::BindGroup,
}

/// Uniform buffer bound on its own group, rewritten every frame.
struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new<T: Pod>(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str, initial: &T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes_of(initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

/// GPU renderer that draws the loaded model and the light marker.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    model_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    model_object: UniformSlot,
    marker_object: UniformSlot,
    meshes: Vec<DrawMesh>,
    marker_mesh: MeshBuffers,
}

impl Renderer {
    /// Initializes the GPU renderer for `window` and uploads `model`.
    pub async fn new(window: Arc<Window>, model: &Model, shaders: &ShaderPaths) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(StartupError::graphics("surface", "window has zero area").into());
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|err| StartupError::graphics("surface", err))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| StartupError::graphics("adapter", err))?;
        info!("using adapter {}", adapter.get_info().name);

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("renderer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .map_err(|err| StartupError::graphics("device", err))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let fallback_format = surface_caps
            .formats
            .first()
            .copied()
            .ok_or_else(|| StartupError::graphics("surface", "adapter reports no surface formats"))?;
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(fallback_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        debug!("surface configured as {surface_format:?} {}x{}", size.width, size.height);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bind-layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let model_source = shader::load_source(shaders.model.as_deref(), MODEL_SHADER)?;
        let marker_source = shader::load_source(shaders.marker.as_deref(), MARKER_SHADER)?;
        let model_shader = shader::compile(&device, "model-shader", model_source).await?;
        let marker_shader = shader::compile(&device, "marker-shader", marker_source).await?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let model_pipeline = create_pipeline(
            &device,
            "model-pipeline",
            &[&frame_layout, &object_layout, &material_layout],
            &model_shader,
            surface_format,
        );
        let marker_pipeline = create_pipeline(
            &device,
            "marker-pipeline",
            &[&frame_layout, &object_layout],
            &marker_shader,
            surface_format,
        );
        if let Some(err) = device.pop_error_scope().await {
            return Err(anyhow!("shader interface does not match the renderer: {err}"));
        }

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lights-uniform"),
            size: std::mem::size_of::<LightsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        let identity = ObjectUniform::new(glam::Mat4::IDENTITY, MARKER_COLOR);
        let model_object = UniformSlot::new(&device, &object_layout, "model-object", &identity);
        let marker_object = UniformSlot::new(&device, &object_layout, "marker-object", &identity);

        let mut uploader = MaterialUploader::new(&device, &queue, &material_layout);
        let meshes = model
            .meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| {
                let label = format!("mesh-{index}");
                let material = uploader.bind_group(model, &model.material_for(mesh), &label);
                DrawMesh {
                    buffers: MeshBuffers::from_mesh(&device, mesh, &label),
                    material,
                }
            })
            .collect::<Vec<_>>();
        info!(
            "uploaded {} meshes with {} textures",
            meshes.len(),
            uploader.textures.len()
        );
        let marker_mesh = MeshBuffers::from_mesh(&device, &marker_cube(), "marker-cube");

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth,
            model_pipeline,
            marker_pipeline,
            frame_buffer,
            lights_buffer,
            frame_bind_group,
            model_object,
            marker_object,
            meshes,
            marker_mesh,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Reapplies the current configuration after the surface was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Draws the model followed by the light marker and presents the frame.
    pub fn render(&mut self, frame: &FrameParams) -> Result<(), wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytes_of(&FrameUniform::from(frame)));
        self.queue
            .write_buffer(&self.lights_buffer, 0, bytes_of(&LightsUniform::from(frame)));
        self.queue.write_buffer(
            &self.model_object.buffer,
            0,
            bytes_of(&ObjectUniform::new(frame.model, Vec4::ONE)),
        );
        self.queue.write_buffer(
            &self.marker_object.buffer,
            0,
            bytes_of(&ObjectUniform::new(frame.marker, MARKER_COLOR)),
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        let clear = clear_color(frame.clear_color, self.config.format.is_srgb());
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.model_pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.model_object.bind_group, &[]);
        for mesh in &self.meshes {
            pass.set_bind_group(2, &mesh.material, &[]);
            mesh.buffers.draw(&mut pass);
        }

        pass.set_pipeline(&self.marker_pipeline);
        pass.set_bind_group(1, &self.marker_object.bind_group, &[]);
        self.marker_mesh.draw(&mut pass);

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Uploads material textures, sharing decoded images between meshes.
struct MaterialUploader<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    layout: &'a wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HashMap<(PathBuf, wgpu::TextureFormat), Arc<Texture>>,
}

impl<'a> MaterialUploader<'a> {
    fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue, layout: &'a wgpu::BindGroupLayout) -> Self {
        Self {
            device,
            queue,
            layout,
            sampler: create_sampler(device),
            textures: HashMap::new(),
        }
    }

    fn bind_group(&mut self, model: &Model, material: &Material, label: &str) -> wgpu::BindGroup {
        let diffuse_path = material.diffuse_map.as_deref().map(|map| model.texture_path(map));
        let specular_path = material.specular_map.as_deref().map(|map| model.texture_path(map));
        let diffuse = self.texture(
            diffuse_path,
            material.diffuse_color,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &format!("{label}-diffuse"),
        );
        let specular = self.texture(
            specular_path,
            material.specular_color,
            wgpu::TextureFormat::Rgba8Unorm,
            &format!("{label}-specular"),
        );
        let params = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-material")),
                contents: bytes_of(&MaterialUniform::new(material.shininess)),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-material")),
            layout: self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Cached texture for `path`, or a fresh solid texel of `color` when the
    /// path is absent or fails to decode.
    fn texture(
        &mut self,
        path: Option<PathBuf>,
        color: Vec3,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Arc<Texture> {
        let Some(path) = path else {
            return Arc::new(Texture::solid(self.device, self.queue, color, format, label));
        };
        let key = (path, format);
        if let Some(texture) = self.textures.get(&key) {
            return Arc::clone(texture);
        }
        match Texture::from_path(self.device, self.queue, &key.0, format) {
            Ok(texture) => {
                let texture = Arc::new(texture);
                self.textures.insert(key, Arc::clone(&texture));
                texture
            }
            Err(err) => {
                warn!("{label}: {err:#}; using material colour");
                Arc::new(Texture::solid(self.device, self.queue, color, format, label))
            }
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
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

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[vertex_layout()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

/// Clear colour for the surface. sRGB surfaces encode on write, so the
/// display-space colour is linearized first.
fn clear_color(color: Vec3, srgb_surface: bool) -> wgpu::Color {
    let channel = |value: f32| {
        let value = f64::from(value);
        if !srgb_surface {
            value
        } else if value <= 0.04045 {
            value / 12.92
        } else {
            ((value + 0.055) / 1.055).powf(2.4)
        }
    };
    wgpu::Color {
        r: channel(color.x),
        g: channel(color.y),
        b: channel(color.z),
        a: 1.0,
    }
}
