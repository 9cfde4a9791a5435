use wgpu::util::DeviceExt;

use crate::paint::Color;

use super::ctx::{RenderCtx, RenderTarget};
use super::error::GpuResourceError;
use super::mesh::{MeshAllocator, MeshSet, VERTICES_PER_MESH, VertexFormat};

/// One vertex buffer holding a single triangle.
pub struct GpuMesh {
    buffer: wgpu::Buffer,
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

struct DeviceAllocator<'a> {
    device: &'a wgpu::Device,
    max_buffer_size: u64,
}

impl MeshAllocator for DeviceAllocator<'_> {
    type Mesh = GpuMesh;

    fn allocate(&mut self, index: usize, vertices: &[f32]) -> Result<GpuMesh, GpuResourceError> {
        let label = format!("phoenix triangle vbo {index}");
        let requested = std::mem::size_of_val(vertices) as u64;
        if requested > self.max_buffer_size {
            return Err(GpuResourceError::Allocation {
                label,
                requested,
                limit: self.max_buffer_size,
            });
        }

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Ok(GpuMesh { buffer })
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FillUniform {
    color: [f32; 4],
}

/// Draws the triangle set: one vertex buffer and one three-vertex draw per
/// triangle.
///
/// Position-only geometry is shaded with a fixed fill color; position+color
/// geometry uses its per-vertex color.
pub struct TriangleRenderer {
    fill: Color,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    fill_ubo: Option<wgpu::Buffer>,

    meshes: MeshSet<GpuMesh>,
}

impl TriangleRenderer {
    pub fn new(format: VertexFormat, fill: Color) -> Self {
        Self {
            fill,
            pipeline_format: None,
            pipeline: None,
            bind_group: None,
            fill_ubo: None,
            meshes: MeshSet::new(format),
        }
    }

    #[inline]
    pub fn format(&self) -> VertexFormat {
        self.meshes.format()
    }

    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Compiles the shader and builds the pipeline for the current surface
    /// format. No-op if it is already built for that format.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>) -> Result<(), GpuResourceError> {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return Ok(());
        }

        let (label, shader_src) = match self.format() {
            VertexFormat::Position => ("phoenix triangle shader", include_str!("shaders/triangle.wgsl")),
            VertexFormat::PositionColor => (
                "phoenix triangle color shader",
                include_str!("shaders/triangle_color.wgsl"),
            ),
        };

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });
        check_compilation(label, &shader)?;

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("phoenix triangle bgl"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<FillUniform>() as u64,
                            ),
                        },
                        count: None,
                    }],
                });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("phoenix triangle pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("phoenix triangle pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[self.format().layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Peer triangles have arbitrary winding.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let fill_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("phoenix triangle fill ubo"),
            size: std::mem::size_of::<FillUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let fill = FillUniform {
            color: self.fill.to_array(),
        };
        ctx.queue.write_buffer(&fill_ubo, 0, bytemuck::bytes_of(&fill));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("phoenix triangle bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: fill_ubo.as_entire_binding(),
            }],
        });

        log::debug!(
            "triangle pipeline built for {:?} ({:?})",
            ctx.surface_format,
            self.format()
        );

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group = Some(bind_group);
        self.fill_ubo = Some(fill_ubo);
        Ok(())
    }

    /// Replaces every vertex buffer with one per entry of `triangles`.
    pub fn rebuild<T>(&mut self, ctx: &RenderCtx<'_>, triangles: &[T]) -> Result<(), GpuResourceError>
    where
        T: AsRef<[f32]>,
    {
        let mut allocator = DeviceAllocator {
            device: ctx.device,
            max_buffer_size: ctx.device.limits().max_buffer_size,
        };
        self.meshes.rebuild(&mut allocator, triangles)?;
        log::debug!(
            "rebuild #{}: {} triangle buffer(s)",
            self.meshes.rebuild_count(),
            self.meshes.len()
        );
        Ok(())
    }

    /// Records one draw of three vertices per buffer on top of whatever the
    /// target already holds.
    pub fn render(&self, target: &mut RenderTarget<'_>) {
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("phoenix triangle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);

        for mesh in self.meshes.iter() {
            rpass.set_vertex_buffer(0, mesh.buffer.slice(..));
            rpass.draw(0..VERTICES_PER_MESH, 0..1);
        }
    }

    /// Drops every GPU object this renderer owns.
    pub fn release(&mut self) {
        self.meshes.clear();
        self.bind_group = None;
        if let Some(ubo) = self.fill_ubo.take() {
            ubo.destroy();
        }
        self.pipeline = None;
        self.pipeline_format = None;
    }
}

fn check_compilation(label: &str, shader: &wgpu::ShaderModule) -> Result<(), GpuResourceError> {
    let info = pollster::block_on(shader.get_compilation_info());

    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
        .map(|m| m.message.clone())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(GpuResourceError::ShaderCompile {
            label: label.to_string(),
            message: errors.join("; "),
        })
    }
}
