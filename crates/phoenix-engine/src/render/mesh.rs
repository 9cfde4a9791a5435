use super::error::GpuResourceError;

/// Every mesh is drawn as exactly one triangle.
pub const VERTICES_PER_MESH: u32 = 3;

/// Vertex layout shared by all meshes of a session.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum VertexFormat {
    /// `pos.xyz`, one attribute.
    #[default]
    Position,
    /// `pos.xyz, color.rgb`; attribute 1 starts at float 3.
    PositionColor,
}

impl VertexFormat {
    const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![
        0 => Float32x3 // position
    ];

    const POSITION_COLOR_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // color
    ];

    #[inline]
    pub const fn floats_per_vertex(self) -> usize {
        match self {
            VertexFormat::Position => 3,
            VertexFormat::PositionColor => 6,
        }
    }

    #[inline]
    pub const fn array_stride(self) -> wgpu::BufferAddress {
        (self.floats_per_vertex() * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }

    pub fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        let attributes: &'static [wgpu::VertexAttribute] = match self {
            VertexFormat::Position => &Self::POSITION_ATTRS,
            VertexFormat::PositionColor => &Self::POSITION_COLOR_ATTRS,
        };

        wgpu::VertexBufferLayout {
            array_stride: self.array_stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// Copies `values` and zero-fills up to three whole vertices.
///
/// A triangle shorter than three vertices still gets a buffer that a
/// three-vertex draw can read without running past its end.
pub fn padded_vertices(values: &[f32], format: VertexFormat) -> Vec<f32> {
    let min_len = VERTICES_PER_MESH as usize * format.floats_per_vertex();
    let mut out = values.to_vec();
    if out.len() < min_len {
        out.resize(min_len, 0.0);
    }
    out
}

/// Creates one GPU mesh from vertex data.
///
/// The seam between rebuild bookkeeping and the device, so the former can be
/// tested without a GPU.
pub trait MeshAllocator {
    type Mesh;

    fn allocate(&mut self, index: usize, vertices: &[f32]) -> Result<Self::Mesh, GpuResourceError>;
}

/// The current draw set: one mesh per triangle, in store order.
///
/// Meshes release their GPU memory on drop, so replacing the set is all the
/// cleanup a rebuild needs.
#[derive(Debug)]
pub struct MeshSet<M> {
    format: VertexFormat,
    meshes: Vec<M>,
    rebuilds: u64,
}

impl<M> MeshSet<M> {
    pub fn new(format: VertexFormat) -> Self {
        Self {
            format,
            meshes: Vec::new(),
            rebuilds: 0,
        }
    }

    #[inline]
    pub fn format(&self) -> VertexFormat {
        self.format
    }

    /// Releases every mesh, then allocates one per entry of `triangles`.
    ///
    /// Running it twice on the same input leaves the same set behind. On
    /// error the set is left empty.
    pub fn rebuild<A, T>(&mut self, allocator: &mut A, triangles: &[T]) -> Result<(), GpuResourceError>
    where
        A: MeshAllocator<Mesh = M>,
        T: AsRef<[f32]>,
    {
        self.meshes.clear();
        self.rebuilds += 1;

        let mut meshes = Vec::with_capacity(triangles.len());
        for (index, triangle) in triangles.iter().enumerate() {
            let vertices = padded_vertices(triangle.as_ref(), self.format);
            meshes.push(allocator.allocate(index, &vertices)?);
        }

        self.meshes = meshes;
        Ok(())
    }

    /// Drops every mesh.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, M> {
        self.meshes.iter()
    }

    /// Number of `rebuild` calls so far.
    #[inline]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
