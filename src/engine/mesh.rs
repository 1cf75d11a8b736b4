// GPU vertex records and buffer packing for curl meshes.
//
// Each page slot is drawn as up to four triangle strips, in this order:
//   drop shadow → front strip → back strip → self shadow
// The page strips share one vertex buffer, the shadows another.

use std::ops::Range;

use glam::DVec4;

use super::curl::CurlMesh;
use super::page::{CurlPage, PageSide};
use super::shadow::ShadowColors;

// ============================================================================
// GPU VERTICES
// ============================================================================

/// Page vertex.
///   @location(0) position:  vec3<f32>
///   @location(1) tex_coord: vec2<f32>
///   @location(2) color:     vec4<f32>   blend colour × shade, a = texture mix
///   @location(3) alpha:     f32         face alpha
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuPageVertex {
    pub position:  [f32; 3],
    pub tex_coord: [f32; 2],
    pub color:     [f32; 4],
    pub alpha:     f32,
}

impl GpuPageVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x4,
        3 => Float32
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuPageVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Shadow vertex.
///   @location(0) position: vec3<f32>
///   @location(1) color:    vec4<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuShadowVertex {
    pub position: [f32; 3],
    pub color:    [f32; 4],
}

impl GpuShadowVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuShadowVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// ============================================================================
// PAGE STRIPS
// ============================================================================

/// One strip within a packed vertex buffer, plus the page side whose
/// texture and colour it shows.
#[derive(Clone, Debug, PartialEq)]
pub struct Strip {
    pub vertices: Range<u32>,
    pub side:     PageSide,
}

impl Strip {
    pub fn is_empty(&self) -> bool { self.vertices.is_empty() }
}

/// Packed page geometry for one slot, ready for upload.
#[derive(Default)]
pub struct PageBuffers {
    pub vertices: Vec<GpuPageVertex>,
    pub front:    Option<Strip>,
    pub back:     Option<Strip>,
}

impl PageBuffers {
    /// Maximum vertex count for a mesh: the back strip repeats the two
    /// seam vertices of the front strip.
    pub fn capacity_for(mesh: &CurlMesh) -> usize {
        mesh.capacity() + 2
    }

    /// Repack from a mesh and its page content. A flipped mesh shows the
    /// page's back side on its front strip and vice versa.
    pub fn pack(&mut self, mesh: &CurlMesh, page: &CurlPage) {
        self.vertices.clear();

        let (front_side, back_side) = if mesh.flip_texture() {
            (PageSide::Back, PageSide::Front)
        } else {
            (PageSide::Front, PageSide::Back)
        };

        let front = 0..mesh.front_count();
        self.front = self.push_strip(mesh, page, front, front_side);

        let (start, len) = mesh.back_strip();
        self.back = if mesh.back_count() > 0 {
            self.push_strip(mesh, page, start..start + len, back_side)
        } else {
            None
        };
    }

    fn push_strip(&mut self, mesh: &CurlMesh, page: &CurlPage, range: Range<usize>, side: PageSide) -> Option<Strip> {
        if range.is_empty() {
            return None;
        }
        let tint = page.color(side);
        let first = self.vertices.len() as u32;
        self.vertices.extend(mesh.vertices()[range].iter().map(|v| {
            let rgb = tint.truncate() * v.shade;
            GpuPageVertex {
                position:  v.position.as_vec3().to_array(),
                tex_coord: v.tex_coord.as_vec2().to_array(),
                color:     rgb.extend(tint.w).as_vec4().to_array(),
                alpha:     v.alpha as f32,
            }
        }));
        Some(Strip { vertices: first..self.vertices.len() as u32, side })
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

// ============================================================================
// SHADOW STRIPS
// ============================================================================

#[derive(Default)]
pub struct ShadowBuffers {
    pub vertices:    Vec<GpuShadowVertex>,
    pub drop_shadow: Range<u32>,
    pub self_shadow: Range<u32>,
}

impl ShadowBuffers {
    pub fn capacity_for(mesh: &CurlMesh) -> usize {
        mesh.shadow_capacity()
    }

    pub fn pack(&mut self, mesh: &CurlMesh, colors: &ShadowColors) {
        self.vertices.clear();
        self.vertices.extend(mesh.shadows().strip(colors).map(|sv| GpuShadowVertex {
            position: sv.position.as_vec3().to_array(),
            color:    sv.color.as_vec4().to_array(),
        }));

        let split = mesh.drop_shadow_count() as u32;
        self.drop_shadow = 0..split;
        self.self_shadow = split..self.vertices.len() as u32;
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Clear colour from linear RGBA.
pub fn to_wgpu_color(color: DVec4) -> wgpu::Color {
    wgpu::Color { r: color.x, g: color.y, b: color.z, a: color.w }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::curl::PageRect;
    use glam::DVec2;
    use pretty_assertions::assert_eq;

    fn curled_mesh(flip: bool) -> CurlMesh {
        let mut mesh = CurlMesh::new(8);
        mesh.set_rect(PageRect::new(-1.0, 1.0, 1.0, -1.0));
        mesh.set_flip_texture(flip);
        mesh.curl(DVec2::new(0.3, 0.0), DVec2::X, 0.25);
        mesh
    }

    #[test]
    fn gpu_vertex_layouts_match_struct_sizes() {
        assert_eq!(std::mem::size_of::<GpuPageVertex>(), 40);
        assert_eq!(GpuPageVertex::desc().array_stride, 40);
        assert_eq!(GpuShadowVertex::desc().array_stride, 28);
    }

    #[test]
    fn flat_mesh_packs_one_front_strip() {
        let mut mesh = CurlMesh::new(8);
        mesh.set_rect(PageRect::new(-1.0, 1.0, 1.0, -1.0));
        mesh.reset();
        let mut buffers = PageBuffers::default();
        buffers.pack(&mesh, &CurlPage::new());
        assert_eq!(buffers.front, Some(Strip { vertices: 0..4, side: PageSide::Front }));
        assert_eq!(buffers.back, None);
        assert_eq!(buffers.vertex_bytes().len(), 4 * 40);
    }

    #[test]
    fn back_strip_repeats_seam_vertices() {
        let mesh = curled_mesh(false);
        let mut buffers = PageBuffers::default();
        buffers.pack(&mesh, &CurlPage::new());

        let front = buffers.front.clone().unwrap();
        let back = buffers.back.clone().unwrap();
        assert_eq!(front.vertices.end as usize, mesh.front_count());
        assert_eq!(back.side, PageSide::Back);
        assert_eq!(back.vertices.len(), mesh.back_count() + 2);
        assert_eq!(
            buffers.vertices[back.vertices.start as usize].position,
            buffers.vertices[front.vertices.end as usize - 2].position,
        );
        assert!(buffers.vertices.len() <= PageBuffers::capacity_for(&mesh));
    }

    #[test]
    fn flipped_mesh_swaps_sides() {
        let mesh = curled_mesh(true);
        let mut buffers = PageBuffers::default();
        buffers.pack(&mesh, &CurlPage::new());
        assert_eq!(buffers.front.unwrap().side, PageSide::Back);
        assert_eq!(buffers.back.unwrap().side, PageSide::Front);
    }

    #[test]
    fn page_colour_is_shaded() {
        let mesh = curled_mesh(false);
        let mut page = CurlPage::new();
        page.set_color(DVec4::new(0.5, 1.0, 1.0, 0.25), PageSide::Front);
        let mut buffers = PageBuffers::default();
        buffers.pack(&mesh, &page);
        for (v, src) in buffers.vertices.iter().zip(mesh.vertices()).take(mesh.front_count()) {
            assert!((v.color[0] - (0.5 * src.shade) as f32).abs() < 1e-6);
            assert_eq!(v.color[3], 0.25);
        }
    }

    #[test]
    fn shadow_ranges_split_drop_and_self() {
        let mesh = curled_mesh(false);
        let mut buffers = ShadowBuffers::default();
        buffers.pack(&mesh, &ShadowColors::default());
        assert_eq!(buffers.drop_shadow.len(), mesh.drop_shadow_count());
        assert_eq!(buffers.self_shadow.len(), mesh.self_shadow_count());
        assert!(buffers.vertices.len() <= ShadowBuffers::capacity_for(&mesh));
    }
}
