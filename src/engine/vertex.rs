// Vertex records used while building a curl mesh.
//
// Everything here is double precision: a vertex is rotated into curl-local
// space, bent around the cylinder and rotated back, and f32 round-off would
// accumulate over the scan lines. Conversion to f32 happens only in mesh.rs.

use glam::{DVec2, DVec3};

// ============================================================================
// CURL VERTEX
// ============================================================================

/// One page vertex. Plain value type: every stage works on its own copy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurlVertex {
    /// Position. `z == 0` while the vertex lies flat on the page plane.
    pub position:  DVec3,
    pub tex_coord: DVec2,
    /// Surface normal used for lighting. (0, 0, 1) on the flat page.
    pub normal:    DVec3,
    /// Shading multiplier, 1 on the flat page and in [0.1, 0.1 + 0.9 * sqrt(2)]
    /// inside the curl.
    pub shade:     f64,
    pub alpha:     f64,
}

impl Default for CurlVertex {
    fn default() -> Self {
        Self {
            position:  DVec3::ZERO,
            tex_coord: DVec2::ZERO,
            normal:    DVec3::Z,
            shade:     1.0,
            alpha:     1.0,
        }
    }
}

impl CurlVertex {
    pub fn at(x: f64, y: f64) -> Self {
        Self { position: DVec3::new(x, y, 0.0), ..Self::default() }
    }

    #[inline]
    pub fn x(&self) -> f64 { self.position.x }

    #[inline]
    pub fn y(&self) -> f64 { self.position.y }

    #[inline]
    pub fn z(&self) -> f64 { self.position.z }

    /// Offset X/Y only. Z is never touched by translation.
    pub fn translate(&mut self, offset: DVec2) {
        self.position.x += offset.x;
        self.position.y += offset.y;
    }

    /// Rotate position and normal counter-clockwise about the Z axis.
    pub fn rotate_z(&mut self, theta: f64) {
        let (sin, cos) = theta.sin_cos();
        let rotate = |x: f64, y: f64| (x * cos - y * sin, x * sin + y * cos);

        let (x, y) = rotate(self.position.x, self.position.y);
        self.position.x = x;
        self.position.y = y;

        let (nx, ny) = rotate(self.normal.x, self.normal.y);
        self.normal.x = nx;
        self.normal.y = ny;
    }

    /// Linear interpolation of position, texture coordinate and normal from
    /// `self` towards `other`. Shading and alpha are taken from `self`.
    pub fn lerp(&self, other: &CurlVertex, c: f64) -> CurlVertex {
        CurlVertex {
            position:  self.position + (other.position - self.position) * c,
            tex_coord: self.tex_coord + (other.tex_coord - self.tex_coord) * c,
            normal:    self.normal + (other.normal - self.normal) * c,
            ..*self
        }
    }
}

// ============================================================================
// SHADOW VERTEX
// ============================================================================

/// One shadow sample. Emitted as an inner/outer pair in the shadow strip:
/// the inner point sits at `position`, the outer point at
/// `position + penumbra`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadowVertex {
    pub position: DVec3,
    pub penumbra: DVec2,
    /// Blend factor in [0, 1] between the outer (0) and inner (1) colour.
    pub inner_factor: f64,
}
