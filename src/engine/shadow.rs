// Drop shadow and self shadow geometry.
//
// Both shadows are soft strips derived from the curl vertices as they are
// emitted. Vertices rising off the page but still in front of the fold
// (0 < z <= r) cast a drop shadow onto whatever lies beneath the page.
// Vertices past the fold (z > r) cast a self shadow back onto the page.

use glam::{DVec2, DVec3, DVec4};
use serde::Deserialize;

use super::vertex::{CurlVertex, ShadowVertex};

/// Drop shadow penumbra length per unit of height.
const DROP_PENUMBRA_SCALE: f64 = 0.5;
/// Self shadow penumbra length per unit of height above the fold.
const SELF_PENUMBRA_SCALE: f64 = 1.0 / 3.0;

// ============================================================================
// COLOURS
// ============================================================================

/// Inner colour is drawn where the shadow meets the page, outer colour at
/// the penumbra edge.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowColors {
    pub inner: [f64; 4],
    pub outer: [f64; 4],
}

impl Default for ShadowColors {
    fn default() -> Self {
        Self {
            inner: [0.0, 0.0, 0.0, 0.5],
            outer: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl ShadowColors {
    /// Linear blend from outer (factor 0) to inner (factor 1).
    pub fn blend(&self, factor: f64) -> DVec4 {
        let inner = DVec4::from_array(self.inner);
        let outer = DVec4::from_array(self.outer);
        outer + (inner - outer) * factor
    }

    pub fn outer(&self) -> DVec4 {
        DVec4::from_array(self.outer)
    }
}

/// Final strip vertex, ready for conversion to a GPU record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadowStripVertex {
    pub position: DVec3,
    pub color:    DVec4,
}

// ============================================================================
// SHADOW BUILDER
// ============================================================================

/// Collects shadow samples for one `curl()` pass.
///
/// Capacity is fixed at construction; `push` past it is a programming error.
pub struct ShadowBuilder {
    drop_shadow: Vec<ShadowVertex>,
    self_shadow: Vec<ShadowVertex>,
    capacity:    usize,
}

impl ShadowBuilder {
    pub fn new(max_curl_splits: usize) -> Self {
        let capacity = (max_curl_splits + 2) * 2;
        Self {
            drop_shadow: Vec::with_capacity(capacity),
            self_shadow: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.drop_shadow.clear();
        self.self_shadow.clear();
    }

    /// Record the shadow cast by one finished (world space) curl vertex.
    /// Flat vertices (z == 0) cast nothing.
    pub fn push(&mut self, v: &CurlVertex, direction: DVec2, radius: f64) {
        let z = v.z();
        if z > 0.0 && z <= radius {
            let sample = ShadowVertex {
                position:     v.position,
                penumbra:     -direction * (z * DROP_PENUMBRA_SCALE),
                inner_factor: z / radius,
            };
            Self::insert_paired(&mut self.drop_shadow, self.capacity, sample);
        } else if z > radius {
            let lift = z - radius;
            let sample = ShadowVertex {
                position:     v.position,
                penumbra:     direction * (lift * SELF_PENUMBRA_SCALE),
                inner_factor: (lift / radius).min(1.0),
            };
            Self::insert_paired(&mut self.self_shadow, self.capacity, sample);
        }
    }

    // Samples arrive as (upper, lower) pairs per scan line. Inserting at the
    // middle keeps upper samples in the first half and lower samples in the
    // second half, so the list walks around the shadow outline.
    fn insert_paired(list: &mut Vec<ShadowVertex>, capacity: usize, sample: ShadowVertex) {
        debug_assert!(list.len() < capacity, "shadow list overflow ({capacity})");
        let idx = list.len().div_ceil(2);
        list.insert(idx, sample);
    }

    pub fn drop_shadow(&self) -> &[ShadowVertex] { &self.drop_shadow }
    pub fn self_shadow(&self) -> &[ShadowVertex] { &self.self_shadow }

    /// Strip vertex counts. Each sample emits an inner and an outer vertex,
    /// so both are always even.
    pub fn drop_shadow_count(&self) -> usize { self.drop_shadow.len() * 2 }
    pub fn self_shadow_count(&self) -> usize { self.self_shadow.len() * 2 }

    /// Maximum strip length across both shadows.
    pub fn strip_capacity(&self) -> usize { self.capacity * 4 }

    /// Triangle strip for both shadows: drop shadow first
    /// (`[0, drop_shadow_count)`), then self shadow.
    pub fn strip<'a>(&'a self, colors: &'a ShadowColors) -> impl Iterator<Item = ShadowStripVertex> + 'a {
        self.drop_shadow
            .iter()
            .chain(self.self_shadow.iter())
            .flat_map(move |sv| {
                let inner = ShadowStripVertex {
                    position: sv.position,
                    color:    colors.blend(sv.inner_factor),
                };
                let outer = ShadowStripVertex {
                    position: sv.position + sv.penumbra.extend(0.0),
                    color:    colors.outer(),
                };
                [inner, outer]
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifted(x: f64, y: f64, z: f64) -> CurlVertex {
        let mut v = CurlVertex::at(x, y);
        v.position.z = z;
        v
    }

    #[test]
    fn flat_vertices_cast_nothing() {
        let mut shadows = ShadowBuilder::new(4);
        shadows.push(&CurlVertex::at(0.0, 0.0), DVec2::X, 0.3);
        assert_eq!(shadows.drop_shadow_count(), 0);
        assert_eq!(shadows.self_shadow_count(), 0);
    }

    #[test]
    fn rising_vertex_casts_drop_shadow_against_direction() {
        let mut shadows = ShadowBuilder::new(4);
        shadows.push(&lifted(0.0, 0.0, 0.2), DVec2::X, 0.4);
        let sv = shadows.drop_shadow()[0];
        assert_eq!(sv.penumbra, DVec2::new(-0.1, 0.0));
        assert_eq!(sv.inner_factor, 0.5);
        assert_eq!(shadows.self_shadow_count(), 0);
    }

    #[test]
    fn folded_vertex_casts_self_shadow_along_direction() {
        let mut shadows = ShadowBuilder::new(4);
        shadows.push(&lifted(0.0, 0.0, 0.6), DVec2::Y, 0.3);
        let sv = shadows.self_shadow()[0];
        assert!(sv.penumbra.x.abs() < 1e-12);
        assert!((sv.penumbra.y - 0.1).abs() < 1e-12);
        assert!((sv.inner_factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn insertion_splits_upper_and_lower_halves() {
        let mut shadows = ShadowBuilder::new(4);
        // Three scan lines, each emitting an upper then a lower vertex.
        for (i, z) in [0.05, 0.1, 0.15].into_iter().enumerate() {
            let x = -(i as f64);
            shadows.push(&lifted(x, 1.0, z), DVec2::X, 0.3);
            shadows.push(&lifted(x, -1.0, z), DVec2::X, 0.3);
        }
        let ys: Vec<f64> = shadows.drop_shadow().iter().map(|s| s.position.y).collect();
        assert_eq!(ys, vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0]);
        let xs: Vec<f64> = shadows.drop_shadow().iter().map(|s| s.position.x).collect();
        assert_eq!(xs, vec![0.0, -1.0, -2.0, -2.0, -1.0, 0.0]);
    }

    #[test]
    fn strip_pairs_inner_and_outer_colours() {
        let colors = ShadowColors::default();
        let mut shadows = ShadowBuilder::new(2);
        shadows.push(&lifted(0.0, 0.0, 0.15), DVec2::X, 0.3);
        shadows.push(&lifted(0.0, 0.0, 0.45), DVec2::X, 0.3);
        let strip: Vec<_> = shadows.strip(&colors).collect();
        assert_eq!(strip.len(), shadows.drop_shadow_count() + shadows.self_shadow_count());
        assert_eq!(strip[0].color, DVec4::new(0.0, 0.0, 0.0, 0.25));
        assert_eq!(strip[1].color, colors.outer());
        assert_eq!(strip[1].position.x, -0.075);
    }
}
