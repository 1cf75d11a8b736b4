// Curl mesh generation.
//
// A flat page rectangle is re-tessellated into one triangle strip that is
// flat in front of the curl, wrapped around a half cylinder inside it, and
// folded fully over behind it.
//
// Pipeline per curl() call:
//   world rect → curl-local frame (curl direction = +X, curl crest at X = 0)
//             → scan lines (crest, arc subdivisions, "minus infinity")
//             → clip each scan area (clip.rs)
//             → bend vertices onto the cylinder
//             → back to world space → vertex arena + shadow samples
//
// The strip split point is returned as front/back counts:
//   front strip = [0, front)
//   back strip  = [max(0, front - 2), front + back)   (shares the seam pair)

use std::f64::consts::PI;

use glam::{DVec2, DVec3};

use super::clip;
use super::shadow::ShadowBuilder;
use super::vertex::{CurlVertex, ShadowVertex};

pub const FRONT_FACE_ALPHA: f64 = 1.0;

// ============================================================================
// RECTANGLES
// ============================================================================

/// Axis-aligned rectangle in y-up view space (`top > bottom` for pages).
/// Also used for texture bounds, where swapping `left` and `right` mirrors
/// the page horizontally.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PageRect {
    pub left:   f64,
    pub top:    f64,
    pub right:  f64,
    pub bottom: f64,
}

pub type TextureRect = PageRect;

impl PageRect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Texture rect covering a whole texture, v growing downwards.
    pub const UNIT_TEXTURE: TextureRect = PageRect::new(0.0, 0.0, 1.0, 1.0);

    pub fn width(&self) -> f64 { (self.right - self.left).abs() }
    pub fn height(&self) -> f64 { (self.top - self.bottom).abs() }
    pub fn center_x(&self) -> f64 { (self.left + self.right) * 0.5 }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.left.min(self.right)
            && p.x <= self.left.max(self.right)
            && p.y >= self.top.min(self.bottom)
            && p.y <= self.top.max(self.bottom)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Same rect with left and right exchanged.
    pub fn mirrored(&self) -> Self {
        Self::new(self.right, self.top, self.left, self.bottom)
    }
}

// ============================================================================
// CURL MESH
// ============================================================================

/// Geometry for one page slot. Buffers are sized once from
/// `max_curl_splits` and reused on every `curl()`/`reset()`.
pub struct CurlMesh {
    max_curl_splits: usize,
    capacity:        usize,

    // 0 = top-left, 1 = bottom-left, 2 = top-right, 3 = bottom-right.
    rectangle:    [CurlVertex; 4],
    rect:         PageRect,
    texture_rect: TextureRect,
    flip_texture: bool,
    back_face_alpha: f64,

    vertices:    Vec<CurlVertex>,
    front_count: usize,
    back_count:  usize,
    shadows:     ShadowBuilder,

    // Scratch, reused between calls.
    scan_lines: Vec<f64>,
    batch:      Vec<CurlVertex>,
}

impl CurlMesh {
    /// `max_curl_splits` controls how smooth the cylinder is. Values below 1
    /// are clamped to 1.
    pub fn new(max_curl_splits: usize) -> Self {
        let max_curl_splits = max_curl_splits.max(1);
        // Four rectangle corners, two intersections paired with the middle
        // corners, and two per scan line across the curl.
        let capacity = 4 + 2 + 2 * max_curl_splits;

        let mut mesh = Self {
            max_curl_splits,
            capacity,
            rectangle: [CurlVertex::default(); 4],
            rect: PageRect::default(),
            texture_rect: PageRect::UNIT_TEXTURE,
            flip_texture: false,
            back_face_alpha: 1.0,
            vertices: Vec::with_capacity(capacity),
            front_count: 0,
            back_count: 0,
            shadows: ShadowBuilder::new(max_curl_splits),
            scan_lines: Vec::with_capacity(max_curl_splits + 1),
            batch: Vec::with_capacity(8),
        };
        mesh.apply_texture_rect();
        mesh.reset();
        mesh
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Update mesh bounds. Takes effect on the next `curl()` or `reset()`.
    pub fn set_rect(&mut self, rect: PageRect) {
        self.rect = rect;
        let corners = [
            (rect.left, rect.top),
            (rect.left, rect.bottom),
            (rect.right, rect.top),
            (rect.right, rect.bottom),
        ];
        for (v, (x, y)) in self.rectangle.iter_mut().zip(corners) {
            v.position = DVec3::new(x, y, 0.0);
        }
    }

    /// Sub-rectangle of the bound texture that holds the page image.
    pub fn set_texture_rect(&mut self, texture_rect: TextureRect) {
        self.texture_rect = texture_rect;
        self.apply_texture_rect();
    }

    /// Mirror the page horizontally. Used for left-hand pages, which show
    /// the back of a turned page.
    pub fn set_flip_texture(&mut self, flip: bool) {
        self.flip_texture = flip;
        self.apply_texture_rect();
    }

    pub fn set_back_face_alpha(&mut self, alpha: f64) {
        self.back_face_alpha = alpha.clamp(0.0, 1.0);
        self.apply_texture_rect();
    }

    fn apply_texture_rect(&mut self) {
        let tex = self.effective_texture_rect();
        let coords = [
            (tex.left, tex.top),
            (tex.left, tex.bottom),
            (tex.right, tex.top),
            (tex.right, tex.bottom),
        ];
        let alpha = self.face_alpha(true);
        for (v, (u, w)) in self.rectangle.iter_mut().zip(coords) {
            v.tex_coord = DVec2::new(u, w);
            v.alpha = alpha;
        }
    }

    /// Texture rect as applied to the corners, mirrored when flipped.
    pub fn effective_texture_rect(&self) -> TextureRect {
        if self.flip_texture { self.texture_rect.mirrored() } else { self.texture_rect }
    }

    // Alpha for vertices on the front strip (`front == true`) or back strip.
    // Flipping swaps which face of the page each strip shows.
    fn face_alpha(&self, front: bool) -> f64 {
        if front != self.flip_texture { FRONT_FACE_ALPHA } else { self.back_face_alpha }
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    /// Flat rectangle: four front vertices, no back vertices, no shadow.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.vertices.extend_from_slice(&self.rectangle);
        self.front_count = 4;
        self.back_count = 0;
        self.shadows.clear();
    }

    /// Curl the page around the line through `anchor` perpendicular to
    /// `direction`. The part of the page on the `+direction` side stays
    /// flat; the rest wraps around a cylinder of `radius` and folds back.
    ///
    /// `direction` must be a unit vector and `radius` non-negative.
    pub fn curl(&mut self, anchor: DVec2, direction: DVec2, radius: f64) {
        debug_assert!(
            (direction.length() - 1.0).abs() < 1e-6,
            "curl direction must be normalized, got {direction}"
        );
        debug_assert!(radius >= 0.0, "curl radius must be non-negative, got {radius}");

        let angle = direction.y.atan2(direction.x);

        // Curl-local frame: anchor at the origin, direction along +X.
        let mut rotated = self.rectangle;
        for v in &mut rotated {
            v.translate(-anchor);
            v.rotate_z(-angle);
        }
        let edges = clip::sort_corners(&mut rotated);

        self.vertices.clear();
        self.front_count = 0;
        self.back_count = 0;
        self.shadows.clear();

        let curl_length = PI * radius;
        self.build_scan_lines(curl_length, rotated[3].x() - 1.0);

        // First scan area starts at "plus infinity".
        let mut scan_x_max = rotated[0].x() + 1.0;
        let last_line = self.scan_lines.len() - 1;
        let mut batch = std::mem::take(&mut self.batch);

        for i in 0..self.scan_lines.len() {
            let scan_x_min = self.scan_lines[i];
            batch.clear();

            // Rectangle corners inside this scan area, each with the point
            // across the rectangle on the same vertical.
            for corner in rotated.iter().filter(|v| v.x() >= scan_x_min && v.x() < scan_x_max) {
                clip::push_corner(&rotated, &edges, *corner, &mut batch);
            }

            // The scan line itself. A single hit means it runs exactly
            // through a corner, which was already emitted above.
            if let Some(pair) = clip::intersections(&rotated, &edges, scan_x_min).pair_by_y() {
                batch.extend_from_slice(&pair);
            }

            for v in batch.iter_mut() {
                self.bend(v, i, last_line, radius, curl_length);
                v.rotate_z(angle);
                v.translate(anchor);
                self.shadows.push(v, direction, radius);
                debug_assert!(
                    self.vertices.len() < self.capacity,
                    "curl vertex arena overflow ({})",
                    self.capacity
                );
                self.vertices.push(*v);
            }

            scan_x_max = scan_x_min;
        }

        self.batch = batch;
        debug_assert_eq!(self.vertices.len(), self.front_count + self.back_count);
    }

    // Crest, arc subdivisions down to -curl_length, then one line left of
    // the whole page that sweeps up everything folded completely over.
    fn build_scan_lines(&mut self, curl_length: f64, minus_infinity: f64) {
        let splits = self.max_curl_splits;
        self.scan_lines.clear();
        self.scan_lines.push(0.0);
        for i in 1..splits {
            self.scan_lines.push(-curl_length * i as f64 / (splits - 1) as f64);
        }
        self.scan_lines.push(minus_infinity);
    }

    // Classify one curl-local vertex by scan area and move it onto the
    // flat page, the cylinder, or the folded-over back.
    fn bend(&mut self, v: &mut CurlVertex, area: usize, last_area: usize, radius: f64, curl_length: f64) {
        if area == 0 {
            v.alpha = self.face_alpha(true);
            self.front_count += 1;
        } else if area == last_area || curl_length == 0.0 {
            v.position.x = -(curl_length + v.position.x);
            v.position.z = 2.0 * radius;
            v.normal = -DVec3::Z;
            v.alpha = self.face_alpha(false);
            self.back_count += 1;
        } else {
            // x is within [-curl_length, 0] here.
            let rot_y = PI * v.position.x / curl_length;
            let (sin, cos) = rot_y.sin_cos();
            v.position.x = radius * sin;
            v.position.z = radius - radius * cos;
            v.normal = DVec3::new(sin, 0.0, cos);
            v.shade = 0.1 + 0.9 * (sin + 1.0).max(0.0).sqrt();

            if v.position.z >= radius {
                v.alpha = self.face_alpha(false);
                self.back_count += 1;
            } else {
                v.alpha = self.face_alpha(true);
                self.front_count += 1;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    pub fn vertices(&self) -> &[CurlVertex] { &self.vertices }
    pub fn front_count(&self) -> usize { self.front_count }
    pub fn back_count(&self) -> usize { self.back_count }

    /// Start index and length of the back strip. It starts two vertices
    /// early so the strip stays continuous across the seam.
    pub fn back_strip(&self) -> (usize, usize) {
        let start = self.front_count.saturating_sub(2);
        (start, self.front_count + self.back_count - start)
    }

    pub fn drop_shadow(&self) -> &[ShadowVertex] { self.shadows.drop_shadow() }
    pub fn self_shadow(&self) -> &[ShadowVertex] { self.shadows.self_shadow() }
    pub fn drop_shadow_count(&self) -> usize { self.shadows.drop_shadow_count() }
    pub fn self_shadow_count(&self) -> usize { self.shadows.self_shadow_count() }
    pub fn shadows(&self) -> &ShadowBuilder { &self.shadows }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn shadow_capacity(&self) -> usize { self.shadows.strip_capacity() }
    pub fn max_curl_splits(&self) -> usize { self.max_curl_splits }
    pub fn rect(&self) -> PageRect { self.rect }
    pub fn texture_rect(&self) -> TextureRect { self.texture_rect }
    pub fn flip_texture(&self) -> bool { self.flip_texture }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const EPS: f64 = 1e-9;

    fn unit_page(splits: usize) -> CurlMesh {
        let mut mesh = CurlMesh::new(splits);
        mesh.set_rect(PageRect::new(-1.0, 1.0, 1.0, -1.0));
        mesh.reset();
        mesh
    }

    fn positions(mesh: &CurlMesh) -> Vec<(f64, f64, f64)> {
        let mut p: Vec<_> = mesh.vertices().iter()
            .map(|v| (v.x(), v.y(), v.z()))
            .collect();
        p.sort_by(|a, b| a.partial_cmp(b).unwrap());
        p
    }

    #[test]
    fn reset_is_the_flat_rectangle() {
        let mesh = unit_page(10);
        assert_eq!(mesh.front_count(), 4);
        assert_eq!(mesh.back_count(), 0);
        assert_eq!(mesh.drop_shadow_count(), 0);
        assert_eq!(mesh.self_shadow_count(), 0);
        let corners: Vec<_> = mesh.vertices().iter().map(|v| (v.x(), v.y())).collect();
        assert_eq!(corners, vec![(-1.0, 1.0), (-1.0, -1.0), (1.0, 1.0), (1.0, -1.0)]);
    }

    #[test]
    fn reset_after_curl_restores_rectangle() {
        let mut mesh = unit_page(10);
        mesh.curl(DVec2::new(0.2, 0.1), DVec2::new(0.6, 0.8), 0.25);
        assert!(mesh.back_count() > 0);
        mesh.reset();
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.back_count(), 0);
        assert_eq!(mesh.drop_shadow_count() + mesh.self_shadow_count(), 0);
    }

    #[test]
    fn splits_below_one_are_clamped() {
        let mesh = CurlMesh::new(0);
        assert_eq!(mesh.max_curl_splits(), 1);
        assert_eq!(mesh.capacity(), 8);
    }

    #[test]
    fn reference_curl_stays_within_bounds() {
        let mut mesh = unit_page(10);
        let radius = 0.3;
        mesh.curl(DVec2::new(0.5, 0.0), DVec2::X, radius);

        let total = mesh.vertices().len();
        assert_eq!(total, mesh.front_count() + mesh.back_count());
        assert!(total <= mesh.capacity());
        assert!(mesh.back_count() > 0);

        for v in mesh.vertices() {
            assert!(v.z() >= -EPS && v.z() <= 2.0 * radius + EPS, "z out of range: {}", v.z());
            assert!(v.y() >= -1.0 - EPS && v.y() <= 1.0 + EPS);
        }

        // Untouched region keeps its original geometry.
        let flat: Vec<_> = mesh.vertices()[..mesh.front_count()].iter()
            .filter(|v| v.z() == 0.0)
            .collect();
        assert!(flat.iter().all(|v| v.x() >= 0.5 - EPS));
        assert!(flat.iter().any(|v| (v.x() - 1.0).abs() < EPS));

        // Curved band lies between the crest and one arc length behind it.
        for v in mesh.vertices() {
            if v.z() > EPS && v.z() < 2.0 * radius - EPS {
                assert!(v.x() <= 0.5 + EPS && v.x() >= 0.5 - radius - EPS);
            }
        }
    }

    #[test]
    fn curl_reaching_past_page_flips_remainder_over() {
        let mut mesh = unit_page(10);
        let radius = 0.3;
        mesh.curl(DVec2::new(0.5, 0.0), DVec2::X, radius);
        let folded: Vec<_> = mesh.vertices().iter()
            .filter(|v| (v.z() - 2.0 * radius).abs() < EPS)
            .collect();
        assert!(!folded.is_empty());
        // The left page edge at x = -1 is reflected about the crest.
        let curl_length = PI * radius;
        let expected = 0.5 + (-(curl_length + (-1.0 - 0.5)));
        assert!(folded.iter().any(|v| (v.x() - expected).abs() < EPS));
        assert!(folded.iter().all(|v| v.normal.z < 0.0));
    }

    #[test]
    fn page_entirely_on_flat_side_is_unchanged() {
        let mut mesh = unit_page(10);
        let flat = positions(&mesh);
        mesh.curl(DVec2::new(-3.0, 0.0), DVec2::X, 0.3);
        assert_eq!(mesh.front_count(), 4);
        assert_eq!(mesh.back_count(), 0);
        assert_eq!(positions(&mesh), flat);
        assert_eq!(mesh.drop_shadow_count() + mesh.self_shadow_count(), 0);
    }

    #[test]
    fn anchor_an_arc_beyond_the_page_puts_nothing_in_the_curl() {
        let mut mesh = unit_page(10);
        let radius = 0.3;
        mesh.curl(DVec2::new(1.0 + PI * radius, 0.0), DVec2::X, radius);
        assert_eq!(mesh.front_count(), 0);
        assert!(mesh.vertices().iter().all(|v| (v.z() - 2.0 * radius).abs() < EPS));
    }

    #[test]
    fn zero_radius_is_a_razor_thin_flip() {
        let mut mesh = unit_page(10);
        mesh.curl(DVec2::new(0.25, 0.0), DVec2::X, 0.0);

        let total = mesh.vertices().len();
        assert_eq!(mesh.back_count(), total - mesh.front_count());
        assert!(mesh.vertices().iter().all(|v| v.z() == 0.0));
        // Everything behind the crest is mirrored in front of it.
        for v in &mesh.vertices()[mesh.front_count()..] {
            assert!(v.x() >= 0.25 - EPS);
        }
        assert_eq!(mesh.drop_shadow_count() + mesh.self_shadow_count(), 0);
    }

    #[test]
    fn curl_band_vertices_lie_on_the_cylinder() {
        let mut mesh = unit_page(16);
        let radius = 0.2;
        let anchor = DVec2::new(0.3, -0.2);
        let direction = DVec2::new(0.8, 0.6);
        mesh.curl(anchor, direction, radius);

        for v in mesh.vertices() {
            // Distance of (signed offset along direction, z) from the
            // cylinder axis at (0, radius).
            let along = (v.position.truncate() - anchor).dot(direction);
            if along <= EPS && v.z() < 2.0 * radius - EPS {
                let r = ((along).powi(2) + (v.z() - radius).powi(2)).sqrt();
                assert!((r - radius).abs() < 1e-6, "off cylinder by {}", r - radius);
            }
        }
    }

    #[test]
    fn front_back_split_matches_height() {
        let mut mesh = unit_page(12);
        let radius = 0.25;
        mesh.curl(DVec2::new(0.1, 0.3), DVec2::new(-0.6, 0.8), radius);
        let front = mesh.front_count();
        for v in &mesh.vertices()[..front] {
            assert!(v.z() < radius + EPS);
        }
        for v in &mesh.vertices()[front..] {
            assert!(v.z() >= radius - EPS);
        }
        let (start, len) = mesh.back_strip();
        assert_eq!(start, front.saturating_sub(2));
        assert_eq!(start + len, mesh.vertices().len());
    }

    #[test]
    fn random_curls_respect_capacity_and_even_shadows() {
        let mut rng = StdRng::seed_from_u64(0x9a9e);
        for splits in [1, 2, 5, 10, 24] {
            let mut mesh = CurlMesh::new(splits);
            mesh.set_rect(PageRect::new(-0.7, 1.0, 0.9, -1.0));
            for _ in 0..200 {
                let anchor = DVec2::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
                let angle: f64 = rng.gen_range(-PI..PI);
                let direction = DVec2::new(angle.cos(), angle.sin());
                let radius = rng.gen_range(0.0..0.6);
                mesh.curl(anchor, direction, radius);

                let total = mesh.vertices().len();
                assert_eq!(total, mesh.front_count() + mesh.back_count());
                assert!(total <= mesh.capacity(), "{total} > {}", mesh.capacity());
                assert_eq!(mesh.drop_shadow_count() % 2, 0);
                assert_eq!(mesh.self_shadow_count() % 2, 0);
                assert!(mesh.drop_shadow_count() + mesh.self_shadow_count() <= mesh.shadow_capacity());
                for v in mesh.vertices() {
                    assert!(v.z() >= -EPS && v.z() <= 2.0 * radius + EPS);
                }
            }
        }
    }

    #[test]
    fn flip_texture_mirrors_corner_coordinates() {
        let mut mesh = unit_page(4);
        mesh.set_flip_texture(true);
        mesh.reset();
        let tl = mesh.vertices()[0];
        let tr = mesh.vertices()[2];
        assert_eq!(tl.tex_coord, DVec2::new(1.0, 0.0));
        assert_eq!(tr.tex_coord, DVec2::new(0.0, 0.0));
        assert!(mesh.flip_texture());
        assert_eq!(mesh.texture_rect(), PageRect::UNIT_TEXTURE);
    }

    #[test]
    fn back_face_alpha_follows_flip() {
        let mut mesh = unit_page(6);
        mesh.set_back_face_alpha(0.2);
        mesh.curl(DVec2::new(0.0, 0.0), DVec2::X, 0.2);
        let front = mesh.front_count();
        assert!(mesh.vertices()[..front].iter().all(|v| v.alpha == 1.0));
        assert!(mesh.vertices()[front..].iter().all(|v| v.alpha == 0.2));

        mesh.set_flip_texture(true);
        mesh.curl(DVec2::new(0.0, 0.0), DVec2::X, 0.2);
        let front = mesh.front_count();
        assert!(mesh.vertices()[..front].iter().all(|v| v.alpha == 0.2));
        assert!(mesh.vertices()[front..].iter().all(|v| v.alpha == 1.0));
    }
}
