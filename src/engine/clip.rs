// Scan-line clipping of a rotated rectangle.
//
// The curl generator slices the page with vertical lines in curl-local
// space. Each slice needs the points where the line crosses the page
// outline, with texture coordinates and normals interpolated along the
// crossed edge.

use super::vertex::CurlVertex;

/// Rectangle outline as index pairs into the x-sorted corners.
/// Corners 0 and 3 are the diagonal pair.
pub type RectEdges = [[usize; 2]; 4];

pub const DEFAULT_EDGES: RectEdges = [[0, 1], [0, 2], [1, 3], [2, 3]];

// ============================================================================
// EDGE TABLE
// ============================================================================

/// Sort the four corners by X (descending, Y descending on ties) and return
/// the outline for that order.
///
/// Sorting by X alone does not guarantee that corner 3 is diagonal to corner
/// 0: for a nearly axis-aligned rectangle rounding can put either far corner
/// last. Whichever of corners 2 and 3 is farther from corner 0 is the
/// diagonal one, and the edge table is corrected to match.
pub fn sort_corners(corners: &mut [CurlVertex; 4]) -> RectEdges {
    corners.sort_by(|a, b| {
        b.x().total_cmp(&a.x()).then_with(|| b.y().total_cmp(&a.y()))
    });

    let origin = corners[0].position.truncate();
    let dist2 = origin.distance_squared(corners[2].position.truncate());
    let dist3 = origin.distance_squared(corners[3].position.truncate());

    let mut edges = DEFAULT_EDGES;
    if dist2 > dist3 {
        edges[1][1] = 3;
        edges[2][1] = 2;
    }
    edges
}

// ============================================================================
// INTERSECTIONS
// ============================================================================

/// Result of crossing the outline with one scan line.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ScanHits {
    /// Line misses the rectangle, or only touches it at an extreme corner.
    None,
    /// Line passes exactly through a corner and crosses one other edge.
    Single(CurlVertex),
    /// The common case: the line cuts two edges.
    Pair(CurlVertex, CurlVertex),
    /// Three or more crossings. Only reachable through float edge alignment;
    /// callers drop these.
    Degenerate,
}

impl ScanHits {
    pub fn len(&self) -> usize {
        match self {
            ScanHits::None => 0,
            ScanHits::Single(_) => 1,
            ScanHits::Pair(..) => 2,
            ScanHits::Degenerate => 3,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ScanHits::None)
    }

    /// The pair ordered higher Y first, as the triangle strip expects.
    pub fn pair_by_y(&self) -> Option<[CurlVertex; 2]> {
        match *self {
            ScanHits::Pair(a, b) if a.y() < b.y() => Some([b, a]),
            ScanHits::Pair(a, b) => Some([a, b]),
            _ => None,
        }
    }
}

/// Intersect the outline with the vertical line `x = scan_x`.
///
/// An edge counts only if one endpoint is strictly right of the line and the
/// other strictly left, so a line through a corner does not report that
/// corner twice.
pub fn intersections(corners: &[CurlVertex; 4], edges: &RectEdges, scan_x: f64) -> ScanHits {
    let mut found: [Option<CurlVertex>; 2] = [None, None];
    let mut count = 0;

    for &[a, b] in edges {
        let (va, vb) = (&corners[a], &corners[b]);
        let (high, low) = if va.x() >= vb.x() { (va, vb) } else { (vb, va) };
        if !(high.x() > scan_x && low.x() < scan_x) {
            continue;
        }

        let c = (scan_x - low.x()) / (high.x() - low.x());
        let mut hit = low.lerp(high, c);
        hit.position.x = scan_x;

        if count < found.len() {
            found[count] = Some(hit);
        }
        count += 1;
    }

    match (count, found) {
        (0, _) => ScanHits::None,
        (1, [Some(a), _]) => ScanHits::Single(a),
        (2, [Some(a), Some(b)]) => ScanHits::Pair(a, b),
        _ => ScanHits::Degenerate,
    }
}

/// Push `corner` together with the point across the rectangle on the same
/// vertical, higher Y first. A corner has at most one crossing; anything
/// more is float noise and the corner is skipped. Returns how many vertices
/// were pushed.
pub fn push_corner(
    corners: &[CurlVertex; 4],
    edges: &RectEdges,
    corner: CurlVertex,
    out: &mut Vec<CurlVertex>,
) -> usize {
    match intersections(corners, edges, corner.x()) {
        ScanHits::None => {
            out.push(corner);
            1
        }
        ScanHits::Single(hit) if hit.y() > corner.y() => {
            out.extend_from_slice(&[hit, corner]);
            2
        }
        ScanHits::Single(hit) => {
            out.extend_from_slice(&[corner, hit]);
            2
        }
        ScanHits::Pair(..) | ScanHits::Degenerate => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn square() -> [CurlVertex; 4] {
        let mut corners = [
            CurlVertex::at(-1.0, 1.0),
            CurlVertex::at(-1.0, -1.0),
            CurlVertex::at(1.0, 1.0),
            CurlVertex::at(1.0, -1.0),
        ];
        corners[0].tex_coord = DVec2::new(0.0, 0.0);
        corners[1].tex_coord = DVec2::new(0.0, 1.0);
        corners[2].tex_coord = DVec2::new(1.0, 0.0);
        corners[3].tex_coord = DVec2::new(1.0, 1.0);
        corners
    }

    fn diamond() -> [CurlVertex; 4] {
        let mut corners = square();
        for v in &mut corners {
            v.rotate_z(std::f64::consts::FRAC_PI_4);
        }
        corners
    }

    #[test]
    fn sort_is_descending_by_x_then_y() {
        let mut corners = square();
        sort_corners(&mut corners);
        let xy: Vec<(f64, f64)> = corners.iter().map(|v| (v.x(), v.y())).collect();
        assert_eq!(xy, vec![(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]);
    }

    #[test]
    fn axis_aligned_square_keeps_default_edges() {
        let mut corners = square();
        assert_eq!(sort_corners(&mut corners), DEFAULT_EDGES);
    }

    #[test]
    fn edges_always_form_the_outline() {
        // Every corner has exactly two incident edges and 0/3 are not joined.
        for step in 0..16 {
            let mut corners = square();
            for v in &mut corners {
                v.rotate_z(step as f64 * 0.39);
            }
            let edges = sort_corners(&mut corners);
            for corner in 0..4 {
                let degree = edges.iter().filter(|e| e.contains(&corner)).count();
                assert_eq!(degree, 2);
            }
            assert!(!edges.iter().any(|e| e.contains(&0) && e.contains(&3)));
            // No edge crosses the interior: its length must be a side.
            for &[a, b] in &edges {
                let len = corners[a].position.distance(corners[b].position);
                assert!((len - 2.0).abs() < 1e-9, "edge {a}-{b} has length {len}");
            }
        }
    }

    #[test]
    fn scan_through_middle_hits_two_edges() {
        let mut corners = square();
        let edges = sort_corners(&mut corners);
        let [top, bottom] = intersections(&corners, &edges, 0.5).pair_by_y().unwrap();
        assert_eq!((top.x(), top.y()), (0.5, 1.0));
        assert_eq!((bottom.x(), bottom.y()), (0.5, -1.0));
        assert!((top.tex_coord.x - 0.75).abs() < 1e-12);
        assert!((bottom.tex_coord.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scan_outside_or_on_extreme_edge_hits_nothing() {
        let mut corners = square();
        let edges = sort_corners(&mut corners);
        assert_eq!(intersections(&corners, &edges, 2.0), ScanHits::None);
        assert_eq!(intersections(&corners, &edges, 1.0), ScanHits::None);
        assert_eq!(intersections(&corners, &edges, -1.0), ScanHits::None);
    }

    #[test]
    fn scan_through_a_corner_reports_single_hit() {
        // Tilted so the middle corners are not on the same X.
        let mut corners = tilted_diamond();
        let edges = sort_corners(&mut corners);
        let hits = intersections(&corners, &edges, corners[1].x());
        assert_eq!(hits.len(), 1);
    }

    fn tilted_diamond() -> [CurlVertex; 4] {
        let mut corners = diamond();
        for v in &mut corners {
            v.rotate_z(0.1);
        }
        corners
    }

    #[test]
    fn more_than_two_crossings_are_degenerate() {
        // Every edge is the diagonal, so a line through the middle crosses four times.
        let mut corners = square();
        sort_corners(&mut corners);
        let edges: RectEdges = [[0, 3]; 4];
        let hits = intersections(&corners, &edges, 0.0);
        assert_eq!(hits, ScanHits::Degenerate);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits.pair_by_y(), None);
    }

    #[test]
    fn corner_with_extra_crossings_is_skipped() {
        let mut corners = tilted_diamond();
        sort_corners(&mut corners);
        let corner = corners[1];
        let mut out = Vec::new();

        assert_eq!(push_corner(&corners, &[[0, 3]; 4], corner, &mut out), 0);
        assert_eq!(push_corner(&corners, &[[0, 3], [0, 3], [0, 1], [2, 3]], corner, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn corner_is_paired_with_the_point_across() {
        let mut corners = tilted_diamond();
        let edges = sort_corners(&mut corners);
        let mut out = Vec::new();
        assert_eq!(push_corner(&corners, &edges, corners[1], &mut out), 2);
        assert!(out[0].y() > out[1].y());
        assert!(out.iter().all(|v| (v.x() - corners[1].x()).abs() < 1e-12));

        // The extreme corner has nothing across it.
        out.clear();
        assert_eq!(push_corner(&corners, &edges, corners[0], &mut out), 1);
    }

    #[test]
    fn diamond_crossing_interpolates_along_edges() {
        let mut corners = diamond();
        let edges = sort_corners(&mut corners);
        let [top, bottom] = intersections(&corners, &edges, 0.0).pair_by_y().unwrap();
        let half_diag = 2.0f64.sqrt();
        assert!((top.y() - half_diag).abs() < 1e-9);
        assert!((bottom.y() + half_diag).abs() < 1e-9);
        assert!(top.x().abs() < 1e-12);
    }
}
