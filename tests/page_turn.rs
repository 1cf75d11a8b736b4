// End-to-end page turns through the public API: pointer down, drag,
// release, then tick the settle animation to completion.

use std::time::{Duration, Instant};

use glam::{DVec2, DVec4};
use pretty_assertions::assert_eq;

use page_curl::engine::page_turn::{anchor_curl, Spine};
use page_curl::engine::{
    CurlPage, CurlState, Margins, PageProvider, PageSide, PageTurner, PointerAction, PointerEvent,
    Settings, SlotRole, ViewMode,
};

struct Shelf {
    pages: usize,
    loads: Vec<usize>,
}

impl PageProvider for Shelf {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_content(&mut self, _width: u32, _height: u32, index: usize) -> CurlPage {
        self.loads.push(index);
        let mut page = CurlPage::new();
        page.set_color(DVec4::new(0.0, index as f64 / 100.0, 0.0, 1.0), PageSide::Both);
        page
    }
}

fn book(view_mode: ViewMode, pages: usize, index: usize) -> PageTurner<Shelf> {
    let settings = Settings { view_mode, margins: Margins::default(), ..Settings::default() };
    let mut turner = PageTurner::new(&settings, Shelf { pages, loads: Vec::new() });
    match view_mode {
        ViewMode::OnePage => turner.set_viewport(400, 400),
        ViewMode::TwoPages => turner.set_viewport(800, 400),
    }
    turner.set_current_index(index);
    turner
}

fn pointer(action: PointerAction, x: f64, y: f64) -> PointerEvent {
    PointerEvent { action, position: DVec2::new(x, y), pressure: 0.0 }
}

/// Drag from `from` to `to` in a few steps, release, and run the settle
/// animation to the end.
fn turn(turner: &mut PageTurner<Shelf>, from: DVec2, to: DVec2) {
    let start = Instant::now();
    assert!(turner.handle_pointer(pointer(PointerAction::Down, from.x, from.y), start));
    for step in 1..=8 {
        let p = from.lerp(to, step as f64 / 8.0);
        turner.handle_pointer(pointer(PointerAction::Move, p.x, p.y), start);
        assert_curl_in_bounds(turner);
    }
    assert!(turner.handle_pointer(pointer(PointerAction::Up, to.x, to.y), start));

    let mut now = start;
    while turner.is_animating() {
        now += Duration::from_millis(16);
        turner.tick(now);
        assert_curl_in_bounds(turner);
        assert!(now - start < Duration::from_secs(5), "settle never finished");
    }
}

fn assert_curl_in_bounds(turner: &PageTurner<Shelf>) {
    let mesh = &turner.slot_for(SlotRole::Curl).mesh;
    assert!(mesh.vertices().len() <= mesh.capacity());
    let Some(params) = turner.curl_params() else {
        return;
    };
    let rect = mesh.rect();
    assert!((params.direction.length() - 1.0).abs() < 1e-9);
    assert!(rect.contains(params.anchor), "anchor {} off the page", params.anchor);
    for v in mesh.vertices() {
        assert!(v.position.z >= -1e-9 && v.position.z <= 2.0 * params.radius + 1e-9);
    }
}

#[test]
fn one_page_turn_forward_commits() {
    let mut t = book(ViewMode::OnePage, 6, 1);
    turn(&mut t, DVec2::new(0.9, 0.1), DVec2::new(-0.8, 0.0));

    assert_eq!(t.state(), CurlState::Idle);
    assert_eq!(t.current_index(), 2);
    assert_eq!(t.slot_for(SlotRole::Right).page_index(), Some(2));
    assert_eq!(t.slot_for(SlotRole::Left).page_index(), Some(1));
    assert!(t.provider().loads.contains(&2));
}

#[test]
fn one_page_turn_back_commits() {
    let mut t = book(ViewMode::OnePage, 6, 3);
    turn(&mut t, DVec2::new(-0.9, 0.0), DVec2::new(0.7, 0.0));

    assert_eq!(t.state(), CurlState::Idle);
    assert_eq!(t.current_index(), 2);
    assert_eq!(t.slot_for(SlotRole::Right).page_index(), Some(2));
}

#[test]
fn short_drag_cancels_without_moving_index() {
    let mut t = book(ViewMode::OnePage, 6, 2);
    turn(&mut t, DVec2::new(0.9, 0.0), DVec2::new(0.6, -0.2));

    assert_eq!(t.current_index(), 2);
    assert_eq!(t.slot_for(SlotRole::Right).page_index(), Some(2));
    assert_eq!(t.curl_params(), None);
}

#[test]
fn two_page_turns_in_both_directions() {
    let mut t = book(ViewMode::TwoPages, 8, 2);
    turn(&mut t, DVec2::new(1.8, 0.0), DVec2::new(-1.5, 0.1));
    assert_eq!(t.current_index(), 3);
    assert_eq!(t.slot_for(SlotRole::Left).page_index(), Some(2));
    assert_eq!(t.slot_for(SlotRole::Right).page_index(), Some(3));

    turn(&mut t, DVec2::new(-1.8, 0.0), DVec2::new(1.5, 0.0));
    assert_eq!(t.current_index(), 2);
    assert_eq!(t.slot_for(SlotRole::Left).page_index(), Some(1));
    assert_eq!(t.slot_for(SlotRole::Right).page_index(), Some(2));
}

#[test]
fn turning_past_the_last_page() {
    let mut t = book(ViewMode::OnePage, 2, 1);
    turn(&mut t, DVec2::new(0.9, 0.0), DVec2::new(-0.9, 0.0));
    assert_eq!(t.current_index(), 2);

    // Nothing left to turn on the right.
    let now = Instant::now();
    assert!(!t.handle_pointer(pointer(PointerAction::Down, 0.9, 0.0), now));
    assert_eq!(t.draw_list().count(), 1);
}

#[test]
fn curl_slot_is_drawn_last_while_dragging() {
    let mut t = book(ViewMode::TwoPages, 8, 2);
    let now = Instant::now();
    t.handle_pointer(pointer(PointerAction::Down, 1.8, 0.0), now);
    t.handle_pointer(pointer(PointerAction::Move, 0.5, 0.2), now);

    let order: Vec<usize> = t.draw_list().collect();
    assert_eq!(order.len(), 3);
    assert_eq!(order.last(), Some(&t.slot_index(SlotRole::Curl)));
    assert_eq!(t.slot_for(SlotRole::Curl).page_index(), Some(2));
}

#[test]
fn anchored_curl_never_lifts_the_spine() {
    let rect = page_curl::engine::PageRect::new(0.0, 1.0, 1.0, -1.0);
    for (anchor, direction) in [
        (DVec2::new(0.9, 0.9), DVec2::new(-0.1, 1.0)),
        (DVec2::new(0.5, -0.9), DVec2::new(-0.3, -1.0)),
        (DVec2::new(0.2, 0.0), DVec2::new(-1.0, 0.4)),
    ] {
        let (a, d) = anchor_curl(rect, Spine::Left, anchor, direction).unwrap();
        // Points behind the curl line (negative along the direction) are
        // lifted; both spine corners must stay on the flat side.
        for corner in [DVec2::new(rect.left, rect.top), DVec2::new(rect.left, rect.bottom)] {
            assert!((corner - a).dot(d) >= -1e-9, "spine corner {corner} lifted by {a} {d}");
        }
    }
}
