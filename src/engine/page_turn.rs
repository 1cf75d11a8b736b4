// Page-turn state machine.
//
// Three physical page slots are shared between three roles: the static left
// page, the static right page and the page being curled. Starting, cancelling
// or committing a turn swaps which slot plays which role, so a slot keeps
// its mesh, texture rect and loaded content across the swap.
//
//   Idle ──pointer down on right half──▶ CurlingRight
//   Idle ──pointer down on left half───▶ CurlingLeft
//   Curling* ──pointer up──▶ settle animation ──▶ commit/cancel ──▶ Idle
//
// Positions are in view space (see layout.rs). The caller drives time by
// passing `Instant`s to `handle_pointer` and `tick`.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use glam::DVec2;

use super::config::Settings;
use super::curl::{CurlMesh, PageRect};
use super::layout::{Margins, PageLayout, ViewMode};
use super::page::{CurlPage, PageProvider};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CurlState {
    Idle,
    CurlingLeft,
    CurlingRight,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotRole {
    Left,
    Right,
    Curl,
}

impl SlotRole {
    /// Render order: static pages first, the curl on top.
    pub const DRAW_ORDER: [SlotRole; 3] = [SlotRole::Left, SlotRole::Right, SlotRole::Curl];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// Pointer sample in view coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub action:   PointerAction,
    pub position: DVec2,
    /// In [0, 1]. Ignored unless touch pressure is enabled.
    pub pressure: f64,
}

/// The parameters last passed to the curl mesh.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurlParams {
    pub anchor:    DVec2,
    pub direction: DVec2,
    pub radius:    f64,
}

/// Which edge of a page is bound to the book.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Spine {
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SettleTarget {
    /// Curl ends up as the right page.
    Right,
    /// Curl ends up as the left page.
    Left,
}

struct Animation {
    source: DVec2,
    target: DVec2,
    start:  Instant,
    settle: SettleTarget,
}

// ============================================================================
// PAGE SLOT
// ============================================================================

pub struct PageSlot {
    pub mesh: CurlMesh,
    pub page: CurlPage,
    visible:  bool,
    index:    Option<usize>,
    reloaded: bool,
}

impl PageSlot {
    fn new(settings: &Settings) -> Self {
        let mut mesh = CurlMesh::new(settings.max_curl_splits);
        mesh.set_back_face_alpha(settings.back_face_alpha);
        Self {
            mesh,
            page: CurlPage::new(),
            visible: false,
            index: None,
            reloaded: false,
        }
    }

    fn place(&mut self, rect: PageRect, flip: bool) {
        self.mesh.set_rect(rect);
        self.mesh.set_flip_texture(flip);
        self.mesh.reset();
    }

    pub fn visible(&self) -> bool { self.visible }

    /// Index of the page whose content this slot holds.
    pub fn page_index(&self) -> Option<usize> { self.index }

    /// True once after new content was loaded or the page's textures
    /// changed. The renderer uploads textures when this fires.
    pub fn take_texture_upload(&mut self) -> bool {
        let changed = self.page.take_textures_changed();
        std::mem::take(&mut self.reloaded) || changed
    }
}

// ============================================================================
// PAGE TURNER
// ============================================================================

pub struct PageTurner<P: PageProvider> {
    provider: P,
    layout:   PageLayout,

    slots: [PageSlot; 3],
    // Physical slot index per role, indexed by `SlotRole as usize`.
    roles: [usize; 3],

    state:         CurlState,
    current_index: usize,
    drag_start:    DVec2,
    pointer:       DVec2,
    pressure:      f64,
    animation:     Option<Animation>,
    curl:          Option<CurlParams>,

    allow_last_page_curl:  bool,
    enable_touch_pressure: bool,
    default_pressure:      f64,
    render_left_page:      bool,
    animation_duration:    Duration,
}

impl<P: PageProvider> PageTurner<P> {
    pub fn new(settings: &Settings, provider: P) -> Self {
        Self {
            provider,
            layout: PageLayout::new(settings.view_mode, settings.margins),
            slots: [PageSlot::new(settings), PageSlot::new(settings), PageSlot::new(settings)],
            roles: [0, 1, 2],
            state: CurlState::Idle,
            current_index: 0,
            drag_start: DVec2::ZERO,
            pointer: DVec2::ZERO,
            pressure: settings.default_pressure,
            animation: None,
            curl: None,
            allow_last_page_curl: settings.allow_last_page_curl,
            enable_touch_pressure: settings.enable_touch_pressure,
            default_pressure: settings.default_pressure,
            render_left_page: settings.render_left_page,
            animation_duration: settings.animation_duration(),
        }
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if self.layout.set_viewport(width, height) {
            self.update_pages();
        }
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        if self.layout.set_view_mode(view_mode) {
            self.update_pages();
        }
    }

    pub fn set_margins(&mut self, margins: Margins) {
        if self.layout.set_margins(margins) {
            self.update_pages();
        }
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    /// Jump to page `index`, clamped to the book, and reload every slot.
    pub fn set_current_index(&mut self, index: usize) {
        let count = self.provider.page_count();
        self.current_index = if self.allow_last_page_curl {
            index.min(count)
        } else {
            index.min(count.saturating_sub(1))
        };
        log::debug!("current index set to {}", self.current_index);
        self.update_pages();
    }

    /// Reload content into every slot for the current index and state.
    pub fn update_pages(&mut self) {
        let (width, height) = self.layout.page_pixels();
        if width == 0 || height == 0 {
            return;
        }
        for slot in &mut self.slots {
            slot.visible = false;
        }

        let count = self.provider.page_count();
        let mut left_index = self.current_index.checked_sub(1);
        let mut right_index = Some(self.current_index);
        let mut curl_index = None;
        match self.state {
            CurlState::CurlingLeft => {
                curl_index = left_index;
                left_index = left_index.and_then(|i| i.checked_sub(1));
            }
            CurlState::CurlingRight => {
                curl_index = right_index;
                right_index = Some(self.current_index + 1);
            }
            CurlState::Idle => {}
        }

        let (left_rect, right_rect) = (self.layout.left_page(), self.layout.right_page());

        if let Some(i) = right_index.filter(|&i| i < count) {
            self.load(SlotRole::Right, i);
            let slot = self.slot_for_mut(SlotRole::Right);
            slot.place(right_rect, false);
            slot.visible = true;
        }
        if let Some(i) = left_index.filter(|&i| i < count) {
            self.load(SlotRole::Left, i);
            let render_left = self.render_left_page;
            let slot = self.slot_for_mut(SlotRole::Left);
            slot.place(left_rect, true);
            slot.visible = render_left;
        }
        if let Some(i) = curl_index.filter(|&i| i < count) {
            self.load(SlotRole::Curl, i);
            let (rect, flip) = self.curl_placement();
            let slot = self.slot_for_mut(SlotRole::Curl);
            slot.place(rect, flip);
            slot.visible = true;
        }
    }

    fn load(&mut self, role: SlotRole, index: usize) {
        let (width, height) = self.layout.page_pixels();
        let page = self.provider.page_content(width, height, index);
        log::debug!("loaded page {index} into {role:?} slot ({width}x{height})");
        let slot = self.slot_for_mut(role);
        slot.page = page;
        slot.index = Some(index);
        slot.reloaded = true;
    }

    // Rect and flip of the curl mesh for the current state.
    fn curl_placement(&self) -> (PageRect, bool) {
        let two_page_left =
            self.state == CurlState::CurlingLeft && self.layout.view_mode() == ViewMode::TwoPages;
        if two_page_left {
            (self.layout.left_page(), true)
        } else {
            (self.layout.right_page(), false)
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Returns false if the event was not used.
    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> bool {
        if self.animation.is_some() {
            return false;
        }

        self.pointer = event.position;
        self.pressure = if self.enable_touch_pressure {
            event.pressure
        } else {
            self.default_pressure
        };

        match event.action {
            // A second pointer going down mid-drag just moves the curl.
            PointerAction::Down if self.state != CurlState::Idle => {
                self.update_curl_pos(self.pointer);
                true
            }
            PointerAction::Down => {
                if !self.begin_drag(event.position) {
                    return false;
                }
                self.update_curl_pos(self.pointer);
                true
            }
            PointerAction::Move => {
                if self.state == CurlState::Idle {
                    return false;
                }
                self.update_curl_pos(self.pointer);
                true
            }
            PointerAction::Up | PointerAction::Cancel => {
                if self.state == CurlState::Idle {
                    return false;
                }
                self.start_settle(now, event.action == PointerAction::Cancel);
                true
            }
        }
    }

    // Pick the page to curl from a pointer-down position.
    fn begin_drag(&mut self, position: DVec2) -> bool {
        let right = self.layout.right_page();
        let left = self.layout.left_page();
        let count = self.provider.page_count();

        self.drag_start = position;
        self.drag_start.y = position.y.clamp(right.bottom, right.top);

        let split_x = match self.layout.view_mode() {
            ViewMode::OnePage => right.center_x(),
            ViewMode::TwoPages => right.left,
        };

        if position.x < split_x && self.current_index > 0 {
            self.drag_start.x = match self.layout.view_mode() {
                ViewMode::OnePage => right.left,
                ViewMode::TwoPages => left.left,
            };
            self.start_curl(CurlState::CurlingLeft);
        } else if position.x >= split_x && self.current_index < count {
            if !self.allow_last_page_curl && self.current_index + 1 >= count {
                return false;
            }
            self.drag_start.x = right.right;
            self.start_curl(CurlState::CurlingRight);
        }

        self.state != CurlState::Idle
    }

    fn start_curl(&mut self, state: CurlState) {
        let count = self.provider.page_count();
        let (left_rect, right_rect) = (self.layout.left_page(), self.layout.right_page());
        for slot in &mut self.slots {
            slot.visible = false;
        }

        match state {
            CurlState::CurlingRight => {
                self.swap_roles(SlotRole::Right, SlotRole::Curl);
                if self.current_index > 0 {
                    let render_left = self.render_left_page;
                    let slot = self.slot_for_mut(SlotRole::Left);
                    slot.place(left_rect, true);
                    slot.visible = render_left;
                }
                if self.current_index + 1 < count {
                    self.load(SlotRole::Right, self.current_index + 1);
                    let slot = self.slot_for_mut(SlotRole::Right);
                    slot.place(right_rect, false);
                    slot.visible = true;
                }
            }
            CurlState::CurlingLeft => {
                self.swap_roles(SlotRole::Left, SlotRole::Curl);
                if self.current_index > 1 {
                    self.load(SlotRole::Left, self.current_index - 2);
                    let render_left = self.render_left_page;
                    let slot = self.slot_for_mut(SlotRole::Left);
                    slot.place(left_rect, true);
                    slot.visible = render_left;
                }
                if self.current_index < count {
                    let slot = self.slot_for_mut(SlotRole::Right);
                    slot.place(right_rect, false);
                    slot.visible = true;
                }
            }
            CurlState::Idle => return,
        }

        self.state = state;
        let (rect, flip) = self.curl_placement();
        let slot = self.slot_for_mut(SlotRole::Curl);
        slot.place(rect, flip);
        slot.visible = true;
        log::debug!("start {state:?} at index {}", self.current_index);
    }

    // Release: settle towards whichever side the pointer is over. A cancelled
    // pointer always settles back to where the curl started.
    fn start_settle(&mut self, now: Instant, cancel: bool) {
        let right = self.layout.right_page();
        let left = self.layout.left_page();
        let view_mode = self.layout.view_mode();

        let on_right = if cancel {
            self.state == CurlState::CurlingRight
        } else {
            match view_mode {
                ViewMode::OnePage => self.pointer.x > right.center_x(),
                ViewMode::TwoPages => self.pointer.x > right.left,
            }
        };

        let mut target = self.drag_start;
        let settle = if on_right {
            target.x = right.right;
            SettleTarget::Right
        } else {
            target.x = if self.state == CurlState::CurlingRight || view_mode == ViewMode::TwoPages {
                left.left
            } else {
                right.left
            };
            SettleTarget::Left
        };

        log::debug!("{:?} released, settling to the {settle:?}", self.state);
        self.animation = Some(Animation { source: self.pointer, target, start: now, settle });
    }

    // ------------------------------------------------------------------------
    // Animation
    // ------------------------------------------------------------------------

    /// Advance the settle animation. Returns true while something moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(animation) = &self.animation else {
            return false;
        };

        let elapsed = now.saturating_duration_since(animation.start);
        if elapsed >= self.animation_duration {
            let settle = animation.settle;
            self.finish_settle(settle);
            return true;
        }

        let t = elapsed.as_secs_f64() / self.animation_duration.as_secs_f64();
        let eased = t.sqrt();
        let position = animation.source + (animation.target - animation.source) * eased;
        self.pointer = position;
        self.update_curl_pos(position);
        true
    }

    fn finish_settle(&mut self, settle: SettleTarget) {
        let index_before = self.current_index;
        match settle {
            SettleTarget::Right => {
                let rect = self.layout.right_page();
                let curl = self.slot_for_mut(SlotRole::Curl);
                curl.place(rect, false);
                curl.visible = true;
                self.slot_for_mut(SlotRole::Right).visible = false;
                self.swap_roles(SlotRole::Right, SlotRole::Curl);
                if self.state == CurlState::CurlingLeft {
                    self.current_index -= 1;
                }
            }
            SettleTarget::Left => {
                let rect = self.layout.left_page();
                let render_left = self.render_left_page;
                let curl = self.slot_for_mut(SlotRole::Curl);
                curl.place(rect, true);
                curl.visible = render_left;
                self.slot_for_mut(SlotRole::Left).visible = false;
                self.swap_roles(SlotRole::Left, SlotRole::Curl);
                if self.state == CurlState::CurlingRight {
                    self.current_index += 1;
                }
            }
        }

        if self.current_index == index_before {
            log::debug!("{:?} cancelled at index {}", self.state, self.current_index);
        } else {
            log::debug!("{:?} committed, index {} -> {}", self.state, index_before, self.current_index);
        }
        self.state = CurlState::Idle;
        self.animation = None;
        self.curl = None;
    }

    // ------------------------------------------------------------------------
    // Curl position
    // ------------------------------------------------------------------------

    // Turn a pointer position into curl parameters.
    fn update_curl_pos(&mut self, pointer: DVec2) {
        let right = self.layout.right_page();
        let mut radius = right.width() / 3.0 * (1.0 - self.pressure).max(0.0);
        let mut pos = pointer;
        let direction;

        let follows_drag = self.state == CurlState::CurlingRight
            || (self.state == CurlState::CurlingLeft && self.layout.view_mode() == ViewMode::TwoPages);

        if follows_drag {
            direction = pos - self.drag_start;
            let dist = direction.length();
            let page_width = right.width();
            let mut curl_length = radius * PI;

            // Shrink the fold as the page nears the end of its travel.
            if dist > page_width * 2.0 - curl_length {
                curl_length = (page_width * 2.0 - dist).max(0.0);
                radius = curl_length / PI;
            }

            if dist >= curl_length {
                let translate = (dist - curl_length) / 2.0;
                if dist > 0.0 {
                    if self.layout.view_mode() == ViewMode::TwoPages {
                        pos.x -= direction.x * translate / dist;
                    } else {
                        radius = (pos.x - right.left).min(radius).max(0.0);
                    }
                    pos.y -= direction.y * translate / dist;
                }
            } else if dist > 0.0 {
                let angle = PI * (dist / curl_length).sqrt();
                let translate = radius * angle.sin();
                pos += direction * (translate / dist);
            }
        } else {
            // One-page mode, left curl: the page unrolls from the left edge
            // and its curl tracks the pointer directly.
            radius = (pos.x - right.left).min(radius).max(0.0);
            pos.x -= (right.right - pos.x).min(radius);
            direction = DVec2::new(pos.x - right.right, pos.y - self.drag_start.y);
        }

        self.set_curl_pos(pos, direction, radius);
    }

    fn set_curl_pos(&mut self, anchor: DVec2, direction: DVec2, radius: f64) {
        let (rect, spine) = if self.curl_placement().1 {
            (self.layout.left_page(), Spine::Right)
        } else {
            (self.layout.right_page(), Spine::Left)
        };

        let params = anchor_curl(rect, spine, anchor, direction).map(|(anchor, direction)| CurlParams {
            anchor,
            direction,
            radius,
        });

        let mesh = &mut self.slot_for_mut(SlotRole::Curl).mesh;
        match params {
            Some(p) => {
                log::trace!("curl anchor {} direction {} radius {:.4}", p.anchor, p.direction, p.radius);
                mesh.curl(p.anchor, p.direction, p.radius);
            }
            None => mesh.reset(),
        }
        self.curl = params;
    }

    // ------------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------------

    fn swap_roles(&mut self, a: SlotRole, b: SlotRole) {
        self.roles.swap(a as usize, b as usize);
    }

    /// Physical slot index currently playing `role`.
    pub fn slot_index(&self, role: SlotRole) -> usize {
        self.roles[role as usize]
    }

    pub fn slot_for(&self, role: SlotRole) -> &PageSlot {
        &self.slots[self.slot_index(role)]
    }

    fn slot_for_mut(&mut self, role: SlotRole) -> &mut PageSlot {
        let index = self.slot_index(role);
        &mut self.slots[index]
    }

    /// Slots by physical index. GPU resources are kept per physical slot.
    pub fn slots(&self) -> &[PageSlot; 3] { &self.slots }
    pub fn slots_mut(&mut self) -> &mut [PageSlot; 3] { &mut self.slots }

    /// Physical slot indices of the visible slots, in render order.
    pub fn draw_list(&self) -> impl Iterator<Item = usize> + '_ {
        SlotRole::DRAW_ORDER
            .into_iter()
            .map(|role| self.slot_index(role))
            .filter(|&i| self.slots[i].visible)
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    pub fn state(&self) -> CurlState { self.state }
    pub fn current_index(&self) -> usize { self.current_index }
    pub fn is_animating(&self) -> bool { self.animation.is_some() }
    pub fn curl_params(&self) -> Option<CurlParams> { self.curl }
    pub fn layout(&self) -> &PageLayout { &self.layout }
    pub fn provider(&self) -> &P { &self.provider }
    pub fn page_count(&self) -> usize { self.provider.page_count() }
}

// ============================================================================
// ANCHORING
// ============================================================================

/// Keep a curl attached to its page.
///
/// The anchor is pulled back onto the spine if it crossed it. If the curl
/// line meets the spine inside the page, part of the spine would curl away,
/// so the direction is rotated until the line passes through the spine's
/// top or bottom corner instead. Finally the anchor slides along the curl
/// line onto the page, which leaves the curl itself unchanged. Returns the
/// adjusted anchor and normalized direction, or `None` if the page should
/// lie flat: the anchor is past the page's outer edge, the direction is
/// zero, or the curl line misses the page.
pub fn anchor_curl(
    rect: PageRect,
    spine: Spine,
    mut anchor: DVec2,
    mut direction: DVec2,
) -> Option<(DVec2, DVec2)> {
    match spine {
        Spine::Left => {
            if anchor.x >= rect.right {
                return None;
            }
            anchor.x = anchor.x.max(rect.left);
            if direction.y != 0.0 {
                let spine_y = anchor.y + (anchor.x - rect.left) * direction.x / direction.y;
                if direction.y < 0.0 && spine_y < rect.top {
                    direction = DVec2::new(anchor.y - rect.top, rect.left - anchor.x);
                } else if direction.y > 0.0 && spine_y > rect.bottom {
                    direction = DVec2::new(rect.bottom - anchor.y, anchor.x - rect.left);
                }
            }
        }
        Spine::Right => {
            if anchor.x <= rect.left {
                return None;
            }
            anchor.x = anchor.x.min(rect.right);
            if direction.y != 0.0 {
                let spine_y = anchor.y + (anchor.x - rect.right) * direction.x / direction.y;
                if direction.y < 0.0 && spine_y < rect.top {
                    direction = DVec2::new(rect.top - anchor.y, anchor.x - rect.right);
                } else if direction.y > 0.0 && spine_y > rect.bottom {
                    direction = DVec2::new(anchor.y - rect.bottom, rect.right - anchor.x);
                }
            }
        }
    }

    let direction = direction.try_normalize()?;
    let anchor = slide_onto_page(rect, anchor, direction)?;
    Some((anchor, direction))
}

// Move the anchor along the curl line to the point of the line inside
// `rect` closest to it. With the spine on the flat side, a line that misses
// the page leaves all of it flat.
fn slide_onto_page(rect: PageRect, anchor: DVec2, direction: DVec2) -> Option<DVec2> {
    const EPS: f64 = 1e-12;
    let line = direction.perp();
    let (x_min, x_max) = (rect.left.min(rect.right), rect.left.max(rect.right));
    let (y_min, y_max) = (rect.bottom.min(rect.top), rect.bottom.max(rect.top));

    let (mut t_min, mut t_max) = (f64::NEG_INFINITY, f64::INFINITY);
    for (p, d, lo, hi) in [(anchor.x, line.x, x_min, x_max), (anchor.y, line.y, y_min, y_max)] {
        if d.abs() < EPS {
            if p < lo - EPS || p > hi + EPS {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - p) / d, (hi - p) / d);
        t_min = t_min.max(a.min(b));
        t_max = t_max.min(a.max(b));
    }
    if t_min > t_max + EPS {
        return None;
    }

    let t = 0.0_f64.max(t_min).min(t_max);
    let p = anchor + line * t;
    Some(DVec2::new(p.x.clamp(x_min, x_max), p.y.clamp(y_min, y_max)))
}
