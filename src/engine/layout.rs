// View layout: where the pages sit on screen.
//
// View space is y-up with the window height spanning [-1, 1] and the width
// spanning [-aspect, aspect]. Page rectangles are derived from the view
// rect, the margins and the view mode:
//   - one page:  right page fills the margin rect, left page is the same
//                rect shifted one page width to the left (off screen)
//   - two pages: margin rect split down the middle

use glam::{DVec2, Mat4};
use serde::Deserialize;

use super::curl::PageRect;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    OnePage,
    TwoPages,
}

/// Proportional margins: 0.1 is 10% of the view size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left:   f64,
    pub top:    f64,
    pub right:  f64,
    pub bottom: f64,
}

pub struct PageLayout {
    view_mode: ViewMode,
    margins:   Margins,

    viewport:  (u32, u32),
    view_rect: PageRect,

    left_page:  PageRect,
    right_page: PageRect,
    /// Size of one page in pixels, used to request page content.
    page_pixels: (u32, u32),
}

impl PageLayout {
    pub fn new(view_mode: ViewMode, margins: Margins) -> Self {
        Self {
            view_mode,
            margins,
            viewport: (0, 0),
            view_rect: PageRect::default(),
            left_page: PageRect::default(),
            right_page: PageRect::default(),
            page_pixels: (0, 0),
        }
    }

    /// Returns true if the page rects changed.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        self.viewport = (width, height);
        if height == 0 {
            self.view_rect = PageRect::default();
            return false;
        }
        let aspect = width as f64 / height as f64;
        self.view_rect = PageRect::new(-aspect, 1.0, aspect, -1.0);
        self.update_page_rects()
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) -> bool {
        self.view_mode = view_mode;
        self.update_page_rects()
    }

    pub fn set_margins(&mut self, margins: Margins) -> bool {
        self.margins = margins;
        self.update_page_rects()
    }

    fn update_page_rects(&mut self) -> bool {
        let view = self.view_rect;
        let (w, h) = (view.width(), view.height());
        if w == 0.0 || h == 0.0 {
            return false;
        }

        let m = self.margins;
        let inner = PageRect::new(
            view.left + w * m.left,
            view.top - h * m.top,
            view.right - w * m.right,
            view.bottom + h * m.bottom,
        );

        let (left, right) = match self.view_mode {
            ViewMode::OnePage => (inner.offset(-inner.width(), 0.0), inner),
            ViewMode::TwoPages => {
                let mid = inner.center_x();
                (
                    PageRect { right: mid, ..inner },
                    PageRect { left: mid, ..inner },
                )
            }
        };
        self.left_page = left;
        self.right_page = right;

        let (vw, vh) = self.viewport;
        self.page_pixels = (
            (right.width() * vw as f64 / w) as u32,
            (right.height() * vh as f64 / h) as u32,
        );
        log::debug!("page rects updated: left {left:?}, right {right:?}, {:?} px", self.page_pixels);
        true
    }

    /// Screen pixels (y-down, origin top-left) to view coordinates.
    pub fn translate(&self, screen: DVec2) -> DVec2 {
        let (vw, vh) = self.viewport;
        if vw == 0 || vh == 0 {
            return DVec2::ZERO;
        }
        let view = self.view_rect;
        DVec2::new(
            view.left + view.width() * screen.x / vw as f64,
            view.top - view.height() * screen.y / vh as f64,
        )
    }

    /// View coordinates back to screen pixels. Inverse of `translate`.
    pub fn to_screen(&self, view: DVec2) -> DVec2 {
        let (vw, vh) = self.viewport;
        let rect = self.view_rect;
        if rect.width() == 0.0 || rect.height() == 0.0 {
            return DVec2::ZERO;
        }
        DVec2::new(
            (view.x - rect.left) / rect.width() * vw as f64,
            (rect.top - view.y) / rect.height() * vh as f64,
        )
    }

    /// Orthographic projection for the view rect.
    pub fn projection(&self) -> Mat4 {
        let v = self.view_rect;
        Mat4::orthographic_rh(
            v.left as f32, v.right as f32,
            v.bottom as f32, v.top as f32,
            -10.0, 10.0,
        )
    }

    pub fn view_mode(&self) -> ViewMode { self.view_mode }
    pub fn view_rect(&self) -> PageRect { self.view_rect }
    pub fn left_page(&self) -> PageRect { self.left_page }
    pub fn right_page(&self) -> PageRect { self.right_page }
    pub fn page_pixels(&self) -> (u32, u32) { self.page_pixels }
}
