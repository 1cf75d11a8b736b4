// Procedural demo book.
//
// Every page gets a paper tint, a title band, ragged "text" lines and a page
// number tally, all drawn from an RNG seeded per page and side so a page
// looks the same every time it is reloaded.

use glam::DVec4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use page_curl::engine::{CurlPage, PageImage, PageProvider, PageSide};

pub struct DemoBook {
    page_count: usize,
    seed: u64,
}

impl DemoBook {
    pub fn new(page_count: usize, seed: u64) -> Self {
        Self { page_count, seed }
    }

    fn render_side(&self, width: u32, height: u32, index: usize, side: PageSide) -> Option<PageImage> {
        let side_seed = if side == PageSide::Back { 1 } else { 0 };
        let mut rng = StdRng::seed_from_u64(self.seed ^ (((index as u64) << 1) | side_seed));
        let mut canvas = Canvas::new(width, height, paper(&mut rng));

        let margin = (width.min(height) / 12).max(1);
        let ink = [30, 30, 40, 255];

        // Title band.
        let accent = [rng.gen_range(60..200), rng.gen_range(60..200), rng.gen_range(60..200), 255];
        canvas.fill_rect(margin, margin, width.saturating_sub(2 * margin), margin, accent);

        // Body text.
        let line_height = (height / 40).max(2);
        let mut y = margin * 3;
        while y + line_height < height.saturating_sub(margin * 2) {
            if rng.gen_bool(0.12) {
                // Paragraph break.
                y += line_height * 2;
                continue;
            }
            let full = width.saturating_sub(2 * margin);
            let len = if rng.gen_bool(0.2) { rng.gen_range(full / 4..=full.max(1)) } else { full };
            canvas.fill_rect(margin, y, len, line_height / 2 + 1, ink);
            y += line_height;
        }

        // Page number as a tally at the foot of the page.
        let tick = (margin / 4).max(1);
        for i in 0..=(index as u32 % 10) {
            let x = margin + i * tick * 2;
            canvas.fill_rect(x, height.saturating_sub(margin + tick * 3), tick, tick * 3, accent);
        }

        match PageImage::new(width, height, canvas.pixels) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("page {index}: {e}");
                None
            }
        }
    }
}

impl PageProvider for DemoBook {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_content(&mut self, width: u32, height: u32, index: usize) -> CurlPage {
        let mut page = CurlPage::new();
        // Every third page has a plain back, blended a little darker.
        if index % 3 == 2 {
            page.set_texture(self.render_side(width, height, index, PageSide::Front), PageSide::Both);
            page.set_color(DVec4::new(0.85, 0.85, 0.85, 1.0), PageSide::Back);
        } else {
            page.set_texture(self.render_side(width, height, index, PageSide::Front), PageSide::Front);
            page.set_texture(self.render_side(width, height, index, PageSide::Back), PageSide::Back);
        }
        page
    }
}

fn paper(rng: &mut StdRng) -> [u8; 4] {
    let warm = rng.gen_range(0..12);
    [250 - warm / 2, 246 - warm, 235 - warm * 2, 255]
}

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, fill: [u8; 4]) -> Self {
        let pixels = fill
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, pixels }
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = (row * self.width + x.min(x_end)) as usize * 4;
            let end = (row * self.width + x_end) as usize * 4;
            for px in self.pixels[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_deterministic() {
        let mut book = DemoBook::new(4, 7);
        let a = book.page_content(64, 96, 1);
        let b = book.page_content(64, 96, 1);
        assert_eq!(a.texture(PageSide::Front), b.texture(PageSide::Front));
        assert!(a.has_back_texture());
    }

    #[test]
    fn plain_back_pages_share_the_front_image() {
        let mut book = DemoBook::new(4, 7);
        let page = book.page_content(32, 32, 2);
        assert!(!page.has_back_texture());
        assert_eq!(page.texture(PageSide::Front).width(), 32);
    }
}
