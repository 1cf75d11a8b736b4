// Page content: the images and blend colours shown on each side of a page,
// and the trait the page-turn state machine pulls content through.

use glam::DVec4;

use super::error::{CurlError, Result};

// ============================================================================
// PAGE IMAGE
// ============================================================================

/// Tightly packed RGBA8 pixels. The engine never looks at the pixel data;
/// it is carried through to the rendering side as a texture payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageImage {
    width:  u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PageImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CurlError::EmptyImage { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CurlError::ImageSize { width, height, len: pixels.len(), expected });
        }
        Ok(Self { width, height, pixels })
    }

    /// 1x1 image of a single colour. Stands in for a missing texture so the
    /// page shows its blend colour.
    pub fn solid(color: DVec4) -> Self {
        let rgba = color.clamp(DVec4::ZERO, DVec4::ONE) * 255.0;
        Self {
            width:  1,
            height: 1,
            pixels: rgba.round().to_array().map(|c| c as u8).to_vec(),
        }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn pixels(&self) -> &[u8] { &self.pixels }
}

// ============================================================================
// CURL PAGE
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PageSide {
    Front,
    Back,
    Both,
}

pub const WHITE: DVec4 = DVec4::ONE;

/// Everything needed to draw one page. Blend colours multiply the texture;
/// the colour's alpha controls how much of the texture shows through.
#[derive(Clone, Debug)]
pub struct CurlPage {
    front_color: DVec4,
    back_color:  DVec4,
    front:       PageImage,
    // `None` means the back shows the front image.
    back:        Option<PageImage>,
    textures_changed: bool,
}

impl Default for CurlPage {
    fn default() -> Self {
        Self {
            front_color: WHITE,
            back_color:  WHITE,
            front:       PageImage::solid(WHITE),
            back:        None,
            textures_changed: false,
        }
    }
}

impl CurlPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to a blank white page.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn color(&self, side: PageSide) -> DVec4 {
        match side {
            PageSide::Front => self.front_color,
            PageSide::Back | PageSide::Both => self.back_color,
        }
    }

    pub fn set_color(&mut self, color: DVec4, side: PageSide) {
        match side {
            PageSide::Front => self.front_color = color,
            PageSide::Back => self.back_color = color,
            PageSide::Both => {
                self.front_color = color;
                self.back_color = color;
            }
        }
    }

    /// `None` installs a solid image of that side's blend colour.
    pub fn set_texture(&mut self, image: Option<PageImage>, side: PageSide) {
        let image = image.unwrap_or_else(|| {
            PageImage::solid(if side == PageSide::Back { self.back_color } else { self.front_color })
        });
        match side {
            PageSide::Front => self.front = image,
            PageSide::Back => self.back = Some(image),
            PageSide::Both => {
                self.front = image;
                self.back = None;
            }
        }
        self.textures_changed = true;
    }

    pub fn texture(&self, side: PageSide) -> &PageImage {
        match side {
            PageSide::Front => &self.front,
            PageSide::Back | PageSide::Both => self.back.as_ref().unwrap_or(&self.front),
        }
    }

    /// True if the back has its own image, distinct from the front.
    pub fn has_back_texture(&self) -> bool {
        self.back.as_ref().is_some_and(|back| *back != self.front)
    }

    pub fn textures_changed(&self) -> bool {
        self.textures_changed
    }

    /// Returns whether textures changed since the last call and clears the
    /// flag. The renderer calls this once per frame per slot.
    pub fn take_textures_changed(&mut self) -> bool {
        std::mem::take(&mut self.textures_changed)
    }
}

// ============================================================================
// PAGE PROVIDER
// ============================================================================

/// Source of page content.
pub trait PageProvider {
    fn page_count(&self) -> usize;

    /// Content for page `index`, rendered for a page of `width` x `height`
    /// pixels. Only called with `index < page_count()`.
    fn page_content(&mut self, width: u32, height: u32, index: usize) -> CurlPage;
}
