use anyhow::Result;
use wme_formats::{Rect, Rgba};

use crate::handle_list::SubframeHandle;
use crate::surface::Surface;

/// Identity of the object a frame is drawn for, used for hit testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OwnerId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Subtractive,
}

/// Screen area that answers hit tests for `owner`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveRect {
    pub owner: OwnerId,
    pub subframe: SubframeHandle,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub zoom_x: f32,
    pub zoom_y: f32,
    pub precise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlitMode {
    Plain,
    Zoom {
        zoom_x: f32,
        zoom_y: f32,
    },
    Transform {
        rotate: f32,
        zoom_x: f32,
        zoom_y: f32,
        hotspot_x: i32,
        hotspot_y: i32,
    },
}

pub struct Blit<'a> {
    pub surface: &'a Surface,
    pub x: i32,
    pub y: i32,
    pub rect: Rect,
    pub mode: BlitMode,
    pub alpha: Rgba,
    pub blend: BlendMode,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

/// Transform applied to a whole frame when it is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    /// Percent, 100 is unscaled.
    pub zoom_x: f32,
    pub zoom_y: f32,
    pub precise: bool,
    pub alpha: Rgba,
    /// Degrees.
    pub rotate: f32,
    pub blend: BlendMode,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            zoom_x: 100.0,
            zoom_y: 100.0,
            precise: true,
            alpha: Rgba::WHITE,
            rotate: 0.0,
            blend: BlendMode::Normal,
        }
    }
}

pub trait Renderer {
    /// Fills the whole screen with `color`, alpha included.
    fn fade_to_color(&mut self, color: Rgba) -> Result<()>;
    fn register_active_rect(&mut self, rect: ActiveRect);
    fn blit(&mut self, blit: &Blit<'_>) -> Result<()>;
}
