use std::rc::Rc;

use anyhow::Result;
use wme_formats::{Rect, Rgba};

/// How transparent pixels of a surface are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorKey {
    /// Engine default keying (magenta and the image's own alpha).
    Default,
    Custom(Rgba),
}

/// A decoded image as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub filename: String,
    pub width: i32,
    pub height: i32,
    pub color_key: ColorKey,
}

impl Surface {
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

/// Shared image cache consulted whenever a subframe needs a surface.
pub trait SurfaceStorage {
    fn add_surface(
        &mut self,
        filename: &str,
        color_key: ColorKey,
        life_time: i32,
        keep_loaded: bool,
    ) -> Result<Rc<Surface>>;

    fn remove_surface(&mut self, _surface: &Rc<Surface>) {}
}
