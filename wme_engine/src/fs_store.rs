//! Directory-backed collaborators used by the host binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use wme_formats::Rgba;

use crate::render::{ActiveRect, Blit, Renderer};
use crate::sound::{SoundId, SoundKind, SoundManager};
use crate::surface::{ColorKey, Surface, SurfaceStorage};

/// Resource paths use `\` separators and are resolved against `root`.
fn resolve(root: &Path, filename: &str) -> PathBuf {
    let relative = filename.replace('\\', "/");
    root.join(relative.trim_start_matches('/'))
}

/// Surfaces sized from the image headers found under a data root.
pub struct DirSurfaceStorage {
    root: PathBuf,
    cache: HashMap<String, Rc<Surface>>,
}

impl DirSurfaceStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }
}

impl SurfaceStorage for DirSurfaceStorage {
    fn add_surface(
        &mut self,
        filename: &str,
        color_key: ColorKey,
        _life_time: i32,
        _keep_loaded: bool,
    ) -> Result<Rc<Surface>> {
        let key = filename.to_ascii_lowercase();
        if let Some(surface) = self.cache.get(&key).filter(|s| s.color_key == color_key) {
            return Ok(Rc::clone(surface));
        }

        let path = resolve(&self.root, filename);
        let (width, height) = image::image_dimensions(&path)
            .with_context(|| format!("failed to read image header: {}", path.display()))?;
        let surface = Rc::new(Surface {
            filename: filename.to_string(),
            width: i32::try_from(width).context("image too wide")?,
            height: i32::try_from(height).context("image too tall")?,
            color_key,
        });
        self.cache.insert(key, Rc::clone(&surface));
        Ok(surface)
    }

    fn remove_surface(&mut self, surface: &Rc<Surface>) {
        let key = surface.filename.to_ascii_lowercase();
        // One reference is the cache's own; the caller's is the other.
        if self
            .cache
            .get(&key)
            .is_some_and(|cached| Rc::ptr_eq(cached, surface) && Rc::strong_count(cached) <= 2)
        {
            self.cache.remove(&key);
        }
    }
}

/// Sound buffers backed by files under a data root. Nothing is audible;
/// playback requests are logged.
pub struct FileSoundManager {
    root: PathBuf,
    available: bool,
    next_id: u32,
    buffers: HashMap<SoundId, String>,
}

impl FileSoundManager {
    pub fn new(root: impl Into<PathBuf>, available: bool) -> Self {
        Self {
            root: root.into(),
            available,
            next_id: 1,
            buffers: HashMap::new(),
        }
    }

    fn name(&self, id: SoundId) -> &str {
        self.buffers.get(&id).map_or("?", String::as_str)
    }
}

impl SoundManager for FileSoundManager {
    fn sound_available(&self) -> bool {
        self.available
    }

    fn add_sound(&mut self, filename: &str, kind: SoundKind, streamed: bool) -> Result<SoundId> {
        if !self.available {
            bail!("sound device is not available");
        }
        let path = resolve(&self.root, filename);
        if !path.is_file() {
            bail!("sound file not found: {}", path.display());
        }
        let id = SoundId(self.next_id);
        self.next_id += 1;
        log::debug!("sound {} loaded from {} ({kind:?}, streamed={streamed})", id.0, path.display());
        self.buffers.insert(id, filename.to_string());
        Ok(id)
    }

    fn play(&mut self, id: SoundId, looping: bool, position: u32) -> Result<()> {
        log::info!("play '{}' (looping={looping}, position={position})", self.name(id));
        Ok(())
    }

    fn pause(&mut self, id: SoundId) -> Result<()> {
        log::info!("pause '{}'", self.name(id));
        Ok(())
    }

    fn stop(&mut self, id: SoundId) -> Result<()> {
        log::info!("stop '{}'", self.name(id));
        Ok(())
    }

    fn remove_sound(&mut self, id: SoundId) {
        self.buffers.remove(&id);
    }
}

/// Renderer that only describes each request in the log.
#[derive(Default)]
pub struct LoggingRenderer;

impl Renderer for LoggingRenderer {
    fn fade_to_color(&mut self, color: Rgba) -> Result<()> {
        log::debug!("fill screen with {:#010x}", color.0);
        Ok(())
    }

    fn register_active_rect(&mut self, rect: ActiveRect) {
        log::debug!(
            "active rect for owner {} at ({}, {}) {}x{}",
            rect.owner.0,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }

    fn blit(&mut self, blit: &Blit<'_>) -> Result<()> {
        log::debug!(
            "blit {} at ({}, {}) {:?} alpha {:#010x}",
            blit.surface.filename,
            blit.x,
            blit.y,
            blit.mode,
            blit.alpha.0
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) -> Result<()> {
        let pixels = vec![0u8; (width * height * 4) as usize];
        let file = std::fs::File::create(path)?;
        PngEncoder::new(file).write_image(&pixels, width, height, ColorType::Rgba8)?;
        Ok(())
    }

    #[test]
    fn surfaces_are_sized_from_png_headers() -> Result<()> {
        let dir = tempdir()?;
        std::fs::create_dir(dir.path().join("sprites"))?;
        write_png(&dir.path().join("sprites").join("walk.png"), 12, 7)?;

        let mut storage = DirSurfaceStorage::new(dir.path());
        let surface = storage.add_surface("sprites\\walk.png", ColorKey::Default, -1, false)?;
        assert_eq!((surface.width, surface.height), (12, 7));

        let again = storage.add_surface("SPRITES\\WALK.PNG", ColorKey::Default, -1, false)?;
        assert!(Rc::ptr_eq(&surface, &again));

        assert!(storage
            .add_surface("missing.png", ColorKey::Default, -1, false)
            .is_err());
        Ok(())
    }

    #[test]
    fn sounds_need_a_device_and_a_file() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("step.ogg"), b"OggS")?;

        let mut sounds = FileSoundManager::new(dir.path(), true);
        let id = sounds.add_sound("step.ogg", SoundKind::Sfx, false)?;
        sounds.play(id, false, 0)?;
        assert!(sounds.add_sound("none.ogg", SoundKind::Sfx, false).is_err());

        let mut muted = FileSoundManager::new(dir.path(), false);
        assert!(muted.add_sound("step.ogg", SoundKind::Sfx, false).is_err());
        Ok(())
    }
}
