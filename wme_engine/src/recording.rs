//! In-memory collaborators that record what the engine asked of them.
//!
//! Each recorder is a cheap clone over shared state, so a test keeps one
//! copy while the [`Game`] owns the other.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use anyhow::{bail, Result};
use serde::Serialize;
use wme_formats::{Rect, Rgba};

use crate::frame::FrameOwner;
use crate::game::{Game, SystemClock};
use crate::render::{ActiveRect, Blit, BlendMode, BlitMode, Renderer};
use crate::sound::{Sound, SoundId, SoundKind, SoundManager};
use crate::surface::{ColorKey, Surface, SurfaceStorage};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Fill(Rgba),
    ActiveRect(ActiveRect),
    Blit {
        surface: String,
        x: i32,
        y: i32,
        rect: Rect,
        mode: BlitMode,
        alpha: Rgba,
        blend: BlendMode,
        mirror_x: bool,
        mirror_y: bool,
    },
}

#[derive(Clone, Default)]
pub struct RecordingRenderer {
    events: Rc<RefCell<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.borrow().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn fade_to_color(&mut self, color: Rgba) -> Result<()> {
        self.events.borrow_mut().push(RenderEvent::Fill(color));
        Ok(())
    }

    fn register_active_rect(&mut self, rect: ActiveRect) {
        self.events.borrow_mut().push(RenderEvent::ActiveRect(rect));
    }

    fn blit(&mut self, blit: &Blit<'_>) -> Result<()> {
        self.events.borrow_mut().push(RenderEvent::Blit {
            surface: blit.surface.filename.clone(),
            x: blit.x,
            y: blit.y,
            rect: blit.rect,
            mode: blit.mode,
            alpha: blit.alpha,
            blend: blit.blend,
            mirror_x: blit.mirror_x,
            mirror_y: blit.mirror_y,
        });
        Ok(())
    }
}

#[derive(Default)]
struct SurfaceState {
    sizes: BTreeMap<String, (i32, i32)>,
    live: usize,
}

/// Surface storage backed by a table of known image sizes.
#[derive(Clone, Default)]
pub struct MemorySurfaces {
    state: Rc<RefCell<SurfaceState>>,
}

impl MemorySurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&self, filename: &str, width: i32, height: i32) {
        self.state
            .borrow_mut()
            .sizes
            .insert(filename.to_string(), (width, height));
    }

    /// Surfaces handed out and not yet removed.
    pub fn live_count(&self) -> usize {
        self.state.borrow().live
    }
}

impl SurfaceStorage for MemorySurfaces {
    fn add_surface(
        &mut self,
        filename: &str,
        color_key: ColorKey,
        _life_time: i32,
        _keep_loaded: bool,
    ) -> Result<Rc<Surface>> {
        let mut state = self.state.borrow_mut();
        let Some(&(width, height)) = state.sizes.get(filename) else {
            bail!("image '{filename}' not found");
        };
        state.live += 1;
        Ok(Rc::new(Surface {
            filename: filename.to_string(),
            width,
            height,
            color_key,
        }))
    }

    fn remove_surface(&mut self, _surface: &Rc<Surface>) {
        let mut state = self.state.borrow_mut();
        state.live = state.live.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoundEvent {
    Added { filename: String, id: u32 },
    Played { id: u32, looping: bool, position: u32 },
    Paused { id: u32 },
    Stopped { id: u32 },
    Removed { id: u32 },
}

struct SoundState {
    available: bool,
    known: BTreeSet<String>,
    next_id: u32,
    events: Vec<SoundEvent>,
}

/// Sound manager that accepts a fixed set of file names.
#[derive(Clone)]
pub struct RecordingSounds {
    state: Rc<RefCell<SoundState>>,
}

impl Default for RecordingSounds {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(SoundState {
                available: true,
                known: BTreeSet::new(),
                next_id: 1,
                events: Vec::new(),
            })),
        }
    }
}

impl RecordingSounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_known(&self, filename: &str) {
        self.state.borrow_mut().known.insert(filename.to_string());
    }

    pub fn set_available(&self, available: bool) {
        self.state.borrow_mut().available = available;
    }

    pub fn events(&self) -> Vec<SoundEvent> {
        self.state.borrow().events.clone()
    }
}

impl SoundManager for RecordingSounds {
    fn sound_available(&self) -> bool {
        self.state.borrow().available
    }

    fn add_sound(&mut self, filename: &str, _kind: SoundKind, _streamed: bool) -> Result<SoundId> {
        let mut state = self.state.borrow_mut();
        if !state.available {
            bail!("no sound device");
        }
        if !state.known.contains(filename) {
            bail!("sound '{filename}' not found");
        }
        let id = state.next_id;
        state.next_id += 1;
        state.events.push(SoundEvent::Added {
            filename: filename.to_string(),
            id,
        });
        Ok(SoundId(id))
    }

    fn play(&mut self, id: SoundId, looping: bool, position: u32) -> Result<()> {
        self.state.borrow_mut().events.push(SoundEvent::Played {
            id: id.0,
            looping,
            position,
        });
        Ok(())
    }

    fn pause(&mut self, id: SoundId) -> Result<()> {
        self.state
            .borrow_mut()
            .events
            .push(SoundEvent::Paused { id: id.0 });
        Ok(())
    }

    fn stop(&mut self, id: SoundId) -> Result<()> {
        self.state
            .borrow_mut()
            .events
            .push(SoundEvent::Stopped { id: id.0 });
        Ok(())
    }

    fn remove_sound(&mut self, id: SoundId) {
        self.state
            .borrow_mut()
            .events
            .push(SoundEvent::Removed { id: id.0 });
    }
}

/// Clock that only moves when told to.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u32>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: u32) {
        self.0.set(now_ms);
    }

    pub fn advance(&self, delta_ms: u32) {
        self.0.set(self.0.get().wrapping_add(delta_ms));
    }
}

impl SystemClock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum OwnerEvent {
    SoundUpdated(String),
    EventApplied(String),
}

/// Frame owner that only remembers what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingOwner {
    events: Vec<OwnerEvent>,
}

impl RecordingOwner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OwnerEvent> {
        self.events.clone()
    }
}

impl FrameOwner for RecordingOwner {
    fn update_one_sound(&mut self, sound: &mut Sound) {
        self.events.push(OwnerEvent::SoundUpdated(
            sound.filename().unwrap_or_default().to_string(),
        ));
    }

    fn apply_event(&mut self, event: &str) {
        self.events.push(OwnerEvent::EventApplied(event.to_string()));
    }
}

/// A [`Game`] wired to recorders, with handles to inspect them.
pub struct TestRig {
    pub game: Game,
    pub renderer: RecordingRenderer,
    pub sounds: RecordingSounds,
    pub surfaces: MemorySurfaces,
    pub clock: ManualClock,
}

impl TestRig {
    pub fn new() -> Self {
        let renderer = RecordingRenderer::new();
        let sounds = RecordingSounds::new();
        let surfaces = MemorySurfaces::new();
        let clock = ManualClock::new();
        let game = Game::new(
            Box::new(surfaces.clone()),
            Box::new(sounds.clone()),
            Box::new(renderer.clone()),
        )
        .with_clock(Box::new(clock.clone()));
        Self {
            game,
            renderer,
            sounds,
            surfaces,
            clock,
        }
    }

    pub fn with_image(self, filename: &str, width: i32, height: i32) -> Self {
        self.surfaces.add_image(filename, width, height);
        self
    }

    pub fn with_sound(self, filename: &str) -> Self {
        self.sounds.add_known(filename);
        self
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_track_live_handles() {
        let mut surfaces = MemorySurfaces::new();
        surfaces.add_image("a.png", 4, 2);
        let surface = surfaces
            .add_surface("a.png", ColorKey::Default, -1, false)
            .expect("surface");
        assert_eq!(surface.bounds(), Rect::new(0, 0, 4, 2));
        assert_eq!(surfaces.live_count(), 1);
        surfaces.remove_surface(&surface);
        assert_eq!(surfaces.live_count(), 0);
        assert!(surfaces.add_surface("b.png", ColorKey::Default, -1, false).is_err());
    }

    #[test]
    fn unavailable_device_rejects_sounds() {
        let mut sounds = RecordingSounds::new();
        sounds.add_known("a.wav");
        sounds.set_available(false);
        assert!(sounds.add_sound("a.wav", SoundKind::Sfx, false).is_err());
        sounds.set_available(true);
        assert_eq!(sounds.add_sound("a.wav", SoundKind::Sfx, false).ok(), Some(SoundId(1)));
        assert_eq!(
            sounds.events(),
            vec![SoundEvent::Added {
                filename: "a.wav".to_string(),
                id: 1
            }]
        );
    }
}
