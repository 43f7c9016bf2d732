use std::time::Instant;

use crate::render::Renderer;
use crate::sound::SoundManager;
use crate::surface::SurfaceStorage;

/// Source of wall-clock milliseconds.
pub trait SystemClock {
    fn now_ms(&self) -> u32;
}

/// Milliseconds since the clock was created.
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock for WallClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// Collaborators and shared state every runtime object is driven against.
pub struct Game {
    /// Game-logical clock in milliseconds, advanced by the host each tick.
    pub timer: u32,
    /// Skips blits while still registering hit-test rects.
    pub suspended_rendering: bool,
    /// Newly started sounds are paused right away while frozen.
    pub frozen: bool,
    pub clock: Box<dyn SystemClock>,
    pub surfaces: Box<dyn SurfaceStorage>,
    pub sounds: Box<dyn SoundManager>,
    pub renderer: Box<dyn Renderer>,
}

impl Game {
    pub fn new(
        surfaces: Box<dyn SurfaceStorage>,
        sounds: Box<dyn SoundManager>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            timer: 0,
            suspended_rendering: false,
            frozen: false,
            clock: Box::new(WallClock::new()),
            surfaces,
            sounds,
            renderer,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn SystemClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn system_time(&self) -> u32 {
        self.clock.now_ms()
    }
}
