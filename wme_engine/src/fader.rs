use anyhow::Result;
use wme_formats::Rgba;
use wme_persist::{Persist, PersistError, PersistMgr};

use crate::game::Game;

/// Timed full-screen colour overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Fader {
    active: bool,
    ready: bool,
    red: u8,
    green: u8,
    blue: u8,
    current_alpha: u8,
    source_alpha: u8,
    target_alpha: u8,
    duration: u32,
    start_time: u32,
    /// Timed against the wall clock rather than the game timer.
    system: bool,
}

impl Default for Fader {
    fn default() -> Self {
        Self {
            active: false,
            ready: false,
            red: 0,
            green: 0,
            blue: 0,
            current_alpha: 0,
            source_alpha: 0,
            target_alpha: 0,
            duration: 1000,
            start_time: 0,
            system: false,
        }
    }
}

impl Fader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn current_alpha(&self) -> u8 {
        self.current_alpha
    }

    pub fn current_color(&self) -> Rgba {
        Rgba::new(self.red, self.green, self.blue, self.current_alpha)
    }

    fn now(&self, game: &Game) -> u32 {
        if self.system {
            game.system_time()
        } else {
            game.timer
        }
    }

    fn start(&mut self, game: &Game, color: Rgba, duration: u32, system: bool) {
        self.ready = false;
        self.active = true;
        self.red = color.r();
        self.green = color.g();
        self.blue = color.b();
        self.duration = duration;
        self.system = system;
        self.start_time = self.now(game);
    }

    /// Fades from `color` (its alpha included) to fully transparent.
    pub fn fade_in(&mut self, game: &Game, color: Rgba, duration: u32, system: bool) {
        self.source_alpha = color.a();
        self.target_alpha = 0;
        self.start(game, color, duration, system);
    }

    /// Fades from whatever is on screen now to `color`.
    pub fn fade_out(&mut self, game: &Game, color: Rgba, duration: u32, system: bool) {
        self.source_alpha = self.current_alpha;
        self.target_alpha = color.a();
        self.start(game, color, duration, system);
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.ready = true;
    }

    pub fn update(&mut self, game: &Game) {
        if !self.active {
            return;
        }

        let elapsed = self.now(game).wrapping_sub(self.start_time);
        if elapsed >= self.duration {
            self.current_alpha = self.target_alpha;
        } else {
            let source = f32::from(self.source_alpha);
            let delta = f32::from(self.target_alpha) - source;
            let progress = elapsed as f32 / self.duration as f32;
            self.current_alpha = (source + progress * delta).clamp(0.0, 255.0) as u8;
        }

        self.ready = elapsed >= self.duration;
        if self.ready && self.current_alpha == 0 {
            self.active = false;
        }
    }

    pub fn display(&self, game: &mut Game) -> Result<()> {
        if self.active && self.current_alpha > 0 {
            game.renderer.fade_to_color(self.current_color())?;
        }
        Ok(())
    }
}

impl Persist for Fader {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        mgr.transfer("active", &mut self.active)?;
        mgr.transfer("blue", &mut self.blue)?;
        mgr.transfer("current_alpha", &mut self.current_alpha)?;
        mgr.transfer("duration", &mut self.duration)?;
        mgr.transfer("green", &mut self.green)?;
        mgr.transfer("red", &mut self.red)?;
        mgr.transfer("source_alpha", &mut self.source_alpha)?;
        mgr.transfer("start_time", &mut self.start_time)?;
        mgr.transfer("target_alpha", &mut self.target_alpha)?;
        mgr.transfer("system", &mut self.system)?;

        // The wall clock restarts with the process.
        if self.system && !mgr.is_saving() {
            self.start_time = 0;
        }
        Ok(())
    }
}
