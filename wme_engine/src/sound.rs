use anyhow::Result;
use wme_persist::{Persist, PersistError, PersistMgr};

use crate::game::Game;

/// Buffer identifier handed out by a [`SoundManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoundKind {
    #[default]
    Sfx,
    Music,
    Speech,
}

impl SoundKind {
    fn code(self) -> u8 {
        match self {
            SoundKind::Sfx => 0,
            SoundKind::Music => 1,
            SoundKind::Speech => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => SoundKind::Music,
            2 => SoundKind::Speech,
            _ => SoundKind::Sfx,
        }
    }
}

pub trait SoundManager {
    fn sound_available(&self) -> bool;
    /// Fails when the file is missing or no sound device is available.
    fn add_sound(&mut self, filename: &str, kind: SoundKind, streamed: bool) -> Result<SoundId>;
    fn play(&mut self, id: SoundId, looping: bool, position: u32) -> Result<()>;
    fn pause(&mut self, id: SoundId) -> Result<()>;
    fn stop(&mut self, id: SoundId) -> Result<()>;
    fn remove_sound(&mut self, id: SoundId);
}

/// A sound attached to a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sound {
    filename: Option<String>,
    kind: SoundKind,
    streamed: bool,
    looping: bool,
    playing: bool,
    position: u32,
    buffer: Option<SoundId>,
}

impl Sound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn kind(&self) -> SoundKind {
        self.kind
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn buffer(&self) -> Option<SoundId> {
        self.buffer
    }

    /// Loads `filename` into a fresh buffer, releasing the previous one.
    pub fn set_sound(
        &mut self,
        game: &mut Game,
        filename: &str,
        kind: SoundKind,
        streamed: bool,
    ) -> Result<()> {
        self.release(game);
        let id = game.sounds.add_sound(filename, kind, streamed)?;
        self.buffer = Some(id);
        self.filename = Some(filename.to_string());
        self.kind = kind;
        self.streamed = streamed;
        Ok(())
    }

    pub fn play(&mut self, game: &mut Game, looping: bool) -> Result<()> {
        if let Some(id) = self.buffer {
            self.looping = looping;
            self.playing = true;
            game.sounds.play(id, looping, self.position)?;
        }
        Ok(())
    }

    pub fn pause(&mut self, game: &mut Game) -> Result<()> {
        if let Some(id) = self.buffer {
            game.sounds.pause(id)?;
        }
        Ok(())
    }

    pub fn stop(&mut self, game: &mut Game) -> Result<()> {
        if let Some(id) = self.buffer {
            self.playing = false;
            self.position = 0;
            game.sounds.stop(id)?;
        }
        Ok(())
    }

    pub fn release(&mut self, game: &mut Game) {
        if let Some(id) = self.buffer.take() {
            game.sounds.remove_sound(id);
        }
    }

    /// Re-acquires the buffer after a load and resumes playback if it was
    /// playing when saved.
    pub fn restore(&mut self, game: &mut Game) -> Result<()> {
        let Some(filename) = self.filename.clone() else {
            return Ok(());
        };
        let id = game.sounds.add_sound(&filename, self.kind, self.streamed)?;
        self.buffer = Some(id);
        if self.playing {
            game.sounds.play(id, self.looping, self.position)?;
        }
        Ok(())
    }
}

impl Persist for Sound {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        mgr.transfer("sound_filename", &mut self.filename)?;
        let mut kind = self.kind.code();
        mgr.transfer("sound_type", &mut kind)?;
        self.kind = SoundKind::from_code(kind);
        mgr.transfer("sound_looping", &mut self.looping)?;
        mgr.transfer("sound_playing", &mut self.playing)?;
        mgr.transfer("sound_position", &mut self.position)?;
        mgr.transfer("sound_streamed", &mut self.streamed)?;
        if !mgr.is_saving() {
            self.buffer = None;
        }
        Ok(())
    }
}
