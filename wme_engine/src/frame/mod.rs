//! Live animation frames.
//!
//! A [`Frame`] is built from a parsed [`FrameDef`], loading every subframe
//! image and the optional sound through the [`Game`] collaborators. It owns
//! its subframes exclusively; scripts reach them through handles only.

use anyhow::Result;
use wme_formats::{FrameDef, ParseError, Rect};
use wme_persist::{Persist, PersistError, PersistMgr};

use crate::error::LoadError;
use crate::game::Game;
use crate::handle_list::{HandleList, SubframeHandle};
use crate::render::{DrawParams, OwnerId};
use crate::script::ScriptableBase;
use crate::sound::{Sound, SoundKind};
use crate::subframe::Subframe;

mod scripting;

/// Object an animation frame is displayed for.
pub trait FrameOwner {
    /// Lets the owner adjust (and track) a sound before the frame plays it.
    fn update_one_sound(&mut self, sound: &mut Sound);
    fn apply_event(&mut self, event: &str);
}

#[derive(Debug, Default)]
pub struct Frame {
    pub base: ScriptableBase,
    pub delay: u32,
    pub move_x: i32,
    pub move_y: i32,
    pub keyframe: bool,
    pub kill_sound: bool,
    pub editor_expanded: bool,
    sound: Option<Sound>,
    subframes: HandleList<Subframe>,
    apply_events: Vec<String>,
}

impl Frame {
    /// Parses and builds a complete `FRAME { ... }` definition.
    pub fn load(game: &mut Game, text: &str) -> Result<Self, LoadError> {
        let def = FrameDef::parse_definition(text).inspect_err(report_parse_error)?;
        Self::from_def(game, &def)
    }

    /// Builds a frame from the body of a `FRAME` block.
    pub fn load_body(game: &mut Game, body: &str) -> Result<Self, LoadError> {
        let def = FrameDef::parse_body(body).inspect_err(report_parse_error)?;
        Self::from_def(game, &def)
    }

    pub fn from_def(game: &mut Game, def: &FrameDef) -> Result<Self, LoadError> {
        let mut frame = Frame {
            base: ScriptableBase::with_editor_props(def.editor_props.clone()),
            delay: def.delay,
            move_x: def.move_x,
            move_y: def.move_y,
            keyframe: def.keyframe,
            kill_sound: def.kill_sound,
            editor_expanded: def.editor_expanded,
            apply_events: def.apply_events.clone(),
            ..Frame::default()
        };

        for (position, sub_def) in def.subframes.iter().enumerate() {
            match Subframe::from_def(game, sub_def) {
                Ok(sub) => {
                    frame.subframes.push(sub);
                }
                Err(err) => {
                    log::error!("Error loading SUBFRAME: {err:#}");
                    log::error!("Error loading FRAME definition");
                    frame.release(game);
                    return Err(LoadError::Generic(format!(
                        "subframe {position} could not be built: {err:#}"
                    )));
                }
            }
        }

        if let Some(filename) = &def.sound {
            let mut sound = Sound::new();
            match sound.set_sound(game, filename, SoundKind::Sfx, false) {
                Ok(()) => frame.sound = Some(sound),
                Err(err) => {
                    if game.sounds.sound_available() {
                        log::error!("Error loading sound '{filename}': {err:#}");
                    }
                }
            }
        }

        Ok(frame)
    }

    /// Drops every subframe and the sound, handing their resources back.
    pub fn release(&mut self, game: &mut Game) {
        for mut sub in self.subframes.drain() {
            sub.release(game);
        }
        if let Some(mut sound) = self.sound.take() {
            sound.release(game);
        }
    }

    pub fn sound(&self) -> Option<&Sound> {
        self.sound.as_ref()
    }

    pub fn subframes(&self) -> &HandleList<Subframe> {
        &self.subframes
    }

    pub fn subframe(&self, handle: SubframeHandle) -> Option<&Subframe> {
        self.subframes.get(handle)
    }

    pub fn subframe_mut(&mut self, handle: SubframeHandle) -> Option<&mut Subframe> {
        self.subframes.get_mut(handle)
    }

    pub fn apply_events(&self) -> &[String] {
        &self.apply_events
    }

    /// Adds `event` unless an event with the same name, ignoring case, exists.
    pub fn add_event(&mut self, event: &str) -> bool {
        if self
            .apply_events
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(event))
        {
            return false;
        }
        self.apply_events.push(event.to_string());
        true
    }

    /// Removes the first event matching `event`, ignoring case.
    pub fn delete_event(&mut self, event: &str) -> bool {
        match self
            .apply_events
            .iter()
            .position(|existing| existing.eq_ignore_ascii_case(event))
        {
            Some(position) => {
                self.apply_events.remove(position);
                true
            }
            None => false,
        }
    }

    /// Draws every subframe in order; the first failure stops the frame.
    pub fn draw(
        &self,
        game: &mut Game,
        x: i32,
        y: i32,
        owner: Option<OwnerId>,
        params: &DrawParams,
    ) -> Result<()> {
        for (handle, sub) in self.subframes.iter() {
            sub.draw(game, handle, x, y, owner, params)?;
        }
        Ok(())
    }

    /// Runs the side effects of entering this frame: plays the sound unless
    /// `muted` and dispatches every apply event to `owner`.
    pub fn one_time_display(
        &mut self,
        game: &mut Game,
        owner: Option<&mut dyn FrameOwner>,
        muted: bool,
    ) -> Result<()> {
        let mut owner = owner;
        if !muted {
            if let Some(sound) = self.sound.as_mut() {
                if let Some(owner) = owner.as_deref_mut() {
                    owner.update_one_sound(sound);
                }
                sound.play(game, false)?;
                if game.frozen {
                    sound.pause(game)?;
                }
            }
        }
        if let Some(owner) = owner {
            for event in &self.apply_events {
                owner.apply_event(event);
            }
        }
        Ok(())
    }

    /// Union of the subframe rectangles at `(x, y)`, decorations included.
    pub fn bounding_rect(&self, x: i32, y: i32, scale_x: f32, scale_y: f32) -> Rect {
        self.subframes
            .values()
            .map(|sub| sub.bounding_rect(x, y, scale_x, scale_y))
            .fold(Rect::EMPTY, |acc, rect| acc.union(&rect))
    }

    pub fn to_def(&self) -> FrameDef {
        FrameDef {
            delay: self.delay,
            move_x: self.move_x,
            move_y: self.move_y,
            keyframe: self.keyframe,
            kill_sound: self.kill_sound,
            editor_expanded: self.editor_expanded,
            sound: self
                .sound
                .as_ref()
                .and_then(|sound| sound.filename())
                .map(str::to_string),
            subframes: self.subframes.values().map(Subframe::to_def).collect(),
            apply_events: self.apply_events.clone(),
            editor_props: self.base.editor_props.clone(),
        }
    }

    pub fn to_text(&self) -> String {
        self.to_def().to_text()
    }

    /// Re-acquires surfaces and the sound buffer after a load.
    pub fn restore(&mut self, game: &mut Game) -> Result<()> {
        for sub in self.subframes.values_mut() {
            sub.restore(game)?;
        }
        if let Some(sound) = self.sound.as_mut() {
            if let Err(err) = sound.restore(game) {
                if game.sounds.sound_available() {
                    log::error!(
                        "Error loading sound '{}': {err:#}",
                        sound.filename().unwrap_or_default()
                    );
                }
            }
        }
        Ok(())
    }
}

fn report_parse_error(err: &ParseError) {
    match err {
        ParseError::TokenNotFound { .. } => log::error!("Syntax error in FRAME definition: {err}"),
        ParseError::Malformed { .. } => log::error!("Error loading FRAME definition: {err}"),
    }
}

impl Persist for Frame {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        self.base.persist(mgr)?;
        mgr.transfer("apply_events", &mut self.apply_events)?;
        mgr.transfer("delay", &mut self.delay)?;
        mgr.transfer("editor_expanded", &mut self.editor_expanded)?;
        mgr.transfer("keyframe", &mut self.keyframe)?;
        mgr.transfer("kill_sound", &mut self.kill_sound)?;
        mgr.transfer("move_x", &mut self.move_x)?;
        mgr.transfer("move_y", &mut self.move_y)?;

        let mut has_sound = self.sound.is_some();
        mgr.transfer("sound", &mut has_sound)?;
        if !mgr.is_saving() {
            self.sound = has_sound.then(Sound::new);
        }
        if let Some(sound) = self.sound.as_mut() {
            sound.persist(mgr)?;
        }

        self.subframes.persist(mgr)
    }
}
