//! Live runtime for WME animation frames: loading against engine
//! collaborators, per-tick display, script dispatch, the screen fader and
//! save-state persistence.

pub mod error;
pub mod fader;
pub mod frame;
pub mod fs_store;
pub mod game;
pub mod handle_list;
pub mod lua_host;
pub mod recording;
pub mod render;
pub mod script;
pub mod settings;
pub mod sound;
pub mod subframe;
pub mod surface;

pub use error::{LoadError, ScriptError};
pub use fader::Fader;
pub use frame::{Frame, FrameOwner};
pub use game::Game;
pub use subframe::Subframe;
