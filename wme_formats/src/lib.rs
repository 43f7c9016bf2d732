pub mod editor;
pub mod frame;
pub mod geometry;
pub mod parser;
pub mod text;

pub use editor::EditorProps;
pub use frame::{FrameDef, SubframeDef};
pub use geometry::{Rect, Rgba};
pub use parser::{Command, ParseError, ScanTarget, TokenParser, scan_str};
pub use text::TextBuffer;
