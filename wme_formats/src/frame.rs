//! Declarative `FRAME { ... }` / `SUBFRAME { ... }` definitions.
//!
//! [`FrameDef`] is the parsed, engine-independent view of one animation frame.
//! It keeps exactly what the text said (image paths, colour keys, rectangles)
//! and leaves surface loading and sound acquisition to the runtime.

use serde::Serialize;

use crate::editor::EditorProps;
use crate::geometry::{Rect, Rgba};
use crate::parser::{Command, ParseError, ScanTarget, TokenParser, scan_str};
use crate::text::{TextBuffer, bool_word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Frame,
    Delay,
    Image,
    Transparent,
    Rect,
    Hotspot,
    Move,
    TwoDOnly,
    ThreeDOnly,
    MirrorX,
    MirrorY,
    AlphaColor,
    Alpha,
    EditorSelected,
    EditorExpanded,
    EditorProperty,
    KillSound,
    Subframe,
    Sound,
    Keyframe,
    Decoration,
    ApplyEvent,
}

const DEFINITION_COMMANDS: &[(&str, Token)] = &[("FRAME", Token::Frame)];

const FRAME_COMMANDS: &[(&str, Token)] = &[
    ("DELAY", Token::Delay),
    ("IMAGE", Token::Image),
    ("TRANSPARENT", Token::Transparent),
    ("RECT", Token::Rect),
    ("HOTSPOT", Token::Hotspot),
    ("2D_ONLY", Token::TwoDOnly),
    ("3D_ONLY", Token::ThreeDOnly),
    ("MIRROR_X", Token::MirrorX),
    ("MIRROR_Y", Token::MirrorY),
    ("MOVE", Token::Move),
    ("ALPHA_COLOR", Token::AlphaColor),
    ("ALPHA", Token::Alpha),
    ("SUBFRAME", Token::Subframe),
    ("SOUND", Token::Sound),
    ("KEYFRAME", Token::Keyframe),
    ("DECORATION", Token::Decoration),
    ("APPLY_EVENT", Token::ApplyEvent),
    ("EDITOR_SELECTED", Token::EditorSelected),
    ("EDITOR_EXPANDED", Token::EditorExpanded),
    ("EDITOR_PROPERTY", Token::EditorProperty),
    ("KILL_SOUND", Token::KillSound),
];

const SUBFRAME_COMMANDS: &[(&str, Token)] = &[
    ("IMAGE", Token::Image),
    ("TRANSPARENT", Token::Transparent),
    ("RECT", Token::Rect),
    ("HOTSPOT", Token::Hotspot),
    ("2D_ONLY", Token::TwoDOnly),
    ("3D_ONLY", Token::ThreeDOnly),
    ("DECORATION", Token::Decoration),
    ("ALPHA_COLOR", Token::AlphaColor),
    ("ALPHA", Token::Alpha),
    ("MIRROR_X", Token::MirrorX),
    ("MIRROR_Y", Token::MirrorY),
    ("EDITOR_SELECTED", Token::EditorSelected),
    ("EDITOR_PROPERTY", Token::EditorProperty),
];

/// One drawable element of a frame as written in the definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubframeDef {
    pub image: Option<String>,
    /// Custom colour key; `None` keeps the engine default keying.
    pub transparent: Option<Rgba>,
    /// Source rectangle; `None` means the full image.
    pub rect: Option<Rect>,
    pub hotspot_x: i32,
    pub hotspot_y: i32,
    pub alpha: Rgba,
    pub two_d_only: bool,
    pub three_d_only: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub decoration: bool,
    pub editor_selected: bool,
    pub editor_props: EditorProps,
}

impl Default for SubframeDef {
    fn default() -> Self {
        Self {
            image: None,
            transparent: None,
            rect: None,
            hotspot_x: 0,
            hotspot_y: 0,
            alpha: Rgba::WHITE,
            two_d_only: false,
            three_d_only: false,
            mirror_x: false,
            mirror_y: false,
            decoration: false,
            editor_selected: false,
            editor_props: EditorProps::default(),
        }
    }
}

impl SubframeDef {
    /// Parses the inner text of a `SUBFRAME { ... }` block.
    pub fn parse_body(body: &str, line: usize) -> Result<Self, ParseError> {
        let mut parser = TokenParser::at_line(body, SUBFRAME_COMMANDS, line);
        let mut fields = VisualFields::default();
        let mut editor_props = EditorProps::default();
        while let Some(cmd) = parser.next_command()? {
            if cmd.token == Token::EditorProperty {
                editor_props.parse_property(cmd.params, cmd.params_line)?;
            } else {
                fields.apply(&cmd);
            }
        }
        Ok(fields.finish(true, editor_props))
    }

    /// Writes the subframe; `complete` wraps it in its own `SUBFRAME` block,
    /// otherwise the fields are merged into the enclosing frame block.
    pub fn write_text(&self, out: &mut TextBuffer, indent: usize, complete: bool) {
        if complete {
            out.put_indented(indent, format_args!("SUBFRAME {{\n"));
        }
        let inner = indent + 2;
        if let Some(image) = &self.image {
            out.put_indented(inner, format_args!("IMAGE = \"{image}\"\n"));
        }
        if let Some(key) = self.transparent.filter(|key| *key != Rgba::MAGENTA) {
            out.put_indented(
                inner,
                format_args!("TRANSPARENT {{ {},{},{} }}\n", key.r(), key.g(), key.b()),
            );
        }
        if let Some(rect) = self.rect {
            out.put_indented(
                inner,
                format_args!(
                    "RECT {{ {},{},{},{} }}\n",
                    rect.left, rect.top, rect.right, rect.bottom
                ),
            );
        }
        if self.hotspot_x != 0 || self.hotspot_y != 0 {
            out.put_indented(
                inner,
                format_args!("HOTSPOT {{{}, {}}}\n", self.hotspot_x, self.hotspot_y),
            );
        }
        if self.alpha != Rgba::WHITE {
            let alpha = self.alpha;
            out.put_indented(
                inner,
                format_args!("ALPHA_COLOR {{ {},{},{} }}\n", alpha.r(), alpha.g(), alpha.b()),
            );
            out.put_indented(inner, format_args!("ALPHA = {}\n", alpha.a()));
        }
        let flags = [
            ("MIRROR_X", self.mirror_x),
            ("MIRROR_Y", self.mirror_y),
            ("2D_ONLY", self.two_d_only),
            ("3D_ONLY", self.three_d_only),
            ("DECORATION", self.decoration),
            ("EDITOR_SELECTED", self.editor_selected),
        ];
        for (name, _) in flags.iter().filter(|(_, set)| *set) {
            out.put_indented(inner, format_args!("{name}={}\n", bool_word(true)));
        }
        self.editor_props.write_text(out, inner);
        if complete {
            out.put_indented(indent, format_args!("}}\n\n"));
        }
    }
}

/// Visual fields shared by the frame body and `SUBFRAME` blocks.
struct VisualFields {
    image: Option<String>,
    transparent: Option<[i32; 3]>,
    rect: Rect,
    hotspot: [i32; 2],
    alpha_rgb: [i32; 3],
    alpha: i32,
    two_d_only: bool,
    three_d_only: bool,
    mirror_x: bool,
    mirror_y: bool,
    decoration: bool,
    editor_selected: bool,
}

impl Default for VisualFields {
    fn default() -> Self {
        Self {
            image: None,
            transparent: None,
            rect: Rect::EMPTY,
            hotspot: [0, 0],
            alpha_rgb: [255, 255, 255],
            alpha: 255,
            two_d_only: false,
            three_d_only: false,
            mirror_x: false,
            mirror_y: false,
            decoration: false,
            editor_selected: false,
        }
    }
}

impl VisualFields {
    /// Applies a visual command; returns `false` for anything else.
    fn apply(&mut self, cmd: &Command<'_, Token>) -> bool {
        let params = cmd.params;
        match cmd.token {
            Token::Image => self.image = Some(params.to_string()),
            Token::Transparent => {
                let [mut r, mut g, mut b] = [255, 255, 255];
                scan_str(
                    params,
                    "%d,%d,%d",
                    &mut [
                        ScanTarget::Int(&mut r),
                        ScanTarget::Int(&mut g),
                        ScanTarget::Int(&mut b),
                    ],
                );
                self.transparent = Some([r, g, b]);
            }
            Token::Rect => {
                let rect = &mut self.rect;
                scan_str(
                    params,
                    "%d,%d,%d,%d",
                    &mut [
                        ScanTarget::Int(&mut rect.left),
                        ScanTarget::Int(&mut rect.top),
                        ScanTarget::Int(&mut rect.right),
                        ScanTarget::Int(&mut rect.bottom),
                    ],
                );
            }
            Token::Hotspot => {
                let [x, y] = &mut self.hotspot;
                scan_str(params, "%d,%d", &mut [ScanTarget::Int(x), ScanTarget::Int(y)]);
            }
            Token::AlphaColor => {
                let [r, g, b] = &mut self.alpha_rgb;
                scan_str(
                    params,
                    "%d,%d,%d",
                    &mut [ScanTarget::Int(r), ScanTarget::Int(g), ScanTarget::Int(b)],
                );
            }
            Token::Alpha => {
                scan_str(params, "%d", &mut [ScanTarget::Int(&mut self.alpha)]);
            }
            Token::TwoDOnly => scan_flag(params, &mut self.two_d_only),
            Token::ThreeDOnly => scan_flag(params, &mut self.three_d_only),
            Token::MirrorX => scan_flag(params, &mut self.mirror_x),
            Token::MirrorY => scan_flag(params, &mut self.mirror_y),
            Token::Decoration => scan_flag(params, &mut self.decoration),
            Token::EditorSelected => scan_flag(params, &mut self.editor_selected),
            _ => return false,
        }
        true
    }

    /// `colors_need_image` drops the alpha colour and key when no image was
    /// given, which is how the frame body treats its legacy fields.
    fn finish(self, colors_need_image: bool, editor_props: EditorProps) -> SubframeDef {
        let colored = !colors_need_image || self.image.is_some();
        let [ar, ag, ab] = self.alpha_rgb;
        SubframeDef {
            transparent: self
                .transparent
                .filter(|_| colored)
                .map(|[r, g, b]| Rgba::from_ints(r, g, b, 255)),
            alpha: if colored {
                Rgba::from_ints(ar, ag, ab, self.alpha)
            } else {
                Rgba::WHITE
            },
            image: self.image,
            rect: (!self.rect.is_empty()).then_some(self.rect),
            hotspot_x: self.hotspot[0],
            hotspot_y: self.hotspot[1],
            two_d_only: self.two_d_only,
            three_d_only: self.three_d_only,
            mirror_x: self.mirror_x,
            mirror_y: self.mirror_y,
            decoration: self.decoration,
            editor_selected: self.editor_selected,
            editor_props,
        }
    }
}

fn scan_flag(params: &str, flag: &mut bool) {
    scan_str(params, "%b", &mut [ScanTarget::Bool(flag)]);
}

/// A parsed animation frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameDef {
    pub delay: u32,
    pub move_x: i32,
    pub move_y: i32,
    pub keyframe: bool,
    pub kill_sound: bool,
    pub editor_expanded: bool,
    pub sound: Option<String>,
    /// Draw order. Index 0 holds the subframe built from the legacy
    /// top-level fields when the body had an `IMAGE` or no `SUBFRAME` at all.
    pub subframes: Vec<SubframeDef>,
    /// Duplicates are kept; only script-side additions deduplicate.
    pub apply_events: Vec<String>,
    pub editor_props: EditorProps,
}

impl FrameDef {
    /// Parses a complete `FRAME { ... }` definition.
    pub fn parse_definition(text: &str) -> Result<Self, ParseError> {
        let mut parser = TokenParser::new(text, DEFINITION_COMMANDS);
        match parser.next_command()? {
            Some(cmd) if cmd.token == Token::Frame => Self::parse_body_at(cmd.params, cmd.params_line),
            _ => Err(ParseError::TokenNotFound {
                line: parser.line(),
                offender: "'FRAME' keyword expected".to_string(),
            }),
        }
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|err| ParseError::Malformed {
            line: 1,
            reason: format!("definition is not valid UTF-8: {err}"),
        })?;
        Self::parse_definition(text)
    }

    /// Parses a frame body, the text between the braces of `FRAME { }`.
    pub fn parse_body(body: &str) -> Result<Self, ParseError> {
        Self::parse_body_at(body, 1)
    }

    fn parse_body_at(body: &str, line: usize) -> Result<Self, ParseError> {
        let mut parser = TokenParser::at_line(body, FRAME_COMMANDS, line);
        let mut frame = FrameDef::default();
        let mut legacy = VisualFields::default();

        while let Some(cmd) = parser.next_command()? {
            if legacy.apply(&cmd) {
                continue;
            }
            let params = cmd.params;
            match cmd.token {
                Token::Delay => {
                    let mut delay = 0;
                    scan_str(params, "%d", &mut [ScanTarget::Int(&mut delay)]);
                    frame.delay = delay.max(0) as u32;
                }
                Token::Move => {
                    scan_str(
                        params,
                        "%d,%d",
                        &mut [
                            ScanTarget::Int(&mut frame.move_x),
                            ScanTarget::Int(&mut frame.move_y),
                        ],
                    );
                }
                Token::Keyframe => scan_flag(params, &mut frame.keyframe),
                Token::KillSound => scan_flag(params, &mut frame.kill_sound),
                Token::EditorExpanded => scan_flag(params, &mut frame.editor_expanded),
                Token::Subframe => frame
                    .subframes
                    .push(SubframeDef::parse_body(params, cmd.params_line)?),
                Token::Sound => frame.sound = Some(params.to_string()),
                Token::ApplyEvent => frame.apply_events.push(params.to_string()),
                Token::EditorProperty => frame.editor_props.parse_property(params, cmd.params_line)?,
                _ => {}
            }
        }

        if legacy.image.is_some() || frame.subframes.is_empty() {
            frame
                .subframes
                .insert(0, legacy.finish(true, EditorProps::default()));
        }
        Ok(frame)
    }

    pub fn write_text(&self, out: &mut TextBuffer, indent: usize) {
        out.put_indented(indent, format_args!("FRAME {{\n"));
        let inner = indent + 2;
        out.put_indented(inner, format_args!("DELAY = {}\n", self.delay));
        if self.move_x != 0 || self.move_y != 0 {
            out.put_indented(
                inner,
                format_args!("MOVE {{{}, {}}}\n", self.move_x, self.move_y),
            );
        }
        if let Some(sound) = &self.sound {
            out.put_indented(inner, format_args!("SOUND=\"{sound}\"\n"));
        }
        out.put_indented(inner, format_args!("KEYFRAME={}\n", bool_word(self.keyframe)));
        if self.kill_sound {
            out.put_indented(inner, format_args!("KILL_SOUND={}\n", bool_word(true)));
        }
        if self.editor_expanded {
            out.put_indented(inner, format_args!("EDITOR_EXPANDED={}\n", bool_word(true)));
        }

        let mut subframes = self.subframes.iter();
        if let Some(first) = subframes.next() {
            first.write_text(out, indent, false);
        }
        for subframe in subframes {
            subframe.write_text(out, inner, true);
        }

        for event in &self.apply_events {
            out.put_indented(inner, format_args!("APPLY_EVENT=\"{event}\"\n"));
        }
        self.editor_props.write_text(out, inner);
        out.put_indented(indent, format_args!("}}\n\n"));
    }

    pub fn to_text(&self) -> String {
        let mut out = TextBuffer::new();
        self.write_text(&mut out, 0);
        out.into_string()
    }
}
