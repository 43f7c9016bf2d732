use std::fs;
use std::process::Command;

use wme_formats::{FrameDef, ParseError, Rect, Rgba};

const WALK_FRAME: &str = r#"
; walk cycle, step 2
FRAME
{
  DELAY = 120
  MOVE { 4, 0 }
  SOUND = "sfx\step.ogg"
  KEYFRAME = TRUE
  IMAGE = "actors\molly\walk_02.png"
  TRANSPARENT { 0, 255, 0 }
  HOTSPOT { 32, 120 }
  ALPHA_COLOR { 200, 100, 50 }
  ALPHA = 192
  SUBFRAME
  {
    IMAGE = "actors\molly\shadow.png"
    RECT { 0, 0, 64, 16 }
    DECORATION = TRUE
    EDITOR_PROPERTY { NAME="layer" VALUE="floor" }
  }
  APPLY_EVENT = "FootstepLeft"
  EDITOR_EXPANDED = TRUE
}
"#;

#[test]
fn parses_a_full_definition() {
    let frame = FrameDef::parse_definition(WALK_FRAME).expect("parsed");
    assert_eq!(frame.delay, 120);
    assert_eq!((frame.move_x, frame.move_y), (4, 0));
    assert!(frame.keyframe);
    assert!(frame.editor_expanded);
    assert_eq!(frame.sound.as_deref(), Some("sfx\\step.ogg"));
    assert_eq!(frame.apply_events, vec!["FootstepLeft"]);

    assert_eq!(frame.subframes.len(), 2);
    let body = &frame.subframes[0];
    assert_eq!(body.image.as_deref(), Some("actors\\molly\\walk_02.png"));
    assert_eq!(body.transparent, Some(Rgba::new(0, 255, 0, 255)));
    assert_eq!((body.hotspot_x, body.hotspot_y), (32, 120));
    assert_eq!(body.alpha, Rgba::new(200, 100, 50, 192));
    assert_eq!(body.rect, None);

    let shadow = &frame.subframes[1];
    assert!(shadow.decoration);
    assert_eq!(shadow.rect, Some(Rect::new(0, 0, 64, 16)));
    assert_eq!(shadow.editor_props.get("layer"), Some("floor"));
}

#[test]
fn text_form_parses_back_to_the_same_frame() {
    let frame = FrameDef::parse_definition(WALK_FRAME).expect("parsed");
    let text = frame.to_text();
    let reparsed = FrameDef::parse_definition(&text).expect("reparsed");
    assert_eq!(reparsed, frame);
}

#[test]
fn syntax_errors_carry_the_line() {
    let err = FrameDef::parse_definition("FRAME\n{\n  DELAY = 1\n  WOBBLE = 2\n}\n").unwrap_err();
    assert_eq!(err.line(), 4);
    assert!(matches!(err, ParseError::TokenNotFound { .. }));

    let err = FrameDef::parse_bytes(b"FRAME { IMAGE = \"\xff\" }").unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
}

#[test]
fn frame_dump_prints_summary_and_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("walk.frame");
    fs::write(&path, WALK_FRAME).expect("write frame");

    let output = Command::new(env!("CARGO_BIN_EXE_frame_dump"))
        .arg(&path)
        .output()
        .expect("run frame_dump");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("delay 120"));
    assert!(stdout.contains("subframes: 2"));
    assert!(stdout.contains("decoration"));

    let output = Command::new(env!("CARGO_BIN_EXE_frame_dump"))
        .arg(&path)
        .arg("--json")
        .output()
        .expect("run frame_dump --json");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["delay"], 120);
    assert_eq!(json["subframes"][1]["decoration"], true);
    assert_eq!(json["apply_events"][0], "FootstepLeft");
}
