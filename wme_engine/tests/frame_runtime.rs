use anyhow::Result;
use wme_engine::fader::Fader;
use wme_engine::recording::{RecordingOwner, OwnerEvent, TestRig};
use wme_engine::script::{invoke, MethodCall, NativeRef, ScArgs, ScValue, ScriptLog, Scriptable};
use wme_engine::{Frame, LoadError};
use wme_formats::{Rect, Rgba};
use wme_persist::{decode_save, encode_save, Persist, PersistMgr};

const WALK: &str = r#"
FRAME
{
  DELAY = 120
  MOVE { 3, -1 }
  SOUND = "step.ogg"
  SUBFRAME
  {
    IMAGE = "legs.png"
    HOTSPOT { 8, 30 }
  }
  SUBFRAME
  {
    IMAGE = "torso.png"
    RECT { 0, 0, 16, 12 }
    ALPHA_COLOR { 255, 0, 0 }
    ALPHA = 128
  }
  APPLY_EVENT = "FootDown"
  APPLY_EVENT = "Dust"
  APPLY_EVENT = "Shake"
}
"#;

fn rig() -> TestRig {
    TestRig::new()
        .with_image("legs.png", 16, 30)
        .with_image("torso.png", 16, 20)
        .with_image("a.png", 5, 5)
        .with_image("x.png", 40, 40)
        .with_sound("step.ogg")
}

#[test]
fn single_subframe_block_is_not_padded() -> Result<()> {
    let mut rig = rig();
    let frame = Frame::load(&mut rig.game, r#"FRAME { DELAY=10 SUBFRAME{IMAGE="a.png"} }"#)?;
    assert_eq!(frame.get_property("Delay"), ScValue::Int(10));
    assert_eq!(frame.get_property("NumSubframes"), ScValue::Int(1));
    Ok(())
}

#[test]
fn legacy_image_becomes_slot_zero() -> Result<()> {
    let mut rig = rig();
    let frame = Frame::load(
        &mut rig.game,
        r#"FRAME { IMAGE="x.png" RECT{0,0,10,10} ALPHA=128 }"#,
    )?;
    assert_eq!(frame.subframes().len(), 1);
    let sub = frame.subframes().at(0).expect("slot 0");
    assert_eq!(sub.rect, Rect::new(0, 0, 10, 10));
    assert_eq!(sub.alpha.a(), 128);
    assert_eq!(sub.image(), Some("x.png"));
    Ok(())
}

#[test]
fn unknown_token_is_a_syntax_error() {
    let mut rig = rig();
    let err = Frame::load(&mut rig.game, "FRAME { DELAY = 1\n WOBBLE = 2 }").unwrap_err();
    assert!(matches!(err, LoadError::Syntax(_)), "{err}");
}

#[test]
fn subframe_indices_out_of_range_report_and_yield_null() -> Result<()> {
    let mut rig = rig();
    let mut frame = Frame::load(&mut rig.game, WALK)?;
    let mut log = ScriptLog::new();

    for index in [-1, 2] {
        let mut call = MethodCall::new(&mut rig.game, &mut log, ScArgs::new([ScValue::Int(index)]));
        assert!(invoke(&mut frame, "GetSubframe", &mut call).is_null());
    }
    assert_eq!(
        log.errors(),
        [
            "Frame.GetSubframe: Subframe index -1 is out of range.".to_string(),
            "Frame.GetSubframe: Subframe index 2 is out of range.".to_string(),
        ]
    );

    let mut call = MethodCall::new(&mut rig.game, &mut log, ScArgs::new([ScValue::Int(0)]));
    let first = invoke(&mut frame, "GetSubframe", &mut call);
    assert_eq!(
        first.as_native(),
        Some(NativeRef::Subframe(frame.subframes().handle_at(0).expect("handle")))
    );
    Ok(())
}

#[test]
fn event_names_dedup_case_insensitively() -> Result<()> {
    let mut rig = rig();
    let mut frame = Frame::load(&mut rig.game, "FRAME { }")?;
    let mut log = ScriptLog::new();
    for (method, name) in [("AddEvent", "Foo"), ("AddEvent", "foo")] {
        let mut call = MethodCall::new(&mut rig.game, &mut log, ScArgs::new([ScValue::from(name)]));
        invoke(&mut frame, method, &mut call);
    }
    assert_eq!(frame.get_property("NumEvents"), ScValue::Int(1));

    let mut call = MethodCall::new(&mut rig.game, &mut log, ScArgs::new([ScValue::from("FOO")]));
    invoke(&mut frame, "DeleteEvent", &mut call);
    assert_eq!(frame.get_property("NumEvents"), ScValue::Int(0));
    Ok(())
}

#[test]
fn entering_a_frame_plays_and_dispatches() -> Result<()> {
    let mut rig = rig();
    let mut frame = Frame::load(&mut rig.game, WALK)?;
    let mut owner = RecordingOwner::new();
    rig.game.frozen = true;
    frame.one_time_display(&mut rig.game, Some(&mut owner), false)?;

    let events = owner.events();
    assert_eq!(events[0], OwnerEvent::SoundUpdated("step.ogg".to_string()));
    assert_eq!(events.len(), 4);
    let sound = frame.sound().expect("sound");
    assert!(sound.is_playing());
    Ok(())
}

#[test]
fn save_state_round_trip() -> Result<()> {
    let mut rig = rig();
    let mut frame = Frame::load(&mut rig.game, WALK)?;
    frame.keyframe = true;
    frame.kill_sound = true;

    rig.clock.set(90_000);
    let mut fader = Fader::new();
    fader.fade_out(&rig.game, Rgba::new(0, 0, 0, 255), 500, true);

    let mut saver = PersistMgr::for_saving();
    frame.persist(&mut saver)?;
    fader.persist(&mut saver)?;
    let stream = encode_save(&saver.finish()?);

    let mut loader = PersistMgr::for_loading(decode_save(&stream)?.to_vec());
    let mut loaded = Frame::default();
    loaded.persist(&mut loader)?;
    let mut loaded_fader = Fader::new();
    loaded_fader.persist(&mut loader)?;
    assert_eq!(loader.remaining(), 0);
    loaded.restore(&mut rig.game)?;

    assert_eq!(loaded.delay, 120);
    assert_eq!((loaded.move_x, loaded.move_y), (3, -1));
    assert!(loaded.keyframe && loaded.kill_sound);
    assert_eq!(loaded.apply_events(), ["FootDown", "Dust", "Shake"]);
    assert_eq!(loaded.subframes().len(), 2);
    for (saved, restored) in frame.subframes().values().zip(loaded.subframes().values()) {
        assert_eq!(saved, restored);
    }
    assert_eq!(
        loaded.sound().and_then(|sound| sound.filename()),
        Some("step.ogg")
    );
    assert!(loaded.sound().and_then(|sound| sound.buffer()).is_some());
    assert_eq!(loaded.to_text(), frame.to_text());

    assert!(loaded_fader.is_active());
    assert_eq!(loaded_fader.current_color(), fader.current_color());
    // The wall clock keeps running after the load; a zero start makes the
    // fade complete on the first update.
    loaded_fader.update(&rig.game);
    assert!(loaded_fader.is_ready());
    Ok(())
}
