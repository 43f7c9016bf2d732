use crate::error::ScriptError;
use crate::script::{find_member, MethodCall, NativeRef, ScValue, Scriptable};
use crate::sound::{Sound, SoundKind};
use crate::subframe::Subframe;
use crate::surface::ColorKey;

use super::Frame;

type Getter = fn(&Frame) -> ScValue;
type Setter = fn(&mut Frame, &ScValue);
type Method = fn(&mut Frame, &mut MethodCall<'_>) -> ScValue;

const PROPERTIES: &[(&str, Getter)] = &[
    ("Type", |_| ScValue::from("frame")),
    ("Delay", |frame| ScValue::Int(frame.delay as i32)),
    ("Keyframe", |frame| ScValue::Bool(frame.keyframe)),
    ("KillSounds", |frame| ScValue::Bool(frame.kill_sound)),
    ("MoveX", |frame| ScValue::Int(frame.move_x)),
    ("MoveY", |frame| ScValue::Int(frame.move_y)),
    ("NumSubframes", |frame| {
        ScValue::Int(frame.subframes.len() as i32)
    }),
    ("NumEvents", |frame| {
        ScValue::Int(frame.apply_events.len() as i32)
    }),
];

const SETTERS: &[(&str, Setter)] = &[
    ("Delay", |frame, value| frame.delay = value.to_int().max(0) as u32),
    ("Keyframe", |frame, value| frame.keyframe = value.to_bool()),
    ("KillSounds", |frame, value| frame.kill_sound = value.to_bool()),
    ("MoveX", |frame, value| frame.move_x = value.to_int()),
    ("MoveY", |frame, value| frame.move_y = value.to_int()),
];

// "GetSubframe" is listed twice; lookup stops at the first entry, so the
// event getter behind the second one is unreachable by name.
const METHODS: &[(&str, Method)] = &[
    ("GetSound", Frame::sc_get_sound),
    ("SetSound", Frame::sc_set_sound),
    ("GetSubframe", Frame::sc_get_subframe),
    ("DeleteSubframe", Frame::sc_delete_subframe),
    ("AddSubframe", Frame::sc_add_subframe),
    ("InsertSubframe", Frame::sc_insert_subframe),
    ("GetSubframe", Frame::sc_get_event),
    ("AddEvent", Frame::sc_add_event),
    ("DeleteEvent", Frame::sc_delete_event),
];

impl Frame {
    /// The subframe unknown members are forwarded to, present only while the
    /// frame holds exactly one.
    pub fn sole_subframe(&self) -> Option<&Subframe> {
        match self.subframes.len() {
            1 => self.subframes.at(0),
            _ => None,
        }
    }

    pub fn sole_subframe_mut(&mut self) -> Option<&mut Subframe> {
        match self.subframes.len() {
            1 => self.subframes.at_mut(0),
            _ => None,
        }
    }

    /// Whether calling `name` reaches a method of the frame or of its sole
    /// subframe.
    pub fn resolves_method(&self, name: &str) -> bool {
        find_member(METHODS, name).is_some()
            || (self.sole_subframe().is_some() && Subframe::has_method(name))
    }

    /// Whether reading `name` reaches a property, following the same
    /// delegation as [`Scriptable::get_property`].
    pub fn resolves_property(&self, name: &str) -> bool {
        if find_member(PROPERTIES, name).is_some() {
            return true;
        }
        match self.sole_subframe() {
            Some(sub) => sub.has_property(name),
            None => self.base.has_property(name),
        }
    }

    fn sc_get_sound(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(0);
        ScValue::from(self.sound.as_ref().and_then(Sound::filename))
    }

    fn sc_set_sound(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let value = call.args.pop();
        if let Some(mut old) = self.sound.take() {
            old.release(call.game);
        }
        if value.is_null() {
            return ScValue::Bool(true);
        }

        let filename = value.to_text();
        let mut sound = Sound::new();
        match sound.set_sound(call.game, &filename, SoundKind::Sfx, false) {
            Ok(()) => {
                self.sound = Some(sound);
                ScValue::Bool(true)
            }
            Err(err) => {
                log::warn!("SetSound('{filename}') failed: {err:#}");
                ScValue::Bool(false)
            }
        }
    }

    fn sc_get_subframe(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let index = call.args.pop().to_int_or(-1);
        let handle = usize::try_from(index)
            .ok()
            .and_then(|position| self.subframes.handle_at(position));
        match handle {
            Some(handle) => ScValue::Native(NativeRef::Subframe(handle)),
            None => {
                call.script.runtime_error(format!(
                    "Frame.GetSubframe: Subframe index {index} is out of range."
                ));
                ScValue::Null
            }
        }
    }

    fn sc_delete_subframe(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let value = call.args.pop();
        if value.is_int() {
            let index = value.to_int();
            let removed = usize::try_from(index)
                .ok()
                .and_then(|position| self.subframes.remove_at(position));
            match removed {
                Some(mut sub) => sub.release(call.game),
                None => call.script.runtime_error(format!(
                    "Frame.DeleteSubframe: Subframe index {index} is out of range."
                )),
            }
        } else if let Some(NativeRef::Subframe(handle)) = value.as_native() {
            if let Some(mut sub) = self.subframes.remove(handle) {
                sub.release(call.game);
            }
        }
        ScValue::Null
    }

    fn new_script_subframe(call: &mut MethodCall<'_>, image: &ScValue) -> Subframe {
        let mut sub = Subframe::new();
        if !image.is_null() {
            let filename = image.to_text();
            if let Err(err) = sub.set_surface(call.game, &filename, ColorKey::Default) {
                log::warn!("subframe image '{filename}' could not be loaded: {err:#}");
            }
            sub.set_default_rect();
        }
        sub
    }

    fn sc_add_subframe(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let image = call.args.pop();
        let sub = Self::new_script_subframe(call, &image);
        ScValue::Native(NativeRef::Subframe(self.subframes.push(sub)))
    }

    fn sc_insert_subframe(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(2);
        let image = call.args.pop();
        let index = call.args.pop().to_int().max(0) as usize;
        let sub = Self::new_script_subframe(call, &image);
        ScValue::Native(NativeRef::Subframe(self.subframes.insert(index, sub)))
    }

    fn sc_get_event(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let index = call.args.pop().to_int_or(-1);
        let event = usize::try_from(index)
            .ok()
            .and_then(|position| self.apply_events.get(position));
        match event {
            Some(event) => ScValue::String(event.clone()),
            None => {
                call.script.runtime_error(format!(
                    "Frame.GetEvent: Event index {index} is out of range."
                ));
                ScValue::Null
            }
        }
    }

    fn sc_add_event(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let event = call.args.pop().to_text();
        self.add_event(&event);
        ScValue::Null
    }

    fn sc_delete_event(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let event = call.args.pop().to_text();
        self.delete_event(&event);
        ScValue::Null
    }
}

impl Scriptable for Frame {
    fn get_property(&self, name: &str) -> ScValue {
        if let Some(getter) = find_member(PROPERTIES, name) {
            return getter(self);
        }
        match self.sole_subframe() {
            Some(sub) => sub.get_property(name),
            None => self.base.get_property(name),
        }
    }

    fn set_property(&mut self, name: &str, value: ScValue) {
        if let Some(setter) = find_member(SETTERS, name) {
            setter(self, &value);
            return;
        }
        match self.sole_subframe_mut() {
            Some(sub) => sub.set_property(name, value),
            None => self.base.set_property(name, value),
        }
    }

    fn call_method(
        &mut self,
        name: &str,
        call: &mut MethodCall<'_>,
    ) -> Result<ScValue, ScriptError> {
        if let Some(method) = find_member(METHODS, name) {
            return Ok(method(self, call));
        }
        match self.sole_subframe_mut() {
            Some(sub) => sub.call_method(name, call),
            None => self.base.call_method(name, call),
        }
    }

    fn to_script_string(&self) -> String {
        "[frame]".to_string()
    }
}
