//! Lua bindings for a live frame and the screen fader.
//!
//! The frame is published as the global `frame`, a table whose metatable
//! routes every read through property and method lookup and every write
//! through property assignment. Subframe handles reach Lua as small tables
//! that only carry the raw handle; each access re-validates it against the
//! frame.
//!
//! A name that is neither a method nor a readable property comes back as a
//! callable that routes through method dispatch, so `obj:Unknown()` is
//! reported and ignored instead of raising a Lua error.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use mlua::{
    Error as LuaError, Function, Lua, LuaOptions, Result as LuaResult, StdLib, Table, Value,
    Variadic,
};
use wme_formats::Rgba;
use wme_persist::{decode_save, encode_save, Persist, PersistError, PersistMgr};

use crate::error::ScriptError;
use crate::fader::Fader;
use crate::frame::{Frame, FrameOwner};
use crate::game::Game;
use crate::handle_list::{ListHandle, SubframeHandle};
use crate::render::{DrawParams, OwnerId};
use crate::script::{invoke, MethodCall, NativeRef, ScArgs, ScValue, ScriptLog, ScriptRuntime, Scriptable};
use crate::subframe::Subframe;

const SUBFRAME_META: &str = "wme.subframe_meta";

/// Owner id the hosted frame registers its hit-test rects under.
pub const HOST_OWNER: OwnerId = OwnerId(1);

/// Everything a script can reach.
pub struct HostState {
    pub game: Game,
    pub frame: Frame,
    pub fader: Fader,
    pub log: ScriptLog,
}

impl HostState {
    pub fn new(game: Game, frame: Frame) -> Self {
        Self {
            game,
            frame,
            fader: Fader::new(),
            log: ScriptLog::new(),
        }
    }

    /// Side effects of showing the frame for the first time.
    pub fn enter(&mut self, owner: Option<&mut dyn FrameOwner>, muted: bool) -> Result<()> {
        self.frame.one_time_display(&mut self.game, owner, muted)
    }

    /// One update pass followed by one display pass.
    pub fn tick(&mut self, tick_ms: u32) -> Result<()> {
        self.game.timer = self.game.timer.wrapping_add(tick_ms);
        self.fader.update(&self.game);
        self.frame
            .draw(&mut self.game, 0, 0, Some(HOST_OWNER), &DrawParams::default())?;
        self.fader.display(&mut self.game)
    }

    /// Serializes the frame and the fader into a framed save stream.
    pub fn save(&mut self) -> Result<Vec<u8>, PersistError> {
        let mut mgr = PersistMgr::for_saving();
        self.frame.persist(&mut mgr)?;
        self.fader.persist(&mut mgr)?;
        Ok(encode_save(&mgr.finish()?))
    }

    /// Replaces the frame and the fader with the ones in `stream` and
    /// re-acquires their resources. On failure the current state is kept.
    pub fn load(&mut self, stream: &[u8]) -> Result<()> {
        let payload = decode_save(stream).context("reading save header")?;
        let mut mgr = PersistMgr::for_loading(payload.to_vec());
        let mut frame = Frame::default();
        frame.persist(&mut mgr).context("loading frame state")?;
        let mut fader = Fader::new();
        fader.persist(&mut mgr).context("loading fader state")?;
        if mgr.remaining() != 0 {
            log::warn!("{} trailing bytes after save state", mgr.remaining());
        }

        if let Err(err) = frame.restore(&mut self.game) {
            frame.release(&mut self.game);
            return Err(err.context("restoring frame resources"));
        }
        let mut previous = std::mem::replace(&mut self.frame, frame);
        previous.release(&mut self.game);
        self.fader = fader;
        Ok(())
    }
}

pub struct ScriptHost {
    lua: Lua,
    state: Rc<RefCell<HostState>>,
}

impl ScriptHost {
    pub fn new(state: HostState) -> Result<Self> {
        let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default())
            .context("initialising Lua runtime with standard libraries")?;
        let state = Rc::new(RefCell::new(state));
        install_subframe_metatable(&lua, state.clone()).context("installing subframe bindings")?;
        install_frame(&lua, state.clone()).context("installing frame bindings")?;
        install_fader(&lua, state.clone()).context("installing fader bindings")?;
        Ok(Self { lua, state })
    }

    /// Runs a chunk. Compile errors are returned; errors raised while the
    /// chunk runs are reported as script runtime errors.
    pub fn run(&self, name: &str, source: &str) -> Result<()> {
        match self.lua.load(source).set_name(name).exec() {
            Ok(()) => Ok(()),
            Err(err @ LuaError::SyntaxError { .. }) => {
                Err(err).with_context(|| format!("compiling script {name}"))
            }
            Err(err) => {
                self.state
                    .borrow_mut()
                    .log
                    .runtime_error(format!("{name}: {err}"));
                Ok(())
            }
        }
    }

    pub fn state(&self) -> Ref<'_, HostState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, HostState> {
        self.state.borrow_mut()
    }

    /// Shuts the Lua state down and hands the host state back.
    pub fn into_state(self) -> Result<HostState> {
        let ScriptHost { lua, state } = self;
        drop(lua);
        Rc::try_unwrap(state)
            .map(RefCell::into_inner)
            .map_err(|_| anyhow!("host state is still referenced by the Lua runtime"))
    }
}

fn install_frame(lua: &Lua, state: Rc<RefCell<HostState>>) -> LuaResult<()> {
    let frame = lua.create_table()?;

    let index_state = state.clone();
    let index = lua.create_function(move |lua_ctx, (_table, key): (Table, String)| {
        let value = {
            let host = index_state.borrow();
            let frame = &host.frame;
            (!frame.resolves_method(&key) && frame.resolves_property(&key))
                .then(|| frame.get_property(&key))
        };
        match value {
            Some(value) => to_lua(lua_ctx, value),
            None => frame_method(lua_ctx, index_state.clone(), key).map(Value::Function),
        }
    })?;

    let newindex_state = state;
    let newindex = lua.create_function(
        move |_, (_table, key, value): (Table, String, Value)| {
            let value = from_lua(&value)?;
            newindex_state.borrow_mut().frame.set_property(&key, value);
            Ok(())
        },
    )?;

    let metatable = lua.create_table()?;
    metatable.set("__index", index)?;
    metatable.set("__newindex", newindex)?;
    frame.set_metatable(Some(metatable));
    lua.globals().set("frame", frame)?;
    Ok(())
}

fn frame_method<'lua>(
    lua: &'lua Lua,
    state: Rc<RefCell<HostState>>,
    name: String,
) -> LuaResult<Function<'lua>> {
    lua.create_function(move |lua_ctx, args: Variadic<Value>| {
        let args = lua_args(strip_self(args))?;
        let result = {
            let mut guard = state.borrow_mut();
            let HostState {
                game, frame, log, ..
            } = &mut *guard;
            let mut call = MethodCall::new(game, log, args);
            invoke(frame, &name, &mut call)
        };
        to_lua(lua_ctx, result)
    })
}

fn install_subframe_metatable(lua: &Lua, state: Rc<RefCell<HostState>>) -> LuaResult<()> {
    let index_state = state.clone();
    let index = lua.create_function(move |lua_ctx, (table, key): (Table, String)| {
        let Some(handle) = table_handle(&table)? else {
            return Ok(Value::Nil);
        };
        if Subframe::has_method(&key) {
            return subframe_method(lua_ctx, index_state.clone(), handle, key).map(Value::Function);
        }
        let value = {
            let mut guard = index_state.borrow_mut();
            let host = &mut *guard;
            match host.frame.subframe(handle) {
                Some(sub) if sub.has_property(&key) => Some(sub.get_property(&key)),
                Some(_) => None,
                None => {
                    host.log.runtime_error(ScriptError::StaleHandle.to_string());
                    Some(ScValue::Null)
                }
            }
        };
        match value {
            Some(value) => to_lua(lua_ctx, value),
            None => subframe_method(lua_ctx, index_state.clone(), handle, key).map(Value::Function),
        }
    })?;

    let newindex_state = state;
    let newindex = lua.create_function(
        move |_, (table, key, value): (Table, String, Value)| {
            let Some(handle) = table_handle(&table)? else {
                return Ok(());
            };
            let value = from_lua(&value)?;
            let mut guard = newindex_state.borrow_mut();
            let host = &mut *guard;
            match host.frame.subframe_mut(handle) {
                Some(sub) => sub.set_property(&key, value),
                None => host.log.runtime_error(ScriptError::StaleHandle.to_string()),
            }
            Ok(())
        },
    )?;

    let metatable = lua.create_table()?;
    metatable.set("__index", index)?;
    metatable.set("__newindex", newindex)?;
    lua.set_named_registry_value(SUBFRAME_META, metatable)
}

fn subframe_method<'lua>(
    lua: &'lua Lua,
    state: Rc<RefCell<HostState>>,
    handle: SubframeHandle,
    name: String,
) -> LuaResult<Function<'lua>> {
    lua.create_function(move |lua_ctx, args: Variadic<Value>| {
        let args = lua_args(strip_self(args))?;
        let result = {
            let mut guard = state.borrow_mut();
            let HostState {
                game, frame, log, ..
            } = &mut *guard;
            match frame.subframe_mut(handle) {
                Some(sub) => {
                    let mut call = MethodCall::new(game, log, args);
                    invoke(sub, &name, &mut call)
                }
                None => {
                    log.runtime_error(ScriptError::StaleHandle.to_string());
                    ScValue::Null
                }
            }
        };
        to_lua(lua_ctx, result)
    })
}

fn install_fader(lua: &Lua, state: Rc<RefCell<HostState>>) -> LuaResult<()> {
    let fader = lua.create_table()?;

    for (name, fade_out) in [("FadeIn", false), ("FadeOut", true)] {
        let fade_state = state.clone();
        fader.set(
            name,
            lua.create_function(move |_, args: Variadic<Value>| {
                let mut args = lua_args(strip_self(args))?;
                args.correct(6);
                let red = args.pop().to_int();
                let green = args.pop().to_int();
                let blue = args.pop().to_int();
                let alpha = args.pop().to_int_or(255);
                let duration = args.pop().to_int_or(1000).max(0) as u32;
                let system = args.pop().to_bool_or(false);
                let color = Rgba::from_ints(red, green, blue, alpha);

                let mut guard = fade_state.borrow_mut();
                let HostState { game, fader, .. } = &mut *guard;
                if fade_out {
                    fader.fade_out(game, color, duration, system);
                } else {
                    fader.fade_in(game, color, duration, system);
                }
                Ok(())
            })?,
        )?;
    }

    let deactivate_state = state.clone();
    fader.set(
        "Deactivate",
        lua.create_function(move |_, _: Variadic<Value>| {
            deactivate_state.borrow_mut().fader.deactivate();
            Ok(())
        })?,
    )?;

    let active_state = state;
    fader.set(
        "IsActive",
        lua.create_function(move |_, _: Variadic<Value>| {
            Ok(active_state.borrow().fader.is_active())
        })?,
    )?;

    lua.globals().set("Fader", fader)?;
    Ok(())
}

fn strip_self(args: Variadic<Value>) -> Vec<Value> {
    let mut iter = args.into_iter();
    match iter.next() {
        Some(Value::Table(_)) => iter.collect(),
        Some(value) => {
            let mut values = vec![value];
            values.extend(iter);
            values
        }
        None => Vec::new(),
    }
}

fn lua_args(values: Vec<Value>) -> LuaResult<ScArgs> {
    values
        .iter()
        .map(from_lua)
        .collect::<LuaResult<Vec<_>>>()
        .map(ScArgs::new)
}

fn table_handle(table: &Table) -> LuaResult<Option<SubframeHandle>> {
    let list: Option<u32> = table.raw_get("__list")?;
    let index: Option<u32> = table.raw_get("__subframe")?;
    let generation: Option<u32> = table.raw_get("__generation")?;
    Ok(match (list, index, generation) {
        (Some(list), Some(index), Some(generation)) => {
            Some(ListHandle::from_raw(list, index, generation))
        }
        _ => None,
    })
}

fn subframe_table<'lua>(lua: &'lua Lua, handle: SubframeHandle) -> LuaResult<Table<'lua>> {
    let (list, index, generation) = handle.into_raw();
    let table = lua.create_table()?;
    table.raw_set("__list", list)?;
    table.raw_set("__subframe", index)?;
    table.raw_set("__generation", generation)?;
    let metatable: Table = lua.named_registry_value(SUBFRAME_META)?;
    table.set_metatable(Some(metatable));
    Ok(table)
}

fn from_lua(value: &Value) -> LuaResult<ScValue> {
    Ok(match value {
        Value::Nil => ScValue::Null,
        Value::Boolean(flag) => ScValue::Bool(*flag),
        Value::Integer(number) => ScValue::Int(*number as i32),
        Value::Number(number)
            if number.fract() == 0.0 && number.abs() <= f64::from(i32::MAX) =>
        {
            ScValue::Int(*number as i32)
        }
        Value::Number(number) => ScValue::Float(*number),
        Value::String(text) => ScValue::String(text.to_str()?.to_string()),
        Value::Table(table) => match table_handle(table)? {
            Some(handle) => ScValue::Native(NativeRef::Subframe(handle)),
            None => ScValue::Null,
        },
        _ => ScValue::Null,
    })
}

fn to_lua(lua: &Lua, value: ScValue) -> LuaResult<Value<'_>> {
    Ok(match value {
        ScValue::Null => Value::Nil,
        ScValue::Int(number) => Value::Integer(number as mlua::Integer),
        ScValue::Float(number) => Value::Number(number),
        ScValue::Bool(flag) => Value::Boolean(flag),
        ScValue::String(text) => Value::String(lua.create_string(&text)?),
        ScValue::Native(NativeRef::Subframe(handle)) => Value::Table(subframe_table(lua, handle)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RenderEvent, TestRig};

    fn host(rig: TestRig) -> Result<(ScriptHost, crate::recording::RecordingRenderer)> {
        let renderer = rig.renderer.clone();
        let mut game = rig.game;
        let frame = Frame::load(&mut game, "FRAME { DELAY = 10 }")?;
        Ok((ScriptHost::new(HostState::new(game, frame))?, renderer))
    }

    #[test]
    fn scripts_drive_frame_members() -> Result<()> {
        let rig = TestRig::new().with_image("a.png", 8, 8).with_image("b.png", 4, 4);
        let (host, _) = host(rig)?;
        host.run(
            "members",
            r#"
            assert(frame.Type == "frame")
            assert(frame.Delay == 10)
            frame.Delay = 50
            frame:DeleteSubframe(0)
            frame.Mood = "calm"
            assert(frame.Mood == "calm")
            local sub = frame:AddSubframe("a.png")
            sub.HotspotX = 4
            assert(frame.HotspotX == 4)
            assert(sub:GetImage() == "a.png")
            assert(frame:GetImage() == "a.png")
            frame:AddEvent("Step")
            frame:AddEvent("STEP")
            assert(frame.NumEvents == 1)
            "#,
        )?;

        let state = host.state();
        assert!(state.log.errors().is_empty(), "{:?}", state.log.errors());
        assert_eq!(state.frame.delay, 50);
        assert_eq!(state.frame.apply_events(), ["Step"]);
        assert_eq!(state.frame.sole_subframe().map(|sub| sub.hotspot_x), Some(4));
        Ok(())
    }

    #[test]
    fn deleted_subframe_handles_go_stale() -> Result<()> {
        let rig = TestRig::new().with_image("a.png", 8, 8);
        let (host, _) = host(rig)?;
        host.run(
            "stale",
            r#"
            local sub = frame:AddSubframe("a.png")
            frame:DeleteSubframe(sub)
            assert(sub.HotspotX == nil)
            sub.HotspotY = 3
            assert(sub:GetImage() == nil)
            "#,
        )?;
        let state = host.state();
        assert_eq!(state.frame.subframes().len(), 1);
        assert_eq!(
            state.log.errors(),
            [
                ScriptError::StaleHandle.to_string(),
                ScriptError::StaleHandle.to_string(),
                ScriptError::StaleHandle.to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn out_of_range_and_unknown_methods_are_reported() -> Result<()> {
        let (host, _) = host(TestRig::new())?;
        host.run(
            "errors",
            r#"
            assert(frame:GetSubframe(5) == nil)
            assert(frame:Explode() == nil)
            local sub = frame:GetSubframe(0)
            sub:Shatter(1, 2)
            frame.Delay = 99
            "#,
        )?;
        let state = host.state();
        assert_eq!(
            state.log.errors(),
            [
                "Frame.GetSubframe: Subframe index 5 is out of range.",
                "Call to undefined method 'Explode'. Ignored.",
                "Call to undefined method 'Shatter'. Ignored.",
            ]
        );
        assert_eq!(state.frame.delay, 99);
        drop(state);

        assert!(host.run("broken", "frame:(").is_err());
        Ok(())
    }

    #[test]
    fn fader_bindings_and_ticks() -> Result<()> {
        let (host, renderer) = host(TestRig::new())?;
        host.run(
            "fade",
            r#"
            Fader:FadeOut(0, 0, 0, 255, 100)
            assert(Fader:IsActive())
            "#,
        )?;

        let mut state = host.into_state()?;
        state.tick(50)?;
        assert_eq!(
            renderer.events().last(),
            Some(&RenderEvent::Fill(Rgba::new(0, 0, 0, 127)))
        );
        state.tick(100)?;
        assert_eq!(state.fader.current_alpha(), 255);
        Ok(())
    }

    #[test]
    fn save_and_load_round_trip() -> Result<()> {
        let rig = TestRig::new().with_image("a.png", 8, 8);
        let (host, _) = host(rig)?;
        host.run(
            "setup",
            r#"
            frame:AddSubframe("a.png")
            frame:AddEvent("Land")
            frame.MoveX = 7
            "#,
        )?;
        let mut state = host.into_state()?;
        let stream = state.save()?;

        state.frame.move_x = 0;
        state.load(&stream)?;
        assert_eq!(state.frame.move_x, 7);
        assert_eq!(state.frame.apply_events(), ["Land"]);
        assert_eq!(state.frame.subframes().len(), 2);
        assert_eq!(
            state.frame.subframes().at(1).and_then(Subframe::image),
            Some("a.png")
        );
        Ok(())
    }

    #[test]
    fn failed_restore_keeps_the_current_frame() -> Result<()> {
        let (saving, _) = host(TestRig::new().with_image("a.png", 8, 8))?;
        saving.run("setup", r#"frame:AddSubframe("a.png")"#)?;
        let stream = saving.into_state()?.save()?;

        // This data root has no a.png, so the saved subframe can not come back.
        let rig = TestRig::new();
        let surfaces = rig.surfaces.clone();
        let (loading, _) = host(rig)?;
        let mut state = loading.into_state()?;
        state.frame.move_x = 3;
        assert!(state.load(&stream).is_err());
        assert_eq!(state.frame.move_x, 3);
        assert_eq!(state.frame.subframes().len(), 1);
        assert_eq!(surfaces.live_count(), 0);
        Ok(())
    }
}
