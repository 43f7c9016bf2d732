//! Late-bound member access shared by every scriptable engine object.
//!
//! Each object type keeps ordered `(name, accessor)` tables. Lookup is an
//! exact, case-sensitive comparison and the first entry with a matching name
//! wins. Names no table claims end up in [`ScriptableBase`], which stores
//! unknown properties and rejects unknown methods.

use std::collections::BTreeMap;

use wme_formats::EditorProps;
use wme_persist::{Persist, PersistError, PersistMgr};

use crate::error::ScriptError;
use crate::game::Game;

mod value;

pub use value::{NativeRef, ScArgs, ScValue};

/// Receiver of non-fatal script runtime errors.
pub trait ScriptRuntime {
    fn runtime_error(&mut self, message: String);
}

/// Collects runtime errors and mirrors them to the log.
#[derive(Debug, Clone, Default)]
pub struct ScriptLog {
    errors: Vec<String>,
}

impl ScriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl ScriptRuntime for ScriptLog {
    fn runtime_error(&mut self, message: String) {
        log::warn!("script runtime error: {message}");
        self.errors.push(message);
    }
}

/// Everything a method body may touch besides its receiver.
pub struct MethodCall<'a> {
    pub game: &'a mut Game,
    pub script: &'a mut dyn ScriptRuntime,
    pub args: ScArgs,
}

impl<'a> MethodCall<'a> {
    pub fn new(game: &'a mut Game, script: &'a mut dyn ScriptRuntime, args: ScArgs) -> Self {
        Self { game, script, args }
    }
}

pub trait Scriptable {
    fn get_property(&self, name: &str) -> ScValue;
    fn set_property(&mut self, name: &str, value: ScValue);
    fn call_method(
        &mut self,
        name: &str,
        call: &mut MethodCall<'_>,
    ) -> Result<ScValue, ScriptError>;
    fn to_script_string(&self) -> String;
}

/// Calls `name` on `target`; errors become runtime errors and yield null.
pub fn invoke(target: &mut dyn Scriptable, name: &str, call: &mut MethodCall<'_>) -> ScValue {
    match target.call_method(name, call) {
        Ok(value) => value,
        Err(err) => {
            call.script.runtime_error(err.to_string());
            ScValue::Null
        }
    }
}

/// First entry of `table` named exactly `name`.
pub fn find_member<T: Copy>(table: &[(&'static str, T)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(member, _)| *member == name)
        .map(|(_, accessor)| *accessor)
}

/// Dynamic property bag plus editor metadata carried by every object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptableBase {
    pub editor_props: EditorProps,
    props: BTreeMap<String, ScValue>,
}

impl ScriptableBase {
    pub fn with_editor_props(editor_props: EditorProps) -> Self {
        Self {
            editor_props,
            props: BTreeMap::new(),
        }
    }

    /// Whether a script stored a property called `name`.
    pub fn has_property(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    pub fn get_property(&self, name: &str) -> ScValue {
        self.props.get(name).cloned().unwrap_or_default()
    }

    pub fn set_property(&mut self, name: &str, value: ScValue) {
        self.props.insert(name.to_string(), value);
    }

    pub fn call_method(
        &mut self,
        name: &str,
        call: &mut MethodCall<'_>,
    ) -> Result<ScValue, ScriptError> {
        call.args.correct(0);
        Err(ScriptError::UnknownMethod(name.to_string()))
    }
}

const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_STRING: u8 = 4;

impl Persist for ScriptableBase {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        let mut editor: Vec<String> = self
            .editor_props
            .iter()
            .flat_map(|(name, value)| [name.to_string(), value.to_string()])
            .collect();
        mgr.transfer("editor_props", &mut editor)?;

        // A property is at least a name length and a type tag.
        let count = mgr.transfer_count("props", self.props.len(), 5)?;
        if mgr.is_saving() {
            for (name, value) in self.props.iter_mut() {
                mgr.transfer("prop_name", &mut name.clone())?;
                persist_value(mgr, value)?;
            }
            return Ok(());
        }

        self.editor_props = EditorProps::default();
        for pair in editor.chunks(2) {
            if let [name, value] = pair {
                self.editor_props.set(name, Some(value.as_str()));
            }
        }
        self.props.clear();
        for _ in 0..count {
            let mut name = String::new();
            mgr.transfer("prop_name", &mut name)?;
            let mut value = ScValue::Null;
            persist_value(mgr, &mut value)?;
            self.props.insert(name, value);
        }
        Ok(())
    }
}

/// Natives are process-local and persist as null.
fn persist_value(mgr: &mut PersistMgr, value: &mut ScValue) -> Result<(), PersistError> {
    let mut tag = match value {
        ScValue::Null | ScValue::Native(_) => TAG_NULL,
        ScValue::Int(_) => TAG_INT,
        ScValue::Float(_) => TAG_FLOAT,
        ScValue::Bool(_) => TAG_BOOL,
        ScValue::String(_) => TAG_STRING,
    };
    mgr.transfer("prop_type", &mut tag)?;
    if !mgr.is_saving() {
        *value = match tag {
            TAG_INT => ScValue::Int(0),
            TAG_FLOAT => ScValue::Float(0.0),
            TAG_BOOL => ScValue::Bool(false),
            TAG_STRING => ScValue::String(String::new()),
            _ => ScValue::Null,
        };
    }
    match value {
        ScValue::Int(inner) => mgr.transfer("prop_value", inner),
        ScValue::Float(inner) => mgr.transfer("prop_value", inner),
        ScValue::Bool(inner) => mgr.transfer("prop_value", inner),
        ScValue::String(inner) => mgr.transfer("prop_value", inner),
        ScValue::Null | ScValue::Native(_) => Ok(()),
    }
}
