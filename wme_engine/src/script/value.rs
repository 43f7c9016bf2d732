use std::collections::VecDeque;

use wme_formats::{scan_str, ScanTarget};

use crate::handle_list::SubframeHandle;

/// Engine object a script holds without owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeRef {
    Subframe(SubframeHandle),
}

/// Dynamically typed script value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScValue {
    #[default]
    Null,
    Int(i32),
    Float(f64),
    Bool(bool),
    String(String),
    Native(NativeRef),
}

impl ScValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScValue::Null)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, ScValue::Int(_))
    }

    pub fn to_int(&self) -> i32 {
        self.to_int_or(0)
    }

    /// Integer view; `default` for null and native values.
    pub fn to_int_or(&self, default: i32) -> i32 {
        match self {
            ScValue::Int(value) => *value,
            ScValue::Float(value) => *value as i32,
            ScValue::Bool(flag) => i32::from(*flag),
            ScValue::String(text) => atoi(text),
            ScValue::Null | ScValue::Native(_) => default,
        }
    }

    pub fn to_float(&self) -> f64 {
        match self {
            ScValue::Int(value) => f64::from(*value),
            ScValue::Float(value) => *value,
            ScValue::Bool(flag) => f64::from(u8::from(*flag)),
            ScValue::String(text) => {
                let mut value = 0.0f32;
                scan_str(text, "%f", &mut [ScanTarget::Float(&mut value)]);
                f64::from(value)
            }
            ScValue::Null | ScValue::Native(_) => 0.0,
        }
    }

    pub fn to_bool(&self) -> bool {
        self.to_bool_or(false)
    }

    pub fn to_bool_or(&self, default: bool) -> bool {
        match self {
            ScValue::Bool(flag) => *flag,
            ScValue::Int(value) => *value != 0,
            ScValue::Float(value) => *value != 0.0,
            ScValue::String(text) => {
                text.eq_ignore_ascii_case("yes")
                    || text.eq_ignore_ascii_case("true")
                    || atoi(text) != 0
            }
            ScValue::Native(_) => true,
            ScValue::Null => default,
        }
    }

    /// String view as scripts print it.
    pub fn to_text(&self) -> String {
        match self {
            ScValue::Null => "[null]".to_string(),
            ScValue::Int(value) => value.to_string(),
            ScValue::Float(value) => format!("{value:.6}"),
            ScValue::Bool(flag) => (if *flag { "yes" } else { "no" }).to_string(),
            ScValue::String(text) => text.clone(),
            ScValue::Native(_) => "[native object]".to_string(),
        }
    }

    pub fn as_native(&self) -> Option<NativeRef> {
        match self {
            ScValue::Native(native) => Some(*native),
            _ => None,
        }
    }
}

impl From<i32> for ScValue {
    fn from(value: i32) -> Self {
        ScValue::Int(value)
    }
}

impl From<bool> for ScValue {
    fn from(value: bool) -> Self {
        ScValue::Bool(value)
    }
}

impl From<&str> for ScValue {
    fn from(value: &str) -> Self {
        ScValue::String(value.to_string())
    }
}

impl From<Option<&str>> for ScValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(ScValue::Null, ScValue::from)
    }
}

fn atoi(text: &str) -> i32 {
    let mut value = 0;
    scan_str(text, "%d", &mut [ScanTarget::Int(&mut value)]);
    value
}

/// Arguments of one method call, consumed front to back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScArgs {
    values: VecDeque<ScValue>,
}

impl ScArgs {
    pub fn new(values: impl IntoIterator<Item = ScValue>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pads with nulls or drops trailing values to match `arity`.
    pub fn correct(&mut self, arity: usize) {
        self.values.resize(arity, ScValue::Null);
    }

    pub fn pop(&mut self) -> ScValue {
        self.values.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_follow_script_rules() {
        assert_eq!(ScValue::from("12abc").to_int(), 12);
        assert_eq!(ScValue::Null.to_int_or(-1), -1);
        assert_eq!(ScValue::Float(2.9).to_int(), 2);
        assert!(ScValue::from("Yes").to_bool());
        assert!(ScValue::from("3").to_bool());
        assert!(!ScValue::from("nope").to_bool());
        assert_eq!(ScValue::Null.to_text(), "[null]");
        assert_eq!(ScValue::Bool(false).to_text(), "no");
        assert_eq!(ScValue::Float(1.5).to_text(), "1.500000");
        assert_eq!(ScValue::from("0.25").to_float(), 0.25);
    }

    #[test]
    fn correct_pads_and_truncates() {
        let mut args = ScArgs::new([ScValue::Int(1), ScValue::Int(2), ScValue::Int(3)]);
        args.correct(2);
        assert_eq!(args.len(), 2);
        assert_eq!(args.pop(), ScValue::Int(1));
        assert_eq!(args.pop(), ScValue::Int(2));
        assert_eq!(args.pop(), ScValue::Null);

        let mut args = ScArgs::default();
        args.correct(1);
        assert!(args.pop().is_null());
    }
}
