use std::collections::BTreeMap;

use serde::Serialize;

use crate::parser::{ParseError, TokenParser};
use crate::text::TextBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorToken {
    Name,
    Value,
}

const EDITOR_COMMANDS: &[(&str, EditorToken)] =
    &[("NAME", EditorToken::Name), ("VALUE", EditorToken::Value)];

/// Free-form key/value metadata the scene editor attaches to objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EditorProps(BTreeMap<String, String>);

impl EditorProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Stores `value` under `name`; `None` removes the entry.
    pub fn set(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.0.insert(name.to_string(), value.to_string());
            }
            None => {
                self.0.remove(name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses the body of an `EDITOR_PROPERTY { NAME=".." VALUE=".." }` block.
    pub fn parse_property(&mut self, params: &str, line: usize) -> Result<(), ParseError> {
        let mut parser = TokenParser::at_line(params, EDITOR_COMMANDS, line);
        let mut name = None;
        let mut value = None;
        while let Some(cmd) = parser.next_command()? {
            match cmd.token {
                EditorToken::Name => name = Some(cmd.params),
                EditorToken::Value => value = Some(cmd.params),
            }
        }
        match name {
            Some(name) => self.set(name, value),
            None => log::warn!("line {line}: EDITOR_PROPERTY without NAME ignored"),
        }
        Ok(())
    }

    pub fn write_text(&self, out: &mut TextBuffer, indent: usize) {
        for (name, value) in self.iter() {
            out.put_indented(indent, format_args!("EDITOR_PROPERTY\n"));
            out.put_indented(indent, format_args!("{{\n"));
            out.put_indented(indent + 2, format_args!("NAME=\"{name}\"\n"));
            out.put_indented(indent + 2, format_args!("VALUE=\"{value}\"\n"));
            out.put_indented(indent, format_args!("}}\n\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_writes_properties() {
        let mut props = EditorProps::new();
        props
            .parse_property(" NAME=\"layer\" VALUE=\"front\" ", 1)
            .expect("parsed");
        props.parse_property("VALUE=\"orphan\"", 1).expect("parsed");
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("layer"), Some("front"));

        let mut out = TextBuffer::new();
        props.write_text(&mut out, 2);
        assert_eq!(
            out.as_str(),
            "  EDITOR_PROPERTY\n  {\n    NAME=\"layer\"\n    VALUE=\"front\"\n  }\n\n"
        );
    }

    #[test]
    fn missing_value_removes_property() {
        let mut props = EditorProps::new();
        props.set("layer", Some("front"));
        props.parse_property("NAME=\"layer\"", 1).expect("parsed");
        assert!(props.is_empty());
    }
}
