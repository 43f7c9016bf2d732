use std::fmt::{self, Write};

/// Growable text sink used when writing definitions back out.
#[derive(Debug, Default, Clone)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `args` after `indent` spaces.
    pub fn put_indented(&mut self, indent: usize, args: fmt::Arguments<'_>) {
        self.text.extend(std::iter::repeat(' ').take(indent));
        // Writing into a String can not fail.
        let _ = self.text.write_fmt(args);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

pub(crate) fn bool_word(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}
