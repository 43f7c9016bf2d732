//! Tokenizer for the WME definition language.
//!
//! A definition is a sequence of commands. Each command is a name from a
//! caller-supplied table, optionally followed by a single-quoted object name,
//! and then either `= value` or a `{ ... }` block:
//!
//! ```text
//! DELAY = 10
//! IMAGE = "sprites\walk_01.png"
//! RECT { 0, 0, 64, 128 }
//! SUBFRAME { IMAGE = "shadow.png" DECORATION = TRUE }
//! ```
//!
//! The parser only splits commands; interpreting the parameter string is left
//! to the caller, usually through [`scan_str`].

use thiserror::Error;

/// Why a definition buffer could not be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized token near '{offender}'")]
    TokenNotFound { line: usize, offender: String },
    #[error("line {line}: malformed definition: {reason}")]
    Malformed { line: usize, reason: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::TokenNotFound { line, .. } | ParseError::Malformed { line, .. } => *line,
        }
    }
}

/// One command split out of a definition buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a, T> {
    pub token: T,
    /// Optional `'name'` following the command.
    pub name: Option<&'a str>,
    /// Assignment value or the inner text of the `{ }` block.
    pub params: &'a str,
    pub line: usize,
    /// Line on which `params` starts.
    pub params_line: usize,
}

/// Longest offending snippet quoted back in a [`ParseError::TokenNotFound`].
const MAX_OFFENDER_LEN: usize = 255;

pub struct TokenParser<'a, T: 'static> {
    rest: &'a str,
    line: usize,
    commands: &'static [(&'static str, T)],
}

impl<'a, T: Copy> TokenParser<'a, T> {
    pub fn new(buffer: &'a str, commands: &'static [(&'static str, T)]) -> Self {
        Self::at_line(buffer, commands, 1)
    }

    /// Starts numbering lines at `line`, used for nested blocks.
    pub fn at_line(buffer: &'a str, commands: &'static [(&'static str, T)], line: usize) -> Self {
        Self {
            rest: buffer,
            line,
            commands,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the next command, `Ok(None)` once the buffer is exhausted.
    pub fn next_command(&mut self) -> Result<Option<Command<'a, T>>, ParseError> {
        self.skip_blanks();
        if self.rest.is_empty() {
            return Ok(None);
        }

        let line = self.line;
        let Some((token, len)) = self.match_token() else {
            return Err(ParseError::TokenNotFound {
                line,
                offender: offending_text(self.rest),
            });
        };
        self.advance(len);
        self.skip_whitespace();

        let name = if self.rest.starts_with('\'') {
            Some(self.delimited('\'', "unterminated object name")?)
        } else {
            None
        };
        self.skip_whitespace();

        let params_line = self.line;
        let params = if self.rest.starts_with('=') {
            self.assignment()?
        } else if self.rest.starts_with('{') {
            self.block()?
        } else {
            ""
        };

        Ok(Some(Command {
            token,
            name,
            params,
            line,
            params_line,
        }))
    }

    fn match_token(&self) -> Option<(T, usize)> {
        let bytes = self.rest.as_bytes();
        self.commands.iter().find_map(|(name, token)| {
            let len = name.len();
            if bytes.len() < len || !bytes[..len].eq_ignore_ascii_case(name.as_bytes()) {
                return None;
            }
            match bytes.get(len) {
                Some(next) if next.is_ascii_alphanumeric() || *next == b'_' => None,
                _ => Some((*token, len)),
            }
        })
    }

    fn advance(&mut self, len: usize) {
        let (consumed, rest) = self.rest.split_at(len);
        self.line += consumed.matches('\n').count();
        self.rest = rest;
    }

    fn skip_whitespace(&mut self) {
        let len = self.rest.len() - self.rest.trim_start_matches(is_blank).len();
        self.advance(len);
    }

    fn skip_blanks(&mut self) {
        loop {
            self.skip_whitespace();
            if self.rest.starts_with(';') || self.rest.starts_with("//") {
                let len = self.rest.find('\n').unwrap_or(self.rest.len());
                self.advance(len);
            } else {
                break;
            }
        }
    }

    fn assignment(&mut self) -> Result<&'a str, ParseError> {
        self.advance(1);
        self.skip_whitespace();
        if self.rest.starts_with('"') {
            return self.delimited('"', "unterminated string");
        }
        let len = self
            .rest
            .find(|ch: char| ch <= ' ')
            .unwrap_or(self.rest.len());
        let value = &self.rest[..len];
        self.advance(len);
        Ok(value)
    }

    /// Reads `quote ... quote` and returns the text in between.
    fn delimited(&mut self, quote: char, reason: &str) -> Result<&'a str, ParseError> {
        let body = &self.rest[1..];
        let Some(end) = body.find(quote) else {
            return Err(ParseError::Malformed {
                line: self.line,
                reason: reason.to_string(),
            });
        };
        let value = &body[..end];
        self.advance(end + 2);
        Ok(value)
    }

    fn block(&mut self) -> Result<&'a str, ParseError> {
        let mut depth = 0usize;
        let mut in_string = false;
        for (idx, ch) in self.rest.char_indices() {
            match ch {
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &self.rest[1..idx];
                        self.advance(idx + 1);
                        return Ok(inner);
                    }
                }
                _ => {}
            }
        }
        Err(ParseError::Malformed {
            line: self.line,
            reason: "unbalanced braces".to_string(),
        })
    }
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

fn offending_text(rest: &str) -> String {
    let line = rest.lines().next().unwrap_or_default().trim();
    line.chars().take(MAX_OFFENDER_LEN).collect()
}

/// Destination of one `%` conversion in [`scan_str`].
#[derive(Debug)]
pub enum ScanTarget<'t> {
    /// `%d`
    Int(&'t mut i32),
    /// `%f`
    Float(&'t mut f32),
    /// `%b`
    Bool(&'t mut bool),
    /// `%s`, consumes the rest of the input.
    Str(&'t mut String),
}

/// Best-effort `scanf` over a parameter string.
///
/// Conversions are assigned to `targets` in order. Literal characters in the
/// format (typically commas) must appear in the input, whitespace around them
/// is ignored. Scanning stops at the first mismatch; targets that were not
/// reached keep their previous value. Returns the number of assigned targets.
pub fn scan_str(input: &str, format: &str, targets: &mut [ScanTarget<'_>]) -> usize {
    let mut rest = input;
    let mut assigned = 0;
    let mut spec = format.chars();

    while let Some(ch) = spec.next() {
        if ch.is_whitespace() {
            continue;
        }
        rest = rest.trim_start();

        if ch != '%' {
            match rest.strip_prefix(ch) {
                Some(after) => {
                    rest = after;
                    continue;
                }
                None => break,
            }
        }

        let Some(kind) = spec.next() else { break };
        let Some(target) = targets.get_mut(assigned) else {
            break;
        };
        let consumed = match (kind, target) {
            ('d', ScanTarget::Int(slot)) => scan_int(rest).map(|(value, len)| {
                **slot = value;
                len
            }),
            ('f', ScanTarget::Float(slot)) => scan_float(rest).map(|(value, len)| {
                **slot = value;
                len
            }),
            ('b', ScanTarget::Bool(slot)) => scan_bool(rest).map(|(value, len)| {
                **slot = value;
                len
            }),
            ('s', ScanTarget::Str(slot)) => {
                **slot = rest.trim_end().to_string();
                Some(rest.len())
            }
            _ => None,
        };
        match consumed {
            Some(len) => {
                rest = &rest[len..];
                assigned += 1;
            }
            None => break,
        }
    }

    assigned
}

fn sign_and_digits(input: &str) -> usize {
    let bytes = input.as_bytes();
    let mut len = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        len = 1;
    }
    while bytes.get(len).is_some_and(u8::is_ascii_digit) {
        len += 1;
    }
    len
}

fn scan_int(input: &str) -> Option<(i32, usize)> {
    let len = sign_and_digits(input);
    let value: i64 = input[..len].parse().ok()?;
    let clamped = value.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
    Some((clamped as i32, len))
}

fn scan_float(input: &str) -> Option<(f32, usize)> {
    let bytes = input.as_bytes();
    let mut len = sign_and_digits(input);
    if bytes.get(len) == Some(&b'.') {
        len += 1;
        while bytes.get(len).is_some_and(u8::is_ascii_digit) {
            len += 1;
        }
    }
    let value: f32 = input[..len].parse().ok()?;
    Some((value, len))
}

fn scan_bool(input: &str) -> Option<(bool, usize)> {
    let len = input
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '+'))
        .unwrap_or(input.len());
    let word = &input[..len];
    if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("yes") {
        return Some((true, len));
    }
    if word.eq_ignore_ascii_case("false") || word.eq_ignore_ascii_case("no") {
        return Some((false, len));
    }
    let (value, digits) = scan_int(word)?;
    (digits == len).then_some((value != 0, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tok {
        Alpha,
        AlphaColor,
        Image,
        Rect,
    }

    // ALPHA first on purpose: matching must not stop at a prefix.
    const TOKENS: &[(&str, Tok)] = &[
        ("ALPHA", Tok::Alpha),
        ("ALPHA_COLOR", Tok::AlphaColor),
        ("IMAGE", Tok::Image),
        ("RECT", Tok::Rect),
    ];

    fn collect(input: &str) -> Result<Vec<(Tok, String)>, ParseError> {
        let mut parser = TokenParser::new(input, TOKENS);
        let mut out = Vec::new();
        while let Some(cmd) = parser.next_command()? {
            out.push((cmd.token, cmd.params.to_string()));
        }
        Ok(out)
    }

    #[test]
    fn splits_assignments_and_blocks() {
        let parsed = collect(
            "; leading comment\n  image = \"dir\\a b.png\"\nALPHA_COLOR { 1, 2, 3 }\n alpha=128\n// trailing\nRECT{0,0,{1},2}",
        )
        .expect("parsed");
        assert_eq!(
            parsed,
            vec![
                (Tok::Image, "dir\\a b.png".to_string()),
                (Tok::AlphaColor, " 1, 2, 3 ".to_string()),
                (Tok::Alpha, "128".to_string()),
                (Tok::Rect, "0,0,{1},2".to_string()),
            ]
        );
    }

    #[test]
    fn reports_unknown_tokens_with_line() {
        let err = collect("ALPHA = 1\n\nBOGUS = 3\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::TokenNotFound {
                line: 3,
                offender: "BOGUS = 3".to_string()
            }
        );
    }

    #[test]
    fn reports_malformed_buffers() {
        assert!(matches!(
            collect("RECT { 1, 2"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(matches!(
            collect("IMAGE = \"open"),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn command_without_value_has_empty_params() {
        let parsed = collect("IMAGE 'name' RECT {1}").expect("parsed");
        assert_eq!(parsed[0], (Tok::Image, String::new()));
        assert_eq!(parsed[1], (Tok::Rect, "1".to_string()));
    }

    #[test]
    fn scan_fills_tuples_and_keeps_defaults() {
        let (mut a, mut b, mut c) = (7, 8, 9);
        let count = scan_str(
            " 1 ,-2 ",
            "%d,%d,%d",
            &mut [
                ScanTarget::Int(&mut a),
                ScanTarget::Int(&mut b),
                ScanTarget::Int(&mut c),
            ],
        );
        assert_eq!(count, 2);
        assert_eq!((a, b, c), (1, -2, 9));

        let mut untouched = 5;
        assert_eq!(scan_str("x", "%d", &mut [ScanTarget::Int(&mut untouched)]), 0);
        assert_eq!(untouched, 5);
    }

    #[test]
    fn scan_reads_booleans_floats_and_strings() {
        let mut flag = false;
        assert_eq!(scan_str("TRUE", "%b", &mut [ScanTarget::Bool(&mut flag)]), 1);
        assert!(flag);
        assert_eq!(scan_str("no", "%b", &mut [ScanTarget::Bool(&mut flag)]), 1);
        assert!(!flag);
        assert_eq!(scan_str("2", "%b", &mut [ScanTarget::Bool(&mut flag)]), 1);
        assert!(flag);
        assert_eq!(scan_str("maybe", "%b", &mut [ScanTarget::Bool(&mut flag)]), 0);
        assert!(flag);

        let mut scale = 0.0;
        let mut label = String::new();
        let count = scan_str(
            "-1.5, hello world ",
            "%f,%s",
            &mut [ScanTarget::Float(&mut scale), ScanTarget::Str(&mut label)],
        );
        assert_eq!(count, 2);
        assert_eq!(scale, -1.5);
        assert_eq!(label, "hello world");
    }
}
