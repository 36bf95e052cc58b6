//! Query templates and parameter sets.
//!
//! A [`Query`] is scanned once at construction: placeholders are located
//! (skipping string literals, quoted identifiers and comments), their style
//! is checked for consistency, and the template is split into text and
//! parameter segments so it can be rendered in each backend's native
//! placeholder syntax.

use super::{DatabaseBackend, Value};
use crate::error::{CastlistError, Result};
use std::fmt;

/// Placeholder style used by a query template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// The template has no placeholders.
    None,
    /// Numbered positional placeholders: `$1`, `$2`, or SQLite's `?1`, `?2`.
    Numbered,
    /// Anonymous positional placeholders: `?`.
    Anonymous,
    /// Named placeholders: `:name`.
    Named,
}

impl fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Numbered => write!(f, "numbered ($1)"),
            Self::Anonymous => write!(f, "anonymous (?)"),
            Self::Named => write!(f, "named (:name)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    /// Zero-based parameter index.
    Param(usize),
}

/// An immutable SQL template with zero or more placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    sql: String,
    segments: Vec<Segment>,
    style: PlaceholderStyle,
    names: Vec<String>,
    param_count: usize,
}

impl Query {
    /// Parses a query template.
    ///
    /// Fails with a syntax error if the text is empty, a quoted literal or
    /// block comment is unterminated, placeholder styles are mixed, or
    /// numbered placeholders skip an index.
    ///
    /// A bare `?` is always a placeholder, so the jsonb `?`, `?|` and `?&`
    /// operators must be spelled `jsonb_exists`, `jsonb_exists_any` and
    /// `jsonb_exists_all` in templates.
    pub fn new(sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return Err(CastlistError::syntax("query text is empty"));
        }

        let mut scanner = Scanner::new(&sql);
        scanner.scan()?;
        let Scanner {
            segments,
            style,
            names,
            max_index,
            anonymous_count,
            used,
            ..
        } = scanner;

        let param_count = match style {
            PlaceholderStyle::None => 0,
            PlaceholderStyle::Numbered => {
                if let Some(missing) = (0..max_index).find(|i| !used.contains(i)) {
                    return Err(CastlistError::syntax(format!(
                        "placeholder ${} is never used but ${max_index} is",
                        missing + 1
                    )));
                }
                max_index
            }
            PlaceholderStyle::Anonymous => anonymous_count,
            PlaceholderStyle::Named => names.len(),
        };

        Ok(Self {
            sql,
            segments,
            style,
            names,
            param_count,
        })
    }

    /// The placeholder style used by the template.
    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    /// Number of parameters the template expects.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Renders the template with the backend's native placeholders.
    ///
    /// PostgreSQL receives `$N`, SQLite receives `?N`. Named and anonymous
    /// placeholders are numbered by their parameter position.
    pub fn render(&self, backend: DatabaseBackend) -> String {
        let mut out = String::with_capacity(self.sql.len() + 8);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(index) => {
                    out.push(backend.placeholder_prefix());
                    out.push_str(&(index + 1).to_string());
                }
            }
        }
        out
    }

    /// Orders named values to match the template's placeholders.
    ///
    /// Every placeholder name must be bound exactly once; names the template
    /// does not use are rejected.
    pub fn bind_named<'a, I>(&self, values: I) -> Result<Params>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut slots: Vec<Option<Value>> = vec![None; self.names.len()];

        for (name, value) in values {
            let name = name.strip_prefix(':').unwrap_or(name);
            let index = self
                .names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| {
                    CastlistError::binding(format!("query has no placeholder named :{name}"))
                })?;
            if slots[index].replace(value).is_some() {
                return Err(CastlistError::binding(format!(
                    "parameter :{name} is bound more than once"
                )));
            }
        }

        let bound = slots.iter().filter(|slot| slot.is_some()).count();
        if bound != self.names.len() {
            return Err(CastlistError::arity(self.names.len(), bound));
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Single pass over the template text.
///
/// All syntax the scanner cares about is ASCII, so text segments are sliced
/// at byte offsets that always fall on character boundaries.
struct Scanner<'a> {
    sql: &'a str,
    bytes: &'a [u8],
    pos: usize,
    text_start: usize,
    segments: Vec<Segment>,
    style: PlaceholderStyle,
    names: Vec<String>,
    used: Vec<usize>,
    max_index: usize,
    anonymous_count: usize,
}

impl<'a> Scanner<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            sql,
            bytes: sql.as_bytes(),
            pos: 0,
            text_start: 0,
            segments: Vec::new(),
            style: PlaceholderStyle::None,
            names: Vec::new(),
            used: Vec::new(),
            max_index: 0,
            anonymous_count: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn scan(&mut self) -> Result<()> {
        while let Some(b) = self.peek(0) {
            match b {
                b'E' | b'e' if self.peek(1) == Some(b'\'') && !self.after_ident() => {
                    self.pos += 1;
                    self.skip_quoted(b'\'', "escape string literal", true)?
                }
                b'\'' => self.skip_quoted(b'\'', "string literal", false)?,
                b'"' => self.skip_quoted(b'"', "quoted identifier", false)?,
                b'-' if self.peek(1) == Some(b'-') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'$' => self.dollar()?,
                b'?' => self.question_mark()?,
                b':' => self.colon()?,
                _ => self.pos += 1,
            }
        }
        self.flush_text(self.pos);
        Ok(())
    }

    fn after_ident(&self) -> bool {
        self.pos > 0 && is_ident_byte(self.bytes[self.pos - 1])
    }

    fn skip_quoted(&mut self, quote: u8, what: &str, backslash_escapes: bool) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        // A doubled quote is an escaped quote; it closes and reopens.
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            if backslash_escapes && b == b'\\' {
                self.pos += 1;
            } else if b == quote {
                return Ok(());
            }
        }
        Err(CastlistError::syntax(format!(
            "unterminated {what} starting at offset {start}"
        )))
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.peek(0) == Some(b'*') && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(CastlistError::syntax(format!(
            "unterminated block comment starting at offset {start}"
        )))
    }

    fn take_digits(&self, from: usize) -> usize {
        let mut end = from;
        while end < self.bytes.len() && self.bytes[end].is_ascii_digit() {
            end += 1;
        }
        end
    }

    fn dollar(&mut self) -> Result<()> {
        let start = self.pos;
        let digits_end = self.take_digits(start + 1);
        if digits_end > start + 1 {
            let index = self.parse_index(start + 1, digits_end)?;
            return self.numbered(start, digits_end, index);
        }

        // PostgreSQL dollar-quoted string: $tag$ ... $tag$
        let mut tag_end = start + 1;
        while tag_end < self.bytes.len() && is_ident_byte(self.bytes[tag_end]) {
            tag_end += 1;
        }
        if self.bytes.get(tag_end) == Some(&b'$') {
            let tag = &self.sql[start..=tag_end];
            let body_start = tag_end + 1;
            return match self.sql[body_start..].find(tag) {
                Some(offset) => {
                    self.pos = body_start + offset + tag.len();
                    Ok(())
                }
                None => Err(CastlistError::syntax(format!(
                    "unterminated dollar-quoted string starting at offset {start}"
                ))),
            };
        }

        self.pos += 1;
        Ok(())
    }

    fn question_mark(&mut self) -> Result<()> {
        let start = self.pos;
        let digits_end = self.take_digits(start + 1);
        if digits_end > start + 1 {
            let index = self.parse_index(start + 1, digits_end)?;
            return self.numbered(start, digits_end, index);
        }

        self.set_style(PlaceholderStyle::Anonymous)?;
        let index = self.anonymous_count;
        self.anonymous_count += 1;
        self.push_param(start, start + 1, index);
        Ok(())
    }

    fn colon(&mut self) -> Result<()> {
        let start = self.pos;
        if self.peek(1) == Some(b':') {
            // PostgreSQL cast
            self.pos += 2;
            return Ok(());
        }
        match self.peek(1) {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let mut end = start + 1;
                while end < self.bytes.len() && is_ident_byte(self.bytes[end]) {
                    end += 1;
                }
                self.set_style(PlaceholderStyle::Named)?;
                let name = &self.sql[start + 1..end];
                let index = match self.names.iter().position(|n| n == name) {
                    Some(index) => index,
                    None => {
                        self.names.push(name.to_string());
                        self.names.len() - 1
                    }
                };
                self.push_param(start, end, index);
            }
            _ => self.pos += 1,
        }
        Ok(())
    }

    fn parse_index(&self, from: usize, to: usize) -> Result<usize> {
        let digits = &self.sql[from..to];
        match digits.parse::<usize>() {
            Ok(0) => Err(CastlistError::syntax(
                "placeholder numbering starts at 1, found 0",
            )),
            Ok(n) if n <= u16::MAX as usize => Ok(n),
            _ => Err(CastlistError::syntax(format!(
                "placeholder index {digits} is out of range"
            ))),
        }
    }

    fn numbered(&mut self, start: usize, end: usize, index: usize) -> Result<()> {
        self.set_style(PlaceholderStyle::Numbered)?;
        let zero_based = index - 1;
        if !self.used.contains(&zero_based) {
            self.used.push(zero_based);
        }
        self.max_index = self.max_index.max(index);
        self.push_param(start, end, zero_based);
        Ok(())
    }

    fn set_style(&mut self, style: PlaceholderStyle) -> Result<()> {
        match self.style {
            PlaceholderStyle::None => {
                self.style = style;
                Ok(())
            }
            current if current == style => Ok(()),
            current => Err(CastlistError::syntax(format!(
                "cannot mix {current} and {style} placeholders"
            ))),
        }
    }

    fn push_param(&mut self, start: usize, end: usize, index: usize) {
        self.flush_text(start);
        self.segments.push(Segment::Param(index));
        self.pos = end;
        self.text_start = end;
    }

    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            self.segments
                .push(Segment::Text(self.sql[self.text_start..end].to_string()));
        }
        self.text_start = end;
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// An ordered set of values bound to a query's placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<Value>);

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, builder style.
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Appends a value.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The values, in binding order.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Params {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds a [`Params`] from a list of values convertible into [`Value`].
///
/// ```
/// use castlist::params;
/// let params = params!["Harrison Ford", 2];
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::db::Params::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::db::Params::from(vec![$($crate::db::Value::from($value)),+])
    };
}
