//! Line-preserving Fortran namelist editor.
//!
//! The document is kept as its original lines. Edits rewrite only the line of
//! the assignment being changed (keeping its indentation, key spelling,
//! trailing comma and comment) or insert a new line before the group
//! terminator. One assignment per line is assumed, which holds for every
//! namelist shipped with MPAS and WPS; lines without `=` inside a group are
//! treated as continuations of the previous assignment.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

const DEFAULT_INDENT: &str = "    ";

/// A scalar namelist value.
#[derive(Debug, Clone, PartialEq)]
pub enum NamelistValue {
    Logical(bool),
    Integer(i64),
    Real(f64),
    /// Quoted string. Array values read from a file are also kept here verbatim.
    Text(String),
}

impl NamelistValue {
    /// Parse the right-hand side of an assignment (comment already removed).
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_end_matches(',').trim_end();
        let lower = raw.to_ascii_lowercase();

        match lower.as_str() {
            ".true." | ".t." | "t" | "true" => return Self::Logical(true),
            ".false." | ".f." | "f" | "false" => return Self::Logical(false),
            _ => {}
        }

        if let Some(text) = unquote(raw) {
            return Self::Text(text);
        }

        if let Ok(i) = raw.parse::<i64>() {
            return Self::Integer(i);
        }

        let numeric_start = raw
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
        if numeric_start {
            // Fortran double precision exponents use 'd'
            if let Ok(r) = lower.replace('d', "e").parse::<f64>() {
                return Self::Real(r);
            }
        }

        Self::Text(raw.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for NamelistValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logical(true) => f.write_str(".true."),
            Self::Logical(false) => f.write_str(".false."),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) if r.fract() == 0.0 && r.abs() < 1e15 => write!(f, "{:.1}", r),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for NamelistValue {
    fn from(v: bool) -> Self {
        Self::Logical(v)
    }
}

impl From<i64> for NamelistValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for NamelistValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<u32> for NamelistValue {
    fn from(v: u32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for NamelistValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for NamelistValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for NamelistValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// An editable namelist file.
#[derive(Debug, Clone)]
pub struct Namelist {
    lines: Vec<String>,
    trailing_newline: bool,
    origin: String,
}

/// Line index of a group's `&name` line and of its terminating `/`.
#[derive(Debug, Clone, Copy)]
struct GroupSpan {
    start: usize,
    end: usize,
}

enum LineKind {
    GroupStart(String),
    GroupEnd,
    Assignment(String),
    Continuation,
    Blank,
}

impl Namelist {
    /// Parse namelist text. `origin` names the source in error messages.
    pub fn parse(text: &str, origin: impl Into<String>) -> ConfigResult<Self> {
        let namelist = Self {
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
            origin: origin.into(),
        };
        namelist.spans()?;
        Ok(namelist)
    }

    /// Read and parse a namelist file.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let namelist = Self::parse(&text, path.display().to_string())?;
        debug!(path = %path.display(), groups = ?namelist.groups(), "Loaded namelist");
        Ok(namelist)
    }

    /// Write the document back to `path`.
    pub fn write(&self, path: &Path) -> ConfigResult<()> {
        fs::write(path, self.to_string()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Group names in file order, lowercased.
    pub fn groups(&self) -> Vec<String> {
        self.spans()
            .map(|spans| spans.into_iter().map(|(name, _)| name).collect())
            .unwrap_or_default()
    }

    /// Current value of `group.key`, if the key is present.
    pub fn get(&self, group: &str, key: &str) -> ConfigResult<Option<NamelistValue>> {
        let span = self.span(group)?;
        let key = key.to_ascii_lowercase();
        Ok(self.find_key(span, &key).map(|idx| {
            let code = strip_comment(&self.lines[idx]);
            let value = code.split_once('=').map(|(_, v)| v).unwrap_or("");
            NamelistValue::parse(value)
        }))
    }

    /// Set `group.key`, replacing the existing assignment or appending one
    /// at the end of the group. The group itself must exist.
    pub fn set(
        &mut self,
        group: &str,
        key: &str,
        value: impl Into<NamelistValue>,
    ) -> ConfigResult<()> {
        let span = self.span(group)?;
        let rendered = value.into().to_string();
        let key_lc = key.to_ascii_lowercase();

        match self.find_key(span, &key_lc) {
            Some(idx) => {
                let line = &self.lines[idx];
                let indent = leading_whitespace(line);
                let code = strip_comment(line);
                let comment = &line[code.len()..];
                let original_key = code.split_once('=').map_or(key, |(k, _)| k.trim());
                let comma = if code.trim_end().ends_with(',') { "," } else { "" };

                let mut new_line = format!("{}{} = {}{}", indent, original_key, rendered, comma);
                if !comment.is_empty() {
                    new_line.push(' ');
                    new_line.push_str(comment.trim_start());
                }
                self.lines[idx] = new_line;

                // Drop continuation lines of the old value
                let mut end = span.end;
                while idx + 1 < end
                    && matches!(classify(&self.lines[idx + 1]), LineKind::Continuation)
                {
                    self.lines.remove(idx + 1);
                    end -= 1;
                }
            }
            None => {
                let indent = self.entry_indent(span);
                self.lines
                    .insert(span.end, format!("{}{} = {}", indent, key, rendered));
            }
        }
        Ok(())
    }

    /// Set several keys of one group.
    pub fn update(&mut self, group: &str, entries: &[(&str, NamelistValue)]) -> ConfigResult<()> {
        for (key, value) in entries {
            self.set(group, key, value.clone())?;
        }
        Ok(())
    }

    /// Replace the whole body of `group` with `entries`, creating the group
    /// at the end of the document if it does not exist.
    pub fn replace_group(
        &mut self,
        group: &str,
        entries: &[(&str, NamelistValue)],
    ) -> ConfigResult<()> {
        match self.span(group) {
            Ok(span) => {
                let indent = self.entry_indent(span);
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}{} = {}", indent, k, v))
                    .collect();
                self.lines.splice(span.start + 1..span.end, body);
            }
            Err(ConfigError::MissingGroup { .. }) => {
                if self.lines.last().map_or(false, |l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("&{}", group));
                self.lines.extend(
                    entries
                        .iter()
                        .map(|(k, v)| format!("{}{} = {}", DEFAULT_INDENT, k, v)),
                );
                self.lines.push("/".to_string());
                self.trailing_newline = true;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn span(&self, group: &str) -> ConfigResult<GroupSpan> {
        let wanted = group.to_ascii_lowercase();
        self.spans()?
            .into_iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, span)| span)
            .ok_or_else(|| ConfigError::MissingGroup {
                group: group.to_string(),
                origin: self.origin.clone(),
            })
    }

    fn spans(&self) -> ConfigResult<Vec<(String, GroupSpan)>> {
        let mut spans = Vec::new();
        let mut open: Option<(String, usize)> = None;

        for (idx, line) in self.lines.iter().enumerate() {
            match classify(line) {
                LineKind::GroupStart(name) => {
                    if let Some((group, start)) = open.take() {
                        return Err(self.unterminated(group, start));
                    }
                    open = Some((name, idx));
                }
                LineKind::GroupEnd => {
                    if let Some((group, start)) = open.take() {
                        spans.push((group, GroupSpan { start, end: idx }));
                    }
                }
                _ => {}
            }
        }

        match open {
            Some((group, start)) => Err(self.unterminated(group, start)),
            None => Ok(spans),
        }
    }

    fn unterminated(&self, group: String, start: usize) -> ConfigError {
        ConfigError::UnterminatedGroup {
            group,
            line: start + 1,
            origin: self.origin.clone(),
        }
    }

    fn find_key(&self, span: GroupSpan, key_lc: &str) -> Option<usize> {
        (span.start + 1..span.end).find(|&idx| match classify(&self.lines[idx]) {
            LineKind::Assignment(k) => k == key_lc,
            _ => false,
        })
    }

    fn entry_indent(&self, span: GroupSpan) -> String {
        (span.start + 1..span.end)
            .find(|&idx| matches!(classify(&self.lines[idx]), LineKind::Assignment(_)))
            .map(|idx| leading_whitespace(&self.lines[idx]).to_string())
            .unwrap_or_else(|| DEFAULT_INDENT.to_string())
    }
}

impl fmt::Display for Namelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))?;
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn classify(line: &str) -> LineKind {
    let code = strip_comment(line).trim();

    if code.is_empty() {
        return LineKind::Blank;
    }

    if let Some(rest) = code.strip_prefix('&') {
        let name = rest
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        return if name == "end" {
            LineKind::GroupEnd
        } else {
            LineKind::GroupStart(name)
        };
    }

    if code.starts_with('/') {
        return LineKind::GroupEnd;
    }

    if let Some((key, _)) = code.split_once('=') {
        let key = key.trim();
        let is_identifier = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')' | ',' | ':'));
        if is_identifier {
            return LineKind::Assignment(key.to_ascii_lowercase());
        }
    }

    LineKind::Continuation
}

/// The part of a line before any `!` comment that is not inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (idx, c) in line.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '!') => return &line[..idx],
            _ => {}
        }
    }
    line
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Contents of a single quoted string, or None for anything else
/// (including comma-separated lists of strings).
fn unquote(raw: &str) -> Option<String> {
    let quote = raw.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    if raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }
    let inner = &raw[1..raw.len() - 1];
    let doubled = format!("{}{}", quote, quote);
    if inner.replace(&doubled, "").contains(quote) {
        return None;
    }
    Some(inner.replace(&doubled, &quote.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!(NamelistValue::parse(".true."), NamelistValue::Logical(true));
        assert_eq!(NamelistValue::parse(".FALSE.,"), NamelistValue::Logical(false));
        assert_eq!(NamelistValue::parse("3600"), NamelistValue::Integer(3600));
        assert_eq!(NamelistValue::parse("-7"), NamelistValue::Integer(-7));
        assert_eq!(NamelistValue::parse("72.0"), NamelistValue::Real(72.0));
        assert_eq!(NamelistValue::parse("1.5d3"), NamelistValue::Real(1500.0));
        assert_eq!(
            NamelistValue::parse("'x1.40962.graph.info.part.'"),
            NamelistValue::Text("x1.40962.graph.info.part.".to_string())
        );
        assert_eq!(
            NamelistValue::parse("'it''s'"),
            NamelistValue::Text("it's".to_string())
        );
    }

    #[test]
    fn test_array_of_strings_kept_raw() {
        assert_eq!(
            NamelistValue::parse("'ARW','ARW',"),
            NamelistValue::Text("'ARW','ARW'".to_string())
        );
    }

    #[test]
    fn test_render_values() {
        assert_eq!(NamelistValue::from(true).to_string(), ".true.");
        assert_eq!(NamelistValue::from(72_i64).to_string(), "72");
        assert_eq!(NamelistValue::from(12000.0).to_string(), "12000.0");
        assert_eq!(NamelistValue::from(0.25).to_string(), "0.25");
        assert_eq!(NamelistValue::from("FILE").to_string(), "'FILE'");
        assert_eq!(NamelistValue::from("it's").to_string(), "'it''s'");
    }

    #[test]
    fn test_strip_comment_ignores_quoted_bang() {
        assert_eq!(strip_comment("a = 'x!y' ! note"), "a = 'x!y' ");
        assert_eq!(strip_comment("a = 1"), "a = 1");
    }

    #[test]
    fn test_unterminated_group() {
        let err = Namelist::parse("&share\n start_date = 'x'\n", "test").unwrap_err();
        assert!(matches!(err, ConfigError::UnterminatedGroup { line: 1, .. }));
    }

    #[test]
    fn test_set_keeps_comment_and_comma() {
        let mut nml =
            Namelist::parse("&share\n interval_seconds = 10800, ! 3 hours\n/\n", "test").unwrap();
        nml.set("share", "interval_seconds", 3600).unwrap();
        assert_eq!(
            nml.to_string(),
            "&share\n interval_seconds = 3600, ! 3 hours\n/\n"
        );
    }
}
