//! MPAS XML streams editor.
//!
//! Streams files declare each model input/output stream as a `<stream>` or
//! `<immutable_stream>` element identified by its `name` attribute. Edits
//! rewrite the attribute value inside the original tag text, so attribute
//! order, line breaks and alignment of the file survive the round trip.

use std::fs;
use std::path::Path;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

const STREAM_TAGS: [&[u8]; 2] = [b"stream", b"immutable_stream"];

/// An editable streams file.
#[derive(Debug, Clone)]
pub struct Streams {
    xml: String,
    origin: String,
}

impl Streams {
    /// Parse streams XML. `origin` names the source in error messages.
    pub fn parse(xml: &str, origin: impl Into<String>) -> ConfigResult<Self> {
        let streams = Self {
            xml: xml.to_string(),
            origin: origin.into(),
        };
        // Validate once up front so later edits only fail on missing streams
        streams.names()?;
        Ok(streams)
    }

    /// Read and parse a streams file.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let xml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let streams = Self::parse(&xml, path.display().to_string())?;
        debug!(path = %path.display(), streams = ?streams.names()?, "Loaded streams file");
        Ok(streams)
    }

    /// Write the document back to `path`.
    pub fn write(&self, path: &Path) -> ConfigResult<()> {
        fs::write(path, &self.xml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.xml
    }

    /// Names of all declared streams, in file order.
    pub fn names(&self) -> ConfigResult<Vec<String>> {
        let mut reader = Reader::from_str(&self.xml);
        let mut names = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if let Some(name) = self.stream_name(&e)? {
                        names.push(name);
                    }
                }
                Ok(_) => {}
                Err(e) => return Err(self.xml_error(&reader, e)),
            }
        }

        Ok(names)
    }

    /// Current value of `attr` on stream `stream`.
    pub fn attribute(&self, stream: &str, attr: &str) -> ConfigResult<Option<String>> {
        let mut reader = Reader::from_str(&self.xml);

        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if self.stream_name(&e)?.as_deref() == Some(stream) {
                        return self.get_attribute(&e, attr);
                    }
                }
                Ok(_) => {}
                Err(e) => return Err(self.xml_error(&reader, e)),
            }
        }

        Err(self.missing(stream))
    }

    /// Set `attr` on the stream named `stream`, adding the attribute if the
    /// element does not carry it yet.
    pub fn set_attribute(&mut self, stream: &str, attr: &str, value: &str) -> ConfigResult<()> {
        let mut reader = Reader::from_str(&self.xml);
        let mut writer = Writer::new(Vec::with_capacity(self.xml.len() + 64));
        let mut found = false;
        let escaped = escape(value);

        loop {
            let event = match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(event) => event,
                Err(e) => return Err(self.xml_error(&reader, e)),
            };

            let event = match event {
                Event::Start(e) if self.stream_name(&e)?.as_deref() == Some(stream) => {
                    found = true;
                    Event::Start(self.edited(&e, attr, &escaped)?)
                }
                Event::Empty(e) if self.stream_name(&e)?.as_deref() == Some(stream) => {
                    found = true;
                    Event::Empty(self.edited(&e, attr, &escaped)?)
                }
                other => other,
            };

            writer
                .write_event(event)
                .map_err(|e| self.error_message(e.to_string()))?;
        }

        if !found {
            return Err(self.missing(stream));
        }

        self.xml = String::from_utf8(writer.into_inner())
            .map_err(|e| self.error_message(e.to_string()))?;
        debug!(origin = %self.origin, stream, attr, value, "Updated stream attribute");
        Ok(())
    }

    fn stream_name(&self, e: &BytesStart<'_>) -> ConfigResult<Option<String>> {
        if !STREAM_TAGS.contains(&e.name().as_ref()) {
            return Ok(None);
        }
        self.get_attribute(e, "name")
    }

    fn get_attribute(&self, e: &BytesStart<'_>, attr: &str) -> ConfigResult<Option<String>> {
        let attribute = e
            .try_get_attribute(attr)
            .map_err(|err| self.error_message(err.to_string()))?;
        match attribute {
            Some(a) => {
                let value = a
                    .unescape_value()
                    .map_err(|err| self.error_message(err.to_string()))?;
                Ok(Some(value.into_owned()))
            }
            None => Ok(None),
        }
    }

    /// Rebuild a start tag with one attribute value replaced in its raw text.
    fn edited(
        &self,
        e: &BytesStart<'_>,
        attr: &str,
        escaped_value: &str,
    ) -> ConfigResult<BytesStart<'static>> {
        let raw = std::str::from_utf8(e)
            .map_err(|err| self.error_message(err.to_string()))?;
        let name_len = e.name().as_ref().len();
        let content = replace_raw_attribute(raw, attr, escaped_value);
        Ok(BytesStart::from_content(content, name_len))
    }

    fn missing(&self, stream: &str) -> ConfigError {
        ConfigError::MissingStream {
            stream: stream.to_string(),
            origin: self.origin.clone(),
        }
    }

    fn xml_error(&self, reader: &Reader<&[u8]>, e: quick_xml::Error) -> ConfigError {
        self.error_message(format!("{} at byte {}", e, reader.buffer_position()))
    }

    fn error_message(&self, message: String) -> ConfigError {
        ConfigError::Xml {
            origin: self.origin.clone(),
            message,
        }
    }
}

/// Replace the value of `attr` inside raw tag content (`name a="1" b='2'`),
/// or append `attr="value"` when absent. `value` must already be escaped.
fn replace_raw_attribute(raw: &str, attr: &str, value: &str) -> String {
    let bytes = raw.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {
                let at_word_start = i > 0 && bytes[i - 1].is_ascii_whitespace();
                if at_word_start && raw[i..].starts_with(attr) {
                    if let Some((value_start, value_end)) = attribute_value_span(raw, i + attr.len()) {
                        return format!("{}{}{}", &raw[..value_start], value, &raw[value_end..]);
                    }
                }
            }
        }
        i += 1;
    }

    // Keep whitespace before a self-closing '/>' where it was
    let trimmed = raw.trim_end();
    format!("{} {}=\"{}\"{}", trimmed, attr, value, &raw[trimmed.len()..])
}

/// Byte range of the quoted value following an attribute name ending at `pos`.
fn attribute_value_span(raw: &str, pos: usize) -> Option<(usize, usize)> {
    let bytes = raw.as_bytes();
    let mut i = pos;

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'=') {
        return None;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let q = *bytes.get(i)?;
    if q != b'"' && q != b'\'' {
        return None;
    }
    let start = i + 1;
    let len = raw[start..].find(q as char)?;
    Some((start, start + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_existing_attribute() {
        let raw = "immutable_stream name=\"input\" type=\"input\" filename_template=\"x1.nc\"";
        assert_eq!(
            replace_raw_attribute(raw, "filename_template", "conus.static.nc"),
            "immutable_stream name=\"input\" type=\"input\" filename_template=\"conus.static.nc\""
        );
    }

    #[test]
    fn test_attribute_name_prefix_not_confused() {
        let raw = "stream name=\"lbc\" output_interval_x=\"a\" output_interval=\"3:00:00\"";
        assert_eq!(
            replace_raw_attribute(raw, "output_interval", "1:00:00"),
            "stream name=\"lbc\" output_interval_x=\"a\" output_interval=\"1:00:00\""
        );
    }

    #[test]
    fn test_append_missing_attribute_keeps_trailing_space() {
        let raw = "stream name=\"lbc\" ";
        assert_eq!(
            replace_raw_attribute(raw, "output_interval", "1:00:00"),
            "stream name=\"lbc\" output_interval=\"1:00:00\" "
        );
    }

    #[test]
    fn test_quoted_text_is_not_an_attribute() {
        let raw = "stream name=\"a input=b\" input=\"x\"";
        assert_eq!(
            replace_raw_attribute(raw, "input", "y"),
            "stream name=\"a input=b\" input=\"y\""
        );
    }
}
