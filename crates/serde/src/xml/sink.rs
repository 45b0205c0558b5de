//! Output side of the document boundary.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{ItsError, Result};

/// Push-style writer the graph engine emits through.
///
/// Attributes may only be written while the start tag of the most recently
/// opened element is still open, i.e. before any character data or child
/// element of it.
pub trait XmlSink {
    fn start_element(&mut self, name: &str) -> Result<()>;

    fn write_attribute(&mut self, name: &str, value: &str) -> Result<()>;

    fn write_characters(&mut self, text: &str) -> Result<()>;

    /// Closes the most recently opened element.
    fn end_element(&mut self) -> Result<()>;
}

/// [`XmlSink`] over a quick-xml [`Writer`].
///
/// The start tag of an element is held back until its first child or
/// character data, so childless elements come out self-closing.
pub struct QuickXmlSink<W: Write> {
    writer: Writer<W>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
    write_declaration: bool,
    declaration_written: bool,
}

impl<W: Write> QuickXmlSink<W> {
    /// Creates a sink writing compact XML.
    pub fn new(writer: W) -> Self {
        Self::with_writer(Writer::new(writer))
    }

    /// Creates a sink indenting nested elements by two spaces.
    pub fn pretty(writer: W) -> Self {
        Self::with_writer(Writer::new_with_indent(writer, b' ', 2))
    }

    fn with_writer(writer: Writer<W>) -> Self {
        Self {
            writer,
            pending: None,
            open: Vec::new(),
            write_declaration: false,
            declaration_written: false,
        }
    }

    /// Writes `<?xml version="1.0" encoding="UTF-8"?>` before the first
    /// element.
    pub fn with_declaration(mut self, write_declaration: bool) -> Self {
        self.write_declaration = write_declaration;
        self
    }

    /// Flushes the output and returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        if let Some(name) = self.open.last() {
            return Err(ItsError::Malformed(format!(
                "element <{}> was never closed",
                name
            )));
        }
        self.flush_pending()?;
        Ok(self.writer.into_inner())
    }

    /// Writes the XML declaration if not already written.
    fn write_xml_declaration(&mut self) -> Result<()> {
        if self.write_declaration && !self.declaration_written {
            self.writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            self.declaration_written = true;
        }
        Ok(())
    }

    /// Writes a held back start tag as an open element.
    fn flush_pending(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}

impl<W: Write> XmlSink for QuickXmlSink<W> {
    fn start_element(&mut self, name: &str) -> Result<()> {
        self.flush_pending()?;
        self.write_xml_declaration()?;
        self.pending = Some(BytesStart::new(name.to_string()));
        self.open.push(name.to_string());
        Ok(())
    }

    fn write_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        let start = self.pending.as_mut().ok_or_else(|| {
            ItsError::Malformed(format!(
                "attribute '{}' written after the start tag was closed",
                name
            ))
        })?;
        start.push_attribute((name, value));
        Ok(())
    }

    fn write_characters(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.flush_pending()?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn end_element(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| ItsError::Malformed("no element to close".to_string()))?;
        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Empty(start))?,
            None => self.writer.write_event(Event::End(BytesEnd::new(name)))?,
        }
        Ok(())
    }
}
