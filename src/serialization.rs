//! Serialization of extracted documents.
//!
//! Documents serialize through serde; this module adds streaming writers so
//! a reader's lazy document sequence can be exported without collecting it
//! first.

use std::io::Write;

use crate::document::Document;

/// Error type for serialization operations
#[derive(Debug)]
pub enum SerializationError {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::JsonError(err)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::IoError(err)
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::JsonError(e) => write!(f, "JSON error: {}", e),
            SerializationError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SerializationError {}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes documents as NDJSON, one JSON object per line. Field order in the
/// output follows document field order.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    /// Create a new NDJSON writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single document as an NDJSON line
    pub fn write(&mut self, document: &Document) -> Result<(), SerializationError> {
        let json = serde_json::to_string(document)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Write every document of an iterator, returning how many were written
    pub fn write_all<'a, I>(&mut self, documents: I) -> Result<usize, SerializationError>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut count = 0;
        for document in documents {
            self.write(document)?;
            count += 1;
        }
        Ok(count)
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer and return the underlying output
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// JSON array writer
///
/// Writes documents as one JSON array, streaming elements as they arrive.
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Create a new JSON array writer and write the opening bracket
    pub fn new(mut writer: W) -> Result<Self, SerializationError> {
        write!(writer, "[")?;
        Ok(Self {
            writer,
            first: true,
        })
    }

    /// Write a single document to the JSON array
    pub fn write(&mut self, document: &Document) -> Result<(), SerializationError> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;
        let json = serde_json::to_string(document)?;
        write!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Write the closing bracket and return the underlying output
    pub fn finish(mut self) -> Result<W, SerializationError> {
        write!(self.writer, "]")?;
        Ok(self.writer)
    }
}
