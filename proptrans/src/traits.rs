//! Traits for reading and writing localization files.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use crate::{encoding::decode_strict, error::Error};

/// A trait for parsing and writing one localization file.
///
/// Decoding is strict UTF-8: malformed input is an [`Error::InvalidEncoding`]
/// and nothing is parsed. Parsing of decoded text never fails.
///
/// # Example
///
/// ```rust,no_run
/// use proptrans::{PropertiesFile, traits::Parser};
/// let file = PropertiesFile::read_from("app_de.properties")?;
/// file.write_to("app_de_copy.properties")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse already-decoded text.
    fn parse_str(text: &str) -> Self
    where
        Self: Sized;

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Parse from raw bytes, `label` names the input in error messages.
    fn from_bytes(bytes: &[u8], label: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let text = decode_strict(bytes, label)?;
        Ok(Self::parse_str(&text))
    }

    /// Parse from any reader.
    fn from_reader<R: Read>(mut reader: R) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, "<reader>")
    }

    /// Parse from file path.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, &path.display().to_string())
    }

    /// Write to file path.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
