use std::io::{self, Cursor, Seek};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::Artifact;
use crate::domain::error::Result;

/// Bundles the valid and invalid workbooks into one in-memory zip.
#[derive(Debug, Clone)]
pub struct ArchivePackager {
    valid_name: String,
    invalid_name: String,
}

impl ArchivePackager {
    pub fn new(valid_name: impl Into<String>, invalid_name: impl Into<String>) -> Self {
        Self {
            valid_name: valid_name.into(),
            invalid_name: invalid_name.into(),
        }
    }

    /// Returns the archive rewound to its first byte, ready to send.
    pub fn pack(&self, valid: Artifact, invalid: Artifact) -> Result<Cursor<Vec<u8>>> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, artifact) in [(&self.valid_name, valid), (&self.invalid_name, invalid)] {
            zip.start_file(name.as_str(), options)?;
            io::copy(&mut artifact.into_reader()?, &mut zip)?;
        }

        let mut buffer = zip.finish()?;
        buffer.rewind()?;
        Ok(buffer)
    }
}
