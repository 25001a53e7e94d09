use crate::error::RustyPbixError;
use crate::package::assembler::Package;
use std::io::Cursor;
use std::io::Seek;
use std::io::Write;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipWriter;

/// Writes `package` as a deflated zip archive. Every entry carries the zip
/// epoch as its timestamp, so identical packages give identical archives.
pub fn write_archive<W: Write + Seek>(package: &Package, sink: W) -> Result<W, RustyPbixError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut zip = ZipWriter::new(sink);
    for (name, content) in package.entries() {
        zip.start_file(name, options)?;
        zip.write_all(content)?;
    }
    let sink = zip.finish()?;
    debug!(entries = package.len(), "wrote package archive");
    Ok(sink)
}

impl Package {
    /// The archive bytes of this package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RustyPbixError> {
        Ok(write_archive(self, Cursor::new(Vec::new()))?.into_inner())
    }
}
