//! Zip bundle holding a report's page and metadata.

use std::io::{Cursor, Write};

use bytes::Bytes;
use thiserror::Error;
use zip::{CompressionMethod, ZipWriter, result::ZipError, write::SimpleFileOptions};

pub const BUNDLE_PAGE_ENTRY: &str = "index.html";
pub const BUNDLE_META_ENTRY: &str = "meta.json";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("zip archive error: {0}")]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pack the rendered page and its metadata JSON into a deflated zip archive.
pub fn build_bundle(page_html: &str, meta_json: &[u8]) -> Result<Bytes, BundleError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(BUNDLE_PAGE_ENTRY, options)?;
    writer.write_all(page_html.as_bytes())?;
    writer.start_file(BUNDLE_META_ENTRY, options)?;
    writer.write_all(meta_json)?;

    let cursor = writer.finish()?;
    Ok(Bytes::from(cursor.into_inner()))
}
