//! Zip export of a project file map.

use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ProjectResult;
use crate::files::FileMap;

/// Serialize the file map into an in-memory zip archive.
///
/// Entry names are the map keys, which always use forward slashes.
pub fn archive_bytes(files: &FileMap) -> ProjectResult<Vec<u8>> {
    let cursor = write_entries(files, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

/// Write the zip archive to `dest`, creating parent directories.
pub fn write_archive(files: &FileMap, dest: &Path) -> ProjectResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(dest)?;
    let file = write_entries(files, file)?;
    let size = file.metadata()?.len();
    info!("Archived {} files to {} ({} bytes)", files.len(), dest.display(), size);
    Ok(size)
}

fn write_entries<W: Write + Seek>(files: &FileMap, sink: W) -> ProjectResult<W> {
    let mut zip = ZipWriter::new(sink);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (path, content) in files.iter() {
        zip.start_file(path.as_str(), options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?)
}
