use anyhow::{Context, Result};
use fs_err as fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::site::checked_relative;
use crate::wire::FileSet;

/// Deflated archive with one entry per file, named as in the set.
pub fn zip_bytes(files: &FileSet) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        checked_relative(name)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("adding {name}"))?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Writes the archive next to its final path, then moves it into place.
pub fn write_zip(path: &Path, files: &FileSet) -> Result<usize> {
    let bytes = zip_bytes(files)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = NamedTempFile::new_in(parent)?;
    fs::write(tmp.path(), &bytes)?;
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), files = files.len(), bytes = bytes.len(), "exported site");
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn archive_holds_every_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut files = crate::coerce::default_files("a bakery");
        files.insert("assets/app.js", "let a = 1;");
        let out = temp.path().join("dist").join("site.zip");

        let n = write_zip(&out, &files).unwrap();
        assert_eq!(fs::metadata(&out).unwrap().len() as usize, n);

        let mut archive = ZipArchive::new(fs::File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), files.len());
        for (name, content) in &files {
            let mut entry = archive.by_name(name).unwrap();
            let mut text = String::new();
            entry.read_to_string(&mut text).unwrap();
            assert_eq!(&text, content);
        }
    }

    #[test]
    fn escaping_name_writes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut files = FileSet::new();
        files.insert("../evil.js", "x");
        let out = temp.path().join("site.zip");
        assert!(write_zip(&out, &files).is_err());
        assert!(!out.exists());
    }
}
