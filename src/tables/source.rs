use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::Error;

/// Where a feed's tables come from: a zip archive, a directory of text
/// files, or an in-memory map of table bodies.
pub enum Source {
    Zip(ZipArchive<File>),
    Directory(PathBuf),
    Memory(HashMap<String, String>),
}

impl Source {
    /// Opens `path` as a zip archive when it carries a `.zip` extension,
    /// otherwise treats it as a directory of tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            let file = File::open(path)?;
            Ok(Self::Zip(ZipArchive::new(file)?))
        } else {
            Ok(Self::Directory(path.to_path_buf()))
        }
    }

    pub fn memory(tables: &[(&str, &str)]) -> Self {
        Self::Memory(
            tables
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
        )
    }

    /// Runs `f` over a buffered reader of the named table. `Ok(None)` when
    /// the source has no such table.
    pub fn with_table<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn BufRead) -> R,
    ) -> Result<Option<R>, Error> {
        match self {
            Source::Zip(archive) => {
                let Some(index) = archive.index_for_name(name) else {
                    return Ok(None);
                };
                let file = archive.by_index(index)?;
                let mut reader = BufReader::with_capacity(128 * 1024, file);
                Ok(Some(f(&mut reader)))
            }
            Source::Directory(dir) => {
                let path = dir.join(name);
                if !path.exists() {
                    return Ok(None);
                }
                let file = File::open(path)?;
                let mut reader = BufReader::with_capacity(128 * 1024, file);
                Ok(Some(f(&mut reader)))
            }
            Source::Memory(tables) => {
                let Some(body) = tables.get(name) else {
                    return Ok(None);
                };
                let mut reader = Cursor::new(body.as_bytes());
                Ok(Some(f(&mut reader)))
            }
        }
    }
}
