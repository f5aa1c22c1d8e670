use crate::error::Result;
use crate::index::reader::{WRAPPER_PREFIX, WRAPPER_SUFFIX};
use crate::index::types::SearchIndex;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// JSON formatter matching the generator's output: `", "` and `": "`
/// separators and printable-ASCII-only strings with `\uXXXX` escapes.
struct GeneratorFormatter;

impl Formatter for GeneratorFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        // Control characters never reach this point; DEL does
        if fragment.bytes().all(|b| b.is_ascii() && b != 0x7f) {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() && ch != '\x7f' {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize an index as a `searchindex.js` payload
pub fn to_js(index: &SearchIndex) -> Result<String> {
    let mut buf = Vec::with_capacity(16 * 1024);
    buf.extend_from_slice(WRAPPER_PREFIX.as_bytes());
    write_json(index, &mut buf)?;
    buf.extend_from_slice(WRAPPER_SUFFIX.as_bytes());
    // The formatter only ever emits ASCII
    Ok(String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?)
}

/// Serialize an index as bare JSON in the generator's layout
pub fn to_json(index: &SearchIndex) -> Result<String> {
    let mut buf = Vec::with_capacity(16 * 1024);
    write_json(index, &mut buf)?;
    Ok(String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?)
}

fn write_json<W: Write>(index: &SearchIndex, writer: W) -> Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, GeneratorFormatter);
    index.serialize(&mut ser)?;
    Ok(())
}

/// Writes index files, replacing the target only once the new content is
/// complete
pub struct IndexWriter {
    path: PathBuf,
}

impl IndexWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, index: &SearchIndex) -> Result<()> {
        replace_file(&self.path, to_js(index)?.as_bytes())?;

        info!(
            path = %self.path.display(),
            documents = index.doc_count(),
            terms = index.terms().len(),
            "wrote search index"
        );
        Ok(())
    }
}

/// Replace `path` with `contents` through a sibling `.tmp` file and a
/// rename, so readers never observe a partially written file. Permissions of
/// an existing target are carried over.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        writer.write_all(contents)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(&tmp_path, meta.permissions())?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
