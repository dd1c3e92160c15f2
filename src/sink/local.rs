//! Local filesystem output.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;

use super::{LocalLayout, WriteReceipt};
use crate::error::{Error, Result};
use crate::model::BucketObject;

/// Writes documents below a root directory.
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
    layout: LocalLayout,
}

impl LocalSink {
    pub fn new(root: impl Into<PathBuf>, layout: LocalLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Destination path for `object`, or `None` if its key cannot be mapped
    /// safely below the root.
    pub fn destination(&self, object: &BucketObject) -> Option<PathBuf> {
        let relative = match self.layout {
            LocalLayout::Mirror => object.relative_path()?,
            LocalLayout::Flatten => PathBuf::from(object.flattened_name()?),
        };
        Some(self.root.join(relative))
    }

    pub async fn write(&self, object: &BucketObject, data: Bytes) -> Result<WriteReceipt> {
        let path = self.destination(object).ok_or_else(|| Error::Write {
            location: object.key.clone(),
            message: "key cannot be mapped to a local path".to_string(),
        })?;

        let target = path.clone();
        let bytes_written = data.len() as u64;
        tokio::task::spawn_blocking(move || write_atomic(&target, &data))
            .await
            .map_err(|e| Error::Other(format!("write task failed: {}", e)))?
            .map_err(|e| Error::Write {
                location: path.display().to_string(),
                message: e.to_string(),
            })?;

        log::debug!("Wrote {} ({} bytes)", path.display(), bytes_written);
        Ok(WriteReceipt {
            location: path.display().to_string(),
            bytes_written,
        })
    }
}

/// Write through a temporary file in the destination directory, then rename
/// it over the destination.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_layouts() {
        let object = BucketObject::new("docs", "folder/sub/c.pdf", 1);

        let mirror = LocalSink::new("pdfs", LocalLayout::Mirror);
        assert_eq!(
            mirror.destination(&object).unwrap(),
            Path::new("pdfs").join("folder").join("sub").join("c.pdf")
        );

        let flat = LocalSink::new("pdfs", LocalLayout::Flatten);
        assert_eq!(
            flat.destination(&object).unwrap(),
            Path::new("pdfs").join("folder_sub_c.pdf")
        );
    }

    #[test]
    fn test_destination_rejects_traversal() {
        let sink = LocalSink::new("pdfs", LocalLayout::Mirror);
        let object = BucketObject::new("docs", "../../etc/passwd.pdf", 1);
        assert!(sink.destination(&object).is_none());
    }

    #[test]
    fn test_write_atomic_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.pdf");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
