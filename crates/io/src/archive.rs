// Archive copies of source MARC entries, one `<id>.mrk` per newspaper

use std::fs;
use std::path::{Path, PathBuf};

use nzn_recon::marc::MarcRecord;
use nzn_recon::store::ArchiveSink;

use crate::error::IoError;
use crate::marc21;

pub struct MarcArchive {
    dir: PathBuf,
}

impl MarcArchive {
    /// The directory is created on the first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.mrk"))
    }

    /// Replace the archived copy for `id`.
    pub fn store(&self, id: &str, record: &MarcRecord) -> Result<(), IoError> {
        fs::create_dir_all(&self.dir).map_err(|e| IoError::io(&self.dir, e))?;
        let path = self.path_for(id);
        let temp = path.with_extension("mrk.tmp");
        fs::write(&temp, marc21::to_mnemonic(record)).map_err(|e| IoError::io(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| IoError::io(&path, e))?;
        tracing::debug!(%id, path = %path.display(), "archived MARC entry");
        Ok(())
    }
}

impl ArchiveSink for MarcArchive {
    fn archive(&mut self, id: &str, record: &MarcRecord) -> Result<(), String> {
        self.store(id, record).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_archive_overwrites_previous_copy() {
        let dir = tempdir().unwrap();
        let mut archive = MarcArchive::new(&dir.path().join("marc"));

        let mut first = MarcRecord::new("00000cas a2200000 a 4500");
        first.push_data("245", ['0', '0'], &[('a', "Old title")]);
        archive.archive("7", &first).unwrap();

        let mut second = MarcRecord::new("00000cas a2200000 a 4500");
        second.push_data("245", ['0', '0'], &[('a', "New title")]);
        archive.archive("7", &second).unwrap();

        let text = fs::read_to_string(archive.path_for("7")).unwrap();
        assert!(text.contains("$aNew title"));
        assert!(!text.contains("Old title"));
        assert!(text.starts_with("=LDR  "));
    }
}
