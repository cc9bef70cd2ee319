use crate::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raw access to the persisted scheduling configuration.
pub trait ConfigStore: Send + Sync {
    fn path(&self) -> &Path;
    fn read(&self) -> Result<String, Error>;
    /// Replaces the whole blob. Either the new text is fully persisted or the
    /// previous text is left in place.
    fn write(&self, blob: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Startup check: the config must exist before anything else is built.
    pub fn existing(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::StartupConfigMissing { path });
        }
        Ok(Self { path })
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("timeshift.json");
        self.path
            .with_file_name(format!(".{name}.indicator-{}", std::process::id()))
    }

    fn replace_with(&self, staging: &Path, blob: &str) -> io::Result<()> {
        let metadata = fs::metadata(&self.path)?;
        fs::write(staging, blob)?;
        fs::set_permissions(staging, metadata.permissions())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            std::os::unix::fs::chown(staging, Some(metadata.uid()), Some(metadata.gid()))?;
        }
        fs::rename(staging, &self.path)
    }

    /// Used when the directory refuses a staging file: rewrite the existing
    /// file in one `write_all`.
    fn overwrite_in_place(&self, blob: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(blob.as_bytes())?;
        file.flush()
    }
}

impl ConfigStore for FileConfigStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String, Error> {
        fs::read_to_string(&self.path).map_err(|source| Error::ConfigUnreadable {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, blob: &str) -> Result<(), Error> {
        let staging = self.staging_path();
        let Err(staging_err) = self.replace_with(&staging, blob) else {
            return Ok(());
        };
        let _ = fs::remove_file(&staging);
        debug!(
            path = %self.path.display(),
            error = %staging_err,
            "staged replace failed, writing in place"
        );

        self.overwrite_in_place(blob)
            .map_err(|source| Error::ConfigUnwritable {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigStore, FileConfigStore};
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn existing_rejects_missing_file() {
        let temp = tempdir().expect("tempdir");
        let err = FileConfigStore::existing(temp.path().join("timeshift.json"))
            .expect_err("missing config");
        assert!(matches!(err, Error::StartupConfigMissing { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn write_replaces_contents_without_leaving_staging_files() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("timeshift.json");
        std::fs::write(&path, r#"{"schedule_daily" : "false"}"#).expect("seed config");

        let store = FileConfigStore::existing(&path).expect("store");
        store
            .write(r#"{"schedule_daily" : "true"}"#)
            .expect("write succeeds");

        assert_eq!(
            store.read().expect("read back"),
            r#"{"schedule_daily" : "true"}"#
        );
        let entries = std::fs::read_dir(temp.path()).expect("dir").count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("timeshift.json");
        std::fs::write(&path, "{}").expect("seed config");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640))
            .expect("chmod");

        FileConfigStore::new(&path).write("{ }").expect("write");
        let mode = std::fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn write_to_missing_directory_is_unwritable() {
        let temp = tempdir().expect("tempdir");
        let store = FileConfigStore::new(temp.path().join("missing").join("timeshift.json"));
        let err = store.write("{}").expect_err("write fails");
        assert!(matches!(err, Error::ConfigUnwritable { .. }));
        assert!(matches!(store.read(), Err(Error::ConfigUnreadable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn writable_file_in_read_only_directory_is_rewritten_in_place() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        let dir = temp.path().join("timeshift");
        std::fs::create_dir(&dir).expect("config dir");
        let path = dir.join("timeshift.json");
        std::fs::write(&path, r#"{"schedule_daily" : "false"}"#).expect("seed config");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o666))
            .expect("chmod file");
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555))
            .expect("chmod dir");

        let store = FileConfigStore::existing(&path).expect("store");
        let result = store.write(r#"{"schedule_daily" : "true"}"#);
        let contents = std::fs::read_to_string(&path).expect("read back");
        let entries = std::fs::read_dir(&dir).expect("dir").count();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755))
            .expect("restore dir");

        result.expect("in-place write succeeds");
        assert_eq!(contents, r#"{"schedule_daily" : "true"}"#);
        assert_eq!(entries, 1);
    }

    #[test]
    fn failed_write_leaves_target_and_directory_untouched() {
        let temp = tempdir().expect("tempdir");
        // A directory in the config's place refuses both the rename and the
        // in-place rewrite.
        let path = temp.path().join("timeshift.json");
        std::fs::create_dir(&path).expect("blocking dir");
        let original = r#"{"schedule_daily" : "false"}"#;
        std::fs::write(path.join("blob"), original).expect("seed blob");

        let err = FileConfigStore::new(&path)
            .write(r#"{"schedule_daily" : "true"}"#)
            .expect_err("write fails");

        assert!(matches!(err, Error::ConfigUnwritable { .. }));
        assert!(path.is_dir());
        assert_eq!(
            std::fs::read_to_string(path.join("blob")).expect("blob"),
            original
        );
        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .expect("dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("timeshift.json")]);
    }
}
