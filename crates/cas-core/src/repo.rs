//! # Repository Layout
//!
//! Creates and discovers the `.cas/` directory. A repository is just a
//! path; nothing here holds open handles.

use std::io;
use std::path::{Path, PathBuf};

use crate::blob::BlobStore;
use crate::catalog::{CatalogBackend, JsonCatalog, SqliteCatalog};
use crate::error::CasError;

/// Name of the repository directory inside a working directory.
pub const CAS_DIR_NAME: &str = ".cas";
/// Blob directory inside `.cas/`.
pub const STORAGE_DIR_NAME: &str = "storage";
/// JSON catalog file inside `.cas/`.
pub const CATALOG_JSON_NAME: &str = "catalog.json";
/// SQLite catalog file inside `.cas/`.
pub const CATALOG_DB_NAME: &str = "catalog.db";

/// A located `.cas/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    root: PathBuf,
    cas_dir: PathBuf,
}

impl Repository {
    /// Create `<path>/.cas/` and `<path>/.cas/storage/`, both mode 0755.
    ///
    /// Refuses to touch an existing `.cas`. An empty path means the current
    /// working directory.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, CasError> {
        let root = absolute(path.as_ref())?;
        let cas_dir = root.join(CAS_DIR_NAME);
        if cas_dir.exists() {
            return Err(CasError::AlreadyExists(cas_dir));
        }

        std::fs::create_dir_all(&root)
            .map_err(|e| CasError::io(format!("creating {}", root.display()), e))?;
        match std::fs::create_dir(&cas_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(CasError::AlreadyExists(cas_dir));
            }
            Err(e) => return Err(CasError::io(format!("creating {}", cas_dir.display()), e)),
        }
        let storage = cas_dir.join(STORAGE_DIR_NAME);
        std::fs::create_dir(&storage)
            .map_err(|e| CasError::io(format!("creating {}", storage.display()), e))?;
        set_dir_mode(&cas_dir)?;
        set_dir_mode(&storage)?;

        tracing::debug!(path = %cas_dir.display(), "initialized repository");
        Ok(Self { root, cas_dir })
    }

    /// [`init`](Self::init), then create an empty catalog of the chosen kind.
    pub async fn init_with(
        path: impl AsRef<Path>,
        backend: CatalogBackend,
    ) -> Result<Self, CasError> {
        let repo = Self::init(path)?;
        match backend {
            CatalogBackend::Json => JsonCatalog::new(repo.catalog_json_path()).save().await?,
            CatalogBackend::Sqlite => {
                SqliteCatalog::open(repo.catalog_db_path())
                    .await?
                    .close()
                    .await
            }
        }
        Ok(repo)
    }

    /// Locate `<path>/.cas/`. An empty path means the current working directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CasError> {
        let root = absolute(path.as_ref())?;
        let cas_dir = root.join(CAS_DIR_NAME);
        if !cas_dir.is_dir() {
            return Err(CasError::NotARepository(root));
        }
        Ok(Self { root, cas_dir })
    }

    /// Open a repository given the `.cas` directory itself.
    pub fn at(cas_dir: impl AsRef<Path>) -> Result<Self, CasError> {
        let cas_dir = absolute(cas_dir.as_ref())?;
        if !cas_dir.is_dir() {
            return Err(CasError::NotARepository(cas_dir));
        }
        let root = cas_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cas_dir.clone());
        Ok(Self { root, cas_dir })
    }

    /// Working directory containing `.cas/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.cas/` directory.
    pub fn cas_dir(&self) -> &Path {
        &self.cas_dir
    }

    /// The blob directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.cas_dir.join(STORAGE_DIR_NAME)
    }

    /// Where the JSON catalog lives.
    pub fn catalog_json_path(&self) -> PathBuf {
        self.cas_dir.join(CATALOG_JSON_NAME)
    }

    /// Where the SQLite catalog lives.
    pub fn catalog_db_path(&self) -> PathBuf {
        self.cas_dir.join(CATALOG_DB_NAME)
    }

    /// Blob store rooted at this repository's storage directory.
    pub fn blob_store(&self) -> BlobStore {
        BlobStore::new(self.storage_dir())
    }
}

fn absolute(path: &Path) -> Result<PathBuf, CasError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| CasError::io("resolving current directory", e))?;
    if path.as_os_str().is_empty() {
        Ok(cwd)
    } else {
        Ok(cwd.join(path))
    }
}

#[cfg(unix)]
fn set_dir_mode(dir: &Path) -> Result<(), CasError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| CasError::io(format!("setting permissions on {}", dir.display()), e))
}

#[cfg(not(unix))]
fn set_dir_mode(_dir: &Path) -> Result<(), CasError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        assert_eq!(repo.root(), tmp.path());
        assert!(repo.cas_dir().is_dir());
        assert!(repo.storage_dir().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn init_sets_mode_0755() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        for dir in [repo.cas_dir().to_path_buf(), repo.storage_dir()] {
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755, "{}", dir.display());
        }
    }

    #[test]
    fn init_refuses_existing_repository() {
        let tmp = tempfile::tempdir().unwrap();
        Repository::init(tmp.path()).unwrap();
        let err = Repository::init(tmp.path()).unwrap_err();
        assert!(matches!(err, CasError::AlreadyExists(_)));
    }

    #[test]
    fn init_creates_missing_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let repo = Repository::init(&nested).unwrap();
        assert!(repo.storage_dir().is_dir());
    }

    #[test]
    fn open_finds_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let created = Repository::init(tmp.path()).unwrap();
        let opened = Repository::open(tmp.path()).unwrap();
        assert_eq!(created, opened);
    }

    #[test]
    fn open_without_repository_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Repository::open(tmp.path()).unwrap_err();
        assert!(matches!(err, CasError::NotARepository(_)));
        assert!(err.to_string().contains("no CAS repository found"));
    }

    #[test]
    fn at_uses_cas_dir_directly() {
        let tmp = tempfile::tempdir().unwrap();
        let created = Repository::init(tmp.path()).unwrap();
        let opened = Repository::at(created.cas_dir()).unwrap();
        assert_eq!(created, opened);
        assert!(Repository::at(tmp.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn init_with_json_writes_empty_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init_with(tmp.path(), CatalogBackend::Json)
            .await
            .unwrap();
        let text = std::fs::read_to_string(repo.catalog_json_path()).unwrap();
        assert_eq!(text.trim(), "[]");
    }

    #[tokio::test]
    async fn init_with_sqlite_creates_database() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init_with(tmp.path(), CatalogBackend::Sqlite)
            .await
            .unwrap();
        assert!(repo.catalog_db_path().is_file());
    }
}
