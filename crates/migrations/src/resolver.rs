//! Script Resolver - File system operations for migrations
//!
//! Every migration owns a directory `<migrations_dir>/<name>/` holding an
//! `up.sql` and a `down.sql`. The resolver reads those scripts verbatim and
//! scaffolds new pairs.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::definitions::MigrationDirection;
use crate::error::{MigrationError, MigrationResult};

const DIRECTIONS: [MigrationDirection; 2] = [MigrationDirection::Up, MigrationDirection::Down];

/// Maps migration names to their scripts on disk
#[derive(Debug, Clone)]
pub struct ScriptResolver {
    migrations_dir: PathBuf,
}

impl ScriptResolver {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn migration_dir(&self, name: &str) -> PathBuf {
        self.migrations_dir.join(name)
    }

    pub fn script_path(&self, name: &str, direction: MigrationDirection) -> PathBuf {
        self.migration_dir(name).join(direction.script_file())
    }

    /// Load the SQL for one direction of a migration, untouched
    pub fn load(&self, name: &str, direction: MigrationDirection) -> MigrationResult<String> {
        let path = self.script_path(name, direction);
        tracing::debug!(migration = name, path = %path.display(), "loading script");

        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                MigrationError::ScriptMissing {
                    name: name.to_string(),
                    path,
                }
            } else {
                MigrationError::ScriptRead {
                    name: name.to_string(),
                    path,
                    source,
                }
            }
        })
    }

    /// Create `<name>/up.sql` and `<name>/down.sql` with placeholders.
    ///
    /// Fails with `DuplicateName` when the directory already exists; an
    /// existing directory is never modified. Any other failure removes the
    /// directory again.
    pub fn scaffold(&self, name: &str) -> MigrationResult<PathBuf> {
        let files = DIRECTIONS.map(|d| (d.script_file(), d.placeholder()));
        self.scaffold_files(name, &files)
    }

    fn scaffold_files(&self, name: &str, files: &[(&str, &str)]) -> MigrationResult<PathBuf> {
        let scaffold_error = |source: io::Error| MigrationError::Scaffold {
            name: name.to_string(),
            source,
        };

        fs::create_dir_all(&self.migrations_dir).map_err(scaffold_error)?;

        let dir = self.migration_dir(name);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(MigrationError::duplicate_name(name));
            }
            Err(e) => return Err(scaffold_error(e)),
        }

        if let Err(e) = write_files(&dir, files) {
            self.discard(name);
            return Err(scaffold_error(e));
        }

        tracing::debug!(migration = name, path = %dir.display(), "scaffolded migration");
        Ok(dir)
    }

    /// Remove a migration directory created by `scaffold`
    pub fn remove(&self, name: &str) -> MigrationResult<()> {
        fs::remove_dir_all(self.migration_dir(name)).map_err(|source| MigrationError::Scaffold {
            name: name.to_string(),
            source,
        })
    }

    fn discard(&self, name: &str) {
        if let Err(e) = self.remove(name) {
            tracing::warn!(migration = name, error = %e, "could not remove partial migration");
        }
    }
}

fn write_files(dir: &Path, files: &[(&str, &str)]) -> io::Result<()> {
    for (file_name, content) in files {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(file_name))?;
        file.write_all(content.as_bytes())?;
    }
    Ok(())
}
