//! Statement registry.
//!
//! Loads one named statement per `.sql` file in a directory. The name is the
//! file stem: `sql/findOnePersonById.sql` becomes `findOnePersonById`.

use crate::error::{SqlFnError, SqlFnResult};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extension that marks a file as a statement file.
pub const STATEMENT_EXTENSION: &str = "sql";

/// A named SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub name: String,
    pub text: String,
}

/// Immutable name → statement mapping loaded from one directory.
#[derive(Debug, Clone, Default)]
pub struct StatementRegistry {
    dir: PathBuf,
    statements: BTreeMap<String, Statement>,
}

impl StatementRegistry {
    /// Read every statement file in `dir`. Subdirectories and files with
    /// other extensions are ignored.
    pub fn load(dir: impl AsRef<Path>) -> SqlFnResult<Self> {
        let dir = dir.as_ref();
        let registry_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| SqlFnError::Registry { path, source }
        };

        let mut statements = BTreeMap::new();
        for entry in fs::read_dir(dir).map_err(registry_err(dir))? {
            let path = entry.map_err(registry_err(dir))?.path();
            if !is_statement_file(&path) {
                continue;
            }
            let name = statement_name(&path)?;

            let text = fs::read_to_string(&path).map_err(registry_err(&path))?;
            statements.insert(name.clone(), Statement { name, text });
        }

        tracing::debug!("Loaded {} statements from {}", statements.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            statements,
        })
    }

    /// The directory this registry was loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, name: &str) -> Option<&Statement> {
        self.statements.get(name)
    }

    /// Statements in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.values()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The raw name → text map.
    pub fn to_sql_map(&self) -> BTreeMap<String, String> {
        self.statements
            .iter()
            .map(|(name, stmt)| (name.clone(), stmt.text.clone()))
            .collect()
    }
}

fn is_statement_file(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(STATEMENT_EXTENSION)) && path.is_file()
}

/// The file stem. Names that are not valid UTF-8 cannot be exposed as
/// statement names and fail the load.
fn statement_name(path: &Path) -> SqlFnResult<String> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .map(str::to_string)
        .ok_or_else(|| SqlFnError::Registry {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                "statement file name is not valid UTF-8",
            ),
        })
}
