//! SQL flavor selection.

use gendao_core::{GendaoError, GendaoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Relational database flavor behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlFlavor {
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl SqlFlavor {
    /// Resolves the flavor from the scheme of a database URL.
    pub fn from_url(url: &str) -> GendaoResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| GendaoError::configuration(format!("Invalid database URL '{}': {}", url, e)))?;
        match parsed.scheme() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(GendaoError::configuration(format!(
                "Unsupported database scheme '{}'",
                other
            ))),
        }
    }

    /// Returns true if bind parameters are numbered (`$1`, `$2`, ...).
    #[must_use]
    pub const fn numbered_placeholders(&self) -> bool {
        matches!(self, Self::Postgres)
    }
}

impl fmt::Display for SqlFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::MySql => write!(f, "mysql"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}
