//! Row mappers: translation between [`GenericBo`] and backend rows.
//!
//! A mapper is immutable once built and is shared by reference between DAOs
//! (`Arc<dyn RowMapper>`).

use crate::row::decode_json_object;
use crate::{GendaoError, GendaoResult, GenericBo, Interface, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Column list sentinel meaning "all columns".
pub const ALL_COLUMNS: &str = "*";

/// Translation table key that applies to every storage.
pub const WILDCARD_STORAGE: &str = "*";

/// Storage id -> (source name -> destination name).
pub type TranslationTable = HashMap<String, HashMap<String, String>>;

/// Transforms a business object into a backend row and back.
pub trait RowMapper: Interface {
    /// Projects a business object into the backend row shape.
    ///
    /// `None` maps to `None`.
    fn to_row(&self, storage_id: &str, bo: Option<&GenericBo>) -> GendaoResult<Option<Row>>;

    /// Rebuilds a business object from a backend row.
    ///
    /// `None` (or a row decoding to null) maps to `None`. Rows in an
    /// encoding this mapper does not accept fail with a translation error.
    fn to_bo(&self, storage_id: &str, row: Option<&Row>) -> GendaoResult<Option<GenericBo>>;

    /// Columns to read for a storage; `["*"]` when not configured.
    fn columns_list(&self, storage_id: &str) -> Vec<String>;
}

/// Default case transformation applied to field/column names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTransformation {
    /// Names are kept as they are.
    #[default]
    Intact,
    /// Names are lower-cased.
    LowerCase,
    /// Names are upper-cased.
    UpperCase,
}

impl NameTransformation {
    /// Applies the transformation to a name.
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Intact => name.to_string(),
            Self::LowerCase => name.to_lowercase(),
            Self::UpperCase => name.to_uppercase(),
        }
    }
}

/// Configurable mapper for column-oriented backends (relational, wide-column).
///
/// Names are first passed through the [`NameTransformation`]; then the
/// translation table of the storage (or of the `*` wildcard storage) is
/// consulted field by field, falling back to the transformed name.
#[derive(Debug, Clone, Default)]
pub struct GenericRowMapper {
    name_transformation: NameTransformation,
    gbo_field_to_col_name: TranslationTable,
    col_name_to_gbo_field: TranslationTable,
    columns_list_map: HashMap<String, Vec<String>>,
}

impl GenericRowMapper {
    /// Creates a mapper that keeps names intact.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default name transformation.
    #[must_use]
    pub fn with_name_transformation(mut self, transformation: NameTransformation) -> Self {
        self.name_transformation = transformation;
        self
    }

    /// Sets the write-direction translation table (field -> column).
    #[must_use]
    pub fn with_gbo_field_to_col_name(mut self, table: TranslationTable) -> Self {
        self.gbo_field_to_col_name = table;
        self
    }

    /// Sets the read-direction translation table (column -> field).
    #[must_use]
    pub fn with_col_name_to_gbo_field(mut self, table: TranslationTable) -> Self {
        self.col_name_to_gbo_field = table;
        self
    }

    /// Registers the column list of a storage.
    #[must_use]
    pub fn with_columns(mut self, storage_id: impl Into<String>, columns: Vec<String>) -> Self {
        self.columns_list_map.insert(storage_id.into(), columns);
        self
    }

    /// Returns the default name transformation.
    #[must_use]
    pub fn name_transformation(&self) -> NameTransformation {
        self.name_transformation
    }

    fn translate(&self, table: &TranslationTable, storage_id: &str, name: &str) -> String {
        let transformed = self.name_transformation.apply(name);
        table
            .get(storage_id)
            .or_else(|| table.get(WILDCARD_STORAGE))
            .and_then(|mapping| mapping.get(&transformed).or_else(|| mapping.get(name)))
            .cloned()
            .unwrap_or(transformed)
    }

    fn translate_map(
        &self,
        table: &TranslationTable,
        storage_id: &str,
        source: &Map<String, Value>,
    ) -> Map<String, Value> {
        source
            .iter()
            .map(|(name, value)| (self.translate(table, storage_id, name), value.clone()))
            .collect()
    }
}

impl RowMapper for GenericRowMapper {
    fn to_row(&self, storage_id: &str, bo: Option<&GenericBo>) -> GendaoResult<Option<Row>> {
        Ok(bo.map(|bo| {
            Row::Map(self.translate_map(&self.gbo_field_to_col_name, storage_id, bo.attrs()))
        }))
    }

    fn to_bo(&self, storage_id: &str, row: Option<&Row>) -> GendaoResult<Option<GenericBo>> {
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(row.to_map()?.map(|columns| {
            GenericBo::from(self.translate_map(&self.col_name_to_gbo_field, storage_id, &columns))
        }))
    }

    fn columns_list(&self, storage_id: &str) -> Vec<String> {
        self.columns_list_map
            .get(storage_id)
            .cloned()
            .unwrap_or_else(|| vec![ALL_COLUMNS.to_string()])
    }
}

/// Mapper for schema-free document stores.
///
/// Rows are written as a structural copy of the business object and must be
/// read back as JSON documents (text or bytes).
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRowMapper;

impl RowMapper for DocumentRowMapper {
    fn to_row(&self, _storage_id: &str, bo: Option<&GenericBo>) -> GendaoResult<Option<Row>> {
        Ok(bo.map(|bo| Row::Map(bo.attrs().clone())))
    }

    fn to_bo(&self, _storage_id: &str, row: Option<&Row>) -> GendaoResult<Option<GenericBo>> {
        let Some(row) = row else {
            return Ok(None);
        };
        let document = match row.unwrapped() {
            Row::Json(text) => decode_json_object(text.as_bytes(), "document")?,
            Row::Bytes(bytes) => decode_json_object(bytes, "document")?,
            other => {
                return Err(GendaoError::translation(format!(
                    "Cannot build a business object from {:?}: expected a JSON document",
                    other
                )))
            }
        };
        Ok(document.map(GenericBo::from))
    }

    fn columns_list(&self, _storage_id: &str) -> Vec<String> {
        vec![ALL_COLUMNS.to_string()]
    }
}
