use crate::error::{DataManagerError, DataManagerResult};
use crate::query_builder::BackendKind;

#[derive(Debug, Clone)]
pub struct DataManagerConfig {
    pub database_url: String,
    pub backend: BackendKind,
    /// JSON key all nested task data collapses into when a project stores
    /// uploads without declared fields.
    pub undefined_field_key: String,
}

impl Default for DataManagerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/labelkit_development".to_string(),
            backend: BackendKind::Postgres,
            undefined_field_key: "$undefined$".to_string(),
        }
    }
}

impl DataManagerConfig {
    pub fn from_env() -> DataManagerResult<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(backend) = std::env::var("LABELKIT_QUERY_BACKEND") {
            config.backend = backend.parse().map_err(|e| {
                DataManagerError::configuration("backend", format!("Invalid query backend: {e}"))
            })?;
        }

        if let Ok(key) = std::env::var("LABELKIT_DATA_UNDEFINED_NAME") {
            config.undefined_field_key = key;
        }

        Ok(config)
    }
}
