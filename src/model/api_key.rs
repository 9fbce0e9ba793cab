use crate::entity::Persistable;
use crate::error::StoreError;
use crate::row::DataRow;
use serde::{Deserialize, Serialize};

/// An API key a team authenticates with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(skip)]
    pub id: i64,
    pub key: String,
}

impl Persistable for ApiKey {
    const TABLE: &'static str = "apikey";
    const COLUMNS: &'static [&'static str] = &["id", "key"];
    const SORTABLE_FIELDS: &'static [(&'static str, &'static str)] = &[("id", "id"), ("key", "key")];
    const DEPENDENT_TABLES: &'static [(&'static str, &'static str)] = &[("apikeys_teams", "apikey_id")];

    fn from_row<R: DataRow>(row: &R) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.get("id")?,
            key: row.get("key")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}
