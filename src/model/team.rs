//! Teams and their members.
//!
//! A team's API keys and users live in three join tables. They are only read
//! when the `ALL` fetch group is active; until then the relation fields stay
//! `None` and are left out of the JSON form.

use crate::entity::{Persistable, UuidIdentified};
use crate::error::StoreError;
use crate::executor::Executor;
use crate::model::{ApiKey, LdapUser, ManagedUser};
use crate::query::{Name, Query, SortClause};
use crate::row::DataRow;
use crate::validation::{self, ValidationError};
use sea_query::{Expr, ExprTrait, Query as Statement};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const NAME_MIN: usize = 1;
const NAME_MAX: usize = 255;

/// Named groups of relations a team can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchGroup {
    /// API keys, LDAP users and managed users.
    All,
}

impl AsRef<str> for FetchGroup {
    fn as_ref(&self) -> &str {
        match self {
            FetchGroup::All => "ALL",
        }
    }
}

impl fmt::Display for FetchGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_keys: Option<Vec<ApiKey>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ldap_users: Option<Vec<LdapUser>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub managed_users: Option<Vec<ManagedUser>>,
}

impl Team {
    /// New, unsaved team with a random uuid.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(0, Uuid::new_v4().to_string(), name)
    }

    /// Team with a known identity and no relations loaded.
    pub fn with_id(id: i64, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            uuid: uuid.into(),
            name: name.into(),
            api_keys: None,
            ldap_users: None,
            managed_users: None,
        }
    }

    /// # Errors
    ///
    /// Returns the first field that violates its constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !validation::is_uuid(&self.uuid) {
            return Err(ValidationError::InvalidUuid(self.uuid.clone()));
        }
        validation::check_text("name", &self.name, NAME_MIN, NAME_MAX)
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.api_keys.is_some() && self.ldap_users.is_some() && self.managed_users.is_some()
    }
}

/// Members of team `team_id` listed in `join_table`.
fn members<E: Persistable, X: Executor>(
    executor: &X,
    join_table: &'static str,
    member_column: &'static str,
    team_id: i64,
    ordering: SortClause,
) -> Result<Vec<E>, StoreError> {
    let linked = Statement::select()
        .column(Name(member_column))
        .from(Name(join_table))
        .and_where(Expr::col(Name("team_id")).eq(team_id))
        .to_owned();

    let mut query = Query::<E>::new();
    query
        .filter(Expr::col(Name(E::ID_COLUMN)).in_subquery(linked))
        .set_ordering(ordering);
    query.all(executor)
}

impl Persistable for Team {
    const TABLE: &'static str = "team";
    const COLUMNS: &'static [&'static str] = &["id", "uuid", "name"];
    const SORTABLE_FIELDS: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("uuid", "uuid"), ("name", "name")];
    const FETCH_GROUPS: &'static [&'static str] = &["ALL"];
    const DEPENDENT_TABLES: &'static [(&'static str, &'static str)] = &[
        ("apikeys_teams", "team_id"),
        ("ldapusers_teams", "team_id"),
        ("managedusers_teams", "team_id"),
    ];

    fn from_row<R: DataRow>(row: &R) -> Result<Self, StoreError> {
        Ok(Self::with_id(row.get("id")?, row.get::<String>("uuid")?, row.get::<String>("name")?))
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn load_fetch_group<X: Executor>(&mut self, group: &str, executor: &X) -> Result<(), StoreError> {
        if group != FetchGroup::All.as_ref() {
            return Ok(());
        }
        self.api_keys = Some(members(
            executor,
            "apikeys_teams",
            "apikey_id",
            self.id,
            SortClause::ascending("id", "id"),
        )?);
        self.ldap_users = Some(members(
            executor,
            "ldapusers_teams",
            "ldapuser_id",
            self.id,
            SortClause::ascending("username", "username"),
        )?);
        self.managed_users = Some(members(
            executor,
            "managedusers_teams",
            "manageduser_id",
            self.id,
            SortClause::ascending("username", "username"),
        )?);
        Ok(())
    }
}

impl UuidIdentified for Team {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockExecutor, MockRow};
    use fake::faker::company::en::CompanyName;
    use fake::Fake;
    use sea_query::Value;

    #[test]
    fn test_new_team_is_valid() {
        let name: String = CompanyName().fake();
        let team = Team::new(name.as_str());
        assert_eq!(team.uuid.len(), 36);
        assert_eq!(team.name, name);
        assert!(team.validate().is_ok());
        assert!(!team.is_fully_loaded());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut team = Team::new("Ops");
        team.uuid = "1234".to_string();
        assert!(matches!(team.validate(), Err(ValidationError::InvalidUuid(_))));

        let mut team = Team::new("");
        assert!(matches!(team.validate(), Err(ValidationError::Length { .. })));
        team.name = "x".repeat(256);
        assert!(matches!(team.validate(), Err(ValidationError::Length { actual: 256, .. })));
        team.name = "Ops\r\nTeam".to_string();
        assert_eq!(team.validate(), Err(ValidationError::ControlCharacters("name")));
    }

    #[test]
    fn test_json_omits_id_and_unloaded_relations() {
        let team = Team::with_id(9, "0f3b5a1e-9c1d-4e55-8a3b-2f9a1d7c4e00", "Ops");
        assert_eq!(
            serde_json::to_value(&team).unwrap(),
            serde_json::json!({ "uuid": "0f3b5a1e-9c1d-4e55-8a3b-2f9a1d7c4e00", "name": "Ops" })
        );

        let mut loaded = team.clone();
        loaded.api_keys = Some(vec![ApiKey { id: 1, key: "k".to_string() }]);
        let json = serde_json::to_value(&loaded).unwrap();
        assert_eq!(json["apiKeys"], serde_json::json!([{ "key": "k" }]));
        assert!(json.get("ldapUsers").is_none());
    }

    #[test]
    fn test_load_all_queries_each_join_table_in_order() {
        let executor = MockExecutor::new();
        executor
            .push_result(vec![
                MockRow::new().with("id", 1i64).with("key", "first"),
                MockRow::new().with("id", 2i64).with("key", "second"),
            ])
            .push_result(vec![])
            .push_result(vec![MockRow::new()
                .with("id", 5i64)
                .with("username", "admin")
                .with("fullname", Value::String(None))
                .with("email", "admin@example.com")]);

        let mut team = Team::with_id(3, "0f3b5a1e-9c1d-4e55-8a3b-2f9a1d7c4e00", "Ops");
        team.load_fetch_group("ALL", &executor).unwrap();

        assert!(team.is_fully_loaded());
        assert_eq!(team.api_keys.as_ref().map(|k| k[1].key.as_str()), Some("second"));
        assert_eq!(team.ldap_users, Some(vec![]));
        assert_eq!(team.managed_users.as_ref().map(|u| u[0].id), Some(5));

        let statements = executor.statements();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].sql.contains(
            r#"WHERE "id" IN (SELECT "apikey_id" FROM "apikeys_teams" WHERE "team_id" = $1) ORDER BY "id" ASC"#
        ));
        assert!(statements[1].sql.contains(r#"FROM "ldapusers_teams""#));
        assert!(statements[1].sql.ends_with(r#"ORDER BY "username" ASC"#));
        assert!(statements[2].sql.starts_with(r#"SELECT "id", "username", "fullname", "email" FROM "manageduser""#));
        assert!(statements.iter().all(|s| s.values == vec![Value::BigInt(Some(3))]));
    }

    #[test]
    fn test_unknown_group_loads_nothing() {
        let executor = MockExecutor::new();
        let mut team = Team::new("Ops");
        team.load_fetch_group("SUMMARY", &executor).unwrap();
        assert!(executor.captured_sql().is_empty());
        assert!(team.api_keys.is_none());
    }
}
