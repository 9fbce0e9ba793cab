//! Directory-backed and locally managed users.

use crate::entity::Persistable;
use crate::error::StoreError;
use crate::row::DataRow;
use serde::{Deserialize, Serialize};

/// A user authenticated against LDAP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapUser {
    #[serde(skip)]
    pub id: i64,
    pub username: String,
    /// Distinguished name in the directory.
    pub dn: String,
}

impl Persistable for LdapUser {
    const TABLE: &'static str = "ldapuser";
    const COLUMNS: &'static [&'static str] = &["id", "username", "dn"];
    const SORTABLE_FIELDS: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("username", "username"), ("dn", "dn")];
    const DEPENDENT_TABLES: &'static [(&'static str, &'static str)] = &[("ldapusers_teams", "ldapuser_id")];

    fn from_row<R: DataRow>(row: &R) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            dn: row.get("dn")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// A user whose credentials are stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedUser {
    #[serde(skip)]
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
}

impl Persistable for ManagedUser {
    const TABLE: &'static str = "manageduser";
    const COLUMNS: &'static [&'static str] = &["id", "username", "fullname", "email"];
    const SORTABLE_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("username", "username"),
        ("fullname", "fullname"),
        ("email", "email"),
    ];
    const DEPENDENT_TABLES: &'static [(&'static str, &'static str)] =
        &[("managedusers_teams", "manageduser_id")];

    fn from_row<R: DataRow>(row: &R) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            fullname: row.get_opt("fullname")?,
            email: row.get_opt("email")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRow;
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::Fake;
    use sea_query::Value;

    #[test]
    fn test_managed_user_with_null_optionals() {
        let username: String = Username().fake();
        let row = MockRow::new()
            .with("id", 3i64)
            .with("username", username.as_str())
            .with("fullname", Value::String(None))
            .with("email", Value::String(None));

        let user = ManagedUser::from_row(&row).unwrap();
        assert_eq!(user.username, username);
        assert_eq!(user.fullname, None);
        assert_eq!(serde_json::to_value(&user).unwrap(), serde_json::json!({ "username": username }));
    }

    #[test]
    fn test_managed_user_full_row() {
        let email: String = SafeEmail().fake();
        let row = MockRow::new()
            .with("id", 4i64)
            .with("username", "jdoe")
            .with("fullname", "Jane Doe")
            .with("email", email.as_str());

        let user = ManagedUser::from_row(&row).unwrap();
        assert_eq!(user.email.as_deref(), Some(email.as_str()));
        assert_eq!(user.fullname.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_ldap_user_requires_dn() {
        let row = MockRow::new().with("id", 1i64).with("username", "jdoe");
        assert!(matches!(LdapUser::from_row(&row), Err(StoreError::Decode(_))));
    }
}
