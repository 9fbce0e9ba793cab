//! Query manager against a real PostgreSQL server.
//!
//! Skipped unless `TEST_DATABASE_URL` is set. All tables are session-local
//! temporary tables, so nothing is left behind in the target database.

use sea_query::{Value, Values};
use tidepool::{
    DataRow, DatabaseConfig, Executor, FetchGroup, OrderDirection, Pagination, PgExecutor, Query,
    QueryManager, RequestContext, StoreError, Team,
};

const SCHEMA: &[&str] = &[
    "CREATE TEMP TABLE team (id BIGSERIAL PRIMARY KEY, uuid VARCHAR(36) NOT NULL UNIQUE, name VARCHAR(255) NOT NULL)",
    "CREATE TEMP TABLE apikey (id BIGSERIAL PRIMARY KEY, key VARCHAR(255) NOT NULL UNIQUE)",
    "CREATE TEMP TABLE ldapuser (id BIGSERIAL PRIMARY KEY, username VARCHAR(255) NOT NULL, dn VARCHAR(1024) NOT NULL)",
    "CREATE TEMP TABLE manageduser (id BIGSERIAL PRIMARY KEY, username VARCHAR(255) NOT NULL, fullname VARCHAR(255), email VARCHAR(255))",
    "CREATE TEMP TABLE apikeys_teams (team_id BIGINT NOT NULL REFERENCES team (id), apikey_id BIGINT NOT NULL REFERENCES apikey (id))",
    "CREATE TEMP TABLE ldapusers_teams (team_id BIGINT NOT NULL REFERENCES team (id), ldapuser_id BIGINT NOT NULL REFERENCES ldapuser (id))",
    "CREATE TEMP TABLE managedusers_teams (team_id BIGINT NOT NULL REFERENCES team (id), manageduser_id BIGINT NOT NULL REFERENCES manageduser (id))",
];

fn executor() -> Option<PgExecutor> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        application_name: Some("tidepool-tests".to_string()),
    };
    let executor = PgExecutor::connect(&config).expect("connect to TEST_DATABASE_URL");
    for ddl in SCHEMA {
        executor.execute(ddl, &Values(vec![])).expect("create schema");
    }
    Some(executor)
}

fn insert_returning_id(executor: &PgExecutor, sql: &str, values: Vec<Value>) -> i64 {
    let row = executor
        .query_first(sql, &Values(values))
        .expect("insert")
        .expect("RETURNING row");
    DataRow::get::<i64>(&row, "id").expect("id column")
}

fn seed(executor: &PgExecutor) -> Vec<Team> {
    let mut teams = Vec::new();
    for name in ["Alpha", "Bravo", "Charlie"] {
        let mut team = Team::new(name);
        team.id = insert_returning_id(
            executor,
            "INSERT INTO team (uuid, name) VALUES ($1, $2) RETURNING id",
            vec![team.uuid.clone().into(), name.into()],
        );
        teams.push(team);
    }

    let alpha = teams[0].id;
    for key in ["key-b", "key-a"] {
        let key_id = insert_returning_id(
            executor,
            "INSERT INTO apikey (key) VALUES ($1) RETURNING id",
            vec![key.into()],
        );
        executor
            .execute(
                "INSERT INTO apikeys_teams (team_id, apikey_id) VALUES ($1, $2)",
                &Values(vec![alpha.into(), key_id.into()]),
            )
            .expect("link api key");
    }
    for username in ["zed", "amy"] {
        let user_id = insert_returning_id(
            executor,
            "INSERT INTO manageduser (username) VALUES ($1) RETURNING id",
            vec![username.into()],
        );
        executor
            .execute(
                "INSERT INTO managedusers_teams (team_id, manageduser_id) VALUES ($1, $2)",
                &Values(vec![alpha.into(), user_id.into()]),
            )
            .expect("link managed user");
    }
    teams
}

#[test]
fn test_paginated_ordered_reads_and_counts() {
    let Some(executor) = executor() else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    seed(&executor);

    let ctx = RequestContext::new(
        None,
        Pagination::new(1, 2),
        None,
        Some("name".to_string()),
        OrderDirection::Descending,
    );
    let qm = QueryManager::new(ctx, executor);

    let mut query = Query::<Team>::new();
    let names: Vec<String> = qm.execute(&mut query).unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["Charlie", "Bravo"]);
    assert_eq!(qm.count(&query).unwrap(), 3);

    let mut filtered = Query::<Team>::filtered("name <> 'Charlie'");
    assert_eq!(qm.count(&filtered).unwrap(), 2);
    assert_eq!(qm.execute_first(&mut filtered).unwrap().map(|t| t.name), Some("Bravo".to_string()));
}

#[test]
fn test_lookup_with_fetch_group_and_delete() {
    let Some(executor) = executor() else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let teams = seed(&executor);
    let alpha = &teams[0];

    let result: Result<(), StoreError> = QueryManager::scoped(RequestContext::default(), executor, |qm| {
        let plain = qm.get_by_uuid::<Team>(&alpha.uuid)?.expect("alpha exists");
        assert!(plain.api_keys.is_none());

        let loaded = qm
            .get_by_uuid_with_fetch_group::<Team>(&alpha.uuid, FetchGroup::All)?
            .expect("alpha exists");
        assert_eq!(loaded.id, plain.id);
        let keys: Vec<_> = loaded.api_keys.unwrap_or_default().into_iter().map(|k| k.key).collect();
        assert_eq!(keys, ["key-b", "key-a"]);
        let users: Vec<_> = loaded.managed_users.unwrap_or_default().into_iter().map(|u| u.username).collect();
        assert_eq!(users, ["amy", "zed"]);
        assert_eq!(loaded.ldap_users, Some(vec![]));

        assert!(qm.get_by_uuid::<Team>("00000000-0000-4000-8000-000000000000")?.is_none());

        qm.delete(std::slice::from_ref(alpha))?;
        assert_eq!(qm.count_all::<Team>()?, 2);
        assert!(qm.get_by_id::<Team>(alpha.id)?.is_none());
        Ok(())
    });
    result.unwrap();
}
