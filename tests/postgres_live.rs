//! Runs against a real server when `DBINT_PG_HOST`, `DBINT_PG_DATABASE`,
//! `DBINT_PG_USER` and `DBINT_PG_PASSWORD` are set (a `.env` file works).
//! Without them the test returns early.

use dbint::drivers::TokioPostgresDriver;
use dbint::{ColumnType, ConnectOptions, Connection, Environment};
use tracing_subscriber::EnvFilter;

fn live_options() -> Option<ConnectOptions> {
    let _ = dotenvy::dotenv();
    let var = |name: &str| std::env::var(name).ok();
    Some(ConnectOptions::new(
        var("DBINT_PG_HOST")?,
        var("DBINT_PG_DATABASE")?,
        var("DBINT_PG_USER")?,
        var("DBINT_PG_PASSWORD")?,
    ))
}

#[test]
fn test_postgres_round_trip() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let Some(options) = live_options() else {
        eprintln!("DBINT_PG_* not set, skipping");
        return;
    };

    let env = Environment::new().unwrap();
    let driver = TokioPostgresDriver::new();
    let conn = Connection::connect(&env, &driver, options);
    assert!(!conn.last_error(), "{:?}", conn.last_error_text());
    assert!(conn.is_open());

    let mut stmt = conn.create_statement().unwrap();
    stmt.execute_update(
        "CREATE TEMPORARY TABLE dbint_people (id integer PRIMARY KEY, name varchar(40), born date)",
    )
    .unwrap();

    stmt.prepare("INSERT INTO dbint_people (id, name, born) VALUES (?, ?, ?)")
        .unwrap();
    assert_eq!(stmt.parameter_count(), 3);
    for (id, name, born) in [("1", "O'Brien", "1970-01-02"), ("2", "Zoë", "1985-06-30")] {
        stmt.bind_number(1, id).unwrap();
        stmt.bind_string(2, name).unwrap();
        stmt.bind_string(3, born).unwrap();
        assert_eq!(stmt.execute_insert("").unwrap(), 1);
    }

    stmt.prepare("SELECT id, name, born FROM dbint_people WHERE id >= ? ORDER BY id")
        .unwrap();
    stmt.bind_number(1, "1").unwrap();
    stmt.execute_select("").unwrap();
    assert_eq!(stmt.row_count(), 2);
    assert_eq!(stmt.column_type("id"), ColumnType::Number);
    assert_eq!(stmt.column_type("born"), ColumnType::Date);
    assert_eq!(stmt.column_value("name"), "O'Brien");
    assert_eq!(stmt.column_value("born"), "1970-01-02");
    assert!(stmt.next().unwrap());
    assert_eq!(stmt.column_value("name"), "Zoë");
    assert!(!stmt.next().unwrap());
    assert!(stmt.is_eof());
    stmt.first().unwrap();
    assert_eq!(stmt.column_value("id"), "1");
    stmt.free().unwrap();

    let mut stmt = conn.create_statement().unwrap();
    assert!(stmt.execute_select("SELECT * FROM dbint_missing").is_err());
    assert!(conn.last_error_text().unwrap().contains("42P01"));
    stmt.free().unwrap();

    assert_eq!(
        conn.primary_key_column("pg_temp", "DBINT_PEOPLE", 1).unwrap(),
        None
    );

    conn.commit().unwrap();
    conn.close().unwrap();
}
