use livetalk::infrastructure::persistence::Database;
use uuid::Uuid;

pub async fn setup_test_db() -> Database {
    // File-based SQLite, one file per test so tests can run in parallel
    let path = std::env::temp_dir().join(format!("livetalk_test_{}.db", Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", path.display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    db
}
