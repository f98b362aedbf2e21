//! Tests for on-disk database initialization

use lyricdesk_common::db::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_file_and_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("lyricdesk.db");

    let pool = init_database(&db_path).await.expect("Should create database");

    assert!(db_path.exists());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lyricdesk.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query("INSERT INTO categories (id, name) VALUES ('c1', 'Hymns')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let name: String = sqlx::query_scalar("SELECT name FROM categories WHERE id = 'c1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "Hymns");
}
