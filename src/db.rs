use crate::config::Config;
use crate::model::{Book, BookChanges, BookFilter, BookStatus, NewBook};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_library_books.sql", include_str!("migrations/001_library_books.sql"))];

const BOOK_COLUMNS: &str = "id, title, description, author, publicationyear, status, createdat, updatedat";

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
    replica: bool,
}

// Timestamps are stored with microsecond precision so a value read back compares equal.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("invalid timestamp {raw}: {e}"))?
        .with_timezone(&Utc))
}

/// Next `updatedat` for a row: now, but always strictly after the previous value.
fn next_update_stamp(previous: &DateTime<Utc>) -> DateTime<Utc> {
    let floor = *previous + TimeDelta::microseconds(1);
    now().max(floor)
}

impl Database {
    pub fn is_replica(&self) -> bool {
        self.replica
    }

    pub async fn sync(&self) -> Result<()> {
        if self.replica {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());

        match cfg.app.replica() {
            Some((url, token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                let db = Builder::new_synced_database(&path, url.to_string(), token.to_string())
                    .sync_interval(sync_interval)
                    .build()
                    .await?;
                Self::init(db, true).await
            }
            None => Self::open_local(&path).await,
        }
    }

    pub async fn open_local(path: &Path) -> Result<Self> {
        tracing::info!(path = ?path, "[db] opening local database");
        let db = Builder::new_local(path).build().await?;
        Self::init(db, false).await
    }

    async fn init(db: LibsqlDatabase, replica: bool) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        Ok(Database {
            db,
            conn,
            tx_lock: Mutex::new(()),
            replica,
        })
    }

    fn row_to_book(row: &libsql::Row) -> Result<Book> {
        let status_str: String = row.get(5)?;
        let status = BookStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("invalid book status: {}", status_str))?;
        let createdat: String = row.get(6)?;
        let updatedat: String = row.get(7)?;

        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get::<Option<String>>(2)?.unwrap_or_default(),
            author: row.get::<Option<String>>(3)?.unwrap_or_default(),
            publicationyear: row.get::<Option<i64>>(4)?.unwrap_or(0),
            status,
            createdat: parse_timestamp(&createdat)?,
            updatedat: parse_timestamp(&updatedat)?,
        })
    }

    pub async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut clauses = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(status) = &filter.status {
            clauses.push("status = ?");
            params.push(status.clone().into());
        }
        if let Some(author) = &filter.author {
            clauses.push("author = ?");
            params.push(author.clone().into());
        }
        if let Some(year) = filter.year {
            clauses.push("publicationyear = ?");
            params.push(year.into());
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let query = format!("SELECT {BOOK_COLUMNS} FROM library_books {where_sql} ORDER BY id");

        let mut rows = self.conn.query(&query, params).await?;
        let mut books = vec![];
        while let Some(row) = rows.next().await? {
            books.push(Self::row_to_book(&row)?);
        }

        Ok(books)
    }

    pub async fn get_book(&self, id: i64) -> Result<Option<Book>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM library_books WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_book(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let stamp = format_timestamp(&now());
        let query = format!(
            r#"
            INSERT INTO library_books (title, description, author, publicationyear, status, createdat, updatedat)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {BOOK_COLUMNS}
            "#
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    book.title.as_str(),
                    book.description.as_str(),
                    book.author.as_str(),
                    book.publicationyear,
                    book.status.as_str(),
                    stamp.as_str(),
                    stamp.as_str()
                ],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Self::row_to_book(&row)
        } else {
            anyhow::bail!("Failed to create book")
        }
    }

    /// Merges `changes` into the stored row. `None` when the id does not exist.
    pub async fn update_book(&self, id: i64, changes: BookChanges) -> Result<Option<Book>> {
        let _guard = self.tx_lock.lock().await;

        let Some(existing) = self.get_book(id).await? else {
            return Ok(None);
        };
        let merged = changes.apply(&existing);
        let stamp = format_timestamp(&next_update_stamp(&existing.updatedat));

        let query = format!(
            r#"
            UPDATE library_books
            SET title = ?, description = ?, author = ?, publicationyear = ?, status = ?, updatedat = ?
            WHERE id = ?
            RETURNING {BOOK_COLUMNS}
            "#
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    merged.title.as_str(),
                    merged.description.as_str(),
                    merged.author.as_str(),
                    merged.publicationyear,
                    merged.status.as_str(),
                    stamp.as_str(),
                    id
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_book(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_book(&self, id: i64) -> Result<bool> {
        let result = self
            .conn
            .execute("DELETE FROM library_books WHERE id = ?", libsql::params![id])
            .await?;
        Ok(result > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_local(&dir.path().join("library.db")).await.unwrap();
        (dir, db)
    }

    fn new_book(title: &str, author: &str, year: i64, status: BookStatus) -> NewBook {
        NewBook {
            title: title.to_string(),
            description: String::new(),
            author: author.to_string(),
            publicationyear: year,
            status,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_equal_timestamps() {
        let (_dir, db) = open().await;
        let first = db
            .create_book(&new_book("Dune", "Herbert", 1965, BookStatus::Available))
            .await
            .unwrap();
        let second = db
            .create_book(&new_book("Emma", "Austen", 1815, BookStatus::Borrowed))
            .await
            .unwrap();

        assert!(first.id > 0);
        assert_ne!(first.id, second.id);
        assert_eq!(first.createdat, first.updatedat);
        assert_eq!(db.get_book(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn update_keeps_omitted_fields_and_advances_updatedat() {
        let (_dir, db) = open().await;
        let created = db
            .create_book(&new_book("Dune", "Herbert", 1965, BookStatus::Available))
            .await
            .unwrap();

        let changes = BookChanges {
            status: Some(BookStatus::Borrowed),
            ..Default::default()
        };
        let updated = db.update_book(created.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.author, "Herbert");
        assert_eq!(updated.publicationyear, 1965);
        assert_eq!(updated.status, BookStatus::Borrowed);
        assert_eq!(updated.createdat, created.createdat);
        assert!(updated.updatedat > created.updatedat);

        let again = db.update_book(created.id, BookChanges::default()).await.unwrap().unwrap();
        assert!(again.updatedat > updated.updatedat);
        assert_eq!(again.status, BookStatus::Borrowed);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (_dir, db) = open().await;
        assert!(db.get_book(42).await.unwrap().is_none());
        assert!(db.update_book(42, BookChanges::default()).await.unwrap().is_none());
        assert!(!db.delete_book(42).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_hard_and_repeatable() {
        let (_dir, db) = open().await;
        let created = db
            .create_book(&new_book("Dune", "", 0, BookStatus::Available))
            .await
            .unwrap();

        assert!(db.delete_book(created.id).await.unwrap());
        assert!(db.get_book(created.id).await.unwrap().is_none());
        assert!(!db.delete_book(created.id).await.unwrap());

        let next = db
            .create_book(&new_book("Emma", "", 0, BookStatus::Available))
            .await
            .unwrap();
        assert!(next.id > created.id);
    }

    #[tokio::test]
    async fn list_applies_conjunctive_filters() {
        let (_dir, db) = open().await;
        db.create_book(&new_book("Dune", "Herbert", 1965, BookStatus::Borrowed))
            .await
            .unwrap();
        db.create_book(&new_book("Children of Dune", "Herbert", 1976, BookStatus::Available))
            .await
            .unwrap();
        db.create_book(&new_book("Emma", "Austen", 1815, BookStatus::Borrowed))
            .await
            .unwrap();

        assert_eq!(db.list_books(&BookFilter::default()).await.unwrap().len(), 3);

        let borrowed = db
            .list_books(&BookFilter {
                status: Some("borrowed".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(borrowed.len(), 2);
        assert!(borrowed.iter().all(|b| b.status == BookStatus::Borrowed));

        let herbert_1976 = db
            .list_books(&BookFilter {
                author: Some("Herbert".to_string()),
                year: Some(1976),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(herbert_1976.len(), 1);
        assert_eq!(herbert_1976[0].title, "Children of Dune");

        let nobody = db
            .list_books(&BookFilter {
                status: Some("borrowed".to_string()),
                author: Some("Herbert".to_string()),
                year: Some(1976),
            })
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn storage_rejects_unknown_status() {
        let (_dir, db) = open().await;
        let result = db
            .conn
            .execute(
                "INSERT INTO library_books (title, status, createdat, updatedat) VALUES ('x', 'archived', '', '')",
                (),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn migrations_run_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.db");
        {
            let db = Database::open_local(&path).await.unwrap();
            db.create_book(&new_book("Dune", "", 0, BookStatus::Available))
                .await
                .unwrap();
        }
        let reopened = Database::open_local(&path).await.unwrap();
        assert_eq!(reopened.list_books(&BookFilter::default()).await.unwrap().len(), 1);
        assert!(!reopened.is_replica());
    }
}
