use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::event::{Category, Event};

const EVENT_COLUMNS: &str = "EventId, Name, Category, Description, Latitude, Longitude, \
     StartTime, EndTime, ApplicationDeadline, OrganizationId";

#[derive(Error, Debug)]
pub enum EventStoreError {
    /// A stored row carries a category outside the fixed set
    #[error("Invalid category from DB: {value} (EventId {event_id})")]
    InvalidCategory { event_id: i64, value: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Read-only access to the `Event` table
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Exact lookup by primary key. `Ok(None)` when no row matches.
    async fn get_event(&self, event_id: i64) -> EventStoreResult<Option<Event>>;

    /// All events of one category, ordered by id
    async fn events_by_category(&self, category: Category) -> EventStoreResult<Vec<Event>>;

    /// Every row, ordered by id. A row that fails validation is returned as its own error
    /// so one corrupt row does not hide the others.
    async fn all_events(&self) -> EventStoreResult<Vec<EventStoreResult<Event>>>;
}

/// Event store backed by a SQLite database file
pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Open an existing database read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database: {:?}", path))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a blocking query on the connection without stalling the runtime
    async fn with_connection<T, F>(&self, f: F) -> EventStoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> EventStoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("event store connection lock poisoned"))?;
            f(&conn)
        })
        .await
        .map_err(|e| anyhow!("event store task failed: {}", e))?
    }
}

struct RawEvent {
    event: Event,
    category: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        event: Event {
            event_id: row.get(0)?,
            name: row.get(1)?,
            category: Category::Other,
            description: row.get(3)?,
            latitude: row.get(4)?,
            longitude: row.get(5)?,
            start_time: row.get(6)?,
            end_time: row.get(7)?,
            application_deadline: row.get(8)?,
            organization_id: row.get(9)?,
        },
        category: row.get(2)?,
    })
}

fn into_event(raw: RawEvent) -> EventStoreResult<Event> {
    let category =
        Category::from_str(&raw.category).map_err(|_| EventStoreError::InvalidCategory {
            event_id: raw.event.event_id,
            value: raw.category.clone(),
        })?;
    Ok(Event {
        category,
        ..raw.event
    })
}

fn query_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> EventStoreResult<Vec<RawEvent>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("Failed to prepare query: {}", sql))?;
    let rows = stmt
        .query_map(params, read_row)
        .context("Failed to query events")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read event row")?;
    Ok(rows)
}

fn query_events(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> EventStoreResult<Vec<Event>> {
    query_rows(conn, sql, params)?
        .into_iter()
        .map(into_event)
        .collect()
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn get_event(&self, event_id: i64) -> EventStoreResult<Option<Event>> {
        self.with_connection(move |conn| {
            let sql = format!("SELECT {} FROM Event WHERE EventId = ?1", EVENT_COLUMNS);
            let raw = conn
                .query_row(&sql, params![event_id], read_row)
                .optional()
                .context("Failed to query event")?;
            raw.map(into_event).transpose()
        })
        .await
    }

    async fn events_by_category(&self, category: Category) -> EventStoreResult<Vec<Event>> {
        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {} FROM Event WHERE Category = ?1 ORDER BY EventId",
                EVENT_COLUMNS
            );
            query_events(conn, &sql, params![category.as_ref()])
        })
        .await
    }

    async fn all_events(&self) -> EventStoreResult<Vec<EventStoreResult<Event>>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {} FROM Event ORDER BY EventId", EVENT_COLUMNS);
            Ok(query_rows(conn, &sql, [])?
                .into_iter()
                .map(into_event)
                .collect())
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[tokio::test]
    async fn test_get_event() {
        let store = seeded_store();
        let event = store.get_event(3).await.unwrap().unwrap();
        assert_eq!(event.event_id, 3);
        assert_eq!(event.name, "Sprzątanie plaży");
        assert_eq!(event.category, Category::Environment);
        assert_eq!(event.organization_id, 103);
        assert_eq!(event.start_time, "2025-06-01 10:00:00");
    }

    #[tokio::test]
    async fn test_get_missing_event() {
        let store = seeded_store();
        assert!(store.get_event(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_events_by_category() {
        let store = seeded_store();
        let events = store
            .events_by_category(Category::Environment)
            .await
            .unwrap();
        let ids: Vec<i64> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(events.iter().all(|e| e.category == Category::Environment));

        let none = store.events_by_category(Category::Culture).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_category_union_covers_all_events() {
        let store = seeded_store();
        let mut seen = Vec::new();
        for category in Category::iter() {
            seen.extend(
                store
                    .events_by_category(category)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|e| e.event_id),
            );
        }
        let all: Vec<i64> = store
            .all_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.unwrap().event_id)
            .collect();

        assert_eq!(seen.len(), all.len());
        assert_eq!(
            seen.into_iter().collect::<HashSet<_>>(),
            all.into_iter().collect::<HashSet<_>>()
        );
    }

    #[tokio::test]
    async fn test_invalid_category_row() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn);
        insert_event(&conn, 7, "Zbiórka żywności", "Społeczność");
        insert_event(&conn, 8, "Koncert", "Muzyka");
        let store = SqliteEventStore::from_connection(conn);

        match store.get_event(8).await {
            Err(EventStoreError::InvalidCategory { event_id, value }) => {
                assert_eq!(event_id, 8);
                assert_eq!(value, "Muzyka");
            }
            other => panic!("Expected InvalidCategory, got {:?}", other),
        }
        let rows = store.all_events().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_ref().unwrap().category, Category::Community);
        assert!(matches!(
            rows[1],
            Err(EventStoreError::InvalidCategory { event_id: 8, .. })
        ));
    }

    #[tokio::test]
    async fn test_open_file_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volunteering.db");
        {
            let conn = Connection::open(&path).unwrap();
            create_schema(&conn);
            insert_event(&conn, 1, "Zbiórka książek", "Kultura");
        }

        let store = SqliteEventStore::open(&path).unwrap();
        let event = store.get_event(1).await.unwrap().unwrap();
        assert_eq!(event.category, Category::Culture);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SqliteEventStore::open(dir.path().join("missing.db")).is_err());
    }
}
