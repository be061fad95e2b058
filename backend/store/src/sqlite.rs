use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use canvaspilot_core::{
    CanvasId, CanvasObject, ObjectAttrs, ObjectId, ObjectKind, ObjectPatch, ObjectStore,
    Position, RenderData, StoreError,
};

use crate::{locked_error, validate_row, CanvasInfo};

/// SQLite-backed object store. Batch inserts run inside one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const OBJECT_COLUMNS: &str =
    "id, canvas_id, kind, x, y, render_data, created_at, updated_at";

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl SqliteStore {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!(path = %path.display(), "Object store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS canvases (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS objects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                canvas_id TEXT NOT NULL REFERENCES canvases(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                render_data TEXT NOT NULL,
                locked_by TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_objects_canvas_id ON objects(canvas_id);",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))
    }

    pub fn create_canvas(&self, name: &str) -> Result<CanvasId, StoreError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO canvases (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![id.to_string(), name, Utc::now().to_rfc3339()],
            )
            .map_err(backend)?;
        debug!(canvas_id = %id, name = %name, "Canvas created");
        Ok(id)
    }

    pub fn list_canvases(&self) -> Result<Vec<CanvasInfo>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.name, COUNT(o.id)
                 FROM canvases c LEFT JOIN objects o ON o.canvas_id = c.id
                 GROUP BY c.id ORDER BY c.name ASC",
            )
            .map_err(backend)?;
        let canvases = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let count: i64 = row.get(2)?;
                Ok((id, name, count))
            })
            .map_err(backend)?
            .map(|r| -> Result<CanvasInfo, StoreError> {
                let (id, name, count) = r.map_err(backend)?;
                Ok(CanvasInfo {
                    id: Uuid::parse_str(&id)
                        .map_err(|_| StoreError::Backend(format!("canvas '{name}': corrupt id")))?,
                    name,
                    object_count: count as usize,
                })
            })
            .collect::<Result<Vec<_>, _>>();
        canvases
    }

    pub fn lock_object(&self, canvas_id: CanvasId, id: ObjectId, owner: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        match lock_owner(&conn, canvas_id, id)? {
            Some(current) if current != owner => Err(locked_error(id, &current)),
            _ => set_lock(&conn, id, Some(owner)),
        }
    }

    pub fn unlock_object(&self, canvas_id: CanvasId, id: ObjectId, owner: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        match lock_owner(&conn, canvas_id, id)? {
            Some(current) if current != owner => Err(locked_error(id, &current)),
            _ => set_lock(&conn, id, None),
        }
    }
}

fn canvas_exists(conn: &Connection, canvas_id: CanvasId) -> Result<(), StoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM canvases WHERE id = ?1",
            params![canvas_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(backend)?;
    found.map(|_| ()).ok_or(StoreError::CanvasNotFound(canvas_id))
}

/// `Err(NotFound)` when the object is not on this canvas.
fn lock_owner(conn: &Connection, canvas_id: CanvasId, id: ObjectId) -> Result<Option<String>, StoreError> {
    canvas_exists(conn, canvas_id)?;
    conn.query_row(
        "SELECT locked_by FROM objects WHERE id = ?1 AND canvas_id = ?2",
        params![id, canvas_id.to_string()],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map_err(backend)?
    .ok_or(StoreError::NotFound(id))
}

fn set_lock(conn: &Connection, id: ObjectId, owner: Option<&str>) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE objects SET locked_by = ?1 WHERE id = ?2",
        params![owner, id],
    )
    .map_err(backend)?;
    Ok(())
}

fn ensure_unlocked(conn: &Connection, canvas_id: CanvasId, id: ObjectId) -> Result<(), StoreError> {
    match lock_owner(conn, canvas_id, id)? {
        Some(owner) => Err(locked_error(id, &owner)),
        None => Ok(()),
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn row_to_object(row: &Row<'_>) -> rusqlite::Result<Result<CanvasObject, StoreError>> {
    let id: ObjectId = row.get(0)?;
    let canvas_id: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let x: f64 = row.get(3)?;
    let y: f64 = row.get(4)?;
    let render_data: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    let corrupt = |field: &str| StoreError::Backend(format!("object {id}: corrupt {field}"));
    Ok((|| -> Result<CanvasObject, StoreError> {
        Ok(CanvasObject {
            id,
            canvas_id: Uuid::parse_str(&canvas_id).map_err(|_| corrupt("canvas_id"))?,
            kind: ObjectKind::parse(&kind).ok_or_else(|| corrupt("kind"))?,
            position: Position::new(x, y),
            render_data: serde_json::from_str::<RenderData>(&render_data)
                .map_err(|_| corrupt("render_data"))?,
            created_at: parse_time(&created_at).ok_or_else(|| corrupt("created_at"))?,
            updated_at: parse_time(&updated_at).ok_or_else(|| corrupt("updated_at"))?,
        })
    })())
}

fn fetch(conn: &Connection, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError> {
    conn.query_row(
        &format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE id = ?1 AND canvas_id = ?2"),
        params![id, canvas_id.to_string()],
        row_to_object,
    )
    .optional()
    .map_err(backend)?
    .ok_or(StoreError::NotFound(id))?
}

fn render_json(render_data: &RenderData) -> Result<String, StoreError> {
    serde_json::to_string(render_data).map_err(|e| StoreError::Backend(e.to_string()))
}

impl ObjectStore for SqliteStore {
    fn list_objects(&self, canvas_id: CanvasId) -> Result<Vec<CanvasObject>, StoreError> {
        let conn = self.conn()?;
        canvas_exists(&conn, canvas_id)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {OBJECT_COLUMNS} FROM objects WHERE canvas_id = ?1 ORDER BY id ASC"
            ))
            .map_err(backend)?;
        let objects = stmt
            .query_map(params![canvas_id.to_string()], row_to_object)
            .map_err(backend)?
            .map(|r| r.map_err(backend).and_then(|object| object))
            .collect::<Result<Vec<_>, _>>();
        objects
    }

    fn get_object(&self, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError> {
        let conn = self.conn()?;
        canvas_exists(&conn, canvas_id)?;
        fetch(&conn, canvas_id, id)
    }

    fn insert_batch(
        &self,
        canvas_id: CanvasId,
        rows: &[ObjectAttrs],
    ) -> Result<Vec<CanvasObject>, StoreError> {
        for (index, row) in rows.iter().enumerate() {
            validate_row(index, row)?;
        }

        let mut conn = self.conn()?;
        canvas_exists(&conn, canvas_id)?;
        let tx = conn.transaction().map_err(backend)?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO objects (canvas_id, kind, x, y, render_data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                )
                .map_err(backend)?;
            for row in rows {
                stmt.execute(params![
                    canvas_id.to_string(),
                    row.kind.as_str(),
                    row.position.x,
                    row.position.y,
                    render_json(&row.render_data)?,
                    now.to_rfc3339(),
                ])
                .map_err(backend)?;
                created.push(CanvasObject {
                    id: tx.last_insert_rowid(),
                    canvas_id,
                    kind: row.kind,
                    position: row.position,
                    render_data: row.render_data.clone(),
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        // Dropping an uncommitted transaction rolls it back.
        tx.commit().map_err(backend)?;

        debug!(canvas_id = %canvas_id, rows = created.len(), "Batch inserted");
        Ok(created)
    }

    fn update_one(
        &self,
        canvas_id: CanvasId,
        id: ObjectId,
        patch: &ObjectPatch,
    ) -> Result<CanvasObject, StoreError> {
        let conn = self.conn()?;
        ensure_unlocked(&conn, canvas_id, id)?;
        let mut object = fetch(&conn, canvas_id, id)?;
        patch.apply_to(&mut object);
        object.updated_at = Utc::now();

        conn.execute(
            "UPDATE objects SET x = ?1, y = ?2, render_data = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                object.position.x,
                object.position.y,
                render_json(&object.render_data)?,
                object.updated_at.to_rfc3339(),
                id,
            ],
        )
        .map_err(backend)?;
        Ok(object)
    }

    fn delete_one(&self, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError> {
        let conn = self.conn()?;
        ensure_unlocked(&conn, canvas_id, id)?;
        let object = fetch(&conn, canvas_id, id)?;
        conn.execute("DELETE FROM objects WHERE id = ?1", params![id])
            .map_err(backend)?;
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(x: f64) -> ObjectAttrs {
        ObjectAttrs::new(ObjectKind::Circle, Position::new(x, 5.0))
            .with("width", 60.0)
            .with("fill", "#4A90D9")
    }

    #[test]
    fn test_insert_and_list_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let canvas = store.create_canvas("main").unwrap();
        let created = store.insert_batch(canvas, &[circle(0.0), circle(70.0)]).unwrap();
        assert_eq!(created.len(), 2);
        assert!(created[0].id < created[1].id);

        let listed = store.list_objects(canvas).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].position, Position::new(70.0, 5.0));
        assert_eq!(listed[0].width(), 60.0);
        assert_eq!(listed[0].fill(), Some("#4A90D9"));
    }

    #[test]
    fn test_failed_batch_leaves_no_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let canvas = store.create_canvas("main").unwrap();
        let bad = ObjectAttrs::new(ObjectKind::Text, Position::new(0.0, f64::INFINITY));
        assert!(store.insert_batch(canvas, &[circle(0.0), bad]).is_err());
        assert!(store.list_objects(canvas).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_canvas_is_reported() {
        let store = SqliteStore::in_memory().unwrap();
        let missing = Uuid::new_v4();
        assert_eq!(
            store.insert_batch(missing, &[circle(0.0)]).unwrap_err(),
            StoreError::CanvasNotFound(missing)
        );
    }

    #[test]
    fn test_update_patch_and_null_removes_key() {
        let store = SqliteStore::in_memory().unwrap();
        let canvas = store.create_canvas("main").unwrap();
        let id = store.insert_batch(canvas, &[circle(0.0)]).unwrap()[0].id;

        let patch = ObjectPatch::default()
            .set("fill", serde_json::Value::Null)
            .set("opacity", 0.5);
        let updated = store.update_one(canvas, id, &patch).unwrap();
        assert_eq!(updated.fill(), None);

        let reread = store.get_object(canvas, id).unwrap();
        assert_eq!(reread.render_data["opacity"], 0.5);
        assert!(reread.render_data.get("fill").is_none());
    }

    #[test]
    fn test_lock_blocks_update_and_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let canvas = store.create_canvas("main").unwrap();
        let id = store.insert_batch(canvas, &[circle(0.0)]).unwrap()[0].id;

        store.lock_object(canvas, id, "alice").unwrap();
        let patch = ObjectPatch::move_to(Position::new(1.0, 2.0));
        assert!(matches!(
            store.update_one(canvas, id, &patch),
            Err(StoreError::ConstraintViolation(_))
        ));
        assert!(store.delete_one(canvas, id).is_err());

        store.unlock_object(canvas, id, "alice").unwrap();
        assert_eq!(store.delete_one(canvas, id).unwrap().id, id);
        assert_eq!(store.get_object(canvas, id).unwrap_err(), StoreError::NotFound(id));
    }

    #[test]
    fn test_corrupt_canvas_row_is_an_error() {
        let store = SqliteStore::in_memory().unwrap();
        store.create_canvas("good").unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO canvases (id, name, created_at) VALUES ('not-a-uuid', 'bad', '')",
                [],
            )
            .unwrap();

        let err = store.list_canvases().unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m.contains("bad")));
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data").join("canvas.db");
        let canvas = {
            let store = SqliteStore::open(&path).unwrap();
            let canvas = store.create_canvas("saved").unwrap();
            store.insert_batch(canvas, &[circle(1.0)]).unwrap();
            canvas
        };
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_objects(canvas).unwrap().len(), 1);
        let canvases = store.list_canvases().unwrap();
        assert_eq!(canvases[0].name, "saved");
        assert_eq!(canvases[0].object_count, 1);
    }
}
