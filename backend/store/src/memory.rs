use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use canvaspilot_core::{
    CanvasId, CanvasObject, ObjectAttrs, ObjectId, ObjectPatch, ObjectStore, StoreError,
};

use crate::{locked_error, validate_row, CanvasInfo};

struct StoredObject {
    object: CanvasObject,
    locked_by: Option<String>,
}

struct Canvas {
    name: String,
    objects: BTreeMap<ObjectId, StoredObject>,
}

struct Inner {
    canvases: HashMap<CanvasId, Canvas>,
    next_id: ObjectId,
}

/// Mutex-guarded in-process store. Ids are global and increase monotonically.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                canvases: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    pub fn create_canvas(&self, name: &str) -> Result<CanvasId, StoreError> {
        let id = Uuid::new_v4();
        self.lock()?.canvases.insert(
            id,
            Canvas {
                name: name.to_string(),
                objects: BTreeMap::new(),
            },
        );
        debug!(canvas_id = %id, name = %name, "Canvas created");
        Ok(id)
    }

    pub fn list_canvases(&self) -> Result<Vec<CanvasInfo>, StoreError> {
        let inner = self.lock()?;
        let mut canvases: Vec<CanvasInfo> = inner
            .canvases
            .iter()
            .map(|(id, c)| CanvasInfo {
                id: *id,
                name: c.name.clone(),
                object_count: c.objects.len(),
            })
            .collect();
        canvases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(canvases)
    }

    /// Take a user lock. Re-locking by the same owner is a no-op.
    pub fn lock_object(&self, canvas_id: CanvasId, id: ObjectId, owner: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let stored = stored_mut(&mut inner, canvas_id, id)?;
        match &stored.locked_by {
            Some(current) if current != owner => Err(locked_error(id, current)),
            _ => {
                stored.locked_by = Some(owner.to_string());
                Ok(())
            }
        }
    }

    pub fn unlock_object(&self, canvas_id: CanvasId, id: ObjectId, owner: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let stored = stored_mut(&mut inner, canvas_id, id)?;
        match &stored.locked_by {
            Some(current) if current != owner => Err(locked_error(id, current)),
            _ => {
                stored.locked_by = None;
                Ok(())
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn canvas_mut(inner: &mut Inner, canvas_id: CanvasId) -> Result<&mut Canvas, StoreError> {
    inner
        .canvases
        .get_mut(&canvas_id)
        .ok_or(StoreError::CanvasNotFound(canvas_id))
}

fn stored_mut(
    inner: &mut Inner,
    canvas_id: CanvasId,
    id: ObjectId,
) -> Result<&mut StoredObject, StoreError> {
    canvas_mut(inner, canvas_id)?
        .objects
        .get_mut(&id)
        .ok_or(StoreError::NotFound(id))
}

fn unlocked_mut(
    inner: &mut Inner,
    canvas_id: CanvasId,
    id: ObjectId,
) -> Result<&mut StoredObject, StoreError> {
    let stored = stored_mut(inner, canvas_id, id)?;
    if let Some(owner) = &stored.locked_by {
        return Err(locked_error(id, owner));
    }
    Ok(stored)
}

impl ObjectStore for MemoryStore {
    fn list_objects(&self, canvas_id: CanvasId) -> Result<Vec<CanvasObject>, StoreError> {
        let inner = self.lock()?;
        let canvas = inner
            .canvases
            .get(&canvas_id)
            .ok_or(StoreError::CanvasNotFound(canvas_id))?;
        Ok(canvas.objects.values().map(|s| s.object.clone()).collect())
    }

    fn get_object(&self, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError> {
        let mut inner = self.lock()?;
        Ok(stored_mut(&mut inner, canvas_id, id)?.object.clone())
    }

    fn insert_batch(
        &self,
        canvas_id: CanvasId,
        rows: &[ObjectAttrs],
    ) -> Result<Vec<CanvasObject>, StoreError> {
        for (index, row) in rows.iter().enumerate() {
            validate_row(index, row)?;
        }

        let mut inner = self.lock()?;
        let first_id = inner.next_id;
        let canvas = canvas_mut(&mut inner, canvas_id)?;
        let now = Utc::now();

        let created: Vec<CanvasObject> = rows
            .iter()
            .zip(first_id..)
            .map(|(row, id)| CanvasObject {
                id,
                canvas_id,
                kind: row.kind,
                position: row.position,
                render_data: row.render_data.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();

        for object in &created {
            canvas.objects.insert(
                object.id,
                StoredObject {
                    object: object.clone(),
                    locked_by: None,
                },
            );
        }
        inner.next_id = first_id + created.len() as ObjectId;

        debug!(canvas_id = %canvas_id, rows = created.len(), "Batch inserted");
        Ok(created)
    }

    fn update_one(
        &self,
        canvas_id: CanvasId,
        id: ObjectId,
        patch: &ObjectPatch,
    ) -> Result<CanvasObject, StoreError> {
        let mut inner = self.lock()?;
        let stored = unlocked_mut(&mut inner, canvas_id, id)?;
        patch.apply_to(&mut stored.object);
        stored.object.updated_at = Utc::now();
        Ok(stored.object.clone())
    }

    fn delete_one(&self, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError> {
        let mut inner = self.lock()?;
        unlocked_mut(&mut inner, canvas_id, id)?;
        let canvas = canvas_mut(&mut inner, canvas_id)?;
        canvas
            .objects
            .remove(&id)
            .map(|s| s.object)
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvaspilot_core::{ObjectKind, Position};

    fn rect(x: f64) -> ObjectAttrs {
        ObjectAttrs::new(ObjectKind::Rectangle, Position::new(x, 0.0)).with("fill", "#fff")
    }

    #[test]
    fn test_insert_batch_assigns_ids_in_row_order() {
        let store = MemoryStore::new();
        let canvas = store.create_canvas("main").unwrap();
        let created = store
            .insert_batch(canvas, &[rect(0.0), rect(10.0), rect(20.0)])
            .unwrap();
        let ids: Vec<_> = created.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(created[2].position.x, 20.0);
        assert_eq!(store.list_objects(canvas).unwrap().len(), 3);
    }

    #[test]
    fn test_insert_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let canvas = store.create_canvas("main").unwrap();
        let bad = ObjectAttrs::new(ObjectKind::Circle, Position::new(f64::NAN, 0.0));
        let err = store.insert_batch(canvas, &[rect(0.0), bad]).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert!(store.list_objects(canvas).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_canvas() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4();
        assert_eq!(
            store.list_objects(missing).unwrap_err(),
            StoreError::CanvasNotFound(missing)
        );
        assert!(store.insert_batch(missing, &[rect(0.0)]).is_err());
    }

    #[test]
    fn test_objects_are_canvas_scoped() {
        let store = MemoryStore::new();
        let a = store.create_canvas("a").unwrap();
        let b = store.create_canvas("b").unwrap();
        let created = store.insert_batch(a, &[rect(0.0)]).unwrap();
        assert_eq!(
            store.get_object(b, created[0].id).unwrap_err(),
            StoreError::NotFound(created[0].id)
        );
    }

    #[test]
    fn test_update_and_delete() {
        let store = MemoryStore::new();
        let canvas = store.create_canvas("main").unwrap();
        let id = store.insert_batch(canvas, &[rect(0.0)]).unwrap()[0].id;

        let patch = ObjectPatch::move_to(Position::new(5.0, 6.0)).set("fill", "#000");
        let updated = store.update_one(canvas, id, &patch).unwrap();
        assert_eq!(updated.position, Position::new(5.0, 6.0));
        assert_eq!(updated.fill(), Some("#000"));
        assert!(updated.updated_at >= updated.created_at);

        let deleted = store.delete_one(canvas, id).unwrap();
        assert_eq!(deleted.id, id);
        assert_eq!(store.delete_one(canvas, id).unwrap_err(), StoreError::NotFound(id));
    }

    #[test]
    fn test_locked_object_rejects_writes() {
        let store = MemoryStore::new();
        let canvas = store.create_canvas("main").unwrap();
        let id = store.insert_batch(canvas, &[rect(0.0)]).unwrap()[0].id;

        store.lock_object(canvas, id, "alice").unwrap();
        assert!(store.lock_object(canvas, id, "bob").is_err());
        let patch = ObjectPatch::move_to(Position::new(1.0, 1.0));
        assert!(matches!(
            store.update_one(canvas, id, &patch),
            Err(StoreError::ConstraintViolation(_))
        ));
        assert!(store.delete_one(canvas, id).is_err());

        assert!(store.unlock_object(canvas, id, "bob").is_err());
        store.unlock_object(canvas, id, "alice").unwrap();
        assert!(store.update_one(canvas, id, &patch).is_ok());
    }

    #[test]
    fn test_list_canvases() {
        let store = MemoryStore::new();
        let b = store.create_canvas("beta").unwrap();
        store.create_canvas("alpha").unwrap();
        store.insert_batch(b, &[rect(0.0), rect(1.0)]).unwrap();
        let canvases = store.list_canvases().unwrap();
        assert_eq!(canvases[0].name, "alpha");
        assert_eq!(canvases[1].object_count, 2);
    }
}
