use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{ReturnDocument, UpdateModifications},
    Collection,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::database::manager::{is_duplicate_key, DatabaseError};
use crate::database::paging::{Page, Sort};
use crate::database::pipeline::Pipeline;

/// Outcome of a toggle: the relation row was created, or it was removed.
#[derive(Debug, Clone, PartialEq)]
pub enum Toggle<T> {
    Added(T),
    Removed,
}

impl<T> Toggle<T> {
    pub fn is_on(&self) -> bool {
        matches!(self, Toggle::Added(_))
    }
}

/// Typed access to one collection
pub struct Repository<T>
where
    T: Send + Sync,
{
    collection: Collection<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>, DatabaseError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, DatabaseError> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn exists(&self, filter: Document) -> Result<bool, DatabaseError> {
        let count = self.collection.count_documents(filter).limit(1).await?;
        Ok(count > 0)
    }

    pub async fn count(&self, filter: Document) -> Result<u64, DatabaseError> {
        Ok(self.collection.count_documents(filter).await?)
    }

    /// Ids of every document matching `filter`
    pub async fn ids(&self, filter: Document) -> Result<Vec<ObjectId>, DatabaseError> {
        let values = self.collection.distinct("_id", filter).await?;
        Ok(values.into_iter().filter_map(|v| v.as_object_id()).collect())
    }

    /// One page of documents matching `filter`
    pub async fn find_page(&self, filter: Document, sort: &Sort, page: &Page) -> Result<Vec<T>, DatabaseError> {
        let cursor = self
            .collection
            .find(filter)
            .sort(sort.to_document())
            .skip(page.skip())
            .limit(page.size())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Insert a document and return it with its generated id filled in.
    /// A unique-index violation becomes `Duplicate(conflict_message)`.
    pub async fn insert(&self, document: T, conflict_message: &str) -> Result<T, DatabaseError> {
        let result = self
            .collection
            .insert_one(&document)
            .await
            .map_err(|e| duplicate_or(e, conflict_message))?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| DatabaseError::Serialization("inserted id is not an ObjectId".to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found after insert", self.name())))
    }

    /// Apply `update` to the first document matching `filter` and return the
    /// updated document. `updatedAt` is refreshed as part of the same write.
    pub async fn update_one(
        &self,
        filter: Document,
        mut update: Document,
        conflict_message: &str,
    ) -> Result<Option<T>, DatabaseError> {
        touch(&mut update);
        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| duplicate_or(e, conflict_message))?)
    }

    pub async fn update_by_id(
        &self,
        id: ObjectId,
        update: Document,
        conflict_message: &str,
    ) -> Result<Option<T>, DatabaseError> {
        self.update_one(doc! { "_id": id }, update, conflict_message).await
    }

    /// Update using an aggregation-style update (a list of stages), applied
    /// atomically to the first document matching `filter`.
    pub async fn update_with_pipeline(
        &self,
        filter: Document,
        mut stages: Vec<Document>,
    ) -> Result<Option<T>, DatabaseError> {
        stages.push(doc! { "$set": { "updatedAt": "$$NOW" } });
        Ok(self
            .collection
            .find_one_and_update(filter, stages)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Apply `update` (operators or a stage list) to every document matching
    /// `filter` without touching timestamps
    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<u64, DatabaseError> {
        let result = self.collection.update_many(filter, update).await?;
        Ok(result.modified_count)
    }

    /// Delete the first document matching `filter` and return it
    pub async fn delete_one(&self, filter: Document) -> Result<Option<T>, DatabaseError> {
        Ok(self.collection.find_one_and_delete(filter).await?)
    }

    pub async fn delete_many(&self, filter: Document) -> Result<u64, DatabaseError> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    /// Run an aggregation pipeline; results are untyped documents because the
    /// pipeline reshapes them.
    pub async fn aggregate(&self, pipeline: Pipeline) -> Result<Vec<Document>, DatabaseError> {
        let cursor = self.collection.aggregate(pipeline.into_stages()).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Remove the row matching `key` if there is one, otherwise insert `row`.
    ///
    /// Relies on a unique index covering `key`: when two requests race to
    /// insert, the loser's duplicate-key error is read as "already on".
    pub async fn toggle(&self, key: Document, row: impl FnOnce() -> T) -> Result<Toggle<T>, DatabaseError> {
        let deleted = self.collection.delete_one(key.clone()).await?;
        if deleted.deleted_count > 0 {
            return Ok(Toggle::Removed);
        }

        match self.collection.insert_one(row()).await {
            Ok(_) => {}
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!("Concurrent toggle on {} already inserted {:?}", self.name(), key);
            }
            Err(e) => return Err(e.into()),
        }

        self.find_one(key)
            .await?
            .map(Toggle::Added)
            .ok_or_else(|| DatabaseError::NotFound(format!("{} row vanished during toggle", self.name())))
    }
}

/// Add `updatedAt = now` to an operator-style update
fn touch(update: &mut Document) {
    match update.get_document_mut("$currentDate") {
        Ok(current) => {
            current.insert("updatedAt", true);
        }
        Err(_) => {
            update.insert("$currentDate", doc! { "updatedAt": true });
        }
    }
}

fn duplicate_or(err: mongodb::error::Error, conflict_message: &str) -> DatabaseError {
    if is_duplicate_key(&err) {
        DatabaseError::Duplicate(conflict_message.to_string())
    } else {
        DatabaseError::Mongo(err)
    }
}
