//! Typed models over a collection.
//!
//! A `Model<T, C>` is the schema-level view of a collection: documents are
//! decoded into `T`, and each of its six operations runs inside
//! [`ModelAuditor::observe`] tagged with the matching [`ModelOp`].

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Collection, Cursor, DeleteResult, Document, InsertOneResult, StoreResult, UpdateResult};
use crate::audit::{ModelAuditor, ModelOp};

pub struct Model<T, C> {
    collection: C,
    auditor: ModelAuditor,
    _doc: PhantomData<fn() -> T>,
}

impl<T, C: Clone> Clone for Model<T, C> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            auditor: self.auditor.clone(),
            _doc: PhantomData,
        }
    }
}

impl<T, C> Model<T, C>
where
    T: Serialize + DeserializeOwned + Send,
    C: Collection,
{
    pub fn new(collection: C, auditor: ModelAuditor) -> Self {
        Self {
            collection,
            auditor,
            _doc: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub async fn find(&self, filter: Document) -> StoreResult<Vec<T>> {
        self.auditor
            .observe(self.name(), ModelOp::Find, async {
                let docs = self.collection.find(filter).to_vec().await?;
                docs.into_iter().map(decode).collect()
            })
            .await
    }

    pub async fn find_one(&self, filter: Document) -> StoreResult<Option<T>> {
        self.auditor
            .observe(self.name(), ModelOp::FindOne, async {
                self.collection.find_one(filter).await?.map(decode).transpose()
            })
            .await
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateResult> {
        self.auditor
            .observe(self.name(), ModelOp::UpdateOne, self.collection.update_one(filter, update))
            .await
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateResult> {
        self.auditor
            .observe(self.name(), ModelOp::UpdateMany, self.collection.update_many(filter, update))
            .await
    }

    pub async fn save(&self, doc: &T) -> StoreResult<InsertOneResult> {
        self.auditor
            .observe(self.name(), ModelOp::Save, async {
                let document = serde_json::to_value(doc)?;
                self.collection.insert_one(document).await
            })
            .await
    }

    pub async fn remove(&self, filter: Document) -> StoreResult<DeleteResult> {
        self.auditor
            .observe(self.name(), ModelOp::Remove, self.collection.delete_one(filter))
            .await
    }
}

fn decode<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SlowPolicy;
    use crate::observability::sink::{read_records, MODEL_LOG};
    use crate::observability::LogContext;
    use crate::store::{Database, MemoryDatabase};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        user_id: String,
        product_id: String,
        quantity: u32,
    }

    fn item(user: &str, product: &str, quantity: u32) -> Item {
        Item {
            user_id: user.into(),
            product_id: product.into(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let model: Model<Item, _> = Model::new(MemoryDatabase::new().collection("basket"), ModelAuditor::default());

        model.save(&item("u1", "p1", 1)).await.unwrap();
        model.save(&item("u1", "p2", 2)).await.unwrap();
        model.save(&item("u2", "p1", 5)).await.unwrap();

        let mine = model.find(json!({"user_id": "u1"})).await.unwrap();
        assert_eq!(mine.len(), 2);

        model
            .update_one(json!({"user_id": "u1", "product_id": "p2"}), json!({"$set": {"quantity": 9}}))
            .await
            .unwrap();
        let p2 = model.find_one(json!({"product_id": "p2"})).await.unwrap().unwrap();
        assert_eq!(p2.quantity, 9);

        let bumped = model
            .update_many(json!({"product_id": "p1"}), json!({"$inc": {"quantity": 1}}))
            .await
            .unwrap();
        assert_eq!(bumped.modified_count, 2);

        assert_eq!(model.remove(json!({"user_id": "u2"})).await.unwrap().deleted_count, 1);
        assert!(model.find_one(json!({"user_id": "u2"})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_surfaces() {
        let coll = MemoryDatabase::new().collection("basket");
        coll.insert_one(json!({"user_id": 1})).await.unwrap();
        let model: Model<Item, _> = Model::new(coll, ModelAuditor::default());

        assert!(model.find(json!({})).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operations_use_hook_names() {
        let tmp = tempfile::tempdir().unwrap();
        let auditor = ModelAuditor::new(LogContext::init(tmp.path()).models, SlowPolicy::default());
        let db = MemoryDatabase::with_latency(Duration::from_millis(120));
        let model: Model<Item, _> = Model::new(db.collection("basket"), auditor);

        model.save(&item("u1", "p1", 1)).await.unwrap();
        model.find(json!({})).await.unwrap();
        model.find_one(json!({})).await.unwrap();
        model.update_one(json!({}), json!({"$set": {"quantity": 2}})).await.unwrap();
        model.update_many(json!({}), json!({"$set": {"quantity": 3}})).await.unwrap();
        model.remove(json!({})).await.unwrap();

        let hooks: Vec<_> = read_records(tmp.path().join(MODEL_LOG))
            .unwrap()
            .iter()
            .map(|r| r["hook"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(hooks, ["save", "find", "findOne", "updateOne", "updateMany", "remove"]);
    }
}
