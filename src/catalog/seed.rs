//! Startup product data.

use std::path::Path;

use serde_json::Value;

use crate::store::{Collection, Document, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("seed file must be a JSON array of objects")]
    Shape,

    #[error("failed to insert seed document: {0}")]
    Store(#[from] StoreError),
}

/// Read a JSON array of product documents.
pub fn read_seed(path: &Path) -> Result<Vec<Document>, SeedError> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(docs) if docs.iter().all(Value::is_object) => Ok(docs),
        _ => Err(SeedError::Shape),
    }
}

/// Insert the documents from `path` into `collection`; returns how many.
pub async fn load_seed<C: Collection>(collection: &C, path: &Path) -> Result<usize, SeedError> {
    let docs = read_seed(path)?;
    let count = docs.len();
    for doc in docs {
        collection.insert_one(doc).await?;
    }
    tracing::info!(path = %path.display(), count, collection = collection.name(), "Seed data loaded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCollection;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_seed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"product_code": 1, "name": "Milk"}}, {{"product_code": 2}}]"#).unwrap();

        let products = MemoryCollection::new("products");
        let count = load_seed(&products, file.path()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(products.count_documents(json!({})).await.unwrap(), 2);
    }

    #[test]
    fn test_rejects_non_array() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"product_code": 1}}"#).unwrap();
        assert!(matches!(read_seed(file.path()), Err(SeedError::Shape)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_seed(Path::new("/nonexistent/seed.json")),
            Err(SeedError::Io(_))
        ));
    }
}
