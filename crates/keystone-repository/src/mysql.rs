//! MySQL document store.
//!
//! Every collection lives in the single `documents` table: one row per
//! document with the body stored as a JSON column. Criteria are translated
//! into `JSON_EXTRACT` expressions; field names are validated before they
//! are embedded in a JSON path.

use crate::driver::{ensure_id, strip_id};
use crate::{Criteria, DatabasePool, Document, DocumentDriver, Filter};
use async_trait::async_trait;
use keystone_config::StoreKind;
use keystone_core::{KeystoneError, KeystoneResult};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{MySql, QueryBuilder};
use std::sync::Arc;
use tracing::debug;

/// MySQL `LIMIT` needs a row count whenever `OFFSET` is used.
const NO_LIMIT: u64 = u64::MAX;

/// Document driver over a MySQL `documents` table.
#[derive(Debug, Clone)]
pub struct MySqlDocumentDriver {
    pool: Arc<DatabasePool>,
}

impl MySqlDocumentDriver {
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<DatabasePool> {
        &self.pool
    }
}

/// `address.city` becomes `$."address"."city"`.
fn json_path(field: &str) -> String {
    let segments: Vec<String> = field.split('.').map(|s| format!("\"{}\"", s)).collect();
    format!("$.{}", segments.join("."))
}

fn field_expr(field: &str) -> String {
    format!(
        "COALESCE(JSON_EXTRACT(body, '{}'), CAST('null' AS JSON))",
        json_path(field)
    )
}

fn push_where(qb: &mut QueryBuilder<'_, MySql>, collection: &str, criteria: &Criteria) {
    qb.push(" WHERE collection = ").push_bind(collection.to_string());

    for (field, filter) in &criteria.filters {
        let expr = field_expr(field);
        qb.push(" AND ");
        match filter {
            Filter::Eq(value) => {
                qb.push(format!("{} = CAST(", expr))
                    .push_bind(value.to_string())
                    .push(" AS JSON)");
            }
            Filter::In(values) if values.is_empty() => {
                qb.push("FALSE");
            }
            Filter::In(values) => {
                qb.push("(");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(format!("{} = CAST(", expr))
                        .push_bind(value.to_string())
                        .push(" AS JSON)");
                }
                qb.push(")");
            }
        }
    }
}

fn push_order(qb: &mut QueryBuilder<'_, MySql>, criteria: &Criteria) {
    qb.push(" ORDER BY ");
    for (field, direction) in &criteria.order {
        qb.push(format!(
            "JSON_EXTRACT(body, '{}') {}, ",
            json_path(field),
            direction.as_sql()
        ));
    }
    qb.push("pk ASC");
}

fn push_paging(qb: &mut QueryBuilder<'_, MySql>, limit: Option<u64>, offset: Option<u64>) {
    match (limit, offset) {
        (None, None) => {}
        (limit, offset) => {
            qb.push(" LIMIT ").push_bind(limit.unwrap_or(NO_LIMIT));
            if let Some(offset) = offset {
                qb.push(" OFFSET ").push_bind(offset);
            }
        }
    }
}

fn into_document(body: Json<Value>) -> KeystoneResult<Document> {
    match body.0 {
        Value::Object(document) => Ok(document),
        other => Err(KeystoneError::Decode(format!(
            "document body is not a JSON object: {}",
            other
        ))),
    }
}

impl MySqlDocumentDriver {
    async fn select(&self, collection: &str, criteria: &Criteria, limit: Option<u64>) -> KeystoneResult<Vec<Document>> {
        criteria.validate()?;

        let mut qb = QueryBuilder::<MySql>::new("SELECT body FROM documents");
        push_where(&mut qb, collection, criteria);
        push_order(&mut qb, criteria);
        push_paging(&mut qb, limit, criteria.offset);

        let rows = qb
            .build_query_scalar::<Json<Value>>()
            .fetch_all(self.pool.inner())
            .await?;

        rows.into_iter().map(into_document).collect()
    }

    async fn update(
        &self,
        collection: &str,
        criteria: &Criteria,
        patch: Document,
        single: bool,
    ) -> KeystoneResult<u64> {
        criteria.validate()?;
        let patch = Value::Object(strip_id(patch)).to_string();

        let mut qb = QueryBuilder::<MySql>::new("UPDATE documents SET body = JSON_MERGE_PATCH(body, CAST(");
        qb.push_bind(patch).push(" AS JSON))");
        push_where(&mut qb, collection, criteria);
        push_order(&mut qb, criteria);
        if single {
            qb.push(" LIMIT 1");
        }

        let result = qb.build().execute(self.pool.inner()).await?;
        debug!("Updated {} documents in '{}'", result.rows_affected(), collection);
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DocumentDriver for MySqlDocumentDriver {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Option<Document>> {
        let mut rows = self.select(collection, criteria, Some(1)).await?;
        Ok(rows.pop())
    }

    async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>> {
        self.select(collection, criteria, criteria.limit).await
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> KeystoneResult<Document> {
        let id = ensure_id(&mut document);

        sqlx::query("INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&document))
            .execute(self.pool.inner())
            .await?;

        debug!("Inserted document '{}' into '{}'", id, collection);
        Ok(document)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>> {
        let mut tx = self.pool.inner().begin().await?;
        let mut stored = Vec::with_capacity(documents.len());

        for mut document in documents {
            let id = ensure_id(&mut document);

            sqlx::query("INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?)")
                .bind(collection)
                .bind(&id)
                .bind(Json(&document))
                .execute(&mut *tx)
                .await?;

            stored.push(document);
        }

        tx.commit().await?;
        debug!("Inserted {} documents into '{}'", stored.len(), collection);
        Ok(stored)
    }

    async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.update(collection, criteria, patch, true).await
    }

    async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.update(collection, criteria, patch, false).await
    }

    async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64> {
        criteria.validate()?;

        let mut qb = QueryBuilder::<MySql>::new("DELETE FROM documents");
        push_where(&mut qb, collection, criteria);
        push_order(&mut qb, criteria);
        qb.push(" LIMIT 1");

        let result = qb.build().execute(self.pool.inner()).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> KeystoneResult<()> {
        self.pool.health_check().await
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
        }
    }
}
