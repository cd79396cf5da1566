use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::common::error::Result;
use crate::domain::{AutoSignatureTerm, Document, Signer, Status, User, WebhookEvent};

use super::traits::{ListFilter, RecordLock, Storage};

/// Postgres-backed storage. Lock acquisition opens a transaction and reads
/// the row with `SELECT ... FOR UPDATE`; the returned [`RecordLock`] holds
/// that transaction until commit or release.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_digest TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        file_size BIGINT NOT NULL,
        mime_type TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        provider_key TEXT,
        provider_raw_payload TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS documents_provider_key_idx
        ON documents (provider_key) WHERE provider_key IS NOT NULL",
    "CREATE TABLE IF NOT EXISTS auto_signature_terms (
        id UUID PRIMARY KEY,
        signer_documentation TEXT NOT NULL,
        signer_birthday DATE NOT NULL,
        signer_email TEXT NOT NULL,
        signer_name TEXT NOT NULL,
        admin_email TEXT NOT NULL,
        api_email TEXT NOT NULL,
        status TEXT NOT NULL,
        provider_key TEXT,
        provider_raw_payload TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS auto_signature_terms_provider_key_idx
        ON auto_signature_terms (provider_key) WHERE provider_key IS NOT NULL",
    "CREATE TABLE IF NOT EXISTS webhook_events (
        id UUID PRIMARY KEY,
        provider_key TEXT NOT NULL,
        event_kind TEXT NOT NULL,
        outcome TEXT NOT NULL,
        raw_payload TEXT NOT NULL,
        received_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS webhook_events_provider_key_idx
        ON webhook_events (provider_key, received_at)",
];

fn row_to_document(row: &PgRow) -> Result<Document> {
    Ok(Document {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        file_path: row.try_get("file_path")?,
        file_size: row.try_get("file_size")?,
        mime_type: row.try_get("mime_type")?,
        description: row.try_get("description")?,
        status: Status::from_str(&row.try_get::<String, _>("status")?)?,
        provider_key: row.try_get("provider_key")?,
        provider_raw_payload: row.try_get("provider_raw_payload")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_term(row: &PgRow) -> Result<AutoSignatureTerm> {
    Ok(AutoSignatureTerm {
        id: Some(row.try_get("id")?),
        signer: Signer {
            documentation: row.try_get("signer_documentation")?,
            birthday: row.try_get("signer_birthday")?,
            email: row.try_get("signer_email")?,
            name: row.try_get("signer_name")?,
        },
        admin_email: row.try_get("admin_email")?,
        api_email: row.try_get("api_email")?,
        status: Status::from_str(&row.try_get::<String, _>("status")?)?,
        provider_key: row.try_get("provider_key")?,
        provider_raw_payload: row.try_get("provider_raw_payload")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_digest: row.try_get("password_digest")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_webhook_event(row: &PgRow) -> Result<WebhookEvent> {
    Ok(WebhookEvent {
        id: Some(row.try_get("id")?),
        provider_key: row.try_get("provider_key")?,
        event_kind: row.try_get("event_kind")?,
        outcome: row.try_get("outcome")?,
        raw_payload: row.try_get("raw_payload")?,
        received_at: row.try_get("received_at")?,
    })
}

/// Row lock held inside an open transaction.
struct PgLock<T> {
    tx: Transaction<'static, Postgres>,
    table: &'static str,
    id: Uuid,
    record: T,
}

#[async_trait]
impl<T: Send + Sync> RecordLock<T> for PgLock<T> {
    fn record(&self) -> &T {
        &self.record
    }

    async fn commit_sent(mut self: Box<Self>, provider_key: &str, raw_payload: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET status = $1, provider_key = $2, provider_raw_payload = $3, updated_at = $4 WHERE id = $5",
            self.table
        );
        sqlx::query(&sql)
            .bind(Status::Sent.as_str())
            .bind(provider_key)
            .bind(raw_payload)
            .bind(Utc::now())
            .bind(self.id)
            .execute(&mut *self.tx)
            .await?;
        self.tx.commit().await?;
        Ok(())
    }

    async fn commit_failed(self: Box<Self>, raw_payload: Option<&str>) -> Result<()> {
        self.commit_status(Status::Failed, raw_payload).await
    }

    async fn commit_status(
        mut self: Box<Self>,
        status: Status,
        raw_payload: Option<&str>,
    ) -> Result<()> {
        let sql = match raw_payload {
            Some(_) => format!(
                "UPDATE {} SET status = $1, provider_raw_payload = $2, updated_at = $3 WHERE id = $4",
                self.table
            ),
            None => format!("UPDATE {} SET status = $1, updated_at = $2 WHERE id = $3", self.table),
        };
        let mut query = sqlx::query(&sql).bind(status.as_str());
        if let Some(raw) = raw_payload {
            query = query.bind(raw);
        }
        query
            .bind(Utc::now())
            .bind(self.id)
            .execute(&mut *self.tx)
            .await?;
        self.tx.commit().await?;
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema is up to date");
        Ok(())
    }

    async fn create_document(&self, document: &mut Document) -> Result<()> {
        let id = document.id.unwrap_or_else(Uuid::new_v4);
        document.id = Some(id);
        sqlx::query(
            "INSERT INTO documents (id, name, file_path, file_size, mime_type, description,
                status, provider_key, provider_raw_payload, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(id)
        .bind(&document.name)
        .bind(&document.file_path)
        .bind(document.file_size)
        .bind(&document.mime_type)
        .bind(&document.description)
        .bind(document.status.as_str())
        .bind(&document.provider_key)
        .bind(&document.provider_raw_payload)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_document(&self, document: &Document) -> Result<()> {
        let id = document.id.ok_or_else(|| crate::SignetError::Validation("document id is required".into()))?;
        sqlx::query(
            "UPDATE documents SET name = $1, file_path = $2, file_size = $3, mime_type = $4,
                description = $5, status = $6, provider_key = $7, provider_raw_payload = $8,
                updated_at = $9
             WHERE id = $10",
        )
        .bind(&document.name)
        .bind(&document.file_path)
        .bind(document.file_size)
        .bind(&document.mime_type)
        .bind(&document.description)
        .bind(document.status.as_str())
        .bind(&document.provider_key)
        .bind(&document.provider_raw_payload)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_document_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).transpose()
    }

    async fn get_document_by_provider_key(&self, key: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE provider_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).transpose()
    }

    async fn list_documents(&self, filter: &ListFilter) -> Result<Vec<Document>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM documents WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn lock_document(&self, id: Uuid) -> Result<Option<Box<dyn RecordLock<Document>>>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let record = row_to_document(&row)?;
        Ok(Some(Box::new(PgLock { tx, table: "documents", id, record })))
    }

    async fn lock_document_by_provider_key(
        &self,
        key: &str,
    ) -> Result<Option<Box<dyn RecordLock<Document>>>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM documents WHERE provider_key = $1 FOR UPDATE")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let record = row_to_document(&row)?;
        let id = record.id.unwrap_or_default();
        Ok(Some(Box::new(PgLock { tx, table: "documents", id, record })))
    }

    async fn create_term(&self, term: &mut AutoSignatureTerm) -> Result<()> {
        let id = term.id.unwrap_or_else(Uuid::new_v4);
        term.id = Some(id);
        sqlx::query(
            "INSERT INTO auto_signature_terms (id, signer_documentation, signer_birthday,
                signer_email, signer_name, admin_email, api_email, status, provider_key,
                provider_raw_payload, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(id)
        .bind(&term.signer.documentation)
        .bind(term.signer.birthday)
        .bind(&term.signer.email)
        .bind(&term.signer.name)
        .bind(&term.admin_email)
        .bind(&term.api_email)
        .bind(term.status.as_str())
        .bind(&term.provider_key)
        .bind(&term.provider_raw_payload)
        .bind(term.created_at)
        .bind(term.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_term(&self, term: &AutoSignatureTerm) -> Result<()> {
        let id = term.id.ok_or_else(|| crate::SignetError::Validation("term id is required".into()))?;
        sqlx::query(
            "UPDATE auto_signature_terms SET signer_documentation = $1, signer_birthday = $2,
                signer_email = $3, signer_name = $4, admin_email = $5, api_email = $6,
                status = $7, provider_key = $8, provider_raw_payload = $9, updated_at = $10
             WHERE id = $11",
        )
        .bind(&term.signer.documentation)
        .bind(term.signer.birthday)
        .bind(&term.signer.email)
        .bind(&term.signer.name)
        .bind(&term.admin_email)
        .bind(&term.api_email)
        .bind(term.status.as_str())
        .bind(&term.provider_key)
        .bind(&term.provider_raw_payload)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_term(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM auto_signature_terms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_term_by_id(&self, id: Uuid) -> Result<Option<AutoSignatureTerm>> {
        let row = sqlx::query("SELECT * FROM auto_signature_terms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_term(&r)).transpose()
    }

    async fn get_term_by_provider_key(&self, key: &str) -> Result<Option<AutoSignatureTerm>> {
        let row = sqlx::query("SELECT * FROM auto_signature_terms WHERE provider_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_term(&r)).transpose()
    }

    async fn list_terms(&self, filter: &ListFilter) -> Result<Vec<AutoSignatureTerm>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM auto_signature_terms WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            qb.push(" AND (signer_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR signer_email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_term).collect()
    }

    async fn lock_term(&self, id: Uuid) -> Result<Option<Box<dyn RecordLock<AutoSignatureTerm>>>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM auto_signature_terms WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let record = row_to_term(&row)?;
        Ok(Some(Box::new(PgLock { tx, table: "auto_signature_terms", id, record })))
    }

    async fn lock_term_by_provider_key(
        &self,
        key: &str,
    ) -> Result<Option<Box<dyn RecordLock<AutoSignatureTerm>>>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM auto_signature_terms WHERE provider_key = $1 FOR UPDATE")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let record = row_to_term(&row)?;
        let id = record.id.unwrap_or_default();
        Ok(Some(Box::new(PgLock { tx, table: "auto_signature_terms", id, record })))
    }

    async fn record_webhook_event(&self, event: &mut WebhookEvent) -> Result<()> {
        let id = event.id.unwrap_or_else(Uuid::new_v4);
        event.id = Some(id);
        sqlx::query(
            "INSERT INTO webhook_events (id, provider_key, event_kind, outcome, raw_payload, received_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(&event.provider_key)
        .bind(&event.event_kind)
        .bind(&event.outcome)
        .bind(&event.raw_payload)
        .bind(event.received_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_webhook_events(&self, provider_key: &str) -> Result<Vec<WebhookEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM webhook_events WHERE provider_key = $1 ORDER BY received_at ASC",
        )
        .bind(provider_key)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_webhook_event).collect()
    }

    async fn create_user(&self, user: &mut User) -> Result<()> {
        let id = user.id.unwrap_or_else(Uuid::new_v4);
        user.id = Some(id);
        sqlx::query(
            "INSERT INTO users (id, name, email, password_digest, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_digest)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}
