//! Database connection management and the Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{Message, MessageRole, NewPatient, Page, Patient, PatientChanges, User};
use crate::secrets::DatabaseCredentials;
use crate::store::{MessageStore, PatientStore, UserStore};
use crate::{Config, Error, Result};

/// Create a database connection pool.
pub async fn create_pool(config: &Config, credentials: &DatabaseCredentials) -> Result<PgPool> {
    let host = credentials.host.as_deref().unwrap_or(&config.db_host);
    let port = credentials.port.unwrap_or(5432);
    let name = credentials.dbname.as_deref().unwrap_or(&config.db_name);

    let options = connect_options(&credentials.username, &credentials.password, host, port, name);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}

/// Built field by field; credentials never pass through a URL.
fn connect_options(username: &str, password: &str, host: &str, port: u16, database: &str) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(host)
        .port(port)
        .username(username)
        .password(password)
        .database(database)
}

/// Postgres-backed store. Passwords are hashed in the database with pgcrypto.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PATIENT_COLUMNS: &str =
    "id, user_id, name, email, phone, dob, medical_notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    patient_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        let role = match row.role.as_str() {
            "USER" => MessageRole::User,
            "AI" => MessageRole::Ai,
            other => return Err(Error::Internal(format!("Unknown message role: {}", other))),
        };

        Ok(Self {
            id: row.id,
            patient_id: row.patient_id,
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, crypt($2, gen_salt('bf', 12)))
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, created_at
            "#,
        )
        .bind(email)
        .bind(password)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, created_at
            FROM users
            WHERE email = $1 AND password_hash = crypt($2, password_hash)
            "#,
        )
        .bind(email)
        .bind(password)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl PatientStore for PgStore {
    async fn list_patients(&self, owner: Uuid, page: Page) -> Result<(Vec<Patient>, i64)> {
        let query = format!(
            "SELECT {} FROM patients WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            PATIENT_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let items = sqlx::query_as::<_, Patient>(&query)
            .bind(owner)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&mut *tx)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE user_id = $1")
            .bind(owner)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok((items, total))
    }

    async fn create_patient(&self, owner: Uuid, patient: NewPatient) -> Result<Patient> {
        let query = format!(
            r#"
            INSERT INTO patients (user_id, name, email, phone, dob, medical_notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PATIENT_COLUMNS
        );

        let created = sqlx::query_as::<_, Patient>(&query)
            .bind(owner)
            .bind(&patient.name)
            .bind(&patient.email)
            .bind(&patient.phone)
            .bind(patient.dob)
            .bind(&patient.medical_notes)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_patient(&self, owner: Uuid, id: Uuid) -> Result<Option<Patient>> {
        let query = format!(
            "SELECT {} FROM patients WHERE id = $1 AND user_id = $2",
            PATIENT_COLUMNS
        );

        let patient = sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        Ok(patient)
    }

    async fn update_patient(&self, owner: Uuid, id: Uuid, changes: PatientChanges) -> Result<Option<Patient>> {
        // Build dynamic update query
        let mut updates = Vec::new();
        let mut param_num = 3;

        for (column, present) in [
            ("name", changes.name.is_some()),
            ("email", changes.email.is_some()),
            ("phone", changes.phone.is_some()),
            ("dob", changes.dob.is_some()),
            ("medical_notes", changes.medical_notes.is_some()),
        ] {
            if present {
                updates.push(format!("{} = ${}", column, param_num));
                param_num += 1;
            }
        }

        if updates.is_empty() {
            return self.find_patient(owner, id).await;
        }

        updates.push("updated_at = NOW()".to_string());

        let query = format!(
            "UPDATE patients SET {} WHERE id = $1 AND user_id = $2 RETURNING {}",
            updates.join(", "),
            PATIENT_COLUMNS
        );

        let mut query_builder = sqlx::query_as::<_, Patient>(&query).bind(id).bind(owner);

        if let Some(name) = changes.name {
            query_builder = query_builder.bind(name);
        }
        if let Some(email) = changes.email {
            query_builder = query_builder.bind(email);
        }
        if let Some(phone) = changes.phone {
            query_builder = query_builder.bind(phone);
        }
        if let Some(dob) = changes.dob {
            query_builder = query_builder.bind(dob);
        }
        if let Some(notes) = changes.medical_notes {
            query_builder = query_builder.bind(notes);
        }

        Ok(query_builder.fetch_optional(&self.pool).await?)
    }

    async fn delete_patient(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append_message(&self, patient_id: Uuid, role: MessageRole, content: &str) -> Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (patient_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING id, patient_id, role, content, created_at
            "#,
        )
        .bind(patient_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Message::try_from(row)
    }

    async fn list_messages(&self, patient_id: Uuid, limit: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, patient_id, role, content, created_at
            FROM messages
            WHERE patient_id = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(patient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }
}
