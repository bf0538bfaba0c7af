//! SQLite-backed repositories.

use crate::domain::error::DomainError;
use crate::domain::models::{
    BiomarkerPanel, BloodTestRecord, MriRecord, NewBloodTest, NewMriPrediction,
};
use crate::domain::repository::{PredictionRepository, UserRepository};
use crate::domain::user::{NewUser, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, info, instrument};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name    TEXT NOT NULL,
        last_name     TEXT NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blood_test_data (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id               INTEGER NOT NULL REFERENCES users(id),
        histological_type     TEXT NOT NULL DEFAULT 'nil',
        proline               REAL NOT NULL,
        l_kynurenine          REAL NOT NULL,
        spermidine            REAL NOT NULL,
        amino_hippuric_acid   REAL NOT NULL,
        palmitoyl_l_carnitine REAL NOT NULL,
        taurine               REAL NOT NULL,
        phenylalanine         REAL NOT NULL,
        l_valine              REAL NOT NULL,
        o_tyr                 REAL NOT NULL,
        carnitine             REAL NOT NULL,
        prediction            INTEGER NOT NULL,
        created_at            TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mri_prediction (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL REFERENCES users(id),
        prediction  TEXT NOT NULL,
        probability REAL NOT NULL,
        file_path   TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_blood_test_data_user ON blood_test_data(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_mri_prediction_user ON mri_prediction(user_id)",
];

#[derive(FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

#[derive(FromRow)]
struct BloodTestRow {
    id: i64,
    user_id: i64,
    histological_type: String,
    proline: f64,
    l_kynurenine: f64,
    spermidine: f64,
    amino_hippuric_acid: f64,
    palmitoyl_l_carnitine: f64,
    taurine: f64,
    phenylalanine: f64,
    l_valine: f64,
    o_tyr: f64,
    carnitine: f64,
    prediction: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<BloodTestRow> for BloodTestRecord {
    type Error = anyhow::Error;

    fn try_from(row: BloodTestRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            histological_type: row.histological_type,
            panel: BiomarkerPanel {
                proline: row.proline,
                l_kynurenine: row.l_kynurenine,
                spermidine: row.spermidine,
                amino_hippuric_acid: row.amino_hippuric_acid,
                palmitoyl_l_carnitine: row.palmitoyl_l_carnitine,
                taurine: row.taurine,
                phenylalanine: row.phenylalanine,
                l_valine: row.l_valine,
                o_tyr: row.o_tyr,
                carnitine: row.carnitine,
            },
            prediction: u8::try_from(row.prediction).with_context(|| {
                format!("blood test {} has prediction {}", row.id, row.prediction)
            })?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct MriRow {
    id: i64,
    user_id: i64,
    prediction: String,
    probability: f64,
    file_path: String,
    created_at: DateTime<Utc>,
}

impl From<MriRow> for MriRecord {
    fn from(row: MriRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            prediction: row.prediction,
            probability: row.probability,
            file_path: row.file_path,
            created_at: row.created_at,
        }
    }
}

/// One repository over a single SQLite file; implements both the user and
/// prediction repositories.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {}", url))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("could not open database {}", url))?;

        let repo = Self::new(pool);
        repo.migrate().await?;
        info!(url = url, "Database ready");
        Ok(repo)
    }

    /// A private in-memory database. The pool holds a single connection that
    /// never expires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("could not open in-memory database")?;

        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("schema migration failed")?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn save_user(&self, user: NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (first_name, last_name, email, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await;

        let result = match result {
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(DomainError::Validation(
                    "User with this email already exists".to_string(),
                )
                .into());
            }
            other => other.context("insert user failed")?,
        };

        let id = result.last_insert_rowid();
        debug!(user_id = id, "User inserted");
        Ok(User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
        })
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, password_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email failed")?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, password_hash FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id failed")?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl PredictionRepository for SqliteRepository {
    #[instrument(skip(self, record), fields(user_id = record.user_id))]
    async fn save_blood_test(&self, record: NewBloodTest) -> Result<BloodTestRecord> {
        let created_at = Utc::now();
        let p = &record.panel;
        let result = sqlx::query(
            r#"
            INSERT INTO blood_test_data
                (user_id, histological_type, proline, l_kynurenine, spermidine,
                 amino_hippuric_acid, palmitoyl_l_carnitine, taurine, phenylalanine,
                 l_valine, o_tyr, carnitine, prediction, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id)
        .bind(&record.histological_type)
        .bind(p.proline)
        .bind(p.l_kynurenine)
        .bind(p.spermidine)
        .bind(p.amino_hippuric_acid)
        .bind(p.palmitoyl_l_carnitine)
        .bind(p.taurine)
        .bind(p.phenylalanine)
        .bind(p.l_valine)
        .bind(p.o_tyr)
        .bind(p.carnitine)
        .bind(i64::from(record.prediction))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("insert blood test failed")?;

        let id = result.last_insert_rowid();
        debug!(record_id = id, "Blood test stored");
        Ok(BloodTestRecord {
            id,
            user_id: record.user_id,
            histological_type: record.histological_type,
            panel: record.panel,
            prediction: record.prediction,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn blood_tests_for_user(&self, user_id: i64) -> Result<Vec<BloodTestRecord>> {
        let rows: Vec<BloodTestRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, histological_type, proline, l_kynurenine, spermidine,
                   amino_hippuric_acid, palmitoyl_l_carnitine, taurine, phenylalanine,
                   l_valine, o_tyr, carnitine, prediction, created_at
            FROM blood_test_data
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("list blood tests failed")?;

        rows.into_iter().map(BloodTestRecord::try_from).collect()
    }

    #[instrument(skip(self, record), fields(user_id = record.user_id))]
    async fn save_mri_prediction(&self, record: NewMriPrediction) -> Result<MriRecord> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO mri_prediction (user_id, prediction, probability, file_path, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(&record.prediction)
        .bind(record.probability)
        .bind(&record.file_path)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("insert mri prediction failed")?;

        Ok(MriRecord {
            id: result.last_insert_rowid(),
            user_id: record.user_id,
            prediction: record.prediction,
            probability: record.probability,
            file_path: record.file_path,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn mri_predictions_for_user(&self, user_id: i64) -> Result<Vec<MriRecord>> {
        let rows: Vec<MriRow> = sqlx::query_as(
            "SELECT id, user_id, prediction, probability, file_path, created_at \
             FROM mri_prediction WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("list mri predictions failed")?;

        Ok(rows.into_iter().map(MriRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_round_trip_and_unique_email() {
        let repo = SqliteRepository::in_memory().await.unwrap();

        let saved = repo.save_user(new_user("grace@example.com")).await.unwrap();
        let found = repo.find_user_by_email("grace@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert_eq!(found.display_name(), "Grace Hopper");
        assert!(repo.find_user_by_id(saved.id + 100).await.unwrap().is_none());

        let err = repo.save_user(new_user("grace@example.com")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_blood_test_rows_belong_to_user() {
        let repo = SqliteRepository::in_memory().await.unwrap();
        let user = repo.save_user(new_user("owner@example.com")).await.unwrap();

        let saved = repo
            .save_blood_test(NewBloodTest {
                user_id: user.id,
                panel: BiomarkerPanel {
                    proline: 12.5,
                    carnitine: 0.75,
                    ..Default::default()
                },
                histological_type: "Adenocarcinoma".to_string(),
                prediction: 1,
            })
            .await
            .unwrap();

        let rows = repo.blood_tests_for_user(user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, saved.id);
        assert_eq!(rows[0].panel.proline, 12.5);
        assert_eq!(rows[0].panel.carnitine, 0.75);
        assert_eq!(rows[0].prediction, 1);
        assert_eq!(rows[0].histological_type, "Adenocarcinoma");
    }

    #[tokio::test]
    async fn test_foreign_key_rejects_unknown_user() {
        let repo = SqliteRepository::in_memory().await.unwrap();

        let result = repo
            .save_mri_prediction(NewMriPrediction {
                user_id: 999,
                prediction: "Normal cases".to_string(),
                probability: 0.5,
                file_path: "uploads/x.png".to_string(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mri_predictions_round_trip() {
        let repo = SqliteRepository::in_memory().await.unwrap();
        let user = repo.save_user(new_user("scan@example.com")).await.unwrap();

        repo.save_mri_prediction(NewMriPrediction {
            user_id: user.id,
            prediction: "Bengin cases".to_string(),
            probability: 0.66,
            file_path: "uploads/scan.png".to_string(),
        })
        .await
        .unwrap();

        let rows = repo.mri_predictions_for_user(user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prediction, "Bengin cases");
        assert_eq!(rows[0].file_path, "uploads/scan.png");
    }
}
