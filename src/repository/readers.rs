//! Readers repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, Pool, Postgres};

use super::{conflict_on_duplicate, stale_or_missing, ReaderRepository};
use crate::{
    error::{AppError, AppResult},
    models::{Genre, Reader, ReaderNumber},
};

#[derive(Debug, FromRow)]
struct ReaderRow {
    year: i32,
    sequence: i64,
    name: String,
    email: String,
    birth_date: NaiveDate,
    phone_number: String,
    gdpr_consent: bool,
    marketing_consent: bool,
    third_party_sharing_consent: bool,
    photo_file: Option<String>,
    version: i64,
}

#[derive(Clone)]
pub struct PgReadersRepository {
    pool: Pool<Postgres>,
}

impl PgReadersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn load(&self, row: ReaderRow) -> AppResult<Reader> {
        let interests: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT genre FROM reader_interests
            WHERE year = $1 AND sequence = $2
            ORDER BY position
            "#,
        )
        .bind(row.year)
        .bind(row.sequence)
        .fetch_all(&self.pool)
        .await?;

        let reader_number = ReaderNumber::new(row.year, row.sequence)
            .map_err(|e| AppError::Internal(format!("Corrupt reader row: {}", e)))?;

        Ok(Reader::restore(
            reader_number,
            row.name,
            row.email,
            row.birth_date,
            row.phone_number,
            (row.gdpr_consent, row.marketing_consent, row.third_party_sharing_consent),
            interests.into_iter().map(Genre::from_stored).collect(),
            row.photo_file,
            row.version,
        ))
    }

    async fn load_all(&self, rows: Vec<ReaderRow>) -> AppResult<Vec<Reader>> {
        let mut readers = Vec::with_capacity(rows.len());
        for row in rows {
            readers.push(self.load(row).await?);
        }
        Ok(readers)
    }

    async fn current_version(&self, reader_number: ReaderNumber) -> AppResult<Option<i64>> {
        let version = sqlx::query_scalar("SELECT version FROM readers WHERE year = $1 AND sequence = $2")
            .bind(reader_number.year())
            .bind(reader_number.sequence())
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }
}

#[async_trait]
impl ReaderRepository for PgReadersRepository {
    async fn find_by_reader_number(&self, reader_number: ReaderNumber) -> AppResult<Option<Reader>> {
        let row = sqlx::query_as::<_, ReaderRow>(
            "SELECT * FROM readers WHERE year = $1 AND sequence = $2",
        )
        .bind(reader_number.year())
        .bind(reader_number.sequence())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM readers WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> AppResult<Vec<Reader>> {
        let rows = sqlx::query_as::<_, ReaderRow>(
            "SELECT * FROM readers WHERE phone_number = $1 ORDER BY year, sequence",
        )
        .bind(phone_number)
        .fetch_all(&self.pool)
        .await?;
        self.load_all(rows).await
    }

    async fn find_by_name(&self, pattern: &str) -> AppResult<Vec<Reader>> {
        let rows = sqlx::query_as::<_, ReaderRow>(
            "SELECT * FROM readers WHERE name ILIKE $1 ORDER BY name, year, sequence",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        self.load_all(rows).await
    }

    async fn count_by_year(&self, year: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers WHERE year = $1")
            .bind(year)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn save(&self, reader: &Reader) -> AppResult<Reader> {
        let number = reader.reader_number();
        let photo_file = reader.photo().map(|p| p.photo_file());
        let mut tx = self.pool.begin().await?;

        let version = if reader.is_persisted() {
            let updated: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE readers
                SET name = $3, email = $4, phone_number = $5, marketing_consent = $6,
                    third_party_sharing_consent = $7, photo_file = $8, version = version + 1
                WHERE year = $1 AND sequence = $2 AND version = $9
                RETURNING version
                "#,
            )
            .bind(number.year())
            .bind(number.sequence())
            .bind(reader.name())
            .bind(reader.email())
            .bind(reader.phone_number())
            .bind(reader.marketing_consent())
            .bind(reader.third_party_sharing_consent())
            .bind(photo_file)
            .bind(reader.version())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| conflict_on_duplicate(e, || format!("Email {} is already registered", reader.email())))?;

            match updated {
                Some(version) => version,
                None => {
                    tx.rollback().await?;
                    return Err(stale_or_missing(
                        reader.version(),
                        self.current_version(number).await?,
                        || format!("Reader {} not found", number),
                    ));
                }
            }
        } else {
            sqlx::query(
                r#"
                INSERT INTO readers (year, sequence, name, email, birth_date, phone_number,
                                     gdpr_consent, marketing_consent, third_party_sharing_consent,
                                     photo_file, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(number.year())
            .bind(number.sequence())
            .bind(reader.name())
            .bind(reader.email())
            .bind(reader.birth_date())
            .bind(reader.phone_number())
            .bind(reader.gdpr_consent())
            .bind(reader.marketing_consent())
            .bind(reader.third_party_sharing_consent())
            .bind(photo_file)
            .bind(reader.version())
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_duplicate(e, || format!("Reader {} or its email already exists", number)))?;
            reader.version()
        };

        sqlx::query("DELETE FROM reader_interests WHERE year = $1 AND sequence = $2")
            .bind(number.year())
            .bind(number.sequence())
            .execute(&mut *tx)
            .await?;

        for (position, genre) in reader.interests().iter().enumerate() {
            sqlx::query(
                "INSERT INTO reader_interests (year, sequence, position, genre) VALUES ($1, $2, $3, $4)",
            )
            .bind(number.year())
            .bind(number.sequence())
            .bind(position as i32)
            .bind(genre.name())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(reader.clone().saved(version))
    }
}
