//! Reader registration and maintenance

use chrono::{Datelike, NaiveDate, Utc};
use validator::Validate;

use crate::{
    config::ReadersConfig,
    error::{AppError, AppResult},
    models::{
        reader::{AgePolicy, CreateReaderRequest, NewReader, UpdateReaderRequest},
        validation::require,
        version::check_version,
        Reader, ReaderNumber, ReaderPatch,
    },
    repository::{escape_like, Repository},
};

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
    config: ReadersConfig,
}

impl ReadersService {
    pub fn new(repository: Repository, config: ReadersConfig) -> Self {
        Self { repository, config }
    }

    pub async fn create(&self, request: CreateReaderRequest) -> AppResult<Reader> {
        self.register(request, Utc::now().date_naive()).await
    }

    /// Register a reader as of `today`. The reader number is the next free
    /// sequence within the current year.
    pub async fn register(&self, request: CreateReaderRequest, today: NaiveDate) -> AppResult<Reader> {
        request.validate()?;

        let name = require("Name", request.name)?;
        let email = require("Email", request.email)?;
        let birth_date = require("Birth date", request.birth_date)?;
        let phone_number = require("Phone number", request.phone_number)?;
        let gdpr_consent = require("GDPR consent", request.gdpr_consent)?;
        let interests = self
            .repository
            .resolve_genres(&request.interests.unwrap_or_default())
            .await?;

        let year = today.year();
        let sequence = self.repository.readers.count_by_year(year).await? + 1;

        let reader = Reader::new(
            ReaderNumber::new(year, sequence)?,
            NewReader {
                name: &name,
                email: &email,
                birth_date,
                phone_number: &phone_number,
                gdpr_consent,
                marketing_consent: request.marketing_consent,
                third_party_sharing_consent: request.third_party_sharing_consent,
                interests,
                photo_uri: request.photo_uri.as_deref(),
            },
            AgePolicy {
                minimum_age: self.config.minimum_age,
                today,
            },
        )?;

        if self.repository.readers.exists_by_email(reader.email()).await? {
            return Err(AppError::Conflict(format!("Email {} is already registered", reader.email())));
        }

        let saved = self.repository.readers.save(&reader).await?;
        tracing::info!(reader_number = %saved.reader_number(), "Reader registered");
        Ok(saved)
    }

    pub async fn find_by_reader_number(&self, reader_number: ReaderNumber) -> AppResult<Reader> {
        self.repository
            .readers
            .find_by_reader_number(reader_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Reader {} not found", reader_number)))
    }

    pub async fn find_by_phone_number(&self, phone_number: &str) -> AppResult<Vec<Reader>> {
        let digits: String = phone_number.chars().filter(|c| !c.is_whitespace()).collect();
        self.repository.readers.find_by_phone_number(&digits).await
    }

    /// Readers whose name starts with `name`, case-insensitive
    pub async fn find_by_name(&self, name: &str) -> AppResult<Vec<Reader>> {
        let pattern = format!("{}%", escape_like(name.trim()));
        self.repository.readers.find_by_name(&pattern).await
    }

    pub async fn partial_update(
        &self,
        reader_number: ReaderNumber,
        request: UpdateReaderRequest,
        expected_version: i64,
    ) -> AppResult<Reader> {
        request.validate()?;
        let mut reader = self.find_by_reader_number(reader_number).await?;
        check_version(expected_version, reader.version())?;

        if let Some(email) = &request.email {
            let email = email.trim().to_lowercase();
            if email != reader.email() && self.repository.readers.exists_by_email(&email).await? {
                return Err(AppError::Conflict(format!("Email {} is already registered", email)));
            }
        }

        let interests = match request.interests {
            Some(names) => Some(self.repository.resolve_genres(&names).await?),
            None => None,
        };

        reader.apply_patch(
            expected_version,
            ReaderPatch {
                name: request.name,
                email: request.email,
                phone_number: request.phone_number,
                marketing_consent: request.marketing_consent,
                third_party_sharing_consent: request.third_party_sharing_consent,
                interests,
                photo_uri: request.photo_uri,
            },
        )?;

        let saved = self.repository.readers.save(&reader).await?;
        tracing::info!(%reader_number, version = saved.version(), "Reader updated");
        Ok(saved)
    }

    pub async fn remove_photo(&self, reader_number: ReaderNumber, expected_version: i64) -> AppResult<Reader> {
        let mut reader = self.find_by_reader_number(reader_number).await?;
        if reader.photo().is_none() {
            return Err(AppError::not_found(format!("Reader {} has no photo", reader_number)));
        }

        reader.remove_photo(expected_version)?;
        let saved = self.repository.readers.save(&reader).await?;
        tracing::info!(%reader_number, "Reader photo removed");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;
    use crate::repository::{
        MockAuthorRepository, MockBookRepository, MockGenreRepository, MockReaderRepository,
    };
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn service(readers: MockReaderRepository, genres: MockGenreRepository) -> ReadersService {
        ReadersService::new(
            Repository {
                books: Arc::new(MockBookRepository::new()),
                authors: Arc::new(MockAuthorRepository::new()),
                genres: Arc::new(genres),
                readers: Arc::new(readers),
            },
            ReadersConfig { minimum_age: 12 },
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn request() -> CreateReaderRequest {
        CreateReaderRequest {
            name: Some("Manuel Sarapinto".into()),
            email: Some("manuel@gmail.com".into()),
            birth_date: NaiveDate::from_ymd_opt(2000, 1, 1),
            phone_number: Some("912345678".into()),
            gdpr_consent: Some(true),
            interests: Some(vec!["Fantasia".into()]),
            ..Default::default()
        }
    }

    fn stored() -> Reader {
        Reader::restore(
            ReaderNumber::new(2024, 1).unwrap(),
            "Manuel Sarapinto".into(),
            "manuel@gmail.com".into(),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            "912345678".into(),
            (true, false, false),
            vec![],
            None,
            1,
        )
    }

    #[tokio::test]
    async fn test_register_assigns_next_number() {
        let mut readers = MockReaderRepository::new();
        readers.expect_count_by_year().with(eq(2024)).returning(|_| Ok(4));
        readers.expect_exists_by_email().returning(|_| Ok(false));
        readers
            .expect_save()
            .times(1)
            .returning(|reader| Ok(reader.clone().saved(1)));
        let mut genres = MockGenreRepository::new();
        genres
            .expect_find_by_name()
            .returning(|name| Ok(Some(Genre::new(name).unwrap())));

        let reader = service(readers, genres).register(request(), today()).await.unwrap();

        assert_eq!(reader.reader_number().to_string(), "2024/5");
        assert_eq!(reader.interests().len(), 1);
        assert!(reader.is_persisted());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut readers = MockReaderRepository::new();
        readers.expect_count_by_year().returning(|_| Ok(0));
        readers.expect_exists_by_email().returning(|_| Ok(true));
        readers.expect_save().never();
        let mut genres = MockGenreRepository::new();
        genres
            .expect_find_by_name()
            .returning(|name| Ok(Some(Genre::new(name).unwrap())));

        let err = service(readers, genres).register(request(), today()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_requires_gdpr_consent() {
        let request = CreateReaderRequest {
            gdpr_consent: None,
            ..request()
        };
        let err = service(MockReaderRepository::new(), MockGenreRepository::new())
            .register(request, today())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: GDPR consent cannot be null");
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_email() {
        let request = CreateReaderRequest {
            email: Some("not-an-email".into()),
            ..request()
        };
        let err = service(MockReaderRepository::new(), MockGenreRepository::new())
            .register(request, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_register_too_young() {
        let mut readers = MockReaderRepository::new();
        readers.expect_count_by_year().returning(|_| Ok(0));
        readers.expect_save().never();
        let mut genres = MockGenreRepository::new();
        genres
            .expect_find_by_name()
            .returning(|name| Ok(Some(Genre::new(name).unwrap())));

        let request = CreateReaderRequest {
            birth_date: NaiveDate::from_ymd_opt(2015, 1, 1),
            ..request()
        };
        let err = service(readers, genres).register(request, today()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_partial_update_email_taken() {
        let mut readers = MockReaderRepository::new();
        readers.expect_find_by_reader_number().returning(|_| Ok(Some(stored())));
        readers
            .expect_exists_by_email()
            .withf(|email| email == "other@gmail.com")
            .returning(|_| Ok(true));
        readers.expect_save().never();

        let request = UpdateReaderRequest {
            email: Some("Other@Gmail.com".into()),
            ..Default::default()
        };
        let err = service(readers, MockGenreRepository::new())
            .partial_update(ReaderNumber::new(2024, 1).unwrap(), request, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_partial_update_stale_version_wins_over_taken_email() {
        let mut readers = MockReaderRepository::new();
        readers.expect_find_by_reader_number().returning(|_| Ok(Some(stored())));
        readers.expect_exists_by_email().never();
        readers.expect_save().never();

        let request = UpdateReaderRequest {
            email: Some("other@gmail.com".into()),
            ..Default::default()
        };
        let err = service(readers, MockGenreRepository::new())
            .partial_update(ReaderNumber::new(2024, 1).unwrap(), request, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleVersion { expected: 3, actual: 1 }));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let mut readers = MockReaderRepository::new();
        readers.expect_find_by_reader_number().returning(|_| Ok(Some(stored())));
        readers
            .expect_save()
            .withf(|reader| reader.phone_number() == "223456789" && reader.marketing_consent())
            .times(1)
            .returning(|reader| Ok(reader.clone().saved(2)));

        let request = UpdateReaderRequest {
            phone_number: Some("223456789".into()),
            marketing_consent: Some(true),
            ..Default::default()
        };
        let reader = service(readers, MockGenreRepository::new())
            .partial_update(ReaderNumber::new(2024, 1).unwrap(), request, 1)
            .await
            .unwrap();
        assert_eq!(reader.version(), 2);
    }

    #[tokio::test]
    async fn test_find_by_reader_number_not_found() {
        let mut readers = MockReaderRepository::new();
        readers.expect_find_by_reader_number().returning(|_| Ok(None));

        let err = service(readers, MockGenreRepository::new())
            .find_by_reader_number(ReaderNumber::new(2024, 9).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_photo_without_photo() {
        let mut readers = MockReaderRepository::new();
        readers.expect_find_by_reader_number().returning(|_| Ok(Some(stored())));
        readers.expect_save().never();

        let err = service(readers, MockGenreRepository::new())
            .remove_photo(ReaderNumber::new(2024, 1).unwrap(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
