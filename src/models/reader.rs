//! Reader (library member) model and related types

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidateEmail};

use crate::error::{AppError, AppResult};

use super::{
    genre::Genre,
    photo::Photo,
    validation::non_blank,
    version::{check_version, INITIAL_VERSION},
};

static PHONE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[29][0-9]{8}$").unwrap());

/// Reader number, `{year}/{sequence}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderNumber {
    year: i32,
    sequence: i64,
}

impl ReaderNumber {
    pub fn new(year: i32, sequence: i64) -> AppResult<Self> {
        if sequence < 1 {
            return Err(AppError::invalid("Reader sequence must be positive"));
        }
        Ok(Self { year, sequence })
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        let invalid = || AppError::invalid(format!("Invalid reader number: {}", raw));
        let (year, sequence) = raw.split_once('/').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let sequence = sequence.parse().map_err(|_| invalid())?;
        Self::new(year, sequence)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }
}

impl fmt::Display for ReaderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.sequence)
    }
}

impl Serialize for ReaderNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Age requirement applied when a reader registers
#[derive(Debug, Clone, Copy)]
pub struct AgePolicy {
    pub minimum_age: u32,
    pub today: NaiveDate,
}

impl AgePolicy {
    fn check(&self, birth_date: NaiveDate) -> AppResult<()> {
        match self.today.years_since(birth_date) {
            Some(age) if age >= self.minimum_age => Ok(()),
            Some(_) => Err(AppError::invalid(format!(
                "Reader must be at least {} years old",
                self.minimum_age
            ))),
            None => Err(AppError::invalid("Birth date cannot be in the future")),
        }
    }
}

/// Validated input for a new reader
#[derive(Debug, Clone)]
pub struct NewReader<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub birth_date: NaiveDate,
    pub phone_number: &'a str,
    pub gdpr_consent: bool,
    pub marketing_consent: bool,
    pub third_party_sharing_consent: bool,
    pub interests: Vec<Genre>,
    pub photo_uri: Option<&'a str>,
}

/// Registered library reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Reader {
    #[schema(value_type = String, example = "2024/1")]
    reader_number: ReaderNumber,
    name: String,
    email: String,
    birth_date: NaiveDate,
    phone_number: String,
    gdpr_consent: bool,
    marketing_consent: bool,
    third_party_sharing_consent: bool,
    interests: Vec<Genre>,
    photo: Option<Photo>,
    version: i64,
    #[serde(skip)]
    persisted: bool,
}

impl Reader {
    pub const NAME_MAX_LENGTH: usize = 150;

    pub fn new(reader_number: ReaderNumber, data: NewReader<'_>, age_policy: AgePolicy) -> AppResult<Self> {
        let name = non_blank("Name", data.name, Self::NAME_MAX_LENGTH)?;
        let email = valid_email(data.email)?;
        age_policy.check(data.birth_date)?;
        let phone_number = valid_phone_number(data.phone_number)?;
        if !data.gdpr_consent {
            return Err(AppError::invalid("Readers must consent to GDPR data processing"));
        }
        let photo = Photo::from_uri(data.photo_uri)?;

        Ok(Self {
            reader_number,
            name,
            email,
            birth_date: data.birth_date,
            phone_number,
            gdpr_consent: true,
            marketing_consent: data.marketing_consent,
            third_party_sharing_consent: data.third_party_sharing_consent,
            interests: data.interests,
            photo,
            version: INITIAL_VERSION,
            persisted: false,
        })
    }

    /// Rebuild a reader read back from storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        reader_number: ReaderNumber,
        name: String,
        email: String,
        birth_date: NaiveDate,
        phone_number: String,
        consents: (bool, bool, bool),
        interests: Vec<Genre>,
        photo_file: Option<String>,
        version: i64,
    ) -> Self {
        let (gdpr_consent, marketing_consent, third_party_sharing_consent) = consents;
        Self {
            reader_number,
            name,
            email,
            birth_date,
            phone_number,
            gdpr_consent,
            marketing_consent,
            third_party_sharing_consent,
            interests,
            photo: photo_file.map(Photo::from_stored),
            version,
            persisted: true,
        }
    }

    pub(crate) fn saved(mut self, version: i64) -> Self {
        self.version = version;
        self.persisted = true;
        self
    }

    pub fn reader_number(&self) -> ReaderNumber {
        self.reader_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn gdpr_consent(&self) -> bool {
        self.gdpr_consent
    }

    pub fn marketing_consent(&self) -> bool {
        self.marketing_consent
    }

    pub fn third_party_sharing_consent(&self) -> bool {
        self.third_party_sharing_consent
    }

    pub fn interests(&self) -> &[Genre] {
        &self.interests
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn apply_patch(&mut self, expected_version: i64, patch: ReaderPatch) -> AppResult<()> {
        check_version(expected_version, self.version)?;

        let name = patch
            .name
            .map(|name| non_blank("Name", &name, Self::NAME_MAX_LENGTH))
            .transpose()?;
        let email = patch.email.map(|email| valid_email(&email)).transpose()?;
        let phone_number = patch
            .phone_number
            .map(|phone| valid_phone_number(&phone))
            .transpose()?;
        let photo = Photo::from_uri(patch.photo_uri.as_deref())?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone_number) = phone_number {
            self.phone_number = phone_number;
        }
        if let Some(consent) = patch.marketing_consent {
            self.marketing_consent = consent;
        }
        if let Some(consent) = patch.third_party_sharing_consent {
            self.third_party_sharing_consent = consent;
        }
        if let Some(interests) = patch.interests {
            self.interests = interests;
        }
        if let Some(photo) = photo {
            self.photo = Some(photo);
        }
        Ok(())
    }

    pub fn remove_photo(&mut self, expected_version: i64) -> AppResult<()> {
        check_version(expected_version, self.version)?;
        self.photo = None;
        Ok(())
    }
}

fn valid_email(email: &str) -> AppResult<String> {
    let email = email.trim();
    if !email.validate_email() {
        return Err(AppError::invalid(format!("Invalid email address: {}", email)));
    }
    Ok(email.to_lowercase())
}

fn valid_phone_number(phone: &str) -> AppResult<String> {
    let digits: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if !PHONE_NUMBER.is_match(&digits) {
        return Err(AppError::invalid(
            "Phone number must have 9 digits and start with 2 or 9",
        ));
    }
    Ok(digits)
}

/// Resolved partial update for a reader; `None` leaves a field unchanged.
/// Birth date and GDPR consent cannot be changed after registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub marketing_consent: Option<bool>,
    pub third_party_sharing_consent: Option<bool>,
    pub interests: Option<Vec<Genre>>,
    pub photo_uri: Option<String>,
}

/// Create reader request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateReaderRequest {
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub gdpr_consent: Option<bool>,
    #[serde(default)]
    pub marketing_consent: bool,
    #[serde(default)]
    pub third_party_sharing_consent: bool,
    /// Genre names
    pub interests: Option<Vec<String>>,
    pub photo_uri: Option<String>,
}

/// Update reader request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReaderRequest {
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub marketing_consent: Option<bool>,
    pub third_party_sharing_consent: Option<bool>,
    /// Replacement genre names
    pub interests: Option<Vec<String>>,
    pub photo_uri: Option<String>,
}

/// Reader lookup
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReaderFilter {
    /// Name prefix
    pub name: Option<String>,
    /// Exact phone number, takes precedence over `name`
    pub phone: Option<String>,
}
