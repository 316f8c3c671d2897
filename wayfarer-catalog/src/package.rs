use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use wayfarer_core::PackageTerms;

use crate::{default_currency, default_true, require, CatalogError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageType {
    Budget,
    #[default]
    Standard,
    Luxury,
    Premium,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Budget => "BUDGET",
            PackageType::Standard => "STANDARD",
            PackageType::Luxury => "LUXURY",
            PackageType::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUDGET" => Ok(PackageType::Budget),
            "STANDARD" => Ok(PackageType::Standard),
            "LUXURY" => Ok(PackageType::Luxury),
            "PREMIUM" => Ok(PackageType::Premium),
            other => Err(CatalogError::Validation(format!("Unknown package type: {}", other))),
        }
    }
}

/// A sellable travel offering with a date range, unit price and capacity.
///
/// There is deliberately no participant counter here: how much of
/// `max_participants` is taken is answered by the capacity ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TravelPackage {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub destination_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub unit_price_amount: i64,
    pub currency: String,
    pub max_participants: u32,
    pub package_type: PackageType,
    pub includes: Option<String>,
    pub excludes: Option<String>,
    pub itinerary: Option<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageDraft {
    pub name: String,
    pub description: Option<String>,
    pub destination_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub unit_price_amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub max_participants: u32,
    #[serde(default)]
    pub package_type: PackageType,
    pub includes: Option<String>,
    pub excludes: Option<String>,
    pub itinerary: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PackageDraft {
    pub fn new(
        name: &str,
        destination_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        unit_price_amount: i64,
        max_participants: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            destination_id,
            start_date,
            end_date,
            unit_price_amount,
            currency: default_currency(),
            max_participants,
            package_type: PackageType::default(),
            includes: None,
            excludes: None,
            itinerary: None,
            is_featured: false,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        require(&self.name, "Package name")?;
        require(&self.currency, "Currency")?;
        if self.start_date > self.end_date {
            return Err(CatalogError::Validation(
                "Start date must not be after end date".to_string(),
            ));
        }
        if self.unit_price_amount <= 0 {
            return Err(CatalogError::Validation("Price must be positive".to_string()));
        }
        if self.max_participants == 0 {
            return Err(CatalogError::Validation(
                "Maximum participants must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl TravelPackage {
    pub fn from_draft(draft: PackageDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            destination_id: draft.destination_id,
            start_date: draft.start_date,
            end_date: draft.end_date,
            unit_price_amount: draft.unit_price_amount,
            currency: draft.currency,
            max_participants: draft.max_participants,
            package_type: draft.package_type,
            includes: draft.includes,
            excludes: draft.excludes,
            itinerary: draft.itinerary,
            is_featured: draft.is_featured,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field. Lowering `max_participants` below what
    /// is already booked only blocks further admission.
    pub fn apply(&mut self, draft: PackageDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.destination_id = draft.destination_id;
        self.start_date = draft.start_date;
        self.end_date = draft.end_date;
        self.unit_price_amount = draft.unit_price_amount;
        self.currency = draft.currency;
        self.max_participants = draft.max_participants;
        self.package_type = draft.package_type;
        self.includes = draft.includes;
        self.excludes = draft.excludes;
        self.itinerary = draft.itinerary;
        self.is_featured = draft.is_featured;
        self.is_active = draft.is_active;
        self.touch();
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn terms(&self) -> PackageTerms {
        PackageTerms {
            id: self.id,
            max_participants: self.max_participants,
            unit_price_amount: self.unit_price_amount,
            currency: self.currency.clone(),
            is_active: self.is_active,
        }
    }
}
