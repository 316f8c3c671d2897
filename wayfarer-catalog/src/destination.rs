use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{default_currency, default_true, require, CatalogError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Destination {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub city: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price_amount: i64,
    pub currency: String,
    pub best_time_to_visit: Option<String>,
    pub climate: Option<String>,
    pub popular_attractions: Option<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied destination fields, used for both create and update
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationDraft {
    pub name: String,
    pub country: String,
    pub city: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price_amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub best_time_to_visit: Option<String>,
    pub climate: Option<String>,
    pub popular_attractions: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl DestinationDraft {
    pub fn new(name: &str, country: &str, city: &str, price_amount: i64) -> Self {
        Self {
            name: name.to_string(),
            country: country.to_string(),
            city: city.to_string(),
            description: None,
            image_url: None,
            price_amount,
            currency: default_currency(),
            best_time_to_visit: None,
            climate: None,
            popular_attractions: None,
            is_featured: false,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        require(&self.name, "Destination name")?;
        require(&self.country, "Country")?;
        require(&self.city, "City")?;
        require(&self.currency, "Currency")?;
        if self.price_amount <= 0 {
            return Err(CatalogError::Validation("Price must be positive".to_string()));
        }
        Ok(())
    }
}

impl Destination {
    pub fn from_draft(draft: DestinationDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            country: draft.country,
            city: draft.city,
            description: draft.description,
            image_url: draft.image_url,
            price_amount: draft.price_amount,
            currency: draft.currency,
            best_time_to_visit: draft.best_time_to_visit,
            climate: draft.climate,
            popular_attractions: draft.popular_attractions,
            is_featured: draft.is_featured,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field with the draft's.
    pub fn apply(&mut self, draft: DestinationDraft) {
        self.name = draft.name;
        self.country = draft.country;
        self.city = draft.city;
        self.description = draft.description;
        self.image_url = draft.image_url;
        self.price_amount = draft.price_amount;
        self.currency = draft.currency;
        self.best_time_to_visit = draft.best_time_to_visit;
        self.climate = draft.climate;
        self.popular_attractions = draft.popular_attractions;
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults_from_json() {
        let json = r#"{ "name": "Lisbon", "country": "Portugal", "city": "Lisbon", "price_amount": 90000 }"#;
        let draft: DestinationDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.currency, "USD");
        assert!(draft.is_active);
        assert!(!draft.is_featured);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = DestinationDraft::new("Lisbon", "Portugal", " ", 100);
        assert!(matches!(draft.validate(), Err(CatalogError::Validation(_))));

        draft.city = "Lisbon".to_string();
        draft.price_amount = 0;
        assert!(matches!(draft.validate(), Err(CatalogError::Validation(_))));
    }
}
