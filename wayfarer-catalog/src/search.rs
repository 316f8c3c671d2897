use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::destination::Destination;
use crate::package::{PackageType, TravelPackage};

/// Destination listing criteria. All set fields must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DestinationSearch {
    #[serde(default)]
    pub active_only: bool,
    #[serde(default)]
    pub featured_only: bool,
    pub country: Option<String>,
    pub city: Option<String>,
    /// Case-insensitive substring of name, country or city
    pub term: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl DestinationSearch {
    /// Featured listings only ever show active destinations.
    pub fn normalized(mut self) -> Self {
        if self.featured_only {
            self.active_only = true;
        }
        self
    }

    pub fn matches(&self, destination: &Destination) -> bool {
        if self.active_only && !destination.is_active {
            return false;
        }
        if self.featured_only && !destination.is_featured {
            return false;
        }
        if let Some(country) = &self.country {
            if !destination.country.eq_ignore_ascii_case(country) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !destination.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(term) = &self.term {
            let term = term.to_lowercase();
            let hit = [&destination.name, &destination.country, &destination.city]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        within(destination.price_amount, self.min_price, self.max_price)
    }
}

/// Package listing criteria. All set fields must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageSearch {
    #[serde(default)]
    pub active_only: bool,
    #[serde(default)]
    pub featured_only: bool,
    pub destination_id: Option<Uuid>,
    pub package_type: Option<PackageType>,
    /// Packages starting on or after this date
    pub starting_from: Option<NaiveDate>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// Case-insensitive substring of the package name or the destination's
    /// name or country
    pub term: Option<String>,
}

impl PackageSearch {
    /// Featured, date and price listings only ever show active packages.
    pub fn normalized(mut self) -> Self {
        if self.featured_only
            || self.starting_from.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
        {
            self.active_only = true;
        }
        self
    }

    pub fn matches(&self, package: &TravelPackage, destination: Option<&Destination>) -> bool {
        if self.active_only && !package.is_active {
            return false;
        }
        if self.featured_only && !package.is_featured {
            return false;
        }
        if self.destination_id.is_some_and(|id| id != package.destination_id) {
            return false;
        }
        if self.package_type.is_some_and(|t| t != package.package_type) {
            return false;
        }
        if self.starting_from.is_some_and(|from| package.start_date < from) {
            return false;
        }
        if let Some(term) = &self.term {
            let term = term.to_lowercase();
            let mut fields = vec![package.name.to_lowercase()];
            if let Some(d) = destination {
                fields.push(d.name.to_lowercase());
                fields.push(d.country.to_lowercase());
            }
            if !fields.iter().any(|f| f.contains(&term)) {
                return false;
            }
        }
        within(package.unit_price_amount, self.min_price, self.max_price)
    }
}

fn within(value: i64, min: Option<i64>, max: Option<i64>) -> bool {
    min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
}
