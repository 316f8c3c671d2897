use chrono::{Days, NaiveDate};
use tracing::info;
use uuid::Uuid;
use wayfarer_catalog::{
    CatalogRepository, Destination, DestinationDraft, DestinationSearch, PackageDraft, PackageType,
    TravelPackage,
};
use wayfarer_core::StoreResult;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub destinations: usize,
    pub packages: usize,
}

struct SampleDestination {
    name: &'static str,
    country: &'static str,
    city: &'static str,
    price_amount: i64,
    best_time_to_visit: &'static str,
    climate: &'static str,
    popular_attractions: &'static str,
    is_featured: bool,
}

struct SamplePackage {
    destination: &'static str,
    name: &'static str,
    description: &'static str,
    starts_in_days: u64,
    nights: u64,
    unit_price_amount: i64,
    max_participants: u32,
    package_type: PackageType,
    includes: &'static str,
    is_featured: bool,
}

const DESTINATIONS: &[SampleDestination] = &[
    SampleDestination {
        name: "Paris",
        country: "France",
        city: "Paris",
        price_amount: 89_900,
        best_time_to_visit: "April to June, September to November",
        climate: "Temperate",
        popular_attractions: "Eiffel Tower, Louvre Museum, Notre-Dame Cathedral",
        is_featured: true,
    },
    SampleDestination {
        name: "Tokyo",
        country: "Japan",
        city: "Tokyo",
        price_amount: 129_900,
        best_time_to_visit: "March to May, September to November",
        climate: "Humid subtropical",
        popular_attractions: "Senso-ji Temple, Shibuya Crossing, Meiji Shrine",
        is_featured: true,
    },
    SampleDestination {
        name: "Bali",
        country: "Indonesia",
        city: "Denpasar",
        price_amount: 69_900,
        best_time_to_visit: "April to October",
        climate: "Tropical",
        popular_attractions: "Ubud Rice Terraces, Tanah Lot Temple, Mount Batur",
        is_featured: true,
    },
    SampleDestination {
        name: "New York City",
        country: "USA",
        city: "New York",
        price_amount: 119_900,
        best_time_to_visit: "April to June, September to November",
        climate: "Humid subtropical",
        popular_attractions: "Statue of Liberty, Central Park, Broadway",
        is_featured: true,
    },
    SampleDestination {
        name: "London",
        country: "United Kingdom",
        city: "London",
        price_amount: 109_900,
        best_time_to_visit: "May to September",
        climate: "Temperate oceanic",
        popular_attractions: "Tower of London, British Museum, London Eye",
        is_featured: false,
    },
];

const PACKAGES: &[SamplePackage] = &[
    SamplePackage {
        destination: "Paris",
        name: "Paris Romance Package",
        description: "Five days in the City of Light for couples.",
        starts_in_days: 30,
        nights: 5,
        unit_price_amount: 129_900,
        max_participants: 20,
        package_type: PackageType::Luxury,
        includes: "Hotel, breakfast, city tour, Seine river cruise, museum passes",
        is_featured: true,
    },
    SamplePackage {
        destination: "Paris",
        name: "Paris Budget Explorer",
        description: "Three affordable days exploring Paris.",
        starts_in_days: 45,
        nights: 3,
        unit_price_amount: 59_900,
        max_participants: 30,
        package_type: PackageType::Budget,
        includes: "Hostel, breakfast, walking tour",
        is_featured: false,
    },
    SamplePackage {
        destination: "Tokyo",
        name: "Tokyo Cultural Experience",
        description: "A week of temples, food and modern Tokyo.",
        starts_in_days: 60,
        nights: 7,
        unit_price_amount: 189_900,
        max_participants: 15,
        package_type: PackageType::Premium,
        includes: "Hotel, breakfast, JR Pass, temple visits",
        is_featured: true,
    },
    SamplePackage {
        destination: "Bali",
        name: "Bali Beach Paradise",
        description: "Six relaxing days on Bali's beaches.",
        starts_in_days: 20,
        nights: 6,
        unit_price_amount: 99_900,
        max_participants: 25,
        package_type: PackageType::Standard,
        includes: "Resort, breakfast, airport transfers, temple tour",
        is_featured: true,
    },
    SamplePackage {
        destination: "New York City",
        name: "New York City Explorer",
        description: "Four days in the city that never sleeps.",
        starts_in_days: 40,
        nights: 4,
        unit_price_amount: 149_900,
        max_participants: 20,
        package_type: PackageType::Standard,
        includes: "Hotel, breakfast, subway pass, Broadway show ticket",
        is_featured: false,
    },
];

/// Insert the sample catalog when the repository has no destinations yet.
/// Package dates are relative to `today`.
pub async fn seed_sample_catalog(
    repo: &dyn CatalogRepository,
    today: NaiveDate,
) -> StoreResult<SeedSummary> {
    if !repo
        .list_destinations(&DestinationSearch::default())
        .await?
        .is_empty()
    {
        info!("Catalog already populated, skipping sample data");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();
    let mut ids: Vec<(&str, Uuid)> = Vec::new();

    for sample in DESTINATIONS {
        let mut draft = DestinationDraft::new(sample.name, sample.country, sample.city, sample.price_amount);
        draft.best_time_to_visit = Some(sample.best_time_to_visit.to_string());
        draft.climate = Some(sample.climate.to_string());
        draft.popular_attractions = Some(sample.popular_attractions.to_string());
        draft.is_featured = sample.is_featured;

        let destination = Destination::from_draft(draft);
        repo.insert_destination(&destination).await?;
        ids.push((sample.name, destination.id));
        summary.destinations += 1;
    }

    for sample in PACKAGES {
        let Some(&(_, destination_id)) = ids.iter().find(|(name, _)| *name == sample.destination) else {
            continue;
        };
        let start = today + Days::new(sample.starts_in_days);
        let mut draft = PackageDraft::new(
            sample.name,
            destination_id,
            start,
            start + Days::new(sample.nights),
            sample.unit_price_amount,
            sample.max_participants,
        );
        draft.description = Some(sample.description.to_string());
        draft.package_type = sample.package_type;
        draft.includes = Some(sample.includes.to_string());
        draft.excludes = Some("Airfare, personal expenses".to_string());
        draft.is_featured = sample.is_featured;

        repo.insert_package(&TravelPackage::from_draft(draft)).await?;
        summary.packages += 1;
    }

    info!(
        "Seeded {} destinations and {} packages",
        summary.destinations, summary.packages
    );
    Ok(summary)
}
