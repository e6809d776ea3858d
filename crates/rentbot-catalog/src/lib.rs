use chrono::NaiveDate;
use rentbot_contracts::{House, SearchSlots, SlotValue};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("open catalog failed: {0}")]
    Open(String),
    #[error("read catalog failed: {0}")]
    Read(String),
    #[error("catalog query failed: {0}")]
    Query(String),
}

pub trait HouseCatalog {
    /// Houses matching the search slots, in catalog insertion order.
    fn query(&self, slots: &SearchSlots) -> Result<Vec<House>, CatalogError>;
}

impl<T: HouseCatalog + ?Sized> HouseCatalog for &T {
    fn query(&self, slots: &SearchSlots) -> Result<Vec<House>, CatalogError> {
        (**self).query(slots)
    }
}

impl<T: HouseCatalog + ?Sized> HouseCatalog for Arc<T> {
    fn query(&self, slots: &SearchSlots) -> Result<Vec<House>, CatalogError> {
        (**self).query(slots)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub min_bhk: i64,
    pub min_size: i64,
    pub max_rent: Option<i64>,
    pub location: String,
    pub city: String,
    pub furnished: String,
}

impl SearchCriteria {
    pub fn from_slots(slots: &SearchSlots) -> Self {
        Self {
            min_bhk: slots.house_bhk.integers().into_iter().min().unwrap_or(0),
            min_size: slots.house_size.integers().into_iter().min().unwrap_or(0),
            max_rent: slots.house_rent.integers().into_iter().max(),
            location: lowered(&slots.house_location),
            city: lowered(&slots.house_city),
            furnished: lowered(&slots.house_furnished),
        }
    }

    pub fn matches(&self, house: &House, match_locality: bool) -> bool {
        house.bhk >= self.min_bhk
            && house.size >= self.min_size
            && self.max_rent.map(|max| house.rent <= max).unwrap_or(true)
            && house.city.to_lowercase().contains(&self.city)
            && house
                .furnishing_status
                .to_lowercase()
                .contains(&self.furnished)
            && (!match_locality || house.area_locality.to_lowercase().contains(&self.location))
    }
}

fn lowered(value: &SlotValue) -> String {
    match value {
        SlotValue::Null => String::new(),
        other => other.to_string().trim().to_lowercase(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    houses: Vec<House>,
    match_locality: bool,
}

impl InMemoryCatalog {
    pub fn new(houses: Vec<House>) -> Self {
        Self {
            houses,
            match_locality: false,
        }
    }

    pub fn with_locality_matching(mut self, enabled: bool) -> Self {
        self.match_locality = enabled;
        self
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| CatalogError::Open(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_csv_reader(file)?;
        info!(
            houses = catalog.len(),
            path = %path.display(),
            "catalog initialized"
        );
        Ok(catalog)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut reader = csv::Reader::from_reader(reader);
        reader
            .headers()
            .map_err(|e| CatalogError::Read(e.to_string()))?;

        let mut houses = Vec::new();
        for (idx, result) in reader.deserialize::<ListingRow>().enumerate() {
            match result {
                Ok(row) => houses.push(row.into_house()),
                Err(err) => warn!(row = idx + 1, error = %err, "skipping unreadable listing"),
            }
        }
        Ok(Self::new(houses))
    }

    pub fn houses(&self) -> &[House] {
        &self.houses
    }

    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}

impl HouseCatalog for InMemoryCatalog {
    fn query(&self, slots: &SearchSlots) -> Result<Vec<House>, CatalogError> {
        let criteria = SearchCriteria::from_slots(slots);
        Ok(self
            .houses
            .iter()
            .filter(|house| criteria.matches(house, self.match_locality))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(rename = "Posted On")]
    posted_on: NaiveDate,
    #[serde(rename = "BHK")]
    bhk: i64,
    #[serde(rename = "Rent")]
    rent: i64,
    #[serde(rename = "Size")]
    size: i64,
    #[serde(rename = "Floor")]
    floor: String,
    #[serde(rename = "Area Type")]
    area_type: String,
    #[serde(rename = "Area Locality")]
    area_locality: String,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "Furnishing Status")]
    furnishing_status: String,
    #[serde(rename = "Tenant Preferred")]
    tenant_preferred: String,
    #[serde(rename = "Bathroom")]
    bathroom: i64,
    #[serde(rename = "Point of Contact")]
    point_of_contact: String,
}

impl ListingRow {
    fn into_house(self) -> House {
        House {
            posted_on: self.posted_on,
            bhk: self.bhk,
            rent: self.rent,
            size: self.size,
            floor: self.floor,
            area_type: self.area_type.to_lowercase(),
            area_locality: self.area_locality.to_lowercase(),
            city: self.city.to_lowercase(),
            furnishing_status: self.furnishing_status.to_lowercase(),
            tenant_preferred: self.tenant_preferred.to_lowercase(),
            bathroom: self.bathroom,
            point_of_contact: self.point_of_contact.to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    const HEADER: &str = "Posted On,BHK,Rent,Size,Floor,Area Type,Area Locality,City,Furnishing Status,Tenant Preferred,Bathroom,Point of Contact\n";

    fn fixture() -> InMemoryCatalog {
        let rows = concat!(
            "2022-05-18,2,10000,1100,Ground out of 2,Super Area,Bandel,Kolkata,Unfurnished,Bachelors/Family,2,Contact Owner\n",
            "2022-06-21,2,35000,850,12 out of 24,Carpet Area,Kandivali West,Mumbai,Furnished,Bachelors/Family,2,Contact Agent\n",
            "2022-06-18,2,9000,800,1 out of 2,Carpet Area,Nalasopara East,Mumbai,Unfurnished,Bachelors,1,Contact Owner\n",
            "2022-06-14,3,45000,1250,5 out of 7,Carpet Area,Andheri West,Mumbai,Furnished,Family,3,Contact Agent\n",
            "2022-05-30,1,8500,450,Ground out of 4,Super Area,Mira Road East,Mumbai,Furnished,Bachelors/Family,1,Contact Owner\n",
        );
        InMemoryCatalog::from_csv_reader(format!("{HEADER}{rows}").as_bytes()).unwrap()
    }

    fn slots(size: &str, bhk: &str, rent: &str, location: &str, city: &str, furnished: &str) -> SearchSlots {
        SearchSlots {
            house_size: SlotValue::text(size),
            house_bhk: SlotValue::text(bhk),
            house_rent: SlotValue::text(rent),
            house_location: SlotValue::text(location),
            house_city: SlotValue::text(city),
            house_furnished: SlotValue::text(furnished),
        }
    }

    #[test]
    fn loads_rows_and_normalizes_text_fields() {
        let catalog = fixture();
        assert_eq!(catalog.len(), 5);
        let first = &catalog.houses()[0];
        assert_eq!(first.city, "kolkata");
        assert_eq!(first.posted_on, NaiveDate::from_ymd_opt(2022, 5, 18).unwrap());
        assert_eq!(first.floor, "Ground out of 2");
    }

    #[test]
    fn skips_malformed_rows() {
        let text = format!(
            "{HEADER}not-a-date,2,1,1,x,x,x,x,x,x,1,x\n2022-05-18,2,10000,1100,G,S,Bandel,Kolkata,Unfurnished,Family,2,Owner\n"
        );
        let catalog = InMemoryCatalog::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("rentbot-missing-{nanos}.csv"));
        let err = InMemoryCatalog::from_csv_path(&path).expect_err("expected open error");
        assert!(matches!(err, CatalogError::Open(_)));
    }

    #[test]
    fn loads_from_csv_file() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("rentbot-catalog-test-{nanos}.csv"));
        std::fs::write(
            &path,
            format!("{HEADER}2022-05-18,2,10000,1100,G,S,Bandel,Kolkata,Unfurnished,Family,2,Owner\n"),
        )
        .expect("write temp csv");
        let catalog = InMemoryCatalog::from_csv_path(&path).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn numeric_bounds_use_min_for_floors_and_max_for_rent() {
        let criteria = SearchCriteria::from_slots(&slots(
            "around 800 or 900 sqft",
            "2 or 3",
            "between 9000 and 12000",
            "",
            "Mumbai",
            "",
        ));
        assert_eq!(criteria.min_size, 800);
        assert_eq!(criteria.min_bhk, 2);
        assert_eq!(criteria.max_rent, Some(12000));
    }

    #[test]
    fn missing_numbers_leave_bounds_open() {
        let criteria = SearchCriteria::from_slots(&slots("any", "some", "cheap", "", "", ""));
        assert_eq!(criteria.min_size, 0);
        assert_eq!(criteria.min_bhk, 0);
        assert_eq!(criteria.max_rent, None);
    }

    #[test]
    fn query_filters_in_insertion_order() {
        let catalog = fixture();
        let found = catalog
            .query(&slots("800", "2", "50000", "Mumbai", "MUMBAI", "furnished"))
            .unwrap();
        let localities: Vec<&str> = found.iter().map(|h| h.area_locality.as_str()).collect();
        // "unfurnished" contains "furnished" as a substring.
        assert_eq!(
            localities,
            vec!["kandivali west", "nalasopara east", "andheri west"]
        );
    }

    #[test]
    fn locality_only_filters_when_enabled() {
        let query = slots("0 sqft", "1", "50000", "andheri", "mumbai", "furnished");
        assert_eq!(fixture().query(&query).unwrap().len(), 4);
        let strict = fixture().with_locality_matching(true);
        let found = strict.query(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].area_locality, "andheri west");
    }

    #[test]
    fn catalog_handles_forward_queries() {
        let catalog = Arc::new(fixture());
        let query = slots("0", "3", "50000", "", "mumbai", "");
        assert_eq!(catalog.query(&query).unwrap().len(), 1);
        assert_eq!((&*catalog).query(&query).unwrap().len(), 1);
    }
}
