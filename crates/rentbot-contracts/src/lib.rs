use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OUT_OF_DOMAIN: &str = "OUT_OF_DOMAIN";

pub type SlotMap = IndexMap<String, SlotValue>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Unset,
    HouseSearch,
    HouseSelection,
    AskInfo,
    CompareHouses,
    ShowHouses,
    FallbackPolicy,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Unset => "UNSET",
            Intent::HouseSearch => "HOUSE_SEARCH",
            Intent::HouseSelection => "HOUSE_SELECTION",
            Intent::AskInfo => "ASK_INFO",
            Intent::CompareHouses => "COMPARE_HOUSES",
            Intent::ShowHouses => "SHOW_HOUSES",
            Intent::FallbackPolicy => "FALLBACK_POLICY",
        }
    }

    pub fn from_label(label: &str) -> Option<Intent> {
        match label.trim().to_ascii_uppercase().as_str() {
            "UNSET" => Some(Intent::Unset),
            "HOUSE_SEARCH" => Some(Intent::HouseSearch),
            "HOUSE_SELECTION" => Some(Intent::HouseSelection),
            "ASK_INFO" => Some(Intent::AskInfo),
            "COMPARE_HOUSES" => Some(Intent::CompareHouses),
            "SHOW_HOUSES" => Some(Intent::ShowHouses),
            "FALLBACK_POLICY" => Some(Intent::FallbackPolicy),
            _ => None,
        }
    }

    pub fn is_user_task(&self) -> bool {
        matches!(
            self,
            Intent::HouseSearch | Intent::HouseSelection | Intent::AskInfo | Intent::CompareHouses
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(untagged)]
pub enum SlotValue {
    #[default]
    Null,
    Integer(i64),
    Text(String),
    List(Vec<SlotValue>),
}

impl SlotValue {
    pub fn text(value: impl Into<String>) -> Self {
        SlotValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SlotValue::Null)
    }

    /// Truthiness check used for slot completion. `Integer(0)` counts as
    /// missing.
    pub fn is_filled(&self) -> bool {
        match self {
            SlotValue::Null => false,
            SlotValue::Integer(v) => *v != 0,
            SlotValue::Text(v) => !v.is_empty(),
            SlotValue::List(v) => !v.is_empty(),
        }
    }

    pub fn normalized(self) -> Self {
        match self {
            SlotValue::Text(v) if v == "None" || v == "null" => SlotValue::Null,
            other => other,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SlotValue::Integer(v) => Some(*v),
            SlotValue::Text(v) => v.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn integers(&self) -> Vec<i64> {
        match self {
            SlotValue::Null => Vec::new(),
            SlotValue::Integer(v) => vec![*v],
            SlotValue::Text(v) => v
                .split_whitespace()
                .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
                .filter_map(|token| token.parse::<i64>().ok())
                .collect(),
            SlotValue::List(items) => items.iter().flat_map(SlotValue::integers).collect(),
        }
    }

    pub fn strings(&self) -> Option<Vec<String>> {
        match self {
            SlotValue::Null => Some(Vec::new()),
            SlotValue::Text(v) => Some(vec![v.clone()]),
            SlotValue::Integer(v) => Some(vec![v.to_string()]),
            SlotValue::List(items) => items
                .iter()
                .map(|item| match item {
                    SlotValue::Text(v) => Some(v.clone()),
                    SlotValue::Integer(v) => Some(v.to_string()),
                    _ => None,
                })
                .collect(),
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Null => f.write_str("null"),
            SlotValue::Integer(v) => write!(f, "{v}"),
            SlotValue::Text(v) => f.write_str(v),
            SlotValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

impl From<&str> for SlotValue {
    fn from(value: &str) -> Self {
        SlotValue::Text(value.to_string())
    }
}

impl From<i64> for SlotValue {
    fn from(value: i64) -> Self {
        SlotValue::Integer(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub intent: String,
    #[serde(default)]
    pub slots: SlotMap,
}

impl Chunk {
    pub fn new<K, V>(intent: &str, slots: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<SlotValue>,
    {
        Self {
            intent: intent.to_string(),
            slots: slots
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

pub trait SlotRecord: Default + Clone + PartialEq {
    const KEYS: &'static [&'static str];

    fn slot(&self, key: &str) -> Option<&SlotValue>;

    fn slot_mut(&mut self, key: &str) -> Option<&mut SlotValue>;

    fn entries(&self) -> Vec<(&'static str, &SlotValue)> {
        Self::KEYS
            .iter()
            .filter_map(|key| self.slot(key).map(|v| (*key, v)))
            .collect()
    }

    fn is_complete(&self) -> bool {
        self.entries().iter().all(|(_, v)| v.is_filled())
    }

    fn missing(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, v)| !v.is_filled())
            .map(|(k, _)| k)
            .collect()
    }

    fn to_map(&self) -> SlotMap {
        self.entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchSlots {
    pub house_size: SlotValue,
    pub house_bhk: SlotValue,
    pub house_rent: SlotValue,
    pub house_location: SlotValue,
    pub house_city: SlotValue,
    pub house_furnished: SlotValue,
}

impl SlotRecord for SearchSlots {
    const KEYS: &'static [&'static str] = &[
        "house_size",
        "house_bhk",
        "house_rent",
        "house_location",
        "house_city",
        "house_furnished",
    ];

    fn slot(&self, key: &str) -> Option<&SlotValue> {
        match key {
            "house_size" => Some(&self.house_size),
            "house_bhk" => Some(&self.house_bhk),
            "house_rent" => Some(&self.house_rent),
            "house_location" => Some(&self.house_location),
            "house_city" => Some(&self.house_city),
            "house_furnished" => Some(&self.house_furnished),
            _ => None,
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut SlotValue> {
        match key {
            "house_size" => Some(&mut self.house_size),
            "house_bhk" => Some(&mut self.house_bhk),
            "house_rent" => Some(&mut self.house_rent),
            "house_location" => Some(&mut self.house_location),
            "house_city" => Some(&mut self.house_city),
            "house_furnished" => Some(&mut self.house_furnished),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionSlots {
    pub house_selected: SlotValue,
}

impl SlotRecord for SelectionSlots {
    const KEYS: &'static [&'static str] = &["house_selected"];

    fn slot(&self, key: &str) -> Option<&SlotValue> {
        (key == "house_selected").then_some(&self.house_selected)
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut SlotValue> {
        (key == "house_selected").then_some(&mut self.house_selected)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskInfoSlots {
    pub properties: SlotValue,
}

impl SlotRecord for AskInfoSlots {
    const KEYS: &'static [&'static str] = &["properties"];

    fn slot(&self, key: &str) -> Option<&SlotValue> {
        (key == "properties").then_some(&self.properties)
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut SlotValue> {
        (key == "properties").then_some(&mut self.properties)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompareSlots {
    pub houses: SlotValue,
    pub properties: SlotValue,
}

impl SlotRecord for CompareSlots {
    const KEYS: &'static [&'static str] = &["houses", "properties"];

    fn slot(&self, key: &str) -> Option<&SlotValue> {
        match key {
            "houses" => Some(&self.houses),
            "properties" => Some(&self.properties),
            _ => None,
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut SlotValue> {
        match key {
            "houses" => Some(&mut self.houses),
            "properties" => Some(&mut self.properties),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowHousesSlots {
    pub options: Vec<String>,
}

impl ShowHousesSlots {
    pub fn to_map(&self) -> SlotMap {
        self.options
            .iter()
            .enumerate()
            .map(|(i, summary)| (format!("option_{i}"), SlotValue::Text(summary.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackSlots {
    pub reason: String,
}

impl FallbackSlots {
    pub fn to_map(&self) -> SlotMap {
        SlotMap::from([("reason".to_string(), SlotValue::Text(self.reason.clone()))])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateView {
    pub intent: Intent,
    pub slots: SlotMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct House {
    pub posted_on: NaiveDate,
    pub bhk: i64,
    pub rent: i64,
    pub size: i64,
    pub floor: String,
    pub area_type: String,
    pub area_locality: String,
    pub city: String,
    pub furnishing_status: String,
    pub tenant_preferred: String,
    pub bathroom: i64,
    pub point_of_contact: String,
}

impl House {
    pub fn property(&self, name: &str) -> Option<String> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let value = match key.as_str() {
            "posted_on" | "posted" | "date" => self.posted_on.to_string(),
            "bhk" | "rooms" | "bedrooms" => self.bhk.to_string(),
            "rent" | "price" | "cost" => self.rent.to_string(),
            "size" | "sqft" | "square_feet" => self.size.to_string(),
            "floor" => self.floor.clone(),
            "area_type" => self.area_type.clone(),
            "area_locality" | "locality" | "location" | "area" => self.area_locality.clone(),
            "city" => self.city.clone(),
            "furnishing_status" | "furnishing" | "furnished" => self.furnishing_status.clone(),
            "tenant_preferred" | "tenant" | "tenants" => self.tenant_preferred.clone(),
            "bathroom" | "bathrooms" => self.bathroom.to_string(),
            "point_of_contact" | "contact" => self.point_of_contact.clone(),
            _ => return None,
        };
        Some(value)
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A {} BHK House ({} sq.ft.) in {},{} for {}. Suitable for {}, please contact {} for more information.",
            self.bhk,
            self.size,
            self.area_locality,
            self.city,
            self.rent,
            self.tenant_preferred,
            self.point_of_contact
        )
    }
}
