use rentbot_contracts::{
    AskInfoSlots, CompareSlots, FallbackSlots, Intent, SearchSlots, SelectionSlots,
    ShowHousesSlots, SlotMap, SlotRecord, StateView,
};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Task {
    #[default]
    Unset,
    HouseSearch(SearchSlots),
    HouseSelection(SelectionSlots),
    AskInfo(AskInfoSlots),
    CompareHouses(CompareSlots),
    ShowHouses(ShowHousesSlots),
    Fallback(FallbackSlots),
}

impl Task {
    pub fn intent(&self) -> Intent {
        match self {
            Task::Unset => Intent::Unset,
            Task::HouseSearch(_) => Intent::HouseSearch,
            Task::HouseSelection(_) => Intent::HouseSelection,
            Task::AskInfo(_) => Intent::AskInfo,
            Task::CompareHouses(_) => Intent::CompareHouses,
            Task::ShowHouses(_) => Intent::ShowHouses,
            Task::Fallback(_) => Intent::FallbackPolicy,
        }
    }

    pub fn slots(&self) -> SlotMap {
        match self {
            Task::Unset => SlotMap::new(),
            Task::HouseSearch(slots) => slots.to_map(),
            Task::HouseSelection(slots) => slots.to_map(),
            Task::AskInfo(slots) => slots.to_map(),
            Task::CompareHouses(slots) => slots.to_map(),
            Task::ShowHouses(slots) => slots.to_map(),
            Task::Fallback(slots) => slots.to_map(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Task::Unset => true,
            Task::HouseSearch(slots) => slots.is_complete(),
            Task::HouseSelection(slots) => slots.is_complete(),
            Task::AskInfo(slots) => slots.is_complete(),
            Task::CompareHouses(slots) => slots.is_complete(),
            Task::ShowHouses(slots) => slots.options.iter().all(|o| !o.is_empty()),
            Task::Fallback(slots) => !slots.reason.is_empty(),
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        match self {
            Task::HouseSearch(slots) => slots.missing(),
            Task::HouseSelection(slots) => slots.missing(),
            Task::AskInfo(slots) => slots.missing(),
            Task::CompareHouses(slots) => slots.missing(),
            Task::Unset | Task::ShowHouses(_) | Task::Fallback(_) => Vec::new(),
        }
    }

    pub fn view(&self) -> StateView {
        StateView {
            intent: self.intent(),
            slots: self.slots(),
        }
    }
}

pub fn schema_keys(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::HouseSearch => SearchSlots::KEYS,
        Intent::HouseSelection => SelectionSlots::KEYS,
        Intent::AskInfo => AskInfoSlots::KEYS,
        Intent::CompareHouses => CompareSlots::KEYS,
        Intent::FallbackPolicy => &["reason"],
        Intent::Unset | Intent::ShowHouses => &[],
    }
}

pub fn seed<R: SlotRecord>(supplied: &SlotMap) -> R {
    let mut record = R::default();
    merge(&mut record, supplied);
    record
}

/// Non-destructive overwrite: a supplied value replaces the stored one only
/// when it is not null. Keys outside the schema are dropped.
pub fn merge<R: SlotRecord>(record: &mut R, supplied: &SlotMap) {
    for (key, value) in supplied {
        let value = value.clone().normalized();
        if value.is_null() {
            continue;
        }
        match record.slot_mut(key) {
            Some(slot) => *slot = value,
            None => debug!(slot = %key, "dropping slot outside schema"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentbot_contracts::SlotValue;

    fn map(pairs: &[(&str, SlotValue)]) -> SlotMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn seeding_keeps_every_schema_key() {
        let record: SearchSlots = seed(&map(&[("house_bhk", SlotValue::text("2"))]));
        let slots = Task::HouseSearch(record).slots();
        let keys: Vec<&str> = slots.keys().map(String::as_str).collect();
        assert_eq!(keys, SearchSlots::KEYS);
        assert_eq!(slots["house_bhk"], SlotValue::text("2"));
        assert_eq!(slots["house_size"], SlotValue::Null);
    }

    #[test]
    fn merge_skips_null_and_foreign_keys() {
        let mut record: SearchSlots = seed(&map(&[
            ("house_city", SlotValue::text("Mumbai")),
            ("house_rent", SlotValue::text("10000")),
        ]));
        merge(
            &mut record,
            &map(&[
                ("house_city", SlotValue::Null),
                ("house_rent", SlotValue::text("None")),
                ("house_size", SlotValue::text("800")),
                ("house_colour", SlotValue::text("blue")),
            ]),
        );
        assert_eq!(record.house_city, SlotValue::text("Mumbai"));
        assert_eq!(record.house_rent, SlotValue::text("10000"));
        assert_eq!(record.house_size, SlotValue::text("800"));
        assert_eq!(Task::HouseSearch(record).slots().len(), 6);
    }

    #[test]
    fn merging_the_same_update_twice_is_idempotent() {
        let update = map(&[
            ("house_bhk", SlotValue::text("3")),
            ("house_size", SlotValue::Null),
        ]);
        let mut once: SearchSlots = seed(&map(&[("house_city", SlotValue::text("Delhi"))]));
        merge(&mut once, &update);
        let mut twice = once.clone();
        merge(&mut twice, &update);
        assert_eq!(once, twice);
    }

    #[test]
    fn fallback_and_show_houses_expose_their_own_keys() {
        let fallback = Task::Fallback(FallbackSlots {
            reason: "processing error, retry.".to_string(),
        });
        assert_eq!(fallback.slots().keys().collect::<Vec<_>>(), vec!["reason"]);
        assert!(fallback.is_complete());

        let shown = Task::ShowHouses(ShowHousesSlots {
            options: vec!["a".to_string(), "b".to_string()],
        });
        assert_eq!(
            shown.slots().keys().collect::<Vec<_>>(),
            vec!["option_0", "option_1"]
        );
        assert!(Task::ShowHouses(ShowHousesSlots::default()).is_complete());
    }

    #[test]
    fn missing_lists_unfilled_keys_in_request_order() {
        let search = Task::HouseSearch(seed(&map(&[
            ("house_rent", SlotValue::text("9000")),
            ("house_city", SlotValue::text("Pune")),
        ])));
        assert_eq!(
            search.missing(),
            vec!["house_size", "house_bhk", "house_location", "house_furnished"]
        );
        assert!(Task::Unset.missing().is_empty());
        assert_eq!(
            Task::CompareHouses(CompareSlots::default()).missing(),
            vec!["houses", "properties"]
        );
    }

    #[test]
    fn completion_follows_truthiness() {
        let selection = Task::HouseSelection(SelectionSlots {
            house_selected: SlotValue::Integer(0),
        });
        assert!(!selection.is_complete());
        assert!(Task::Unset.is_complete());
        assert!(!Task::AskInfo(AskInfoSlots::default()).is_complete());
    }
}
