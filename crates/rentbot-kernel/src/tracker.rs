use rentbot_catalog::HouseCatalog;
use rentbot_contracts::{
    AskInfoSlots, Chunk, CompareSlots, House, Intent, SearchSlots, ShowHousesSlots, SlotMap,
    SlotRecord, SlotValue, StateView, OUT_OF_DOMAIN,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fallback::{DomainError, Outcome};
use crate::ledger::ActionLedger;
use crate::schema::{self, Task};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("no completion handler for intent {0}")]
    UnhandledIntent(Intent),
    #[error("completion requested for {requested} while tracking {current}")]
    IntentMismatch { requested: Intent, current: Intent },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeDetection {
    #[default]
    Multiset,
    PerKey,
}

impl ChangeDetection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "multiset" => Some(ChangeDetection::Multiset),
            "per_key" => Some(ChangeDetection::PerKey),
            _ => None,
        }
    }

    fn changed(&self, before: &SearchSlots, after: &SearchSlots) -> bool {
        match self {
            ChangeDetection::Multiset => sorted_values(before) != sorted_values(after),
            ChangeDetection::PerKey => before != after,
        }
    }
}

fn sorted_values(slots: &SearchSlots) -> Vec<SlotValue> {
    let mut values: Vec<SlotValue> = slots.entries().into_iter().map(|(_, v)| v.clone()).collect();
    values.sort();
    values
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub property: String,
    pub values: Vec<Option<String>>,
}

#[derive(Debug)]
pub struct DialogueState<C> {
    catalog: C,
    change_detection: ChangeDetection,
    pub(crate) task: Task,
    pub(crate) last_active_state: Option<Task>,
    ledger: ActionLedger,
    current_houses: Vec<House>,
    active_house: Option<usize>,
    houses_to_compare: Vec<usize>,
    properties_to_compare: Vec<String>,
}

impl<C: HouseCatalog> DialogueState<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            change_detection: ChangeDetection::default(),
            task: Task::Unset,
            last_active_state: None,
            ledger: ActionLedger::new(),
            current_houses: Vec::new(),
            active_house: None,
            houses_to_compare: Vec::new(),
            properties_to_compare: Vec::new(),
        }
    }

    pub fn with_change_detection(mut self, change_detection: ChangeDetection) -> Self {
        self.change_detection = change_detection;
        self
    }

    pub fn update(&mut self, chunks: &[Chunk]) -> Result<Outcome, TrackerError> {
        if chunks.is_empty() {
            self.fallback_policy(DomainError::Malformed);
            return Ok(self.outcome());
        }

        for chunk in chunks {
            if chunk.intent.trim().eq_ignore_ascii_case(OUT_OF_DOMAIN) {
                self.fallback_policy(DomainError::OutOfDomain);
                continue;
            }
            match Intent::from_label(&chunk.intent).filter(Intent::is_user_task) {
                Some(intent) => self.apply(intent, &chunk.slots)?,
                None => self.fallback_policy(DomainError::UnknownIntent(chunk.intent.clone())),
            }
        }
        Ok(self.outcome())
    }

    pub fn update_json(&mut self, input: &serde_json::Value) -> Result<Outcome, TrackerError> {
        match serde_json::from_value::<Vec<Chunk>>(input.clone()) {
            Ok(chunks) => self.update(&chunks),
            Err(err) => {
                warn!(error = %err, "malformed understanding output");
                self.fallback_policy(DomainError::Malformed);
                Ok(self.outcome())
            }
        }
    }

    fn apply(&mut self, intent: Intent, slots: &SlotMap) -> Result<(), TrackerError> {
        let current = self.task.intent();
        if current == Intent::Unset {
            debug!(%intent, "adopting first intent");
            self.initialize_slots(intent, slots)
        } else if intent == current {
            self.merge_slots(intent, slots)
        } else if self.check_slots() {
            debug!(from = %current, to = %intent, "switching intent");
            self.initialize_slots(intent, slots)
        } else {
            self.fallback_policy(DomainError::Incoherent {
                current,
                requested: intent,
            });
            Ok(())
        }
    }

    fn merge_slots(&mut self, intent: Intent, slots: &SlotMap) -> Result<(), TrackerError> {
        let before = self.task.clone();
        match &mut self.task {
            // Each ASK_INFO turn restates the whole request.
            Task::AskInfo(record) => *record = schema::seed(slots),
            Task::HouseSearch(record) => schema::merge(record, slots),
            Task::HouseSelection(record) => schema::merge(record, slots),
            Task::CompareHouses(record) => schema::merge(record, slots),
            Task::Unset | Task::ShowHouses(_) | Task::Fallback(_) => {
                return Err(TrackerError::UnhandledIntent(intent));
            }
        }
        debug!(%intent, slots = ?self.task.slots(), "merged slots");

        if !self.check_slots() {
            debug!(%intent, missing = ?self.task.missing(), "awaiting slots");
            return Ok(());
        }
        let changed = match (&before, &self.task) {
            (Task::HouseSearch(old), Task::HouseSearch(new)) if old.is_complete() => {
                self.change_detection.changed(old, new)
            }
            _ => false,
        };
        self.handle_intent(intent, changed)
    }

    pub fn initialize_slots(&mut self, intent: Intent, slots: &SlotMap) -> Result<(), TrackerError> {
        match intent {
            Intent::HouseSearch => {
                self.task = Task::HouseSearch(schema::seed(slots));
                Ok(())
            }
            Intent::HouseSelection => {
                self.task = Task::HouseSelection(schema::seed(slots));
                self.handle_intent(Intent::HouseSelection, false)
            }
            Intent::AskInfo => {
                if self.active_house.is_none() {
                    self.fallback_policy(DomainError::NoHouseSelected);
                } else {
                    self.task = Task::AskInfo(schema::seed(slots));
                }
                Ok(())
            }
            Intent::CompareHouses => {
                if self.current_houses.is_empty() {
                    self.fallback_policy(DomainError::NoHousesToCompare);
                    return Ok(());
                }
                let record: CompareSlots = schema::seed(slots);
                let resolved = if slots.contains_key("houses") && slots.contains_key("properties")
                {
                    self.resolve_houses(&record.houses)
                        .zip(record.properties.strings())
                } else {
                    None
                };
                match resolved {
                    Some((houses, properties)) => {
                        self.houses_to_compare = houses;
                        self.properties_to_compare = properties;
                        self.task = Task::CompareHouses(record);
                    }
                    None => self.fallback_policy(DomainError::CompareRequest),
                }
                Ok(())
            }
            other => Err(TrackerError::UnhandledIntent(other)),
        }
    }

    pub fn check_slots(&self) -> bool {
        self.task.is_complete()
    }

    pub fn handle_intent(&mut self, intent: Intent, changed: bool) -> Result<(), TrackerError> {
        match (intent, &self.task) {
            (Intent::HouseSearch, Task::HouseSearch(slots)) => {
                let slots = slots.clone();
                self.complete_search(&slots, changed);
                Ok(())
            }
            (Intent::HouseSelection, Task::HouseSelection(slots)) => {
                let selected = slots.house_selected.clone();
                self.complete_selection(&selected);
                Ok(())
            }
            (Intent::CompareHouses, Task::CompareHouses(slots)) => {
                let slots = slots.clone();
                self.complete_comparison(&slots);
                Ok(())
            }
            (Intent::AskInfo, Task::AskInfo(_)) => {
                if self.active_house.is_none() {
                    self.fallback_policy(DomainError::NoHouseSelected);
                }
                Ok(())
            }
            (Intent::HouseSearch | Intent::HouseSelection | Intent::AskInfo | Intent::CompareHouses, task) => {
                Err(TrackerError::IntentMismatch {
                    requested: intent,
                    current: task.intent(),
                })
            }
            (other, _) => Err(TrackerError::UnhandledIntent(other)),
        }
    }

    fn complete_search(&mut self, slots: &SearchSlots, changed: bool) {
        let confirmed = self.ledger.last_confirms(Intent::HouseSearch);
        if !confirmed || changed {
            debug!(confirmed, changed, "search awaiting confirmation");
            return;
        }
        match self.catalog.query(slots) {
            Ok(houses) => {
                info!(results = houses.len(), "house search executed");
                let options = houses.iter().map(House::to_string).collect();
                self.current_houses = houses;
                self.active_house = None;
                self.houses_to_compare.clear();
                self.properties_to_compare.clear();
                self.task = Task::ShowHouses(ShowHousesSlots { options });
            }
            Err(err) => {
                warn!(error = %err, "catalog query failed");
                self.fallback_policy(DomainError::Search);
            }
        }
    }

    fn complete_selection(&mut self, selected: &SlotValue) {
        if selected.is_null() {
            return;
        }
        // house_selected counts from 1.
        let position = selected
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| (1..=self.current_houses.len()).contains(n));
        match position {
            Some(position) => {
                info!(position, "house selected");
                self.active_house = Some(position - 1);
                self.task = Task::AskInfo(AskInfoSlots::default());
            }
            None => self.fallback_policy(DomainError::Selection),
        }
    }

    fn complete_comparison(&mut self, slots: &CompareSlots) {
        let Some(properties) = slots.properties.strings() else {
            self.restart_comparison();
            return;
        };
        self.properties_to_compare = properties;
        if self.houses_to_compare.is_empty() {
            match self.resolve_houses(&slots.houses) {
                Some(houses) if !houses.is_empty() => self.houses_to_compare = houses,
                _ => self.restart_comparison(),
            }
        }
    }

    fn restart_comparison(&mut self) {
        warn!("comparison request could not be resolved; asking again");
        self.houses_to_compare.clear();
        self.properties_to_compare.clear();
        self.task = Task::CompareHouses(CompareSlots::default());
    }

    /// 0-based positions into the current results. Anything but a list of
    /// in-range non-negative integers is rejected.
    fn resolve_houses(&self, value: &SlotValue) -> Option<Vec<usize>> {
        match value {
            SlotValue::List(items) => items
                .iter()
                .map(|item| {
                    item.as_integer()
                        .and_then(|n| usize::try_from(n).ok())
                        .filter(|n| *n < self.current_houses.len())
                })
                .collect(),
            _ => None,
        }
    }
}

impl<C> DialogueState<C> {
    pub fn update_nba(&mut self, label: impl Into<String>) {
        let label = label.into();
        debug!(label = %label, "next best action recorded");
        self.ledger.push(label);
    }

    pub fn get_state(&self) -> StateView {
        self.task.view()
    }

    pub fn current_intent(&self) -> Intent {
        self.task.intent()
    }

    pub fn reset(&mut self) {
        info!(actions = self.ledger.len(), "dialogue state reset");
        self.task = Task::Unset;
        self.last_active_state = None;
        self.ledger.clear();
        self.current_houses.clear();
        self.active_house = None;
        self.houses_to_compare.clear();
        self.properties_to_compare.clear();
    }

    pub fn ledger(&self) -> &ActionLedger {
        &self.ledger
    }

    pub fn current_houses(&self) -> &[House] {
        &self.current_houses
    }

    pub fn active_house(&self) -> Option<&House> {
        self.active_house.and_then(|i| self.current_houses.get(i))
    }

    pub fn active_house_index(&self) -> Option<usize> {
        self.active_house
    }

    pub fn houses_to_compare(&self) -> Vec<&House> {
        self.houses_to_compare
            .iter()
            .filter_map(|i| self.current_houses.get(*i))
            .collect()
    }

    pub fn properties_to_compare(&self) -> &[String] {
        &self.properties_to_compare
    }

    pub fn comparison(&self) -> Vec<ComparisonRow> {
        let houses = self.houses_to_compare();
        self.properties_to_compare
            .iter()
            .map(|property| ComparisonRow {
                property: property.clone(),
                values: houses.iter().map(|h| h.property(property)).collect(),
            })
            .collect()
    }

    pub fn requested_info(&self) -> Vec<(String, Option<String>)> {
        let (Task::AskInfo(slots), Some(house)) = (&self.task, self.active_house()) else {
            return Vec::new();
        };
        slots
            .properties
            .strings()
            .unwrap_or_default()
            .into_iter()
            .map(|name| {
                let value = house.property(&name);
                (name, value)
            })
            .collect()
    }
}
