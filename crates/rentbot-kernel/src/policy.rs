use rentbot_contracts::{Intent, SlotValue, StateView};

use crate::schema::schema_keys;

pub fn next_best_action(state: &StateView) -> String {
    match state.intent {
        Intent::ShowHouses if state.slots.is_empty() => {
            return "fallback_policy('No houses found for the given search criteria.')".to_string();
        }
        Intent::ShowHouses => return "show_houses(HOUSE_SEARCH)".to_string(),
        Intent::FallbackPolicy => {
            let reason = state
                .slots
                .get("reason")
                .map(SlotValue::to_string)
                .unwrap_or_default();
            return format!("fallback_policy(\"{reason}\")");
        }
        Intent::Unset => {
            return "fallback_policy('No active task, start by searching for a house.')"
                .to_string();
        }
        _ => {}
    }

    let missing = schema_keys(state.intent).iter().find(|key| {
        !state
            .slots
            .get(**key)
            .map(SlotValue::is_filled)
            .unwrap_or(false)
    });
    if let Some(slot) = missing {
        return format!("request_slot(\"{slot}\")");
    }

    if state.intent != Intent::AskInfo {
        return format!("confirmation(\"{}\")", state.intent);
    }
    match state
        .slots
        .get("properties")
        .and_then(SlotValue::strings)
        .and_then(|p| p.into_iter().next())
    {
        Some(property) => format!("provide_info(\"{property}\")"),
        None => "fallback_policy('No properties information asked, please retry.')".to_string(),
    }
}
