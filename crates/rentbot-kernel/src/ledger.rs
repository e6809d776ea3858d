use rentbot_contracts::Intent;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLedger {
    entries: Vec<String>,
}

impl ActionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>) {
        self.entries.push(label.into());
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn last_confirms(&self, intent: Intent) -> bool {
        self.last()
            .map(|label| label.contains("confirmation") && label.contains(intent.as_str()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
