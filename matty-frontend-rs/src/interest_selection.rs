use serde::{Deserialize, Serialize};

use crate::Interest;
use crate::data_store::DataStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableInterest {
    pub interest: Interest,
    pub selected: bool,
}

/// The interest picker: every known interest, each with a checkbox. Nothing starts out selected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestSelection {
    interests: Vec<SelectableInterest>,
}

impl InterestSelection {
    /// A store failure leaves the picker empty; the UI shows its "no interests" state.
    pub async fn load<S: DataStore>(store: &S) -> Self {
        match store.fetch_all_interests().await {
            Ok(interests) => Self::from_interests(interests),
            Err(e) => {
                log::error!("Failed to load interests for selection: {e}");
                Self::default()
            }
        }
    }

    pub fn from_interests(interests: impl IntoIterator<Item = Interest>) -> Self {
        Self {
            interests: interests
                .into_iter()
                .map(|interest| SelectableInterest {
                    interest,
                    selected: false,
                })
                .collect(),
        }
    }

    pub fn interests(&self) -> &[SelectableInterest] {
        &self.interests
    }

    pub fn no_interests(&self) -> bool {
        self.interests.is_empty()
    }

    /// Returns the new state, or `None` if there is no interest by that name.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let entry = self.find_mut(name)?;
        entry.selected = !entry.selected;
        Some(entry.selected)
    }

    /// Returns false if there is no interest by that name.
    pub fn select(&mut self, name: &str, selected: bool) -> bool {
        match self.find_mut(name) {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Interest> {
        self.interests
            .iter()
            .filter(|entry| entry.selected)
            .map(|entry| &entry.interest)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut SelectableInterest> {
        let found = self
            .interests
            .iter_mut()
            .find(|entry| entry.interest.name == name);
        if found.is_none() {
            log::debug!("No interest named {name:?} to select");
        }
        found
    }
}
