use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A named tag used to categorise events and to search for them.
/// Two interests are the same interest if they have the same name; the emoji is decoration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interest {
    pub name: String,
    #[serde(default)]
    pub emoji: String,
}

impl Interest {
    pub fn new(name: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emoji: emoji.into(),
        }
    }

    pub(crate) fn name_contains(&self, needle_lowercase: &str) -> bool {
        self.name.to_lowercase().contains(needle_lowercase)
    }
}

impl PartialEq for Interest {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Interest {}

impl Hash for Interest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
