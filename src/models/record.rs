use serde::{Deserialize, Serialize};

/// One dated update entry. Immutable once loaded; missing fields default to
/// empty strings so a sparse entry degrades (an empty date is reported as
/// malformed) instead of failing the whole load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Record {
    pub date: String,
    pub company: String,
    pub game: String,
    pub title: String,
    pub summary: String,
    pub link: String,
}

impl Record {
    pub fn new(date: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            company: company.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = game.into();
        self
    }
}
