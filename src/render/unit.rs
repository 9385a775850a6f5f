use serde::Serialize;

use crate::models::{class_key, Record};

pub const LINK_LABEL: &str = "Official site";

/// Display data for one record. Built by the scheduler, drawn by the target.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub game: String,
    pub company: String,
    /// `company-<class key>`, for per-company styling.
    pub company_class: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub link_label: &'static str,
}

impl From<&Record> for EntryView {
    fn from(record: &Record) -> Self {
        Self {
            game: record.game.clone(),
            company: record.company.clone(),
            company_class: format!("company-{}", class_key(&record.company)),
            title: record.title.clone(),
            summary: record.summary.clone(),
            link: record.link.clone(),
            link_label: LINK_LABEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Notice {
    /// Filtering left nothing to show.
    NoUpdates,
    /// The record collection could not be loaded.
    LoadFailed { reason: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::NoUpdates => "No updates to show".to_string(),
            Notice::LoadFailed { reason } => format!("Failed to load updates: {reason}"),
        }
    }
}

/// One append to a render target.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RenderUnit {
    DateHeader { date: String },
    Entries { date: String, entries: Vec<EntryView> },
    Notice { notice: Notice },
}

impl RenderUnit {
    pub fn notice(notice: Notice) -> Self {
        RenderUnit::Notice { notice }
    }
}
