use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ticket::{Id, Priority, Status};

/// Dashboard counters. Categories without tickets are left out of the maps.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_tickets: usize,
    pub escalated_tickets: usize,
    pub status_counts: BTreeMap<Status, usize>,
    pub priority_counts: BTreeMap<Priority, usize>,
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum AgeRange {
    #[serde(rename = "0-1 days")]
    UpToOneDay,
    #[serde(rename = "2-7 days")]
    UpToOneWeek,
    #[serde(rename = "8-30 days")]
    UpToOneMonth,
    #[serde(rename = "31+ days")]
    Older,
}

impl AgeRange {
    pub const ALL: [Self; 4] = [
        Self::UpToOneDay,
        Self::UpToOneWeek,
        Self::UpToOneMonth,
        Self::Older,
    ];

    pub fn of(days: i64) -> Self {
        match days {
            i64::MIN..=1 => Self::UpToOneDay,
            2..=7 => Self::UpToOneWeek,
            8..=30 => Self::UpToOneMonth,
            _ => Self::Older,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aging {
    /// Every range is present, empty ones with a zero count.
    pub age_ranges: BTreeMap<AgeRange, usize>,
    pub detailed_data: Vec<AgingEntry>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingEntry {
    pub id: Id,

    /// Whole days since creation.
    pub age: i64,
    pub status: Status,
    pub priority: Priority,
}
