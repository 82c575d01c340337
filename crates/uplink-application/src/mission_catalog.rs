//! Built-in mission catalog.
//!
//! Each mission offers a canned briefing question that the front end sends
//! as an ordinary chat message.

use serde::Serialize;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
pub enum MissionStatus {
    Active,
    Online,
    Standby,
}

/// A mission shown in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mission {
    pub title: &'static str,
    pub status: MissionStatus,
    /// Launch or milestone date (`YYYY-MM-DD`)
    pub date: &'static str,
    pub description: &'static str,
}

impl Mission {
    /// The chat question asking for a full briefing on this mission.
    pub fn briefing_query(&self) -> String {
        briefing_query(self.title)
    }
}

static MISSIONS: [Mission; 3] = [
    Mission {
        title: "Chandrayaan-3",
        status: MissionStatus::Active,
        date: "2023-08-23",
        description: "Lunar landing data and telemetry analysis.",
    },
    Mission {
        title: "Aditya-L1",
        status: MissionStatus::Online,
        date: "2023-09-02",
        description: "Solar observation and L1 orbit stability records.",
    },
    Mission {
        title: "Gaganyaan",
        status: MissionStatus::Standby,
        date: "2024-01-15",
        description: "Safety protocols and human-rating verification.",
    },
];

/// Builds the briefing question for a mission title.
pub fn briefing_query(title: &str) -> String {
    format!("Tell me everything about the {title} mission.")
}

pub struct MissionCatalog;

impl MissionCatalog {
    pub fn all() -> &'static [Mission] {
        &MISSIONS
    }

    /// Looks up a mission by title, ignoring case.
    pub fn find(title: &str) -> Option<&'static Mission> {
        let title = title.trim();
        MISSIONS.iter().find(|m| m.title.eq_ignore_ascii_case(title))
    }
}
