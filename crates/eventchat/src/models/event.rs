use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// The closed set of event categories.
///
/// The literals are shared bit-exactly with the database, the vector store metadata
/// and the tool schema, so they are never translated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, AsRefStr,
)]
pub enum Category {
    #[serde(rename = "Środowisko")]
    #[strum(serialize = "Środowisko")]
    Environment,
    #[serde(rename = "Edukacja")]
    #[strum(serialize = "Edukacja")]
    Education,
    #[serde(rename = "Zdrowie")]
    #[strum(serialize = "Zdrowie")]
    Health,
    #[serde(rename = "Społeczność")]
    #[strum(serialize = "Społeczność")]
    Community,
    #[serde(rename = "Kultura")]
    #[strum(serialize = "Kultura")]
    Culture,
    #[serde(rename = "Sport")]
    #[strum(serialize = "Sport")]
    Sport,
    #[serde(rename = "Zwierzęta")]
    #[strum(serialize = "Zwierzęta")]
    Animals,
    #[serde(rename = "Inne")]
    #[strum(serialize = "Inne")]
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A volunteering event as stored in the `Event` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub name: String,
    pub category: Category,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_time: String,
    pub end_time: String,
    pub application_deadline: String,
    pub organization_id: i64,
}

impl Event {
    /// Full single-record rendering used by `getEvent`
    pub fn describe(&self) -> String {
        format!(
            "EventId: {}, Name: {}, Category: {}, Description: {}, Latitude: {}, Longitude: {}, StartTime: {}, EndTime: {}, ApplicationDeadline: {}, OrganizationId: {}",
            self.event_id,
            self.name,
            self.category,
            self.description,
            self.latitude,
            self.longitude,
            self.start_time,
            self.end_time,
            self.application_deadline,
            self.organization_id,
        )
    }

    /// One-line listing without the description, used by `getEventsByCategory`
    pub fn summary_line(&self) -> String {
        format!(
            "EventId: {}, Name: {}, Category: {}, Latitude: {}, Longitude: {}, StartTime: {}, EndTime: {}, ApplicationDeadline: {}, OrganizationId: {}",
            self.event_id,
            self.name,
            self.category,
            self.latitude,
            self.longitude,
            self.start_time,
            self.end_time,
            self.application_deadline,
            self.organization_id,
        )
    }

    /// Text that is embedded for nearest-neighbor search
    pub fn embedding_text(&self) -> String {
        format!("{} {} {}", self.name, self.category, self.description)
    }
}
