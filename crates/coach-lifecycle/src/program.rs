// program.rs — The deliverable: a program of training days, each with
// ordered training sections and nutrition entries.
//
// A Program is created once, by publishing a ProgramBuilder, and never
// mutated afterwards.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use coach_policy::OwnedRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of section types a training day can contain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    WarmUp,
    Main,
    Aerobic,
    CoolDown,
    Corrective,
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionType::WarmUp => "warm-up",
            SectionType::Main => "main",
            SectionType::Aerobic => "aerobic",
            SectionType::CoolDown => "cool-down",
            SectionType::Corrective => "corrective",
        };
        f.write_str(name)
    }
}

/// One movement row in a training section. All prescription fields are free
/// text ("3", "8-12", "60s").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRow {
    pub id: String,
    /// May be several catalog names joined with `" + "` (supersets).
    pub movement_description: String,
    pub system: String,
    pub sets: String,
    pub reps: String,
    pub rhythm: String,
    pub rest_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl TrainingRow {
    /// A fresh row with the usual starting prescription.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            movement_description: String::new(),
            system: "standard".to_string(),
            sets: "3".to_string(),
            reps: "12".to_string(),
            rhythm: "normal".to_string(),
            rest_interval: "60s".to_string(),
            video_url: None,
        }
    }
}

impl Default for TrainingRow {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingSection {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub rows: Vec<TrainingRow>,
}

impl TrainingSection {
    pub fn new(section_type: SectionType) -> Self {
        Self {
            section_type,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NutritionEntry {
    pub id: String,
    pub time_slot: String,
    /// May be several catalog names joined with `" + "`.
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingDay {
    pub id: String,
    pub day_number: u32,
    #[serde(default)]
    pub sections: Vec<TrainingSection>,
    #[serde(default)]
    pub nutrition_entries: Vec<NutritionEntry>,
}

/// A published program. One per request that reached `PLAN_READY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub request_id: String,
    /// Ownership field, copied from the request.
    pub subject_id: String,
    pub authority_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<TrainingDay>,
    pub created_at: DateTime<Utc>,
}

impl OwnedRecord for Program {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.subject_id
    }
}

impl Program {
    /// The program published for a request, if any.
    pub fn for_request<'a>(programs: &'a [Program], request_id: &str) -> Option<&'a Program> {
        programs.iter().find(|p| p.request_id == request_id)
    }

    pub fn total_rows(&self) -> usize {
        self.days
            .iter()
            .flat_map(|d| d.sections.iter())
            .map(|s| s.rows.len())
            .sum()
    }
}
