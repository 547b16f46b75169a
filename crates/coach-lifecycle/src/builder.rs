// builder.rs — ProgramBuilder: the authority's in-progress program.
//
// The builder is working state only. Nothing it holds is persisted until
// `publish`, which produces the immutable Program and the PLAN_READY request
// together. Either both exist or neither does.

use chrono::{Duration, NaiveDate, Utc};
use coach_policy::{Caller, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::CatalogEntry;
use crate::error::LifecycleError;
use crate::program::{
    NutritionEntry, Program, SectionType, TrainingDay, TrainingRow, TrainingSection,
};
use crate::request::{DurationClass, EngagementRequest, RequestStatus};

/// Separator used when a catalog pick is appended to existing row text.
pub const COMPOSITE_SEPARATOR: &str = " + ";

/// The result of publishing: both records must be persisted together.
#[derive(Debug, Clone)]
pub struct Publication {
    pub program: Program,
    pub request: EngagementRequest,
}

/// Authoring model for one request's program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramBuilder {
    request_id: String,
    subject_id: String,
    duration_class: DurationClass,
    days: Vec<TrainingDay>,
}

impl ProgramBuilder {
    /// Start authoring for a request in `WAITING_FOR_PLAN`.
    ///
    /// The builder opens with day 1 holding one empty main section.
    pub fn start(request: &EngagementRequest, caller: &Caller) -> Result<Self, LifecycleError> {
        if request.status != RequestStatus::WaitingForPlan {
            return Err(LifecycleError::InvalidTransition {
                request_id: request.id.clone(),
                from: request.status,
                to: RequestStatus::PlanReady,
            });
        }
        if caller.role != Role::Authority {
            return Err(LifecycleError::ActorNotAllowed {
                request_id: request.id.clone(),
                actor: caller.role.to_string(),
                action: "author_program".to_string(),
            });
        }

        let mut builder = Self {
            request_id: request.id.clone(),
            subject_id: request.subject_id.clone(),
            duration_class: request.details.duration_class,
            days: Vec::new(),
        };
        builder.add_day();
        Ok(builder)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn days(&self) -> &[TrainingDay] {
        &self.days
    }

    /// Append a day numbered after the last one. Returns its id.
    pub fn add_day(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.days.push(TrainingDay {
            id: id.clone(),
            day_number: self.days.len() as u32 + 1,
            sections: vec![TrainingSection::new(SectionType::Main)],
            nutrition_entries: Vec::new(),
        });
        id
    }

    /// Remove a day and renumber the rest so day numbers stay 1..=n.
    pub fn remove_day(&mut self, day_id: &str) -> Result<(), LifecycleError> {
        let index = self
            .days
            .iter()
            .position(|d| d.id == day_id)
            .ok_or_else(|| LifecycleError::DayNotFound(day_id.to_string()))?;
        self.days.remove(index);
        for (i, day) in self.days.iter_mut().enumerate() {
            day.day_number = i as u32 + 1;
        }
        Ok(())
    }

    /// Append a section to a day. Returns its index within the day.
    pub fn add_section(
        &mut self,
        day_id: &str,
        section_type: SectionType,
    ) -> Result<usize, LifecycleError> {
        let day = self.day_mut(day_id)?;
        day.sections.push(TrainingSection::new(section_type));
        Ok(day.sections.len() - 1)
    }

    pub fn set_section_type(
        &mut self,
        day_id: &str,
        index: usize,
        section_type: SectionType,
    ) -> Result<(), LifecycleError> {
        self.section_mut(day_id, index)?.section_type = section_type;
        Ok(())
    }

    pub fn remove_section(&mut self, day_id: &str, index: usize) -> Result<(), LifecycleError> {
        let day = self.day_mut(day_id)?;
        if index >= day.sections.len() {
            return Err(LifecycleError::SectionNotFound {
                day_id: day_id.to_string(),
                index,
            });
        }
        day.sections.remove(index);
        Ok(())
    }

    /// Append a row with the default prescription. Returns its id.
    pub fn add_row(&mut self, day_id: &str, section: usize) -> Result<String, LifecycleError> {
        let row = TrainingRow::new();
        let id = row.id.clone();
        self.section_mut(day_id, section)?.rows.push(row);
        Ok(id)
    }

    /// Edit a row in place (sets, reps, rest, ...).
    pub fn update_row<F>(
        &mut self,
        day_id: &str,
        section: usize,
        row_id: &str,
        edit: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut TrainingRow),
    {
        edit(self.row_mut(day_id, section, row_id)?);
        Ok(())
    }

    pub fn remove_row(
        &mut self,
        day_id: &str,
        section: usize,
        row_id: &str,
    ) -> Result<(), LifecycleError> {
        let rows = &mut self.section_mut(day_id, section)?.rows;
        let before = rows.len();
        rows.retain(|r| r.id != row_id);
        if rows.len() == before {
            return Err(LifecycleError::RowNotFound(row_id.to_string()));
        }
        Ok(())
    }

    /// Append a catalog movement to the row's description.
    ///
    /// Existing text is kept and joined with `" + "`, so picking two
    /// movements builds a superset. The row takes the entry's video link
    /// if it has none yet.
    pub fn append_movement(
        &mut self,
        day_id: &str,
        section: usize,
        row_id: &str,
        entry: &CatalogEntry,
    ) -> Result<(), LifecycleError> {
        let row = self.row_mut(day_id, section, row_id)?;
        append_composite(&mut row.movement_description, &entry.name);
        if row.video_url.is_none() {
            row.video_url = entry.video_url.clone();
        }
        Ok(())
    }

    /// Append a nutrition entry to a day. Returns its id.
    pub fn add_nutrition(
        &mut self,
        day_id: &str,
        time_slot: impl Into<String>,
    ) -> Result<String, LifecycleError> {
        let id = Uuid::new_v4().to_string();
        self.day_mut(day_id)?.nutrition_entries.push(NutritionEntry {
            id: id.clone(),
            time_slot: time_slot.into(),
            description: String::new(),
        });
        Ok(id)
    }

    pub fn set_nutrition_time(
        &mut self,
        day_id: &str,
        entry_id: &str,
        time_slot: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        self.nutrition_mut(day_id, entry_id)?.time_slot = time_slot.into();
        Ok(())
    }

    /// Append a catalog food to a nutrition entry, same rule as movements.
    pub fn append_food(
        &mut self,
        day_id: &str,
        entry_id: &str,
        food: &CatalogEntry,
    ) -> Result<(), LifecycleError> {
        let entry = self.nutrition_mut(day_id, entry_id)?;
        append_composite(&mut entry.description, &food.name);
        Ok(())
    }

    pub fn remove_nutrition(&mut self, day_id: &str, entry_id: &str) -> Result<(), LifecycleError> {
        let entries = &mut self.day_mut(day_id)?.nutrition_entries;
        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        if entries.len() == before {
            return Err(LifecycleError::NutritionEntryNotFound(entry_id.to_string()));
        }
        Ok(())
    }

    /// Turn the working days into an immutable Program and advance the
    /// request to `PLAN_READY`.
    ///
    /// Pure: nothing is produced unless every check passes. The end date is
    /// the start date plus the request's duration class.
    pub fn publish(
        &self,
        request: &EngagementRequest,
        caller: &Caller,
        start_date: NaiveDate,
    ) -> Result<Publication, LifecycleError> {
        if request.id != self.request_id {
            return Err(LifecycleError::RequestMismatch {
                expected: self.request_id.clone(),
                actual: request.id.clone(),
            });
        }
        if self.days.is_empty() {
            return Err(LifecycleError::EmptyProgram);
        }

        let ready = request.mark_plan_ready(caller)?;
        let end_date = start_date
            .checked_add_signed(Duration::weeks(self.duration_class.weeks()))
            .ok_or(LifecycleError::DateOutOfRange)?;

        let program = Program {
            id: Uuid::new_v4().to_string(),
            request_id: self.request_id.clone(),
            subject_id: self.subject_id.clone(),
            authority_id: caller.identity.clone(),
            start_date,
            end_date,
            days: self.days.clone(),
            created_at: Utc::now(),
        };

        tracing::info!(
            request_id = %program.request_id,
            program_id = %program.id,
            days = program.days.len(),
            "program published"
        );

        Ok(Publication {
            program,
            request: ready,
        })
    }

    fn day_mut(&mut self, day_id: &str) -> Result<&mut TrainingDay, LifecycleError> {
        self.days
            .iter_mut()
            .find(|d| d.id == day_id)
            .ok_or_else(|| LifecycleError::DayNotFound(day_id.to_string()))
    }

    fn section_mut(
        &mut self,
        day_id: &str,
        index: usize,
    ) -> Result<&mut TrainingSection, LifecycleError> {
        self.day_mut(day_id)?
            .sections
            .get_mut(index)
            .ok_or_else(|| LifecycleError::SectionNotFound {
                day_id: day_id.to_string(),
                index,
            })
    }

    fn row_mut(
        &mut self,
        day_id: &str,
        section: usize,
        row_id: &str,
    ) -> Result<&mut TrainingRow, LifecycleError> {
        self.section_mut(day_id, section)?
            .rows
            .iter_mut()
            .find(|r| r.id == row_id)
            .ok_or_else(|| LifecycleError::RowNotFound(row_id.to_string()))
    }

    fn nutrition_mut(
        &mut self,
        day_id: &str,
        entry_id: &str,
    ) -> Result<&mut NutritionEntry, LifecycleError> {
        self.day_mut(day_id)?
            .nutrition_entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| LifecycleError::NutritionEntryNotFound(entry_id.to_string()))
    }
}

fn append_composite(text: &mut String, name: &str) {
    if !text.is_empty() {
        text.push_str(COMPOSITE_SEPARATOR);
    }
    text.push_str(name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{authority, new_request, subject, waiting_for_plan};

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    }

    #[test]
    fn start_requires_waiting_for_plan() {
        let result = ProgramBuilder::start(&new_request(), &authority());
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::PlanReady,
                ..
            })
        ));
    }

    #[test]
    fn start_requires_authority() {
        let result = ProgramBuilder::start(&waiting_for_plan(), &subject());
        assert!(matches!(result, Err(LifecycleError::ActorNotAllowed { .. })));
    }

    #[test]
    fn start_opens_day_one_with_main_section() {
        let builder = ProgramBuilder::start(&waiting_for_plan(), &authority()).unwrap();
        assert_eq!(builder.days().len(), 1);
        assert_eq!(builder.days()[0].day_number, 1);
        assert_eq!(builder.days()[0].sections[0].section_type, SectionType::Main);
    }

    #[test]
    fn removing_a_day_renumbers_the_rest() {
        let mut builder = ProgramBuilder::start(&waiting_for_plan(), &authority()).unwrap();
        let day1 = builder.days()[0].id.clone();
        let day2 = builder.add_day();
        let day3 = builder.add_day();
        assert_eq!(builder.days()[2].day_number, 3);

        builder.remove_day(&day1).unwrap();
        let numbers: Vec<u32> = builder.days().iter().map(|d| d.day_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(builder.days()[0].id, day2);
        assert_eq!(builder.days()[1].id, day3);

        assert!(matches!(
            builder.remove_day(&day1),
            Err(LifecycleError::DayNotFound(_))
        ));
    }

    #[test]
    fn sections_and_rows_add_edit_remove() {
        let mut builder = ProgramBuilder::start(&waiting_for_plan(), &authority()).unwrap();
        let day = builder.days()[0].id.clone();

        let warm = builder.add_section(&day, SectionType::WarmUp).unwrap();
        assert_eq!(warm, 1);
        builder.set_section_type(&day, warm, SectionType::Aerobic).unwrap();

        let row = builder.add_row(&day, warm).unwrap();
        builder
            .update_row(&day, warm, &row, |r| {
                r.sets = "4".to_string();
                r.rest_interval = "90s".to_string();
            })
            .unwrap();
        let section = &builder.days()[0].sections[warm];
        assert_eq!(section.section_type, SectionType::Aerobic);
        assert_eq!(section.rows[0].sets, "4");

        builder.remove_row(&day, warm, &row).unwrap();
        assert!(builder.days()[0].sections[warm].rows.is_empty());
        assert!(matches!(
            builder.remove_row(&day, warm, &row),
            Err(LifecycleError::RowNotFound(_))
        ));

        builder.remove_section(&day, warm).unwrap();
        assert_eq!(builder.days()[0].sections.len(), 1);
        assert!(matches!(
            builder.add_row(&day, 5),
            Err(LifecycleError::SectionNotFound { index: 5, .. })
        ));
    }

    #[test]
    fn catalog_picks_append_rather_than_replace() {
        let mut builder = ProgramBuilder::start(&waiting_for_plan(), &authority()).unwrap();
        let day = builder.days()[0].id.clone();
        let row = builder.add_row(&day, 0).unwrap();

        let mut squat = CatalogEntry::exercise("e1", "Back Squat", "legs");
        squat.video_url = Some("https://video.example/squat".to_string());
        let lunge = CatalogEntry::exercise("e2", "Walking Lunge", "legs");

        builder.append_movement(&day, 0, &row, &squat).unwrap();
        builder.append_movement(&day, 0, &row, &lunge).unwrap();

        let r = &builder.days()[0].sections[0].rows[0];
        assert_eq!(r.movement_description, "Back Squat + Walking Lunge");
        assert_eq!(r.video_url.as_deref(), Some("https://video.example/squat"));

        let meal = builder.add_nutrition(&day, "breakfast").unwrap();
        builder
            .append_food(&day, &meal, &CatalogEntry::food("f1", "Oats", "grain"))
            .unwrap();
        builder
            .append_food(&day, &meal, &CatalogEntry::food("f2", "Banana", "fruit"))
            .unwrap();
        builder.set_nutrition_time(&day, &meal, "pre-workout").unwrap();
        let entry = &builder.days()[0].nutrition_entries[0];
        assert_eq!(entry.description, "Oats + Banana");
        assert_eq!(entry.time_slot, "pre-workout");

        builder.remove_nutrition(&day, &meal).unwrap();
        assert!(builder.days()[0].nutrition_entries.is_empty());
    }

    #[test]
    fn publish_produces_program_and_plan_ready_request() {
        let request = waiting_for_plan();
        let mut builder = ProgramBuilder::start(&request, &authority()).unwrap();
        let day = builder.days()[0].id.clone();
        builder.add_row(&day, 0).unwrap();

        let publication = builder.publish(&request, &authority(), start_date()).unwrap();
        assert_eq!(publication.request.status, RequestStatus::PlanReady);
        assert_eq!(publication.request.id, request.id);

        let program = &publication.program;
        assert_eq!(program.request_id, request.id);
        assert_eq!(program.subject_id, "S1");
        assert_eq!(program.authority_id, "ADMIN");
        assert_eq!(program.total_rows(), 1);
        assert_eq!(
            program.end_date,
            NaiveDate::from_ymd_opt(2026, 2, 7).unwrap()
        );
    }

    #[test]
    fn publish_with_no_days_is_rejected() {
        let request = waiting_for_plan();
        let mut builder = ProgramBuilder::start(&request, &authority()).unwrap();
        let day = builder.days()[0].id.clone();
        builder.remove_day(&day).unwrap();
        assert!(matches!(
            builder.publish(&request, &authority(), start_date()),
            Err(LifecycleError::EmptyProgram)
        ));
    }

    #[test]
    fn publish_against_another_request_is_rejected() {
        let request = waiting_for_plan();
        let builder = ProgramBuilder::start(&request, &authority()).unwrap();
        let other = waiting_for_plan();
        assert!(matches!(
            builder.publish(&other, &authority(), start_date()),
            Err(LifecycleError::RequestMismatch { .. })
        ));
    }

    #[test]
    fn publish_twice_fails_on_the_already_ready_request() {
        let request = waiting_for_plan();
        let builder = ProgramBuilder::start(&request, &authority()).unwrap();
        let first = builder.publish(&request, &authority(), start_date()).unwrap();
        let again = builder.publish(&first.request, &authority(), start_date());
        assert!(matches!(
            again,
            Err(LifecycleError::InvalidTransition {
                from: RequestStatus::PlanReady,
                ..
            })
        ));
    }
}
