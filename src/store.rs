use std::collections::{BTreeSet, HashSet, TryReserveError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Outcome, StoreError, StoreResult};
use crate::models::{
    now_timestamp, today, DirectoryFilter, Grade, StudentDraft, StudentPatch, StudentRecord,
};
use crate::stats::{self, PerformanceAnalysis, StatisticsEngine, StatisticsSnapshot};
use crate::validation;

pub const ID_PREFIX: &str = "ST";
const ID_WIDTH: usize = 3;

/// A record that failed the admission rules while already in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityIssue {
    pub id: String,
    pub errors: Vec<String>,
}

/// In-memory roster plus the statistics cache derived from it.
///
/// The record list is only reachable through these methods so that every mutation
/// also clears the cache.
#[derive(Debug, Clone, Default)]
pub struct StudentManager {
    pub(crate) records: Vec<StudentRecord>,
    pub(crate) stats: StatisticsEngine,
}

impl StudentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_ttl(ttl: Duration) -> Self {
        Self {
            records: Vec::new(),
            stats: StatisticsEngine::new(ttl),
        }
    }

    /// Demonstration roster of ten students with a few logged activities.
    pub fn with_sample_data(ttl: Duration) -> Self {
        let mut manager = Self::with_cache_ttl(ttl);
        manager.records = sample_records();
        manager
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Next sequential id: `ST001` for an empty roster, otherwise one past the highest
    /// numeric suffix. Ids not shaped like `ST` + digits are ignored.
    pub fn next_id(&self) -> String {
        let next = self
            .records
            .iter()
            .filter_map(|record| parse_id_sequence(&record.id))
            .max()
            .map_or(1, |max| max + 1);
        format_id(next)
    }

    pub fn add(&mut self, record: StudentRecord) -> StoreResult {
        self.push_record(record)
            .map_err(|err| StoreError::Internal(format!("Error adding student: {err}")))?;
        self.clear_cache();
        Ok(Outcome::done("Student added successfully"))
    }

    /// Appends without touching the cache; batch callers clear it once at the end.
    pub(crate) fn push_record(
        &mut self,
        record: StudentRecord,
    ) -> Result<(), TryReserveError> {
        self.records.try_reserve(1)?;
        info!(id = %record.id, name = %record.name, "student added");
        self.records.push(record);
        Ok(())
    }

    /// Validates a candidate, assigns the next id and stores it. Returns the new id.
    pub fn register(&mut self, draft: &StudentDraft) -> StoreResult<String> {
        let errors = validation::validate(draft);
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let id = self.next_id();
        let enrolled = draft.enrollment_date.unwrap_or_else(today);
        self.add(StudentRecord::from_draft(id.clone(), draft, enrolled))?;
        Ok(Outcome::with_value(
            format!("Student registered successfully! Student ID: {id}"),
            id,
        ))
    }

    pub fn get(&self, id: &str) -> Result<&StudentRecord, StoreError> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound)
    }

    pub fn update(&mut self, id: &str, patch: &StudentPatch) -> StoreResult {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound)?;

        patch.apply_to(record);
        record.last_updated = now_timestamp();
        info!(id, "student updated");
        self.clear_cache();
        Ok(Outcome::done("Student updated successfully"))
    }

    /// Validates the record as it would look after `patch`, then applies it.
    pub fn amend(&mut self, id: &str, patch: &StudentPatch) -> StoreResult {
        let errors = validation::validate(&self.get(id)?.draft_with(patch));
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }
        self.update(id, patch)
    }

    pub fn delete(&mut self, id: &str) -> StoreResult {
        let position = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or(StoreError::NotFound)?;

        self.records.remove(position);
        info!(id, "student deleted");
        self.clear_cache();
        Ok(Outcome::done("Student deleted successfully"))
    }

    /// Removes every listed id in one pass; unknown ids are ignored.
    pub fn bulk_delete<S: AsRef<str>>(&mut self, ids: &[S]) -> StoreResult<usize> {
        let targets: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let before = self.records.len();
        self.records
            .retain(|record| !targets.contains(record.id.as_str()));
        let deleted = before - self.records.len();

        info!(deleted, requested = targets.len(), "bulk delete");
        self.clear_cache();
        Ok(Outcome::with_value(
            format!("Successfully deleted {deleted} students"),
            deleted,
        ))
    }

    /// Appends to a student's activity log; returns the activity's sequence id.
    pub fn add_activity(&mut self, id: &str, kind: &str, description: &str) -> StoreResult<usize> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound)?;

        let sequence_id = record.add_activity(kind, description).sequence_id;
        record.last_updated = now_timestamp();
        info!(id, kind, sequence_id, "activity logged");
        self.clear_cache();
        Ok(Outcome::with_value("Activity recorded", sequence_id))
    }

    /// Case-insensitive substring match over name, email, course, department, phone and
    /// id. An empty query returns the whole roster in store order.
    pub fn search(&self, query: &str) -> Vec<&StudentRecord> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return self.records.iter().collect();
        }

        self.records
            .iter()
            .filter(|record| {
                [
                    &record.name,
                    &record.email,
                    &record.course,
                    &record.department,
                    &record.phone,
                    &record.id,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn filter(&self, query: &str, filter: &DirectoryFilter) -> Vec<&StudentRecord> {
        self.search(query)
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect()
    }

    pub fn departments(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.department.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn clear_cache(&mut self) {
        debug!("statistics cache cleared");
        self.stats.invalidate();
    }

    pub fn statistics(&mut self) -> Option<StatisticsSnapshot> {
        self.stats.statistics(&self.records)
    }

    pub fn statistics_at(&mut self, now: Instant) -> Option<StatisticsSnapshot> {
        self.stats.statistics_at(&self.records, now)
    }

    pub fn performance_analysis(&self) -> Option<PerformanceAnalysis> {
        stats::performance_analysis(&self.records)
    }

    /// Runs the admission rules over every stored record.
    pub fn integrity_check(&self) -> Vec<IntegrityIssue> {
        self.records
            .iter()
            .filter_map(|record| {
                let errors = validation::validate(&record.draft_with(&StudentPatch::default()));
                (!errors.is_empty()).then(|| IntegrityIssue {
                    id: record.id.clone(),
                    errors,
                })
            })
            .collect()
    }
}

fn parse_id_sequence(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn format_id(sequence: u64) -> String {
    format!("{ID_PREFIX}{sequence:0width$}", width = ID_WIDTH)
}

fn sample_records() -> Vec<StudentRecord> {
    let students = [
        ("John Smith", 20, Grade::A, "john.smith@university.edu", 92.0, "+1234567890", "Computer Science", "Engineering", 96.5),
        ("Emma Johnson", 22, Grade::B, "emma.johnson@university.edu", 78.5, "+1234567891", "Data Science", "Computer Science", 88.2),
        ("Michael Brown", 21, Grade::A, "michael.brown@university.edu", 88.0, "+1234567892", "Artificial Intelligence", "Computer Science", 94.7),
        ("Sarah Davis", 19, Grade::C, "sarah.davis@university.edu", 65.5, "+1234567893", "Biology", "Life Sciences", 92.1),
        ("David Wilson", 23, Grade::B, "david.wilson@university.edu", 72.0, "+1234567894", "Mechanical Engineering", "Engineering", 85.4),
        ("Lisa Anderson", 20, Grade::A, "lisa.anderson@university.edu", 95.0, "+1234567895", "Business Administration", "Business", 98.2),
        ("Robert Garcia", 22, Grade::C, "robert.garcia@university.edu", 62.0, "+1234567896", "Chemistry", "Science", 76.8),
        ("Maria Martinez", 21, Grade::B, "maria.martinez@university.edu", 79.0, "+1234567897", "Psychology", "Social Sciences", 89.3),
        ("James Taylor", 24, Grade::A, "james.taylor@university.edu", 91.5, "+1234567898", "Electrical Engineering", "Engineering", 93.7),
        ("Sophia Clark", 19, Grade::B, "sophia.clark@university.edu", 81.0, "+1234567899", "Mathematics", "Science", 87.9),
    ];
    let enrolled = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap_or_else(today);

    let mut records: Vec<StudentRecord> = students
        .iter()
        .enumerate()
        .map(
            |(index, (name, age, grade, email, performance, phone, course, department, attendance))| {
                let draft = StudentDraft {
                    name: name.to_string(),
                    age: *age,
                    grade: *grade,
                    email: email.to_string(),
                    performance: *performance,
                    attendance: Some(*attendance),
                    phone: phone.to_string(),
                    course: course.to_string(),
                    department: department.to_string(),
                    enrollment_date: Some(enrolled),
                };
                StudentRecord::from_draft(format_id(index as u64 + 1), &draft, enrolled)
            },
        )
        .collect();

    let activities = [
        ("Assignment", "Completed Advanced Algorithms assignment"),
        ("Project", "Submitted Data Visualization project"),
        ("Exam", "Scored 95% in AI Midterm"),
    ];
    for (record, (kind, description)) in records.iter_mut().zip(activities) {
        record.add_activity(kind, description);
    }

    records
}
