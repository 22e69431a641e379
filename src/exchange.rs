//! CSV import and export of the roster.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Outcome, StoreError, StoreResult};
use crate::models::{
    today, Grade, StudentDraft, StudentRecord, DEFAULT_AGE, DEFAULT_ATTENDANCE,
    DEFAULT_DEPARTMENT, DEFAULT_GRADE, DEFAULT_PERFORMANCE, TIMESTAMP_FORMAT,
};
use crate::store::StudentManager;
use crate::validation;

pub const EXPORT_HEADERS: [&str; 12] = [
    "id",
    "name",
    "age",
    "grade",
    "email",
    "performance",
    "phone",
    "course",
    "department",
    "enrollment_date",
    "attendance",
    "last_updated",
];

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    name: &'a str,
    age: i32,
    grade: Grade,
    email: &'a str,
    performance: f64,
    phone: &'a str,
    course: &'a str,
    department: &'a str,
    enrollment_date: NaiveDate,
    attendance: f64,
    last_updated: String,
}

impl<'a> From<&'a StudentRecord> for ExportRow<'a> {
    fn from(record: &'a StudentRecord) -> Self {
        Self {
            id: &record.id,
            name: &record.name,
            age: record.age,
            grade: record.grade,
            email: &record.email,
            performance: record.performance,
            phone: &record.phone,
            course: &record.course,
            department: &record.department,
            enrollment_date: record.enrollment_date,
            attendance: record.attendance,
            last_updated: record.last_updated.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Columns read on import. Anything else in the file (id, dates) is ignored.
#[derive(Debug, Deserialize)]
struct ImportRow {
    name: Option<String>,
    age: Option<i32>,
    grade: Option<String>,
    email: Option<String>,
    performance: Option<f64>,
    phone: Option<String>,
    course: Option<String>,
    department: Option<String>,
    attendance: Option<f64>,
}

impl ImportRow {
    /// `department_fallback` applies to empty cells; it is "General" only when the file
    /// has no department column at all.
    fn into_draft(
        self,
        enrollment_date: NaiveDate,
        department_fallback: &str,
    ) -> Result<StudentDraft, String> {
        let grade = match self.grade {
            Some(raw) => raw.parse::<Grade>().map_err(|err| err.to_string())?,
            None => DEFAULT_GRADE,
        };

        Ok(StudentDraft {
            name: self.name.unwrap_or_default(),
            age: self.age.unwrap_or(DEFAULT_AGE),
            grade,
            email: self.email.unwrap_or_default(),
            performance: self.performance.unwrap_or(DEFAULT_PERFORMANCE),
            attendance: Some(self.attendance.unwrap_or(DEFAULT_ATTENDANCE)),
            phone: self.phone.unwrap_or_default(),
            course: self.course.unwrap_or_default(),
            department: self
                .department
                .unwrap_or_else(|| department_fallback.to_string()),
            enrollment_date: Some(enrollment_date),
        })
    }
}

/// Every exported column, read back verbatim when restoring a saved roster.
#[derive(Debug, Deserialize)]
struct SnapshotRow {
    id: String,
    name: String,
    age: i32,
    grade: String,
    email: String,
    performance: f64,
    phone: String,
    course: String,
    department: String,
    enrollment_date: NaiveDate,
    attendance: f64,
    last_updated: String,
}

impl SnapshotRow {
    fn into_record(self) -> Result<StudentRecord, String> {
        let grade = self.grade.parse::<Grade>().map_err(|err| err.to_string())?;
        let last_updated = NaiveDateTime::parse_from_str(&self.last_updated, TIMESTAMP_FORMAT)
            .map_err(|err| format!("invalid last_updated '{}': {err}", self.last_updated))?;

        Ok(StudentRecord {
            id: self.id,
            name: self.name,
            age: self.age,
            grade,
            email: self.email,
            performance: self.performance,
            attendance: self.attendance,
            phone: self.phone,
            course: self.course,
            department: self.department,
            enrollment_date: self.enrollment_date,
            last_updated,
            activities: Vec::new(),
        })
    }
}

/// Per-batch result of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
}

impl StudentManager {
    pub fn export_csv(&self) -> StoreResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer
            .write_record(EXPORT_HEADERS)
            .map_err(|err| StoreError::Export(err.to_string()))?;
        for record in &self.records {
            writer
                .serialize(ExportRow::from(record))
                .map_err(|err| StoreError::Export(err.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| StoreError::Export(err.to_string()))?;
        let csv = String::from_utf8(bytes).map_err(|err| StoreError::Export(err.to_string()))?;

        info!(rows = self.records.len(), "roster exported");
        Ok(Outcome::with_value("Data exported successfully", csv))
    }

    /// Imports rows by header name. Bad rows are skipped and reported by their 1-based
    /// position; every accepted row receives a fresh id.
    pub fn import_csv(&mut self, content: &str) -> StoreResult<ImportReport> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());
        let has_department = reader
            .headers()
            .map_err(|err| StoreError::Import(err.to_string()))?
            .iter()
            .any(|header| header == "department");
        let department_fallback = if has_department {
            ""
        } else {
            DEFAULT_DEPARTMENT
        };

        let enrollment_date = today();
        let mut report = ImportReport::default();

        for (index, result) in reader.deserialize::<ImportRow>().enumerate() {
            let row_number = index + 1;
            let draft = match result
                .map_err(|err| err.to_string())
                .and_then(|row| row.into_draft(enrollment_date, department_fallback))
            {
                Ok(draft) => draft,
                Err(reason) => {
                    warn!(row = row_number, %reason, "skipping unreadable import row");
                    report
                        .errors
                        .push(format!("Row {row_number}: Error processing - {reason}"));
                    continue;
                }
            };

            let errors = validation::validate(&draft);
            if !errors.is_empty() {
                warn!(row = row_number, "skipping invalid import row");
                report
                    .errors
                    .push(format!("Row {row_number}: {}", errors.join(", ")));
                continue;
            }

            let record = StudentRecord::from_draft(self.next_id(), &draft, enrollment_date);
            if let Err(err) = self.push_record(record) {
                report
                    .errors
                    .push(format!("Row {row_number}: Error processing - {err}"));
                continue;
            }
            report.imported += 1;
        }

        self.clear_cache();
        info!(
            imported = report.imported,
            rejected = report.errors.len(),
            "roster import finished"
        );
        Ok(Outcome::with_value(
            format!("Successfully imported {} students", report.imported),
            report,
        ))
    }

    /// Loads a file written by `export_csv` back as-is: ids, enrollment dates and
    /// `last_updated` are kept. Unlike `import_csv` this is all-or-nothing; a bad row or
    /// an id already in use rejects the whole file. Activity logs are not part of the
    /// CSV format and start empty.
    pub fn restore_csv(&mut self, content: &str) -> StoreResult<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        let mut seen: HashSet<String> = self.records.iter().map(|r| r.id.clone()).collect();
        let mut restored = Vec::new();
        for (index, result) in reader.deserialize::<SnapshotRow>().enumerate() {
            let row_number = index + 1;
            let record = result
                .map_err(|err| err.to_string())
                .and_then(SnapshotRow::into_record)
                .map_err(|reason| StoreError::Import(format!("Row {row_number}: {reason}")))?;
            if !seen.insert(record.id.clone()) {
                return Err(StoreError::Import(format!(
                    "Row {row_number}: duplicate id {}",
                    record.id
                )));
            }
            restored.push(record);
        }

        let count = restored.len();
        for record in restored {
            self.push_record(record)
                .map_err(|err| StoreError::Internal(format!("Error restoring roster: {err}")))?;
        }
        self.clear_cache();
        info!(restored = count, "roster restored");
        Ok(Outcome::with_value(
            format!("Restored {count} students"),
            count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn export_writes_fixed_header_and_rows() {
        let manager = StudentManager::with_sample_data(Duration::from_secs(30));
        let csv = manager.export_csv().unwrap().value;
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("id,name,age,grade,email,performance,phone,course,department,enrollment_date,attendance,last_updated")
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with(
            "ST001,John Smith,20,A,john.smith@university.edu,92.0,+1234567890,Computer Science,Engineering,2023-09-01,96.5,"
        ));
        assert_eq!(csv.lines().count(), 11);
    }

    #[test]
    fn export_of_empty_roster_is_header_only() {
        let csv = StudentManager::new().export_csv().unwrap().value;
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn import_applies_defaults_for_missing_columns() {
        let mut manager = StudentManager::new();
        let outcome = manager
            .import_csv("name,email,course\nNoor Haddad,noor@example.edu,Geology\n")
            .unwrap();
        assert_eq!(outcome.message, "Successfully imported 1 students");
        assert!(outcome.value.errors.is_empty());

        let record = manager.get("ST001").unwrap();
        assert_eq!(record.age, 18);
        assert_eq!(record.grade, Grade::B);
        assert_eq!(record.performance, 75.0);
        assert_eq!(record.attendance, 95.0);
        assert_eq!(record.department, "General");
        assert_eq!(record.phone, "");
        assert_eq!(record.enrollment_date, today());
    }

    #[test]
    fn import_skips_invalid_rows_and_numbers_them() {
        let mut manager = StudentManager::new();
        let content = "\
name,age,email,performance,course
Avery Lee,20,avery@example.edu,88,Biology
A,200,bad,50,Biology
Jules Moreno,abc,jules@example.edu,70,Physics
Kiara Patel,22,kiara@example.edu,91,Chemistry
";
        let report = manager.import_csv(content).unwrap().value;

        assert_eq!(report.imported, 2);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(
            report.errors[0],
            "Row 2: Name must be at least 2 characters long, Age must be between 15 and 70, Valid email address is required"
        );
        assert!(report.errors[1].starts_with("Row 3: Error processing - "));

        let ids: Vec<&str> = manager.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["ST001", "ST002"]);
    }

    #[test]
    fn import_never_reuses_file_ids() {
        let mut manager = StudentManager::with_sample_data(Duration::from_secs(30));
        let content = "id,name,email,course\nST001,Noor Haddad,noor@example.edu,Geology\n";
        manager.import_csv(content).unwrap();
        assert_eq!(manager.get("ST011").unwrap().name, "Noor Haddad");
        assert_eq!(manager.get("ST001").unwrap().name, "John Smith");
    }

    #[test]
    fn import_rejects_unknown_grades() {
        let mut manager = StudentManager::new();
        let report = manager
            .import_csv("name,grade,email,course\nNoor Haddad,Z,noor@example.edu,Geology\n")
            .unwrap()
            .value;
        assert_eq!(report.imported, 0);
        assert!(report.errors[0].contains("Unknown grade 'Z'"));
    }

    #[test]
    fn empty_department_cell_stays_empty_when_column_exists() {
        let mut manager = StudentManager::new();
        manager
            .import_csv("name,email,course,department\nNoor Haddad,noor@example.edu,Geology,\n")
            .unwrap();
        assert_eq!(manager.get("ST001").unwrap().department, "");
    }

    #[test]
    fn restore_keeps_ids_and_dates() {
        let mut original = StudentManager::with_sample_data(Duration::from_secs(30));
        original.delete("ST002").unwrap();
        let csv = original.export_csv().unwrap().value;

        let mut copy = StudentManager::new();
        let outcome = copy.restore_csv(&csv).unwrap();
        assert_eq!(outcome.value, 9);
        assert_eq!(copy.get("ST003").unwrap().name, "Michael Brown");
        assert_eq!(copy.get("ST002").unwrap_err(), StoreError::NotFound);

        let first = copy.get("ST001").unwrap();
        let source = original.get("ST001").unwrap();
        assert_eq!(first.enrollment_date, NaiveDate::from_ymd_opt(2023, 9, 1).unwrap());
        assert_eq!(
            first.last_updated.format(TIMESTAMP_FORMAT).to_string(),
            source.last_updated.format(TIMESTAMP_FORMAT).to_string()
        );
        assert!(first.activities.is_empty());
        assert_eq!(copy.next_id(), "ST011");
    }

    #[test]
    fn restore_rejects_the_whole_file_on_a_bad_row() {
        let csv = StudentManager::with_sample_data(Duration::from_secs(30))
            .export_csv()
            .unwrap()
            .value;
        let broken = csv.replacen(",A,", ",Z,", 1);

        let mut manager = StudentManager::new();
        let err = manager.restore_csv(&broken).unwrap_err();
        assert!(matches!(err, StoreError::Import(ref msg) if msg.starts_with("Row 1:")));
        assert!(manager.is_empty());
    }

    #[test]
    fn restore_rejects_ids_already_in_use() {
        let mut manager = StudentManager::with_sample_data(Duration::from_secs(30));
        let csv = manager.export_csv().unwrap().value;
        let err = manager.restore_csv(&csv).unwrap_err();
        assert!(err.to_string().contains("duplicate id ST001"));
        assert_eq!(manager.len(), 10);
    }

    #[test]
    fn quoted_fields_survive_export() {
        let mut manager = StudentManager::new();
        manager
            .import_csv("name,email,course\n\"Lee, Avery\",avery@example.edu,\"Art, History\"\n")
            .unwrap();
        let csv = manager.export_csv().unwrap().value;
        assert!(csv.contains("\"Lee, Avery\""));

        let mut copy = StudentManager::new();
        copy.import_csv(&csv).unwrap();
        assert_eq!(copy.get("ST001").unwrap().course, "Art, History");
    }
}
