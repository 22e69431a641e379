use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time, truncated to whole seconds.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown grade '{0}', expected one of A, B, C, D, F")]
pub struct ParseGradeError(pub String);

impl FromStr for Grade {
    type Err = ParseGradeError;

    /// Accepts a bare letter or a decorated label such as "🎯 A".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letter = s.split_whitespace().last().unwrap_or("");
        match letter.to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            _ => Err(ParseGradeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl PerformanceTier {
    pub const ALL: [PerformanceTier; 4] = [
        PerformanceTier::Excellent,
        PerformanceTier::Good,
        PerformanceTier::Average,
        PerformanceTier::NeedsImprovement,
    ];

    pub fn from_score(performance: f64) -> Self {
        if performance >= 90.0 {
            PerformanceTier::Excellent
        } else if performance >= 75.0 {
            PerformanceTier::Good
        } else if performance >= 60.0 {
            PerformanceTier::Average
        } else {
            PerformanceTier::NeedsImprovement
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Excellent",
            PerformanceTier::Good => "Good",
            PerformanceTier::Average => "Average",
            PerformanceTier::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttendanceTier {
    Excellent,
    Good,
    Average,
    Poor,
}

impl AttendanceTier {
    pub const ALL: [AttendanceTier; 4] = [
        AttendanceTier::Excellent,
        AttendanceTier::Good,
        AttendanceTier::Average,
        AttendanceTier::Poor,
    ];

    pub fn from_rate(attendance: f64) -> Self {
        if attendance >= 95.0 {
            AttendanceTier::Excellent
        } else if attendance >= 85.0 {
            AttendanceTier::Good
        } else if attendance >= 75.0 {
            AttendanceTier::Average
        } else {
            AttendanceTier::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceTier::Excellent => "Excellent",
            AttendanceTier::Good => "Good",
            AttendanceTier::Average => "Average",
            AttendanceTier::Poor => "Poor",
        }
    }
}

impl fmt::Display for AttendanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: String,
    pub description: String,
    pub timestamp: NaiveDateTime,
    pub sequence_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub age: i32,
    pub grade: Grade,
    pub email: String,
    pub performance: f64,
    pub attendance: f64,
    pub phone: String,
    pub course: String,
    pub department: String,
    pub enrollment_date: NaiveDate,
    pub last_updated: NaiveDateTime,
    pub activities: Vec<Activity>,
}

impl StudentRecord {
    /// Builds a record from an already validated draft, trimming text fields.
    pub fn from_draft(id: String, draft: &StudentDraft, enrollment_date: NaiveDate) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            age: draft.age,
            grade: draft.grade,
            email: draft.email.trim().to_string(),
            performance: draft.performance,
            attendance: draft.attendance.unwrap_or(DEFAULT_ATTENDANCE),
            phone: draft.phone.trim().to_string(),
            course: draft.course.trim().to_string(),
            department: draft.department.trim().to_string(),
            enrollment_date,
            last_updated: now_timestamp(),
            activities: Vec::new(),
        }
    }

    pub fn performance_tier(&self) -> PerformanceTier {
        PerformanceTier::from_score(self.performance)
    }

    pub fn attendance_tier(&self) -> AttendanceTier {
        AttendanceTier::from_rate(self.attendance)
    }

    pub fn add_activity(&mut self, kind: &str, description: &str) -> &Activity {
        let sequence_id = self.activities.len() + 1;
        self.activities.push(Activity {
            kind: kind.to_string(),
            description: description.to_string(),
            timestamp: now_timestamp(),
            sequence_id,
        });
        &self.activities[sequence_id - 1]
    }

    /// The candidate this record would become after `patch`, for pre-update validation.
    pub fn draft_with(&self, patch: &StudentPatch) -> StudentDraft {
        StudentDraft {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            age: patch.age.unwrap_or(self.age),
            grade: patch.grade.unwrap_or(self.grade),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            performance: patch.performance.unwrap_or(self.performance),
            attendance: Some(patch.attendance.unwrap_or(self.attendance)),
            phone: patch.phone.clone().unwrap_or_else(|| self.phone.clone()),
            course: patch.course.clone().unwrap_or_else(|| self.course.clone()),
            department: patch
                .department
                .clone()
                .unwrap_or_else(|| self.department.clone()),
            enrollment_date: Some(self.enrollment_date),
        }
    }
}

pub const DEFAULT_AGE: i32 = 18;
pub const DEFAULT_GRADE: Grade = Grade::B;
pub const DEFAULT_PERFORMANCE: f64 = 75.0;
pub const DEFAULT_ATTENDANCE: f64 = 95.0;
pub const DEFAULT_DEPARTMENT: &str = "General";

/// Candidate fields submitted for registration, update or import.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDraft {
    pub name: String,
    pub age: i32,
    pub grade: Grade,
    pub email: String,
    pub performance: f64,
    pub attendance: Option<f64>,
    pub phone: String,
    pub course: String,
    pub department: String,
    pub enrollment_date: Option<NaiveDate>,
}

impl Default for StudentDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: DEFAULT_AGE,
            grade: DEFAULT_GRADE,
            email: String::new(),
            performance: DEFAULT_PERFORMANCE,
            attendance: None,
            phone: String::new(),
            course: String::new(),
            department: DEFAULT_DEPARTMENT.to_string(),
            enrollment_date: None,
        }
    }
}

/// Partial update; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub department: Option<String>,
    pub grade: Option<Grade>,
    pub performance: Option<f64>,
    pub attendance: Option<f64>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        *self == StudentPatch::default()
    }

    pub fn apply_to(&self, record: &mut StudentRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(age) = self.age {
            record.age = age;
        }
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            record.phone = phone.clone();
        }
        if let Some(course) = &self.course {
            record.course = course.clone();
        }
        if let Some(department) = &self.department {
            record.department = department.clone();
        }
        if let Some(grade) = self.grade {
            record.grade = grade;
        }
        if let Some(performance) = self.performance {
            record.performance = performance;
        }
        if let Some(attendance) = self.attendance {
            record.attendance = attendance;
        }
    }
}

/// Exact-match narrowing applied on top of a text search.
#[derive(Debug, Clone, Default)]
pub struct DirectoryFilter {
    pub tier: Option<PerformanceTier>,
    pub grade: Option<Grade>,
    pub department: Option<String>,
}

impl DirectoryFilter {
    pub fn matches(&self, record: &StudentRecord) -> bool {
        self.tier.map_or(true, |tier| record.performance_tier() == tier)
            && self.grade.map_or(true, |grade| record.grade == grade)
            && self
                .department
                .as_deref()
                .map_or(true, |department| record.department == department)
    }
}
