use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::models::{AttendanceTier, Grade, PerformanceTier, StudentRecord};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const PASS_MARK: f64 = 60.0;
pub const EXCELLENCE_MARK: f64 = 90.0;

/// First-versus-last comparison of performance in store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_students: usize,
    pub average_performance: f64,
    pub average_age: f64,
    pub average_attendance: f64,
    pub status_distribution: BTreeMap<PerformanceTier, usize>,
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub attendance_distribution: BTreeMap<AttendanceTier, usize>,
    pub course_distribution: BTreeMap<String, usize>,
    pub department_distribution: BTreeMap<String, usize>,
    pub performance_trend: Trend,
    pub top_performer: String,
    pub most_attended: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
    pub max_performance: f64,
    pub min_performance: f64,
    pub median_performance: f64,
    pub pass_rate: f64,
    pub excellence_rate: f64,
    pub avg_attendance: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone)]
struct StatsCache {
    snapshot: Option<StatisticsSnapshot>,
    computed_at: Instant,
}

/// Owns the single statistics cache. Callers must `invalidate` after every mutation.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    ttl: Duration,
    cache: Option<StatsCache>,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl StatisticsEngine {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, cache: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn statistics(&mut self, records: &[StudentRecord]) -> Option<StatisticsSnapshot> {
        self.statistics_at(records, Instant::now())
    }

    /// Serves the cached snapshot while it is younger than the TTL, otherwise recomputes.
    pub fn statistics_at(
        &mut self,
        records: &[StudentRecord],
        now: Instant,
    ) -> Option<StatisticsSnapshot> {
        if let Some(cache) = &self.cache {
            if now.saturating_duration_since(cache.computed_at) < self.ttl {
                debug!("serving cached statistics snapshot");
                return cache.snapshot.clone();
            }
        }

        debug!(records = records.len(), "recomputing statistics snapshot");
        let snapshot = compute_statistics(records);
        self.cache = Some(StatsCache {
            snapshot: snapshot.clone(),
            computed_at: now,
        });
        snapshot
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }
}

pub fn compute_statistics(records: &[StudentRecord]) -> Option<StatisticsSnapshot> {
    let (first, last) = (records.first()?, records.last()?);
    let count = records.len() as f64;

    let mut status_distribution: BTreeMap<PerformanceTier, usize> =
        PerformanceTier::ALL.iter().map(|tier| (*tier, 0)).collect();
    let mut grade_distribution: BTreeMap<Grade, usize> =
        Grade::ALL.iter().map(|grade| (*grade, 0)).collect();
    let mut attendance_distribution: BTreeMap<AttendanceTier, usize> =
        AttendanceTier::ALL.iter().map(|tier| (*tier, 0)).collect();
    let mut course_distribution = BTreeMap::new();
    let mut department_distribution = BTreeMap::new();

    let mut total_performance = 0.0;
    let mut total_age = 0.0;
    let mut total_attendance = 0.0;
    let mut top_performer = first;
    let mut most_attended = first;

    for record in records {
        total_performance += record.performance;
        total_age += f64::from(record.age);
        total_attendance += record.attendance;

        *status_distribution.entry(record.performance_tier()).or_insert(0) += 1;
        *grade_distribution.entry(record.grade).or_insert(0) += 1;
        *attendance_distribution
            .entry(record.attendance_tier())
            .or_insert(0) += 1;
        *course_distribution.entry(record.course.clone()).or_insert(0) += 1;
        *department_distribution
            .entry(record.department.clone())
            .or_insert(0) += 1;

        if record.performance > top_performer.performance {
            top_performer = record;
        }
        if record.attendance > most_attended.attendance {
            most_attended = record;
        }
    }

    let performance_trend = match last.performance.partial_cmp(&first.performance) {
        Some(Ordering::Greater) => Trend::Improving,
        Some(Ordering::Less) => Trend::Declining,
        _ => Trend::Stable,
    };

    Some(StatisticsSnapshot {
        total_students: records.len(),
        average_performance: round_one_decimal(total_performance / count),
        average_age: round_one_decimal(total_age / count),
        average_attendance: round_one_decimal(total_attendance / count),
        status_distribution,
        grade_distribution,
        attendance_distribution,
        course_distribution,
        department_distribution,
        performance_trend,
        top_performer: top_performer.name.clone(),
        most_attended: most_attended.name.clone(),
    })
}

pub fn performance_analysis(records: &[StudentRecord]) -> Option<PerformanceAnalysis> {
    if records.is_empty() {
        return None;
    }

    let performances: Vec<f64> = records.iter().map(|r| r.performance).collect();
    let attendances: Vec<f64> = records.iter().map(|r| r.attendance).collect();
    let count = records.len() as f64;

    let passed = performances.iter().filter(|p| **p >= PASS_MARK).count() as f64;
    let excellent = performances
        .iter()
        .filter(|p| **p >= EXCELLENCE_MARK)
        .count() as f64;

    Some(PerformanceAnalysis {
        max_performance: performances.iter().copied().fold(f64::MIN, f64::max),
        min_performance: performances.iter().copied().fold(f64::MAX, f64::min),
        median_performance: median(&performances),
        pass_rate: passed / count * 100.0,
        excellence_rate: excellent / count * 100.0,
        avg_attendance: attendances.iter().sum::<f64>() / count,
        correlation: pearson_correlation(&performances, &attendances),
    })
}

pub fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0
    }
}

/// Pearson coefficient; 0 for fewer than two points or a constant series.
fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    covariance / (var_x.sqrt() * var_y.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{today, StudentDraft};

    fn student(id: &str, name: &str, performance: f64, attendance: f64) -> StudentRecord {
        let draft = StudentDraft {
            name: name.to_string(),
            age: 20,
            email: format!("{}@example.edu", id.to_lowercase()),
            performance,
            attendance: Some(attendance),
            course: "Mathematics".to_string(),
            department: "Science".to_string(),
            ..StudentDraft::default()
        };
        StudentRecord::from_draft(id.to_string(), &draft, today())
    }

    #[test]
    fn empty_roster_has_no_statistics() {
        assert!(compute_statistics(&[]).is_none());
        assert!(performance_analysis(&[]).is_none());
    }

    #[test]
    fn distributions_keep_every_fixed_key() {
        let records = vec![student("ST001", "Avery Lee", 92.0, 97.0)];
        let snapshot = compute_statistics(&records).unwrap();

        assert_eq!(snapshot.status_distribution.len(), 4);
        assert_eq!(snapshot.status_distribution[&PerformanceTier::Excellent], 1);
        assert_eq!(snapshot.status_distribution[&PerformanceTier::NeedsImprovement], 0);
        assert_eq!(snapshot.grade_distribution.len(), 5);
        assert_eq!(snapshot.attendance_distribution.len(), 4);
        assert_eq!(snapshot.course_distribution.len(), 1);
        assert_eq!(snapshot.department_distribution["Science"], 1);
    }

    #[test]
    fn averages_round_to_one_decimal() {
        let records = vec![
            student("ST001", "Avery Lee", 80.0, 90.0),
            student("ST002", "Jules Moreno", 70.25, 85.0),
            student("ST003", "Kiara Patel", 60.0, 80.0),
        ];
        let snapshot = compute_statistics(&records).unwrap();
        assert_eq!(snapshot.total_students, 3);
        assert_eq!(snapshot.average_performance, 70.1);
        assert_eq!(snapshot.average_attendance, 85.0);
        assert_eq!(snapshot.average_age, 20.0);
    }

    #[test]
    fn trend_compares_first_and_last_only() {
        let rising = vec![
            student("ST001", "Avery Lee", 60.0, 90.0),
            student("ST002", "Jules Moreno", 99.0, 90.0),
            student("ST003", "Kiara Patel", 61.0, 90.0),
        ];
        assert_eq!(
            compute_statistics(&rising).unwrap().performance_trend,
            Trend::Improving
        );

        let falling = vec![
            student("ST001", "Avery Lee", 70.0, 90.0),
            student("ST002", "Jules Moreno", 65.0, 90.0),
        ];
        assert_eq!(
            compute_statistics(&falling).unwrap().performance_trend,
            Trend::Declining
        );

        let single = vec![student("ST001", "Avery Lee", 70.0, 90.0)];
        assert_eq!(
            compute_statistics(&single).unwrap().performance_trend,
            Trend::Stable
        );
    }

    #[test]
    fn extremes_prefer_first_occurrence() {
        let records = vec![
            student("ST001", "Avery Lee", 95.0, 90.0),
            student("ST002", "Jules Moreno", 95.0, 98.0),
            student("ST003", "Kiara Patel", 70.0, 98.0),
        ];
        let snapshot = compute_statistics(&records).unwrap();
        assert_eq!(snapshot.top_performer, "Avery Lee");
        assert_eq!(snapshot.most_attended, "Jules Moreno");
    }

    #[test]
    fn analysis_rates_and_median() {
        let records = vec![
            student("ST001", "Avery Lee", 95.0, 98.0),
            student("ST002", "Jules Moreno", 55.0, 70.0),
            student("ST003", "Kiara Patel", 72.0, 88.0),
            student("ST004", "Noor Haddad", 64.0, 80.0),
        ];
        let analysis = performance_analysis(&records).unwrap();
        assert_eq!(analysis.max_performance, 95.0);
        assert_eq!(analysis.min_performance, 55.0);
        assert_eq!(analysis.median_performance, 68.0);
        assert_eq!(analysis.pass_rate, 75.0);
        assert_eq!(analysis.excellence_rate, 25.0);
        assert_eq!(analysis.avg_attendance, 84.0);
        assert!(analysis.correlation > 0.9);
    }

    #[test]
    fn correlation_is_zero_for_single_record() {
        let records = vec![student("ST001", "Avery Lee", 88.0, 93.0)];
        assert_eq!(performance_analysis(&records).unwrap().correlation, 0.0);
    }

    #[test]
    fn correlation_handles_perfect_and_constant_series() {
        assert!((pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-9);
        assert!((pearson_correlation(&[1.0, 2.0, 3.0], &[6.0, 4.0, 2.0]) + 1.0).abs() < 1e-9);
        assert_eq!(pearson_correlation(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn cache_serves_snapshot_until_ttl_expires() {
        let mut engine = StatisticsEngine::new(Duration::from_secs(30));
        let start = Instant::now();
        let mut records = vec![student("ST001", "Avery Lee", 80.0, 90.0)];

        let first = engine.statistics_at(&records, start).unwrap();
        records.push(student("ST002", "Jules Moreno", 40.0, 60.0));

        // Not invalidated, so the stale snapshot is still served inside the window.
        let cached = engine.statistics_at(&records, start + Duration::from_secs(29));
        assert_eq!(cached, Some(first.clone()));

        let fresh = engine
            .statistics_at(&records, start + Duration::from_secs(30))
            .unwrap();
        assert_eq!(fresh.total_students, 2);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let mut engine = StatisticsEngine::default();
        let now = Instant::now();
        let mut records = vec![student("ST001", "Avery Lee", 80.0, 90.0)];
        engine.statistics_at(&records, now);
        assert!(engine.is_cached());

        records.clear();
        engine.invalidate();
        assert!(!engine.is_cached());
        assert_eq!(engine.statistics_at(&records, now), None);
    }
}
