use std::fmt::Write;

use crate::models::{Activity, AttendanceTier, Grade, PerformanceTier, StudentRecord};
use crate::stats::{PerformanceAnalysis, StatisticsSnapshot, Trend};

pub fn performance_label(tier: PerformanceTier) -> &'static str {
    match tier {
        PerformanceTier::Excellent => "⭐ Excellent",
        PerformanceTier::Good => "👍 Good",
        PerformanceTier::Average => "📊 Average",
        PerformanceTier::NeedsImprovement => "🚨 Needs Improvement",
    }
}

pub fn grade_label(grade: Grade) -> &'static str {
    match grade {
        Grade::A => "🎯 A",
        Grade::B => "📚 B",
        Grade::C => "📝 C",
        Grade::D => "⚠️ D",
        Grade::F => "❌ F",
    }
}

pub fn attendance_label(tier: AttendanceTier) -> &'static str {
    match tier {
        AttendanceTier::Excellent => "✅ Excellent",
        AttendanceTier::Good => "👍 Good",
        AttendanceTier::Average => "📊 Average",
        AttendanceTier::Poor => "😟 Poor",
    }
}

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Improving => "📈 Improving",
        Trend::Declining => "📉 Declining",
        Trend::Stable => "➡️ Stable",
    }
}

/// Students below the pass tier or with poor attendance, weakest first.
pub fn needs_attention(records: &[StudentRecord]) -> Vec<&StudentRecord> {
    let mut flagged: Vec<&StudentRecord> = records
        .iter()
        .filter(|r| {
            r.performance_tier() == PerformanceTier::NeedsImprovement
                || r.attendance_tier() == AttendanceTier::Poor
        })
        .collect();
    flagged.sort_by(|a, b| {
        a.performance
            .partial_cmp(&b.performance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    flagged
}

pub fn build_report(
    snapshot: Option<&StatisticsSnapshot>,
    analysis: Option<&PerformanceAnalysis>,
    records: &[StudentRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Roster Report");

    let (snapshot, analysis) = match (snapshot, analysis) {
        (Some(snapshot), Some(analysis)) => (snapshot, analysis),
        _ => {
            let _ = writeln!(output);
            let _ = writeln!(
                output,
                "No student data available. Add students to see analytics."
            );
            return output;
        }
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total students: {}", snapshot.total_students);
    let _ = writeln!(
        output,
        "- Average performance: {:.1}%",
        snapshot.average_performance
    );
    let _ = writeln!(
        output,
        "- Average attendance: {:.1}%",
        snapshot.average_attendance
    );
    let _ = writeln!(output, "- Average age: {:.1}", snapshot.average_age);
    let _ = writeln!(
        output,
        "- Performance trend: {}",
        trend_label(snapshot.performance_trend)
    );
    let _ = writeln!(output, "- Top performer: {}", snapshot.top_performer);
    let _ = writeln!(output, "- Most attended: {}", snapshot.most_attended);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Distribution");
    for (tier, count) in &snapshot.status_distribution {
        let _ = writeln!(output, "- {}: {}", performance_label(*tier), count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    for (grade, count) in &snapshot.grade_distribution {
        let _ = writeln!(output, "- {}: {}", grade_label(*grade), count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Distribution");
    for (tier, count) in &snapshot.attendance_distribution {
        let _ = writeln!(output, "- {}: {}", attendance_label(*tier), count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Departments");
    for (department, count) in &snapshot.department_distribution {
        let _ = writeln!(output, "- {department}: {count}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Analysis");
    let _ = writeln!(
        output,
        "- Range: {:.1} to {:.1} (median {:.1})",
        analysis.min_performance, analysis.max_performance, analysis.median_performance
    );
    let _ = writeln!(output, "- Pass rate: {:.1}%", analysis.pass_rate);
    let _ = writeln!(output, "- Excellence rate: {:.1}%", analysis.excellence_rate);
    let _ = writeln!(
        output,
        "- Performance/attendance correlation: {:.3}",
        analysis.correlation
    );

    let flagged = needs_attention(records);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");

    if flagged.is_empty() {
        let _ = writeln!(output, "No students currently flagged.");
    } else {
        for record in flagged.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) performance {:.1}%, attendance {:.1}%",
                record.name, record.id, record.course, record.performance, record.attendance
            );
        }
    }

    let mut recent: Vec<(&StudentRecord, &Activity)> = records
        .iter()
        .flat_map(|record| record.activities.iter().map(move |a| (record, a)))
        .collect();
    recent.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");

    if recent.is_empty() {
        let _ = writeln!(output, "No activity recorded.");
    } else {
        for (record, activity) in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                record.name,
                activity.kind,
                activity.timestamp.date(),
                activity.description
            );
        }
    }

    output
}
