use std::time::{Duration, Instant};

use student_roster::{
    PerformanceTier, StoreError, StudentDraft, StudentManager, StudentPatch, StudentRecord,
};

fn sample() -> StudentManager {
    StudentManager::with_sample_data(Duration::from_secs(30))
}

fn comparable(record: &StudentRecord) -> (String, i32, String, String, String, String, String, String, String) {
    (
        record.name.clone(),
        record.age,
        record.grade.to_string(),
        record.email.clone(),
        format!("{:.3}", record.performance),
        format!("{:.3}", record.attendance),
        record.phone.clone(),
        record.course.clone(),
        record.department.clone(),
    )
}

#[test]
fn export_then_import_round_trips_field_values() {
    let mut original = sample();
    original
        .register(&StudentDraft {
            name: "Noor Haddad".to_string(),
            age: 33,
            email: "noor@example.edu".to_string(),
            performance: 58.25,
            attendance: Some(70.5),
            phone: "".to_string(),
            course: "Geology, Field Methods".to_string(),
            department: "Earth \"Sciences\"".to_string(),
            ..StudentDraft::default()
        })
        .unwrap();

    let csv = original.export_csv().unwrap().value;
    let mut copy = StudentManager::new();
    let outcome = copy.import_csv(&csv).unwrap();

    assert_eq!(outcome.value.imported, original.len());
    assert!(outcome.value.errors.is_empty(), "{:?}", outcome.value.errors);

    let before: Vec<_> = original.records().iter().map(comparable).collect();
    let after: Vec<_> = copy.records().iter().map(comparable).collect();
    assert_eq!(before, after);
}

#[test]
fn blank_department_round_trips_as_blank() {
    let mut original = StudentManager::new();
    original
        .register(&StudentDraft {
            name: "Avery Lee".to_string(),
            email: "avery@example.edu".to_string(),
            course: "Biology".to_string(),
            department: "".to_string(),
            ..StudentDraft::default()
        })
        .unwrap();

    let csv = original.export_csv().unwrap().value;
    let mut copy = StudentManager::new();
    copy.import_csv(&csv).unwrap();
    assert_eq!(copy.get("ST001").unwrap().department, "");
}

#[test]
fn saved_roster_reloads_with_the_same_ids() {
    let mut session = sample();
    session.delete("ST002").unwrap();
    let saved = session.export_csv().unwrap().value;

    let mut next_session = StudentManager::new();
    next_session.restore_csv(&saved).unwrap();
    let ids: Vec<&str> = next_session.records().iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<&str> = session.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, expected);
    assert_eq!(next_session.get("ST003").unwrap().name, "Michael Brown");
    assert_eq!(
        next_session.get("ST001").unwrap().enrollment_date,
        session.get("ST001").unwrap().enrollment_date
    );

    next_session.delete("ST003").unwrap();
    assert_eq!(next_session.get("ST003").unwrap_err(), StoreError::NotFound);
}

#[test]
fn search_scenario_from_dashboard() {
    let manager = sample();

    let by_course = manager.search("data");
    assert!(by_course.iter().any(|r| r.name == "Emma Johnson"));
    let by_name = manager.search("EMMA");
    assert!(by_name.iter().any(|r| r.course == "Data Science"));

    let all = manager.search("");
    assert_eq!(all.len(), manager.len());
    assert!(all
        .iter()
        .zip(manager.records())
        .all(|(found, stored)| found.id == stored.id));
}

#[test]
fn statistics_never_serve_stale_data_across_mutations() {
    let mut manager = sample();
    let now = Instant::now();

    let before = manager.statistics_at(now).unwrap();
    assert_eq!(before.total_students, 10);
    assert_eq!(manager.statistics_at(now).unwrap(), before);

    manager
        .update(
            "ST006",
            &StudentPatch {
                performance: Some(40.0),
                ..StudentPatch::default()
            },
        )
        .unwrap();
    let after = manager.statistics_at(now).unwrap();
    assert_eq!(after.status_distribution[&PerformanceTier::NeedsImprovement], 1);
    assert_eq!(after.top_performer, "John Smith");
    assert_eq!(after.status_distribution.len(), 4);

    manager.bulk_delete(&["ST001", "ST002"]).unwrap();
    assert_eq!(manager.statistics_at(now).unwrap().total_students, 8);
}

#[test]
fn explicit_cache_clear_recomputes() {
    let mut manager = sample();
    let now = Instant::now();
    manager.statistics_at(now);
    manager.clear_cache();
    assert_eq!(manager.statistics_at(now).unwrap().total_students, 10);
}

#[test]
fn single_record_analysis_has_zero_correlation() {
    let mut manager = StudentManager::new();
    manager
        .register(&StudentDraft {
            name: "Avery Lee".to_string(),
            email: "avery@example.edu".to_string(),
            course: "Biology".to_string(),
            ..StudentDraft::default()
        })
        .unwrap();

    let analysis = manager.performance_analysis().unwrap();
    assert_eq!(analysis.correlation, 0.0);
    assert_eq!(analysis.median_performance, 75.0);
}

#[test]
fn deleting_twice_reports_not_found() {
    let mut manager = sample();
    manager.delete("ST004").unwrap();
    assert_eq!(manager.get("ST004").unwrap_err(), StoreError::NotFound);

    let err = manager.delete("ST004").unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert_eq!(manager.len(), 9);
}

#[test]
fn ids_keep_climbing_after_deletes() {
    let mut manager = StudentManager::new();
    let draft = StudentDraft {
        name: "Avery Lee".to_string(),
        email: "avery@example.edu".to_string(),
        course: "Biology".to_string(),
        ..StudentDraft::default()
    };

    let ids: Vec<String> = (0..3)
        .map(|_| manager.register(&draft).unwrap().value)
        .collect();
    assert_eq!(ids, vec!["ST001", "ST002", "ST003"]);

    manager.delete("ST001").unwrap();
    assert_eq!(manager.register(&draft).unwrap().value, "ST004");
}
