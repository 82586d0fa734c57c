use chrono::{DateTime, Duration, TimeZone, Utc};
use queue_core::{
    classify, elapsed_minutes, partition, sort_by_start, Appointment, AppointmentStatus,
    QueueConfig, QueueEntry, QueueSnapshot, UrgencyTier, WaitInfo,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
}

fn appointment(id: &str, offset_minutes: i64, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: id.to_string(),
        patient_id: format!("patient-{id}"),
        provider_id: "dr-01".to_string(),
        start: Some(now() + Duration::minutes(offset_minutes)),
        status,
        service_code: Some("D1110".to_string()),
        ..Appointment::default()
    }
}

fn ids(entries: &[QueueEntry]) -> Vec<&str> {
    entries.iter().map(QueueEntry::id).collect()
}

#[test]
fn reception_board_scenario() {
    let input = vec![
        appointment("a1", -90, AppointmentStatus::CheckedIn),
        appointment("a2", 30, AppointmentStatus::Confirmed),
        appointment("a3", -10, AppointmentStatus::InProgress),
        appointment("a4", -5, AppointmentStatus::Cancelled),
    ];

    let snapshot = QueueSnapshot::build(&input, &QueueConfig::default(), now());

    assert_eq!(ids(snapshot.waiting()), vec!["a1"]);
    assert_eq!(ids(snapshot.in_progress()), vec!["a3"]);
    assert_eq!(ids(snapshot.upcoming()), vec!["a2"]);
    assert_eq!(ids(snapshot.cancelled()), vec!["a4"]);
    assert_eq!(
        snapshot.waiting()[0].wait,
        Some(WaitInfo {
            elapsed_minutes: 90,
            tier: UrgencyTier::Urgent,
        })
    );
    assert_eq!(snapshot.in_progress()[0].wait.map(|w| w.elapsed_minutes), Some(10));
    assert!(!snapshot.upcoming()[0].late);
    assert_eq!(snapshot.generated_at, now());
    assert_eq!(snapshot.counts().urgent, 1);
}

#[test]
fn early_check_in_is_clamped_to_zero() {
    let input = vec![appointment("early", 5, AppointmentStatus::CheckedIn)];
    let snapshot = QueueSnapshot::build(&input, &QueueConfig::default(), now());

    assert_eq!(
        snapshot.waiting()[0].wait,
        Some(WaitInfo {
            elapsed_minutes: 0,
            tier: UrgencyTier::Routine,
        })
    );
}

#[test]
fn partition_is_total_and_disjoint() {
    let statuses = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
        AppointmentStatus::Unknown,
    ];
    let offsets = [-240, -30, 0, 45, 120, 121, 300];

    let mut input = Vec::new();
    for (s, status) in statuses.iter().enumerate() {
        for (o, offset) in offsets.iter().enumerate() {
            input.push(appointment(&format!("{s}-{o}"), *offset, *status));
        }
    }

    let buckets = partition(&input, now(), &QueueConfig::default());
    let listed: Vec<&str> = ids(&buckets.waiting)
        .into_iter()
        .chain(ids(&buckets.in_progress))
        .chain(ids(&buckets.upcoming))
        .chain(ids(&buckets.cancelled))
        .collect();

    let mut unique = listed.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), listed.len(), "một lịch xuất hiện ở hai nhóm");
    assert_eq!(listed.len() + buckets.excluded, input.len());

    for item in &input {
        let expected = match item.status {
            AppointmentStatus::Cancelled
            | AppointmentStatus::InProgress
            | AppointmentStatus::CheckedIn => true,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => {
                item.start.expect("có giờ hẹn") <= now() + Duration::hours(2)
            }
            _ => false,
        };
        assert_eq!(listed.contains(&item.id.as_str()), expected, "lịch {}", item.id);
    }
}

#[test]
fn upcoming_window_includes_upper_bound_and_flags_late() {
    let input = vec![
        appointment("edge", 120, AppointmentStatus::Pending),
        appointment("beyond", 121, AppointmentStatus::Pending),
        appointment("late", -20, AppointmentStatus::Confirmed),
        appointment("now", 0, AppointmentStatus::Confirmed),
    ];

    let snapshot = QueueSnapshot::build(&input, &QueueConfig::default(), now());

    assert_eq!(ids(snapshot.upcoming()), vec!["late", "now", "edge"]);
    let late: Vec<bool> = snapshot.upcoming().iter().map(|e| e.late).collect();
    assert_eq!(late, vec![true, false, false]);
    assert!(snapshot.upcoming().iter().all(|e| e.wait.is_none()));
    assert_eq!(snapshot.excluded, 1);
}

#[test]
fn completed_and_no_show_never_listed() {
    let input = vec![
        appointment("done", -60, AppointmentStatus::Completed),
        appointment("absent", -30, AppointmentStatus::NoShow),
    ];
    let snapshot = QueueSnapshot::build(&input, &QueueConfig::default(), now());

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.excluded, 2);
}

#[test]
fn empty_input_yields_empty_buckets() {
    let snapshot = QueueSnapshot::build(&[], &QueueConfig::default(), now());
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.excluded, 0);
    assert_eq!(snapshot, queue_core::empty_snapshot(now()));
}

#[test]
fn missing_start_is_kept_out_of_time_sensitive_buckets() {
    let mut waiting = appointment("no-clock", 0, AppointmentStatus::CheckedIn);
    waiting.start = None;
    let mut pending = appointment("no-slot", 0, AppointmentStatus::Pending);
    pending.start = None;
    let input = vec![
        waiting,
        appointment("w1", -5, AppointmentStatus::CheckedIn),
        pending,
    ];

    let snapshot = QueueSnapshot::build(&input, &QueueConfig::default(), now());

    assert_eq!(ids(snapshot.waiting()), vec!["w1", "no-clock"]);
    assert_eq!(snapshot.waiting()[1].wait, None);
    assert!(snapshot.upcoming().is_empty());
    assert_eq!(snapshot.excluded, 1);
}

#[test]
fn sort_is_stable_for_equal_start() {
    let entries: Vec<QueueEntry> = vec![
        appointment("later", 10, AppointmentStatus::CheckedIn),
        appointment("first", -10, AppointmentStatus::CheckedIn),
        appointment("second", -10, AppointmentStatus::CheckedIn),
        appointment("third", -10, AppointmentStatus::CheckedIn),
    ]
    .into_iter()
    .map(QueueEntry::new)
    .collect();

    let sorted = sort_by_start(&entries);

    assert_eq!(ids(&sorted), vec!["first", "second", "third", "later"]);
    assert_eq!(ids(&entries), vec!["later", "first", "second", "third"]);
}

#[test]
fn elapsed_minutes_is_floored_and_monotonic() {
    let start = now();
    assert_eq!(elapsed_minutes(start, start + Duration::seconds(59)), 0);
    assert_eq!(elapsed_minutes(start, start + Duration::seconds(60)), 1);
    assert_eq!(elapsed_minutes(start, start + Duration::seconds(119)), 1);
    assert_eq!(elapsed_minutes(start, start - Duration::minutes(3)), 0);

    let mut previous = 0;
    for step in 0..600 {
        let current = elapsed_minutes(start, start + Duration::seconds(step * 17));
        assert!(current >= previous);
        previous = current;
    }
}

#[test]
fn urgency_tier_boundaries() {
    for (w, o) in [(15, 45), (1, 2), (10, 11), (30, 90)] {
        assert_eq!(classify(w - 1, w, o), UrgencyTier::Routine);
        assert_eq!(classify(w, w, o), UrgencyTier::Priority);
        assert_eq!(classify(o - 1, w, o), UrgencyTier::Priority);
        assert_eq!(classify(o, w, o), UrgencyTier::Urgent);
        assert_eq!(classify(u32::MAX, w, o), UrgencyTier::Urgent);
    }
}

#[test]
fn custom_thresholds_change_tiers() {
    let config = QueueConfig {
        warning_threshold_minutes: 5,
        overdue_threshold_minutes: 10,
        ..QueueConfig::default()
    };
    let input = vec![
        appointment("w7", -7, AppointmentStatus::CheckedIn),
        appointment("w12", -12, AppointmentStatus::CheckedIn),
    ];

    let snapshot = QueueSnapshot::build(&input, &config, now());
    let tiers: Vec<_> = snapshot
        .waiting()
        .iter()
        .map(|e| e.wait.map(|w| w.tier))
        .collect();

    assert_eq!(tiers, vec![Some(UrgencyTier::Urgent), Some(UrgencyTier::Priority)]);
}

#[test]
fn build_is_idempotent() {
    let input = vec![
        appointment("b", -30, AppointmentStatus::CheckedIn),
        appointment("a", -30, AppointmentStatus::CheckedIn),
        appointment("c", 60, AppointmentStatus::Pending),
        appointment("d", -3, AppointmentStatus::InProgress),
    ];
    let config = QueueConfig::default();

    let first = QueueSnapshot::build(&input, &config, now());
    let second = QueueSnapshot::build(&input, &config, now());
    assert_eq!(first, second);
}

#[test]
fn confirmed_appointment_turns_late_as_clock_advances() {
    let input = vec![appointment("slot", 10, AppointmentStatus::Confirmed)];
    let config = QueueConfig::default();

    let before = QueueSnapshot::build(&input, &config, now());
    let after = QueueSnapshot::build(&input, &config, now() + Duration::minutes(25));

    assert!(!before.upcoming()[0].late);
    assert!(after.upcoming()[0].late);
    assert_eq!(after.counts().late, 1);
}

#[test]
fn config_validation() {
    assert!(QueueConfig::default().validate().is_ok());

    let inverted = QueueConfig {
        warning_threshold_minutes: 45,
        overdue_threshold_minutes: 15,
        ..QueueConfig::default()
    };
    assert!(inverted.validate().is_err());

    let zero_window = QueueConfig {
        upcoming_window_minutes: 0,
        ..QueueConfig::default()
    };
    assert!(zero_window.validate().is_err());

    let partial: QueueConfig =
        serde_json::from_str(r#"{"overdue_threshold_minutes": 60}"#).expect("config hợp lệ");
    assert_eq!(partial.overdue_threshold_minutes, 60);
    assert_eq!(partial.warning_threshold_minutes, 15);
}

#[test]
fn status_parsing_falls_back_to_unknown() {
    assert_eq!(AppointmentStatus::parse("checked_in"), AppointmentStatus::CheckedIn);
    assert_eq!(AppointmentStatus::parse("In-Progress"), AppointmentStatus::InProgress);
    assert_eq!(AppointmentStatus::parse(" Checked In "), AppointmentStatus::CheckedIn);
    assert_eq!(AppointmentStatus::parse("canceled"), AppointmentStatus::Cancelled);
    assert_eq!(AppointmentStatus::parse("rescheduled"), AppointmentStatus::Unknown);

    let parsed: AppointmentStatus = serde_json::from_str("\"on_hold\"").expect("serde other");
    assert_eq!(parsed, AppointmentStatus::Unknown);
}

#[test]
fn labels_fall_back_to_truncated_ids() {
    let mut item = appointment("x", 0, AppointmentStatus::Pending);
    item.patient_id = "9f8e7d6c5b4a".to_string();
    assert_eq!(item.patient_label(), "Bệnh nhân #9f8e7d6c");

    item.patient_name = Some("  ".to_string());
    assert_eq!(item.patient_label(), "Bệnh nhân #9f8e7d6c");

    item.patient_name = Some("Nguyễn Văn An".to_string());
    assert_eq!(item.patient_label(), "Nguyễn Văn An");

    item.provider_id = String::new();
    assert_eq!(item.provider_label(), "Bác sĩ #?");
}

#[test]
fn window_end_past_calendar_limit_is_unbounded() {
    let late_now = DateTime::<Utc>::MAX_UTC - Duration::minutes(10);
    let input = vec![
        Appointment {
            start: Some(late_now),
            ..appointment("w", 0, AppointmentStatus::CheckedIn)
        },
        Appointment {
            start: Some(late_now + Duration::minutes(5)),
            ..appointment("u", 0, AppointmentStatus::Confirmed)
        },
    ];

    let snapshot = QueueSnapshot::build(&input, &QueueConfig::default(), late_now);

    assert_eq!(ids(snapshot.waiting()), vec!["w"]);
    assert_eq!(ids(snapshot.upcoming()), vec!["u"]);
    assert!(!snapshot.upcoming()[0].late);
    assert_eq!(snapshot.excluded, 0);
}
