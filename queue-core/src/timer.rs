//! Đồng hồ chờ và phân loại mức độ khẩn.

use chrono::{DateTime, Utc};

use crate::{QueueConfig, UrgencyTier, WaitInfo};

/// Số phút trọn vẹn đã trôi qua kể từ `start`.
///
/// Check-in hoặc bắt đầu sớm cho kết quả âm, được chặn về `0`.
pub fn elapsed_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let minutes = now.signed_duration_since(start).num_minutes();
    if minutes <= 0 {
        0
    } else {
        u32::try_from(minutes).unwrap_or(u32::MAX)
    }
}

/// Ánh xạ số phút chờ sang mức độ khẩn.
pub fn classify(elapsed_minutes: u32, warning_threshold: u32, overdue_threshold: u32) -> UrgencyTier {
    if elapsed_minutes >= overdue_threshold {
        UrgencyTier::Urgent
    } else if elapsed_minutes >= warning_threshold {
        UrgencyTier::Priority
    } else {
        UrgencyTier::Routine
    }
}

pub fn wait_info(start: DateTime<Utc>, now: DateTime<Utc>, config: &QueueConfig) -> WaitInfo {
    let elapsed = elapsed_minutes(start, now);
    WaitInfo {
        elapsed_minutes: elapsed,
        tier: classify(
            elapsed,
            config.warning_threshold_minutes,
            config.overdue_threshold_minutes,
        ),
    }
}
