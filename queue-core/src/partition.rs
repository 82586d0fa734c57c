use chrono::{DateTime, Duration, Utc};

use crate::{wait_info, Appointment, AppointmentStatus, QueueConfig, QueueEntry};

/// Bốn nhóm rời nhau của danh sách lịch hẹn trong ngày.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub waiting: Vec<QueueEntry>,
    pub in_progress: Vec<QueueEntry>,
    pub upcoming: Vec<QueueEntry>,
    pub cancelled: Vec<QueueEntry>,
    /// Số lịch không thuộc nhóm nào.
    pub excluded: usize,
}

/// Phân nhóm lịch hẹn theo trạng thái và giờ bắt đầu so với `now`.
///
/// Mỗi lịch rơi vào đúng một nhóm hoặc bị loại. Lịch chờ xác nhận có giờ
/// bắt đầu trong khoảng `now + upcoming_window` (tính cả biên) vào nhóm
/// sắp tới; lịch đã quá giờ vẫn giữ lại và đánh dấu `late`. Khi
/// `now + upcoming_window` vượt giới hạn của `DateTime`, khung giờ không có
/// biên trên.
pub fn partition(appointments: &[Appointment], now: DateTime<Utc>, config: &QueueConfig) -> Partition {
    let horizon =
        now.checked_add_signed(Duration::minutes(i64::from(config.upcoming_window_minutes)));
    let mut buckets = Partition::default();

    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::Cancelled => {
                buckets.cancelled.push(QueueEntry::new(appointment.clone()));
            }
            AppointmentStatus::InProgress => {
                buckets.in_progress.push(timed_entry(appointment, now, config));
            }
            AppointmentStatus::CheckedIn => {
                buckets.waiting.push(timed_entry(appointment, now, config));
            }
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => match appointment.start {
                Some(start) if horizon.map_or(true, |end| start <= end) => {
                    let mut entry = QueueEntry::new(appointment.clone());
                    entry.late = start < now;
                    buckets.upcoming.push(entry);
                }
                _ => buckets.excluded += 1,
            },
            AppointmentStatus::Completed | AppointmentStatus::NoShow | AppointmentStatus::Unknown => {
                buckets.excluded += 1;
            }
        }
    }

    buckets
}

fn timed_entry(appointment: &Appointment, now: DateTime<Utc>, config: &QueueConfig) -> QueueEntry {
    let mut entry = QueueEntry::new(appointment.clone());
    entry.wait = appointment.start.map(|start| wait_info(start, now, config));
    entry
}

/// Sắp xếp tăng dần theo giờ bắt đầu, lịch thiếu giờ xếp cuối.
///
/// Sắp xếp ổn định: cùng giờ giữ nguyên thứ tự đầu vào.
pub fn sort_by_start(bucket: &[QueueEntry]) -> Vec<QueueEntry> {
    let mut sorted = bucket.to_vec();
    sorted.sort_by_key(|entry| (entry.start().is_none(), entry.start()));
    sorted
}
