//! Logic lõi dựng hàng đợi lễ tân từ danh sách lịch hẹn trong ngày.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod command;
mod partition;
mod timer;

pub use command::{
    available_commands, dispatch, CommandKind, CommandOutcome, CommandSink, QueueCommand,
};
pub use partition::{partition, sort_by_start, Partition};
pub use timer::{classify, elapsed_minutes, wait_info};

/// Cấu hình các ngưỡng chờ và khung giờ sắp tới.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueueConfig {
    /// Số phút chờ bắt đầu coi là "ưu tiên".
    pub warning_threshold_minutes: u32,
    /// Số phút chờ bắt đầu coi là "khẩn".
    pub overdue_threshold_minutes: u32,
    /// Khung thời gian (phút) tính từ hiện tại cho nhóm sắp tới.
    pub upcoming_window_minutes: u32,
    /// Chu kỳ làm mới gợi ý cho bên gọi (giây).
    pub refresh_interval_seconds: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            warning_threshold_minutes: 15,
            overdue_threshold_minutes: 45,
            upcoming_window_minutes: 120,
            refresh_interval_seconds: 30,
        }
    }
}

impl QueueConfig {
    /// Kiểm tra các ngưỡng có hợp lệ không.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.warning_threshold_minutes == 0 {
            return Err(QueueError::InvalidConfig(
                "warning_threshold_minutes phải lớn hơn 0".to_string(),
            ));
        }
        if self.warning_threshold_minutes >= self.overdue_threshold_minutes {
            return Err(QueueError::InvalidConfig(format!(
                "warning_threshold_minutes ({}) phải nhỏ hơn overdue_threshold_minutes ({})",
                self.warning_threshold_minutes, self.overdue_threshold_minutes
            )));
        }
        if self.upcoming_window_minutes == 0 {
            return Err(QueueError::InvalidConfig(
                "upcoming_window_minutes phải lớn hơn 0".to_string(),
            ));
        }
        if self.refresh_interval_seconds == 0 {
            return Err(QueueError::InvalidConfig(
                "refresh_interval_seconds phải lớn hơn 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trạng thái lịch hẹn do backend quản lý.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    #[serde(other)]
    Unknown,
}

impl AppointmentStatus {
    /// Đọc trạng thái từ chuỗi tự do, giá trị lạ trả về `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "checked_in" | "checkedin" => Self::CheckedIn,
            "in_progress" | "inprogress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" | "canceled" => Self::Cancelled,
            "no_show" | "noshow" => Self::NoShow,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

/// Lịch hẹn như backend trả về; hàng đợi chỉ đọc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub provider_id: String,
    /// `None` khi backend không gửi hoặc không đọc được thời điểm bắt đầu.
    pub start: Option<DateTime<Utc>>,
    pub status: AppointmentStatus,
    pub service_code: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

impl Default for Appointment {
    fn default() -> Self {
        Self {
            id: String::new(),
            patient_id: String::new(),
            provider_id: String::new(),
            start: None,
            status: AppointmentStatus::Unknown,
            service_code: None,
            patient_name: None,
            provider_name: None,
        }
    }
}

impl Appointment {
    /// Tên bệnh nhân, hoặc mã rút gọn khi chưa có tên.
    pub fn patient_label(&self) -> String {
        display_or_placeholder(self.patient_name.as_deref(), "Bệnh nhân", &self.patient_id)
    }

    /// Tên bác sĩ, hoặc mã rút gọn khi chưa có tên.
    pub fn provider_label(&self) -> String {
        display_or_placeholder(self.provider_name.as_deref(), "Bác sĩ", &self.provider_id)
    }
}

fn display_or_placeholder(name: Option<&str>, prefix: &str, id: &str) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let short: String = id.chars().take(8).collect();
            if short.is_empty() {
                format!("{prefix} #?")
            } else {
                format!("{prefix} #{short}")
            }
        }
    }
}

/// Mức độ khẩn theo thời gian chờ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Routine,
    Priority,
    Urgent,
}

/// Thời gian chờ kèm mức độ khẩn, chỉ tồn tại trong một lượt tính.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitInfo {
    pub elapsed_minutes: u32,
    pub tier: UrgencyTier,
}

/// Một dòng trong hàng đợi.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub appointment: Appointment,
    /// Chỉ có với nhóm đang chờ và đang khám, khi biết giờ bắt đầu.
    pub wait: Option<WaitInfo>,
    /// Lịch sắp tới đã quá giờ hẹn.
    #[serde(default)]
    pub late: bool,
}

impl QueueEntry {
    pub fn new(appointment: Appointment) -> Self {
        Self {
            appointment,
            wait: None,
            late: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.appointment.id
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.appointment.start
    }
}

/// Số lượng từng nhóm cho các widget đầu trang.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub waiting: usize,
    pub in_progress: usize,
    pub upcoming: usize,
    pub cancelled: usize,
    pub urgent: usize,
    pub late: usize,
}

/// Kết quả tổng hợp một lượt tính hàng đợi.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueSnapshot {
    pub generated_at: DateTime<Utc>,
    pub waiting: Vec<QueueEntry>,
    pub in_progress: Vec<QueueEntry>,
    pub upcoming: Vec<QueueEntry>,
    pub cancelled: Vec<QueueEntry>,
    /// Lịch không thuộc nhóm nào (đã xong, vắng mặt, ngoài khung giờ...).
    #[serde(default)]
    pub excluded: usize,
    /// Bản ghi hỏng bị bỏ qua ở bước đọc dữ liệu.
    #[serde(default)]
    pub skipped: usize,
}

impl QueueSnapshot {
    /// Phân nhóm, sắp xếp và gắn thời gian chờ tại thời điểm `now`.
    pub fn build(appointments: &[Appointment], config: &QueueConfig, now: DateTime<Utc>) -> Self {
        let Partition {
            waiting,
            in_progress,
            upcoming,
            cancelled,
            excluded,
        } = partition(appointments, now, config);

        Self {
            generated_at: now,
            waiting: sort_by_start(&waiting),
            in_progress: sort_by_start(&in_progress),
            upcoming: sort_by_start(&upcoming),
            cancelled,
            excluded,
            skipped: 0,
        }
    }

    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn waiting(&self) -> &[QueueEntry] {
        &self.waiting
    }

    pub fn in_progress(&self) -> &[QueueEntry] {
        &self.in_progress
    }

    pub fn upcoming(&self) -> &[QueueEntry] {
        &self.upcoming
    }

    pub fn cancelled(&self) -> &[QueueEntry] {
        &self.cancelled
    }

    /// Tổng số dòng hiển thị trên bốn nhóm.
    pub fn len(&self) -> usize {
        self.waiting.len() + self.in_progress.len() + self.upcoming.len() + self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> QueueCounts {
        QueueCounts {
            waiting: self.waiting.len(),
            in_progress: self.in_progress.len(),
            upcoming: self.upcoming.len(),
            cancelled: self.cancelled.len(),
            urgent: self
                .waiting
                .iter()
                .filter(|entry| {
                    matches!(
                        entry.wait,
                        Some(WaitInfo {
                            tier: UrgencyTier::Urgent,
                            ..
                        })
                    )
                })
                .count(),
            late: self.upcoming.iter().filter(|entry| entry.late).count(),
        }
    }
}

/// Lỗi chung của hàng đợi.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Cấu hình không hợp lệ: {0}")]
    InvalidConfig(String),
    #[error("Không thể {action} lịch hẹn {id} ở trạng thái {status}")]
    InvalidTransition {
        id: String,
        status: &'static str,
        action: &'static str,
    },
    #[error("Thao tác thất bại: {0}")]
    Command(String),
    #[error("Lỗi khác: {0}")]
    Other(String),
}

/// Snapshot rỗng (dùng cho mock/testing).
pub fn empty_snapshot(now: DateTime<Utc>) -> QueueSnapshot {
    QueueSnapshot {
        generated_at: now,
        waiting: Vec::new(),
        in_progress: Vec::new(),
        upcoming: Vec::new(),
        cancelled: Vec::new(),
        excluded: 0,
        skipped: 0,
    }
}
