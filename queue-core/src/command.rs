//! Lệnh chuyển trạng thái gửi tới backend.
//!
//! Hàng đợi không tự sửa danh sách: thành công thì tải lại, thất bại thì
//! báo cho người dùng và giữ nguyên dữ liệu cũ.

use serde::{Deserialize, Serialize};

use crate::{Appointment, AppointmentStatus, QueueError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    CheckIn,
    Start,
    Complete,
    Cancel,
    MarkNoShow,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check-in",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::MarkNoShow => "mark-no-show",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum QueueCommand {
    CheckIn { id: String },
    Start { id: String },
    Complete { id: String },
    Cancel { id: String, reason: String },
    MarkNoShow { id: String },
}

impl QueueCommand {
    pub fn appointment_id(&self) -> &str {
        match self {
            Self::CheckIn { id }
            | Self::Start { id }
            | Self::Complete { id }
            | Self::Cancel { id, .. }
            | Self::MarkNoShow { id } => id,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CheckIn { .. } => CommandKind::CheckIn,
            Self::Start { .. } => CommandKind::Start,
            Self::Complete { .. } => CommandKind::Complete,
            Self::Cancel { .. } => CommandKind::Cancel,
            Self::MarkNoShow { .. } => CommandKind::MarkNoShow,
        }
    }

    /// Kiểm tra lệnh có áp dụng được cho trạng thái hiện tại của lịch hẹn.
    pub fn validate_for(&self, appointment: &Appointment) -> Result<(), QueueError> {
        if self.appointment_id() != appointment.id {
            return Err(QueueError::Other(format!(
                "Lệnh cho lịch {} nhưng nhận lịch {}",
                self.appointment_id(),
                appointment.id
            )));
        }

        if !available_commands(appointment.status).contains(&self.kind()) {
            return Err(QueueError::InvalidTransition {
                id: appointment.id.clone(),
                status: appointment.status.as_str(),
                action: self.kind().as_str(),
            });
        }

        if let Self::Cancel { reason, .. } = self {
            if reason.trim().is_empty() {
                return Err(QueueError::Command("Cần nhập lý do hủy lịch".to_string()));
            }
        }

        Ok(())
    }
}

/// Các thao tác hiển thị cho một lịch hẹn theo trạng thái.
pub fn available_commands(status: AppointmentStatus) -> &'static [CommandKind] {
    if status.is_terminal() {
        return &[];
    }

    match status {
        AppointmentStatus::Pending | AppointmentStatus::Confirmed => &[
            CommandKind::CheckIn,
            CommandKind::Cancel,
            CommandKind::MarkNoShow,
        ],
        AppointmentStatus::CheckedIn => &[
            CommandKind::Start,
            CommandKind::Cancel,
            CommandKind::MarkNoShow,
        ],
        AppointmentStatus::InProgress => &[CommandKind::Complete],
        _ => &[],
    }
}

/// Cổng gửi lệnh tới backend.
pub trait CommandSink {
    fn send(&self, command: &QueueCommand) -> Result<(), QueueError>;
}

/// Việc bên hiển thị cần làm sau khi gửi lệnh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Tải lại danh sách để tính lại hàng đợi.
    Refetch,
    /// Hiện thông báo lỗi, danh sách giữ nguyên.
    Notify(String),
}

/// Gửi lệnh một lần, không thử lại.
pub fn dispatch<S: CommandSink + ?Sized>(
    sink: &S,
    command: &QueueCommand,
    appointment: &Appointment,
) -> CommandOutcome {
    if let Err(err) = command.validate_for(appointment) {
        return CommandOutcome::Notify(err.to_string());
    }

    match sink.send(command) {
        Ok(()) => CommandOutcome::Refetch,
        Err(err) => CommandOutcome::Notify(err.to_string()),
    }
}
