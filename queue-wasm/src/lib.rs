//! Bridge WASM <-> JavaScript cho bảng hàng đợi lễ tân.

use chrono::{DateTime, TimeZone, Utc};
use queue_core::{available_commands, AppointmentStatus, QueueConfig, QueueError};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsQueueConfig {
    #[serde(default)]
    warning_threshold_minutes: Option<u32>,
    #[serde(default)]
    overdue_threshold_minutes: Option<u32>,
    #[serde(default)]
    upcoming_window_minutes: Option<u32>,
    #[serde(default)]
    refresh_interval_seconds: Option<u32>,
}

impl From<JsQueueConfig> for QueueConfig {
    fn from(cfg: JsQueueConfig) -> Self {
        let mut base = QueueConfig::default();
        if let Some(minutes) = cfg.warning_threshold_minutes {
            base.warning_threshold_minutes = minutes;
        }
        if let Some(minutes) = cfg.overdue_threshold_minutes {
            base.overdue_threshold_minutes = minutes;
        }
        if let Some(minutes) = cfg.upcoming_window_minutes {
            base.upcoming_window_minutes = minutes;
        }
        if let Some(seconds) = cfg.refresh_interval_seconds {
            base.refresh_interval_seconds = seconds;
        }
        base
    }
}

/// Tính hàng đợi từ danh sách lịch hẹn; `now_ms` do phía JS cung cấp mỗi nhịp.
#[wasm_bindgen]
pub fn summarize_queue(
    payload: JsValue,
    now_ms: f64,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let payload_value = from_value::<serde_json::Value>(payload)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách lịch hẹn: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsQueueConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            QueueConfig::from(cfg)
        }
        None => QueueConfig::default(),
    };

    let now =
        instant_from_millis(now_ms).map_err(|err| JsValue::from_str(&format_queue_error(err)))?;

    let snapshot = queue_json::summarize_appointments_value(&payload_value, &cfg, now)
        .map_err(|err| JsValue::from_str(&format_queue_error(err)))?;

    to_value(&snapshot)
        .map_err(|err| JsValue::from_str(&format!("Không serialize snapshot: {err}")))
}

/// Các thao tác hợp lệ cho một trạng thái (để bật/tắt nút trên giao diện).
#[wasm_bindgen]
pub fn available_actions(status: &str) -> Result<JsValue, JsValue> {
    let kinds = available_commands(AppointmentStatus::parse(status));
    to_value(&kinds)
        .map_err(|err| JsValue::from_str(&format!("Không serialize thao tác: {err}")))
}

fn instant_from_millis(now_ms: f64) -> Result<DateTime<Utc>, QueueError> {
    if !now_ms.is_finite() {
        return Err(QueueError::Parse(format!("now_ms không hợp lệ: {now_ms}")));
    }
    Utc.timestamp_millis_opt(now_ms.floor() as i64)
        .single()
        .ok_or_else(|| QueueError::Parse(format!("now_ms ngoài phạm vi: {now_ms}")))
}

fn format_queue_error(err: QueueError) -> String {
    format!("Queue error: {err}")
}
