//! Backend appointment JSON to `QueueSnapshot` converter.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use queue_core::{Appointment, AppointmentStatus, QueueConfig, QueueError, QueueSnapshot};
use serde_json::Value;

/// Records accepted from a payload, plus how many were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAppointments {
    pub appointments: Vec<Appointment>,
    pub skipped: usize,
}

/// Summarize today's queue from a JSON string.
pub fn summarize_appointments_str(
    payload_json: &str,
    config: &QueueConfig,
    now: DateTime<Utc>,
) -> Result<QueueSnapshot, QueueError> {
    let value: Value =
        serde_json::from_str(payload_json).map_err(|err| QueueError::Parse(err.to_string()))?;
    summarize_appointments_value(&value, config, now)
}

/// Summarize today's queue from a `serde_json::Value`.
pub fn summarize_appointments_value(
    payload: &Value,
    config: &QueueConfig,
    now: DateTime<Utc>,
) -> Result<QueueSnapshot, QueueError> {
    config.validate()?;
    let parsed = parse_appointments(payload)?;
    Ok(QueueSnapshot::build(&parsed.appointments, config, now).with_skipped(parsed.skipped))
}

/// Extract appointments from the payload, isolating malformed records.
///
/// Accepts a bare array or an envelope with `data`, `appointments`, `items`
/// or `results`. A record without an id is skipped; a record with an
/// unreadable start keeps `start = None`.
pub fn parse_appointments(payload: &Value) -> Result<ParsedAppointments, QueueError> {
    let records = envelope_records(payload)?;
    tracing::debug!(records = records.len(), "parsing appointment payload");

    let mut parsed = ParsedAppointments::default();
    for (index, record) in records.iter().enumerate() {
        match parse_record(record) {
            Some(appointment) => {
                if appointment.start.is_none() {
                    tracing::warn!(id = %appointment.id, "appointment has no readable start");
                }
                parsed.appointments.push(appointment);
            }
            None => {
                tracing::warn!(index, "skipping appointment record without id");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

fn envelope_records(payload: &Value) -> Result<&[Value], QueueError> {
    match payload {
        Value::Null => Err(QueueError::MissingData),
        Value::Array(items) => Ok(items.as_slice()),
        Value::Object(obj) => ["data", "appointments", "items", "results"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                QueueError::Parse("Expected an appointment array or data envelope".to_string())
            }),
        other => Err(QueueError::Parse(format!(
            "Expected an appointment array, received {}",
            json_kind(other)
        ))),
    }
}

fn parse_record(record: &Value) -> Option<Appointment> {
    if !record.is_object() {
        return None;
    }

    let id = extract_id(record, &["id", "appointmentId", "appointment_id"])?;

    let status = extract_text(record, &["status"])
        .map(|raw| AppointmentStatus::parse(&raw))
        .unwrap_or(AppointmentStatus::Unknown);

    Some(Appointment {
        id,
        patient_id: extract_id(record, &["patientId", "patient_id"])
            .or_else(|| nested_id(record, "patient"))
            .unwrap_or_default(),
        provider_id: extract_id(record, &["providerId", "provider_id", "dentistId"])
            .or_else(|| nested_id(record, "provider"))
            .unwrap_or_default(),
        start: extract_datetime(record, &["start", "startTime", "start_time", "scheduledAt"]),
        status,
        service_code: extract_text(
            record,
            &["serviceCode", "service_code", "appointmentType", "appointment_type"],
        ),
        patient_name: extract_text(record, &["patientName", "patient_name"])
            .or_else(|| nested_name(record, "patient")),
        provider_name: extract_text(record, &["providerName", "provider_name"])
            .or_else(|| nested_name(record, "provider")),
    })
}

fn extract_id(record: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .find_map(id_text)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn nested_id(record: &Value, field: &str) -> Option<String> {
    record.get(field).and_then(|obj| obj.get("id")).and_then(id_text)
}

fn nested_name(record: &Value, field: &str) -> Option<String> {
    let obj = record.get(field)?;
    if let Some(name) = obj.get("name").and_then(Value::as_str) {
        return non_blank(name);
    }

    let parts: Vec<&str> = ["firstName", "lastName"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn extract_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| record.get(*field).and_then(Value::as_str))
        .find_map(non_blank)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn extract_datetime(record: &Value, fields: &[&str]) -> Option<DateTime<Utc>> {
    for field in fields {
        let Some(value) = record.get(*field) else {
            continue;
        };

        if let Some(text) = value.as_str() {
            if let Some(dt) = parse_datetime(text) {
                return Some(dt);
            }
        }

        if let Some(millis) = value.as_i64() {
            if let Some(dt) = Utc.timestamp_millis_opt(millis).single() {
                return Some(dt);
            }
        }
    }
    None
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
