//! Total conversion of arbitrary JSON into a well-formed [`Snapshot`].
//!
//! Nothing here fails: every malformed field is replaced by its default, and
//! a value that is not an object at all yields the seed document. Coercions
//! follow the loose truthiness rules the document has always been written
//! with (numbers in strings, `0`/`""` meaning "absent", and so on).

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;
use uuid::Uuid;

use super::defaults::{seed_habits, DEFAULT_COLOR};
use super::{Entry, EntriesByDate, Habit, SidebarMode, Snapshot, ViewMode};
use crate::auth::AuthState;
use crate::storage::CloudConfig;

const DEFAULT_DAYS: [u8; 3] = [1, 3, 5];
const MAX_ICON_CHARS: usize = 4;
const MAX_USER_ID_CHARS: usize = 40;
const MAX_DURATION_MIN: f64 = 1440.0;
const MAX_INTENSITY: f64 = 10.0;

/// Normalize a persisted or remote value. `boot` supplies the cloud
/// defaults for fields the value does not carry.
pub fn normalize(raw: &Value, boot: &CloudConfig) -> Snapshot {
    let mut next = Snapshot::seed(boot);
    let Some(obj) = raw.as_object() else {
        return next;
    };

    next.version = to_number(obj.get("version"))
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map(|n| n.min(f64::from(u32::MAX)) as u32)
        .unwrap_or(1);

    next.sidebar_mode = match obj.get("sidebarMode").and_then(Value::as_str) {
        Some("analytics") => SidebarMode::Analytics,
        _ => SidebarMode::Daily,
    };
    next.view_mode = match obj.get("viewMode").and_then(Value::as_str) {
        Some("month") => ViewMode::Month,
        _ => ViewMode::Week,
    };

    let habits: Vec<Habit> = obj
        .get("habits")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).map(normalize_habit).collect())
        .unwrap_or_default();
    next.habits = if habits.is_empty() { seed_habits() } else { habits };

    next.entries = obj
        .get("entries")
        .and_then(Value::as_object)
        .map(normalize_entries)
        .unwrap_or_default();
    for habit in &next.habits {
        next.entries.entry(habit.id.clone()).or_default();
    }

    next.day_notes = obj
        .get("dayNotes")
        .and_then(Value::as_object)
        .map(|notes| {
            notes
                .iter()
                .filter_map(|(date, text)| text.as_str().map(|t| (date.clone(), t.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let cloud = obj.get("cloud").and_then(Value::as_object);
    if let Some(cloud) = cloud {
        if let Some(enabled) = cloud.get("enabled") {
            next.cloud.enabled = truthy(enabled);
        }
        if let Some(url) = cloud.get("endpointUrl").or_else(|| cloud.get("webAppUrl")) {
            next.cloud.endpoint_url = normalize_endpoint_url(&text_or_empty(url));
        }
        if let Some(user_id) = cloud.get("userId") {
            next.cloud.user_id = normalize_user_id(&text_or_empty(user_id));
        }
        if let Some(stamp) = cloud.get("lastSyncedAt") {
            next.cloud.last_synced_at = text_or_empty(stamp);
        }
        if let Some(pending) = cloud.get("pendingPush") {
            next.cloud.pending_push = truthy(pending);
        }
    }

    // Older documents kept the credential next to the endpoint.
    let credential = obj
        .get("auth")
        .and_then(Value::as_object)
        .and_then(|auth| auth.get("credential"))
        .or_else(|| cloud.and_then(|c| c.get("apiToken")));
    if let Some(credential) = credential {
        next.auth = AuthState::from_credential(text_or_empty(credential).trim());
    }

    next
}

fn normalize_habit(obj: &Map<String, Value>) -> Habit {
    let id = match obj.get("id") {
        Some(v) if truthy(v) => text_or_empty(v),
        _ => format!("habit_{}", Uuid::new_v4()),
    };
    let name = match obj.get("name") {
        Some(v) if truthy(v) => text_or_empty(v),
        _ => "Untitled Habit".to_string(),
    };
    let icon = match obj.get("icon") {
        Some(v) if truthy(v) => text_or_empty(v),
        _ => "✅".to_string(),
    };
    let color = obj
        .get("color")
        .and_then(Value::as_str)
        .map(normalize_hex_color)
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());

    let target = match obj.get("targetPerWeek") {
        Some(v) if truthy(v) => to_number(Some(v)),
        _ => Some(3.0),
    };
    let target_per_week = match target {
        Some(n) if n.is_finite() => n.clamp(1.0, 7.0).round() as u8,
        _ => 1,
    };

    Habit {
        id,
        name,
        icon: icon.chars().take(MAX_ICON_CHARS).collect(),
        color,
        target_per_week,
        scheduled_days: normalize_days(obj.get("scheduledDays")),
        archived: obj.get("archived").is_some_and(truthy),
    }
}

fn normalize_entries(raw: &Map<String, Value>) -> BTreeMap<String, EntriesByDate> {
    raw.iter()
        .filter_map(|(habit_id, by_date)| {
            let by_date = by_date.as_object()?;
            let entries: EntriesByDate = by_date
                .iter()
                .filter_map(|(date, entry)| {
                    entry.as_object().map(|e| (date.clone(), normalize_entry(e)))
                })
                .collect();
            Some((habit_id.clone(), entries))
        })
        .collect()
}

fn normalize_entry(obj: &Map<String, Value>) -> Entry {
    let positive = |key: &str, max: f64| {
        to_number(obj.get(key))
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n.min(max).round())
    };

    Entry {
        completed: obj.get("completed").is_some_and(truthy),
        note: obj.get("note").and_then(Value::as_str).unwrap_or_default().to_string(),
        duration: positive("duration", MAX_DURATION_MIN).map(|n| n as u32),
        intensity: positive("intensity", MAX_INTENSITY).map(|n| n as u8),
        updated_at: obj
            .get("updatedAt")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Weekday list: integers 0..=6, unique and sorted; `[1, 3, 5]` when
/// nothing valid remains.
pub(crate) fn normalize_days(raw: Option<&Value>) -> Vec<u8> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return DEFAULT_DAYS.to_vec();
    };

    let valid: BTreeSet<u8> = items
        .iter()
        .filter_map(|day| to_number(Some(day)))
        .filter(|n| n.fract() == 0.0 && (0.0..=6.0).contains(n))
        .map(|n| n as u8)
        .collect();

    if valid.is_empty() {
        DEFAULT_DAYS.to_vec()
    } else {
        valid.into_iter().collect()
    }
}

pub(crate) fn normalize_hex_color(value: &str) -> String {
    let trimmed = value.trim();
    let is_hex = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if is_hex {
        trimmed.to_ascii_lowercase()
    } else {
        DEFAULT_COLOR.to_string()
    }
}

/// Canonical absolute http(s) URL, or empty when the input is not one.
pub fn normalize_endpoint_url(value: &str) -> String {
    let text = value.trim();
    if text.is_empty() {
        return String::new();
    }
    match Url::parse(text) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        _ => String::new(),
    }
}

/// `[A-Za-z0-9_-]{1,40}`, falling back to `default`.
pub fn normalize_user_id(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_USER_ID_CHARS)
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Loose numeric coercion; `None` stands for "not a number".
fn to_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok()
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_or_empty(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}
