//! Document edits and queries over habits, entries and day notes.
//!
//! These are plain functions over `&mut Snapshot`; callers run them inside
//! a store mutation so that persistence and push scheduling follow.

use chrono::{Datelike, Local, NaiveDate};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::snapshot::{iso_now, Entry, Habit, Snapshot, HABIT_COLOR_PALETTE};

const MAX_NAME_CHARS: usize = 64;
const MAX_ICON_CHARS: usize = 4;

/// `YYYY-MM-DD` key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today_key() -> String {
    date_key(Local::now().date_naive())
}

pub fn parse_date_key(key: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(key.to_string()))
}

pub fn sanitize_habit_name(value: &str) -> String {
    value.trim().chars().take(MAX_NAME_CHARS).collect()
}

pub fn sanitize_habit_icon(value: &str) -> String {
    let text = value.trim();
    if text.is_empty() {
        "✅".to_string()
    } else {
        text.chars().take(MAX_ICON_CHARS).collect()
    }
}

/// Stable palette color derived from the habit name.
pub fn pick_habit_color(seed: &str) -> &'static str {
    if seed.is_empty() {
        return HABIT_COLOR_PALETTE[0];
    }
    let hash = seed
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)));
    HABIT_COLOR_PALETTE[hash as usize % HABIT_COLOR_PALETTE.len()]
}

pub fn active_habits(snapshot: &Snapshot) -> impl Iterator<Item = &Habit> {
    snapshot.habits.iter().filter(|habit| !habit.archived)
}

pub fn find_habit<'a>(snapshot: &'a Snapshot, habit_id: &str) -> Option<&'a Habit> {
    snapshot.habits.iter().find(|habit| habit.id == habit_id)
}

pub fn is_completed(snapshot: &Snapshot, habit_id: &str, date_key: &str) -> bool {
    snapshot
        .entries
        .get(habit_id)
        .and_then(|by_date| by_date.get(date_key))
        .is_some_and(|entry| entry.completed)
}

pub fn is_scheduled_on(habit: &Habit, date: NaiveDate) -> bool {
    let weekday = date.weekday().num_days_from_sunday() as u8;
    habit.scheduled_days.contains(&weekday)
}

/// Flip completion for one habit on one day. An entry that ends up
/// incomplete with nothing else recorded is removed, so toggling twice
/// leaves the document as it was.
pub fn toggle_completion(snapshot: &mut Snapshot, habit_id: &str, date_key: &str) -> bool {
    let by_date = snapshot.entries.entry(habit_id.to_string()).or_default();
    let current = by_date.get(date_key).cloned().unwrap_or_default();
    let next = !current.completed;

    if !next && current.is_bare() {
        by_date.remove(date_key);
    } else {
        by_date.insert(
            date_key.to_string(),
            Entry {
                completed: next,
                updated_at: iso_now(),
                ..current
            },
        );
    }
    next
}

/// Set or clear the note for a day. Blank text removes the note.
pub fn set_day_note(snapshot: &mut Snapshot, date_key: &str, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        snapshot.day_notes.remove(date_key);
    } else {
        snapshot.day_notes.insert(date_key.to_string(), text.to_string());
    }
}

/// Append a habit scheduled every day. Returns the new id.
pub fn add_habit(snapshot: &mut Snapshot, name: &str, icon: &str) -> Result<String, ValidationError> {
    let name = sanitize_habit_name(name);
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let habit = Habit {
        id: format!("habit_{}", Uuid::new_v4()),
        color: pick_habit_color(&name).to_string(),
        name,
        icon: sanitize_habit_icon(icon),
        target_per_week: 7,
        scheduled_days: vec![0, 1, 2, 3, 4, 5, 6],
        archived: false,
    };
    let id = habit.id.clone();
    snapshot.entries.insert(id.clone(), Default::default());
    snapshot.habits.push(habit);
    Ok(id)
}

pub fn rename_habit(
    snapshot: &mut Snapshot,
    habit_id: &str,
    name: &str,
    icon: &str,
) -> Result<(), ValidationError> {
    let name = sanitize_habit_name(name);
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let habit = snapshot
        .habits
        .iter_mut()
        .find(|habit| habit.id == habit_id)
        .ok_or_else(|| ValidationError::HabitNotFound(habit_id.to_string()))?;
    habit.name = name;
    habit.icon = sanitize_habit_icon(icon);
    Ok(())
}

pub fn delete_habit(snapshot: &mut Snapshot, habit_id: &str) -> Result<Habit, ValidationError> {
    let index = snapshot
        .habits
        .iter()
        .position(|habit| habit.id == habit_id)
        .ok_or_else(|| ValidationError::HabitNotFound(habit_id.to_string()))?;
    if snapshot.habits.len() <= 1 {
        return Err(ValidationError::LastHabit);
    }
    snapshot.entries.remove(habit_id);
    Ok(snapshot.habits.remove(index))
}

pub fn total_completions(snapshot: &Snapshot) -> usize {
    snapshot
        .entries
        .values()
        .flat_map(|by_date| by_date.values())
        .filter(|entry| entry.completed)
        .count()
}

/// Whether the document holds anything the user would miss if it were
/// replaced: a completed entry or a day note.
pub fn has_meaningful_data(snapshot: &Snapshot) -> bool {
    total_completions(snapshot) > 0 || !snapshot.day_notes.is_empty()
}

/// Scheduled and completed counts across active habits for one day.
pub fn day_totals(snapshot: &Snapshot, date: NaiveDate) -> (usize, usize) {
    let key = date_key(date);
    active_habits(snapshot)
        .filter(|habit| is_scheduled_on(habit, date))
        .fold((0, 0), |(scheduled, completed), habit| {
            let done = usize::from(is_completed(snapshot, &habit.id, &key));
            (scheduled + 1, completed + done)
        })
}
