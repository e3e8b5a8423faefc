use clap::Subcommand;
use habitsync_core::habits::{
    active_habits, add_habit, date_key, delete_habit, find_habit, is_completed, parse_date_key, rename_habit,
    set_day_note, toggle_completion, today_key,
};
use habitsync_core::ValidationError;

use super::{flush_or_warn, open_default_controller, CmdResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// List habits and their state for a day
    List {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip completion for a habit on a day
    Toggle {
        /// Habit id
        id: String,
        /// Day (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Set the note for a day (empty text clears it)
    Note {
        /// Day (YYYY-MM-DD)
        date: String,
        /// Note text
        text: String,
    },
    /// Add a habit scheduled every day
    Add {
        /// Habit name
        name: String,
        /// Short icon or emoji
        #[arg(long, default_value = "")]
        icon: String,
    },
    /// Change a habit's name and icon
    Rename {
        /// Habit id
        id: String,
        /// New name
        name: String,
        /// New icon (keeps the current one when omitted)
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a habit and its history
    Remove {
        /// Habit id
        id: String,
    },
}

/// Resolve `--date`, defaulting to today.
fn resolve_date(date: Option<String>) -> Result<String, ValidationError> {
    match date {
        Some(raw) => parse_date_key(raw.trim()).map(date_key),
        None => Ok(today_key()),
    }
}

pub async fn run(action: HabitAction) -> CmdResult {
    let controller = open_default_controller()?;

    match action {
        HabitAction::List { date, json } => {
            let day = resolve_date(date)?;
            let snapshot = controller.snapshot();
            let rows: Vec<_> = active_habits(&snapshot)
                .map(|habit| (habit, is_completed(&snapshot, &habit.id, &day)))
                .collect();

            if json {
                let habits: Vec<_> = rows
                    .iter()
                    .map(|(habit, done)| {
                        serde_json::json!({
                            "id": habit.id,
                            "name": habit.name,
                            "icon": habit.icon,
                            "color": habit.color,
                            "completed": done,
                        })
                    })
                    .collect();
                let value = serde_json::json!({
                    "date": day,
                    "note": snapshot.day_notes.get(&day),
                    "habits": habits,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            println!("{day}");
            for (habit, done) in &rows {
                let mark = if *done { "x" } else { " " };
                println!("  [{mark}] {} {}  ({})", habit.icon, habit.name, habit.id);
            }
            if let Some(note) = snapshot.day_notes.get(&day) {
                println!("  note: {note}");
            }
            return Ok(());
        }
        HabitAction::Toggle { id, date } => {
            let day = resolve_date(date)?;
            let done = controller.try_mutate(|snapshot| {
                if find_habit(snapshot, &id).is_none() {
                    return Err(ValidationError::HabitNotFound(id.clone()));
                }
                Ok(toggle_completion(snapshot, &id, &day))
            })?;
            println!("{id} on {day}: {}", if done { "done" } else { "not done" });
        }
        HabitAction::Note { date, text } => {
            let day = date_key(parse_date_key(date.trim())?);
            controller.mutate(|snapshot| set_day_note(snapshot, &day, &text));
            println!("note saved for {day}");
        }
        HabitAction::Add { name, icon } => {
            let id = controller.try_mutate(|snapshot| add_habit(snapshot, &name, &icon))?;
            println!("{id}");
        }
        HabitAction::Rename { id, name, icon } => {
            controller.try_mutate(|snapshot| {
                let icon = match &icon {
                    Some(icon) => icon.clone(),
                    None => find_habit(snapshot, &id)
                        .map(|habit| habit.icon.clone())
                        .ok_or_else(|| ValidationError::HabitNotFound(id.clone()))?,
                };
                rename_habit(snapshot, &id, &name, &icon)
            })?;
            println!("renamed {id}");
        }
        HabitAction::Remove { id } => {
            let removed = controller.try_mutate(|snapshot| delete_habit(snapshot, &id))?;
            println!("removed {}", removed.name);
        }
    }

    if controller.report().enabled {
        flush_or_warn(&controller).await;
    }
    Ok(())
}
