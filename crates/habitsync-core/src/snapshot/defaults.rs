use super::Habit;

/// Colors handed out to new habits, picked by a hash of the name.
pub const HABIT_COLOR_PALETTE: [&str; 10] = [
    "#2563d2", "#2f8b5d", "#d7842c", "#2f94bc", "#b1454f", "#6a5cb6", "#704b8d", "#8b6a35",
    "#4c7f95", "#4e8a54",
];

pub const DEFAULT_COLOR: &str = "#2563d2";

const EVERY_DAY: &[u8] = &[0, 1, 2, 3, 4, 5, 6];

fn habit(id: &str, name: &str, icon: &str, color: &str, target: u8, days: &[u8]) -> Habit {
    Habit {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        target_per_week: target,
        scheduled_days: days.to_vec(),
        archived: false,
    }
}

/// Habits every new document starts with.
pub fn seed_habits() -> Vec<Habit> {
    vec![
        habit("habit_strength_training", "Strength Training", "🏋️", "#2563d2", 3, &[1, 3, 5]),
        habit("habit_sleep", "7-8 hrs Sleep", "😴", "#5a6fc9", 7, EVERY_DAY),
        habit("habit_meals", "Eat Healthy Meals", "🥗", "#2f8b5d", 7, EVERY_DAY),
        habit("habit_study", "Study", "📚", "#d7842c", 6, &[0, 1, 2, 3, 4, 5]),
        habit("habit_hydration", "Drink 2L", "💧", "#2f94bc", 7, EVERY_DAY),
        habit("habit_no_alcohol", "No Alcohol", "🚫", "#b1454f", 7, EVERY_DAY),
        habit("habit_social", "Social Media < 90m", "📵", "#6a5cb6", 7, EVERY_DAY),
        habit("habit_deep_work", "Deep Work 60m", "🧠", "#704b8d", 7, EVERY_DAY),
        habit("habit_plan", "Plan Tomorrow", "📝", "#69707d", 7, EVERY_DAY),
        habit("habit_mobility", "Mobility 15m", "🤸", "#8b6a35", 5, &[1, 2, 3, 4, 5]),
    ]
}
