//! Goal-relative display values derived from raw stats.
//!
//! Everything here is a pure function of [`RawStats`] and [`Goals`]; the
//! same input always yields the same [`Overview`].

use crate::config::Goals;
use crate::types::{BodyComposition, Exercise, RawStats};
use serde::Serialize;

/// Volume of one glass of water, in millilitres.
pub const GLASS_ML: u32 = 250;

const WATER_COLOR: &str = "#38bdf8";
const STEPS_COLOR: &str = "#4ade80";
const EXERCISE_COLOR: &str = "#8b5cf6";

/// Progress towards one daily goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedActivity {
    pub name: String,
    /// Whole percent, not capped at 100.
    pub progress: u32,
    pub color: String,
}

/// A headline card with its display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityCard {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub title: String,
    pub value: Option<f64>,
    pub unit: String,
    pub description: String,
}

/// Everything the dashboard renders for one stats snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub metrics: Vec<MetricCard>,
    /// Present only when the server reported a body composition.
    pub body_composition: Option<BodyComposition>,
    pub daily_goals: Vec<DerivedActivity>,
    pub water: ActivityCard,
    pub steps: ActivityCard,
    pub exercise: ActivityCard,
}

pub fn derive_overview(stats: &RawStats, goals: &Goals) -> Overview {
    let exercise_minutes = total_exercise_minutes(&stats.exercises);
    Overview {
        metrics: metric_cards(stats),
        body_composition: stats.body_composition.clone(),
        daily_goals: daily_activities(stats, goals),
        water: ActivityCard {
            title: "Agua Consumida".into(),
            value: format_water(stats.water_consumed, goals.water_goal_ml),
        },
        steps: ActivityCard {
            title: "Pasos".into(),
            value: format_steps(stats.steps, goals.steps_goal),
        },
        exercise: ActivityCard {
            title: "Ejercicio".into(),
            value: format_exercise(exercise_minutes, goals.exercise_goal_minutes),
        },
    }
}

/// One entry per tracked goal: water, steps, exercise.
pub fn daily_activities(stats: &RawStats, goals: &Goals) -> Vec<DerivedActivity> {
    let exercise_minutes = total_exercise_minutes(&stats.exercises);
    vec![
        DerivedActivity {
            name: "Agua".into(),
            progress: water_progress(stats.water_consumed, goals.water_goal_ml),
            color: WATER_COLOR.into(),
        },
        DerivedActivity {
            name: "Pasos".into(),
            progress: steps_progress(stats.steps, goals.steps_goal),
            color: STEPS_COLOR.into(),
        },
        DerivedActivity {
            name: "Ejercicio".into(),
            progress: exercise_progress(exercise_minutes, goals.exercise_goal_minutes),
            color: EXERCISE_COLOR.into(),
        },
    ]
}

fn metric_cards(stats: &RawStats) -> Vec<MetricCard> {
    vec![
        MetricCard {
            title: "Peso Actual".into(),
            value: stats.weight,
            unit: "kg".into(),
            description: "Tu peso corporal actual".into(),
        },
        MetricCard {
            title: "Altura".into(),
            value: stats.height,
            unit: "cm".into(),
            description: "Tu altura actual".into(),
        },
        MetricCard {
            title: "IMC".into(),
            value: stats.bmi,
            unit: String::new(),
            description: "Índice de masa corporal".into(),
        },
    ]
}

pub fn total_exercise_minutes(exercises: &[Exercise]) -> u64 {
    exercises.iter().map(|e| u64::from(e.duration)).sum()
}

/// `round(value / goal × 100)`; a zero goal reports no progress.
fn percent(value: f64, goal: f64) -> u32 {
    if goal <= 0.0 {
        return 0;
    }
    (value / goal * 100.0).round() as u32
}

pub fn water_progress(glasses: u32, water_goal_ml: u32) -> u32 {
    percent(
        f64::from(glasses) * f64::from(GLASS_ML),
        f64::from(water_goal_ml),
    )
}

pub fn steps_progress(steps: u64, steps_goal: u64) -> u32 {
    percent(steps as f64, steps_goal as f64)
}

pub fn exercise_progress(minutes: u64, exercise_goal_minutes: u32) -> u32 {
    percent(minutes as f64, f64::from(exercise_goal_minutes))
}

/// Glasses needed to reach the water goal, rounded up.
pub fn goal_glasses(water_goal_ml: u32) -> u32 {
    water_goal_ml.div_ceil(GLASS_ML)
}

/// `"8 vasos"` once the goal is met, `"4/8 vasos"` before.
pub fn format_water(glasses: u32, water_goal_ml: u32) -> String {
    let goal = goal_glasses(water_goal_ml);
    if glasses >= goal {
        format!("{} vasos", glasses)
    } else {
        format!("{}/{} vasos", glasses, goal)
    }
}

/// Thousands with one decimal, trailing `.0` dropped: 7500 → `7.5k`,
/// 10000 → `10k`, 500 → `0.5k`.
///
/// Rounds the nearest `f64` to `n / 1000`, so a count like 9950 sits just
/// below the decimal midpoint and shows `9.9k`. Exact binary midpoints
/// (x.25, x.75) round up.
pub fn format_thousands(n: u64) -> String {
    let text = if n % 500 == 250 {
        format!("{:.1}", (n + 50) as f64 / 1000.0)
    } else {
        format!("{:.1}", n as f64 / 1000.0)
    };
    match text.strip_suffix(".0") {
        Some(whole) => format!("{}k", whole),
        None => format!("{}k", text),
    }
}

/// `"10k pasos"` once the goal is met, `"7.5k/10k pasos"` before. Counts
/// under 1000 are shown as-is; the goal is always in thousands.
pub fn format_steps(steps: u64, steps_goal: u64) -> String {
    let current = if steps >= 1000 {
        format_thousands(steps)
    } else {
        steps.to_string()
    };
    if steps >= steps_goal {
        format!("{} pasos", current)
    } else {
        format!("{}/{} pasos", current, format_thousands(steps_goal))
    }
}

pub fn format_exercise(minutes: u64, exercise_goal_minutes: u32) -> String {
    if minutes >= u64::from(exercise_goal_minutes) {
        format!("{} min", minutes)
    } else {
        format!("{}/{} min", minutes, exercise_goal_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn goals() -> Goals {
        Goals::default()
    }

    fn exercises(durations: &[u32]) -> Vec<Exercise> {
        durations
            .iter()
            .map(|&duration| Exercise {
                duration,
                ..Exercise::default()
            })
            .collect()
    }

    #[test]
    fn test_water_below_goal() {
        assert_eq!(water_progress(4, 2000), 50);
        assert_eq!(format_water(4, 2000), "4/8 vasos");
    }

    #[test]
    fn test_water_goal_met() {
        assert_eq!(water_progress(8, 2000), 100);
        assert_eq!(format_water(8, 2000), "8 vasos");
        assert_eq!(format_water(11, 2000), "11 vasos");
    }

    #[test]
    fn test_goal_glasses_rounds_up() {
        assert_eq!(goal_glasses(2000), 8);
        assert_eq!(goal_glasses(2100), 9);
        assert_eq!(format_water(8, 2100), "8/9 vasos");
    }

    #[test]
    fn test_steps_below_goal() {
        assert_eq!(steps_progress(7500, 10_000), 75);
        assert_eq!(format_steps(7500, 10_000), "7.5k/10k pasos");
    }

    #[test]
    fn test_steps_goal_met_drops_goal_suffix() {
        assert_eq!(format_steps(10_000, 10_000), "10k pasos");
        assert_eq!(format_steps(12_340, 10_000), "12.3k pasos");
    }

    #[test]
    fn test_steps_under_thousand_render_raw() {
        assert_eq!(format_steps(999, 10_000), "999/10k pasos");
        assert_eq!(format_steps(0, 10_000), "0/10k pasos");
        assert_eq!(format_steps(1000, 10_000), "1k/10k pasos");
    }

    #[test]
    fn test_format_thousands_rounding() {
        assert_eq!(format_thousands(1250), "1.3k");
        assert_eq!(format_thousands(1249), "1.2k");
        assert_eq!(format_thousands(2250), "2.3k");
        assert_eq!(format_thousands(9750), "9.8k");
        assert_eq!(format_thousands(9960), "10k");
        assert_eq!(format_thousands(500), "0.5k");
        assert_eq!(format_thousands(8000), "8k");
    }

    #[test]
    fn test_format_thousands_midpoints_below_binary_value() {
        assert_eq!(format_thousands(7550), "7.5k");
        assert_eq!(format_thousands(1150), "1.1k");
        assert_eq!(format_steps(9950, 10_000), "9.9k/10k pasos");
        assert_eq!(format_steps(12_450, 10_000), "12.4k pasos");
    }

    #[test]
    fn test_exercise_over_goal_not_capped() {
        let total = total_exercise_minutes(&exercises(&[30, 40]));
        assert_eq!(total, 70);
        assert_eq!(exercise_progress(total, 60), 117);
        assert_eq!(format_exercise(total, 60), "70 min");
    }

    #[test]
    fn test_exercise_below_goal() {
        assert_eq!(format_exercise(45, 60), "45/60 min");
        assert_eq!(exercise_progress(0, 60), 0);
    }

    #[test]
    fn test_zero_goal_reports_no_progress() {
        assert_eq!(steps_progress(500, 0), 0);
        assert_eq!(water_progress(3, 0), 0);
    }

    #[test]
    fn test_daily_activities_order_and_colors() {
        let stats = RawStats {
            water_consumed: 4,
            steps: 7500,
            exercises: exercises(&[30, 40]),
            ..RawStats::default()
        };
        let activities = daily_activities(&stats, &goals());
        let summary: Vec<(&str, u32, &str)> = activities
            .iter()
            .map(|a| (a.name.as_str(), a.progress, a.color.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Agua", 50, "#38bdf8"),
                ("Pasos", 75, "#4ade80"),
                ("Ejercicio", 117, "#8b5cf6"),
            ]
        );
    }

    #[test]
    fn test_overview_body_composition_optional() {
        let without = derive_overview(&RawStats::default(), &goals());
        assert!(without.body_composition.is_none());

        let stats: RawStats = serde_json::from_value(json!({
            "weight": 70.0,
            "height": 175.0,
            "bmi": 22.9,
            "body_composition": {"fat": 18.5, "muscle": 40.1, "water": 55.0},
            "water_consumed": 8,
            "steps": 10000,
            "exercises": [{"exercise_name": "Correr", "duration": 60}]
        }))
        .unwrap();
        let with = derive_overview(&stats, &goals());
        assert_eq!(with.body_composition.as_ref().unwrap().muscle, Some(40.1));
        assert_eq!(with.water.value, "8 vasos");
        assert_eq!(with.steps.value, "10k pasos");
        assert_eq!(with.exercise.value, "60 min");
        assert_eq!(with.metrics[0].value, Some(70.0));
        assert_eq!(with.metrics[2].title, "IMC");
    }

    #[test]
    fn test_derivation_is_repeatable() {
        let stats = RawStats {
            water_consumed: 3,
            steps: 4321,
            exercises: exercises(&[15]),
            ..RawStats::default()
        };
        let first = derive_overview(&stats, &goals());
        let second = derive_overview(&stats, &goals());
        assert_eq!(first, second);
    }
}
