//! Plain-text rendering of the dashboard and history views.

use std::fmt::Write;
use vitals_core::overview::{DerivedActivity, MetricCard};
use vitals_core::types::{BodyComposition, CurrentUser, HistorySeries, Metric, Period};
use vitals_core::Overview;

const BAR_WIDTH: usize = 20;

/// Fixed-width progress bar. Anything past 100% renders as a full bar.
pub fn progress_bar(progress: u32) -> String {
    let filled = (progress.min(100) as usize * BAR_WIDTH + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn metric_value(card: &MetricCard) -> String {
    match card.value {
        Some(v) if card.unit.is_empty() => format!("{:.1}", v),
        Some(v) => format!("{:.1} {}", v, card.unit),
        None => "--".to_string(),
    }
}

fn optional(v: Option<f64>) -> String {
    v.map(|v| format!("{:.1}%", v)).unwrap_or_else(|| "--".into())
}

fn body_composition(out: &mut String, bc: &BodyComposition) {
    let _ = writeln!(out, "\nComposición Corporal");
    let _ = writeln!(out, "  Grasa     {}", optional(bc.fat));
    let _ = writeln!(out, "  Músculo   {}", optional(bc.muscle));
    let _ = writeln!(out, "  Agua      {}", optional(bc.water));
}

fn goal_line(out: &mut String, activity: &DerivedActivity) {
    let _ = writeln!(
        out,
        "  {:<10} {} {:>4}%",
        activity.name,
        progress_bar(activity.progress),
        activity.progress
    );
}

pub fn overview(overview: &Overview) -> String {
    let mut out = String::new();

    for card in &overview.metrics {
        let _ = writeln!(out, "{:<12} {:>10}  {}", card.title, metric_value(card), card.description);
    }

    if let Some(bc) = &overview.body_composition {
        body_composition(&mut out, bc);
    }

    let _ = writeln!(out, "\nObjetivos Diarios");
    for activity in &overview.daily_goals {
        goal_line(&mut out, activity);
    }

    let _ = writeln!(out);
    for card in [&overview.water, &overview.steps, &overview.exercise] {
        let _ = writeln!(out, "{:<22} {}", card.title, card.value);
    }
    out
}

pub fn user(user: &CurrentUser) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", user.display_name());
    for (key, value) in user.as_map() {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(out, "  {:<16} {}", key, text);
    }
    out
}

pub fn history(series: &HistorySeries, metric: Metric, period: Period) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} over {}", metric, period);
    if series.data.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for point in &series.data {
        let value = point
            .value
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "--".into());
        let _ = writeln!(out, "  {:<12} {:>10}", point.date, value);
    }
    if metric.is_cumulative() {
        if let Some(total) = series.total {
            let _ = writeln!(out, "  {:<12} {:>10.1}", "total", total);
        }
    }
    out
}
