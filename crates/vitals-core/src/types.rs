//! Wire and domain types shared by the session and metrics components.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ── Identity ────────────────────────────────────────────────────────────

/// Durable identity of the signed-in user.
///
/// The service reports ids as JSON numbers; they are held as strings so the
/// persisted form and the URL form are the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(s) => UserId(s),
            Repr::Number(n) => UserId(n.to_string()),
        })
    }
}

/// Opaque profile object returned by `GET /users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserDetails(pub Map<String, Value>);

/// The externally visible user: `{id}` with profile fields layered on top.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CurrentUser(Map<String, Value>);

impl CurrentUser {
    /// Merge the bare id shape with optional details. Detail keys win,
    /// including `id` itself.
    pub fn merge(user_id: &UserId, details: Option<&UserDetails>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::String(user_id.as_str().to_string()));
        if let Some(details) = details {
            for (key, value) in &details.0 {
                fields.insert(key.clone(), value.clone());
            }
        }
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String view of a field, rendering numbers as text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Username when the profile has arrived, otherwise the bare id.
    pub fn display_name(&self) -> String {
        self.get_str("username")
            .or_else(|| self.get_str("id"))
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ── Auth payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Masculino,
    Femenino,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "masculino" | "m" | "male" => Ok(Gender::Masculino),
            "femenino" | "f" | "female" => Ok(Gender::Femenino),
            other => Err(format!("unknown gender '{}' (expected Masculino or Femenino)", other)),
        }
    }
}

/// New-account payload for `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub birthday: NaiveDate,
    pub gender: Gender,
    pub password: String,
    pub current_weight: f64,
    pub current_height: f64,
}

/// Payload for `PUT /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub username: String,
    pub birthday: NaiveDate,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdateResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub credentials_changed: bool,
}

// ── Stats ───────────────────────────────────────────────────────────────

/// Server-reported snapshot of the user's current health metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStats {
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub body_composition: Option<BodyComposition>,
    #[serde(default)]
    pub fat_percentage: Option<f64>,
    /// Glasses of water (250 ml each).
    #[serde(default)]
    pub water_consumed: u32,
    #[serde(default)]
    pub steps: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub muscle: Option<f64>,
    #[serde(default)]
    pub water: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub exercise_name: Option<String>,
    /// Minutes.
    #[serde(default)]
    pub duration: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── History ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Weight,
    Height,
    Bmi,
    BodyComposition,
    FatPercentage,
    Water,
    Steps,
    Exercise,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Weight,
        Metric::Height,
        Metric::Bmi,
        Metric::BodyComposition,
        Metric::FatPercentage,
        Metric::Water,
        Metric::Steps,
        Metric::Exercise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Weight => "weight",
            Metric::Height => "height",
            Metric::Bmi => "bmi",
            Metric::BodyComposition => "body_composition",
            Metric::FatPercentage => "fat_percentage",
            Metric::Water => "water",
            Metric::Steps => "steps",
            Metric::Exercise => "exercise",
        }
    }

    /// Cumulative metrics come back with a period total.
    pub fn is_cumulative(&self) -> bool {
        matches!(self, Metric::Water | Metric::Steps | Metric::Exercise)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1w")]
    Week,
    #[serde(rename = "1m")]
    Month,
    #[serde(rename = "3m")]
    Quarter,
    #[serde(rename = "6m")]
    HalfYear,
    #[serde(rename = "1y")]
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "1w",
            Period::Month => "1m",
            Period::Quarter => "3m",
            Period::HalfYear => "6m",
            Period::Year => "1y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1w" => Ok(Period::Week),
            "1m" => Ok(Period::Month),
            "3m" => Ok(Period::Quarter),
            "6m" => Ok(Period::HalfYear),
            "1y" => Ok(Period::Year),
            other => Err(format!("unknown period '{}' (expected 1w, 1m, 3m, 6m or 1y)", other)),
        }
    }
}

/// One point of a metric history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    #[serde(default)]
    pub value: Option<f64>,
    /// Metric-specific fields (e.g. `exercises`, `duration`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    #[serde(default)]
    pub data: Vec<HistoryPoint>,
    /// Period total, reported for cumulative metrics.
    #[serde(default)]
    pub total: Option<f64>,
}

// ── Import ──────────────────────────────────────────────────────────────

/// Payload for `POST /users/{id}/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub import_type: String,
    pub data: Vec<Value>,
}
