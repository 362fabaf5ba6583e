use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

pub const DEFAULT_CATEGORY: &str =
  "general";

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

impl TaskPriority {
  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::Low => "low",
      | TaskPriority::Medium => "medium",
      | TaskPriority::High => "high"
    }
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriority(pub String);

impl fmt::Display for UnknownPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "unknown priority '{}' \
       (expected low, medium or high)",
      self.0
    )
  }
}

impl std::error::Error
  for UnknownPriority
{
}

impl FromStr for TaskPriority {
  type Err = UnknownPriority;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "l" | "low" => Ok(Self::Low),
      | "m" | "med" | "medium" => {
        Ok(Self::Medium)
      }
      | "h" | "high" => Ok(Self::High),
      | _ => {
        Err(UnknownPriority(
          s.to_string()
        ))
      }
    }
  }
}

fn default_category() -> String {
  DEFAULT_CATEGORY.to_string()
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
  #[serde(rename = "_id", alias = "id")]
  pub id:          String,
  pub title:       String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(default)]
  pub completed:   bool,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default = "default_category")]
  pub category:    String,
  #[serde(
    default,
    with = "due_date_serde",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<NaiveDate>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>
}

/// Draft submitted to create a task. The store assigns identity and
/// timestamps.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
  pub title:       String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<TaskPriority>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub category:    Option<String>,
  #[serde(
    default,
    with = "due_date_serde",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<NaiveDate>
}

impl TaskCreate {
  pub fn new(
    title: impl Into<String>
  ) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }

  pub fn has_title(&self) -> bool {
    !self.title.trim().is_empty()
  }

  /// Fills priority and category so the store never receives a draft
  /// without them.
  pub fn with_defaults(mut self) -> Self {
    if self.priority.is_none() {
      self.priority =
        Some(TaskPriority::default());
    }
    let blank_category = self
      .category
      .as_deref()
      .is_none_or(|c| c.trim().is_empty());
    if blank_category {
      self.category =
        Some(default_category());
    }
    self
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:       Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub completed:   Option<bool>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<TaskPriority>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub category:    Option<String>,
  #[serde(
    default,
    with = "due_date_serde",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<NaiveDate>
}

impl TaskPatch {
  pub fn completed(
    completed: bool
  ) -> Self {
    Self {
      completed: Some(completed),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }
}

/// Constraints for a list query. `None` means no constraint on that field.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskFilter {
  pub completed: Option<bool>,
  pub priority:  Option<TaskPriority>,
  pub category:  Option<String>,
  pub search:    Option<String>
}

impl TaskFilter {
  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }

  pub fn query_pairs(
    &self
  ) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(completed) =
      self.completed
    {
      pairs.push((
        "completed",
        completed.to_string()
      ));
    }
    if let Some(priority) = self.priority
    {
      pairs.push((
        "priority",
        priority.as_str().to_string()
      ));
    }
    if let Some(category) =
      self.category.as_ref()
    {
      pairs.push((
        "category",
        category.clone()
      ));
    }
    if let Some(search) =
      self.search.as_ref()
    {
      pairs
        .push(("search", search.clone()));
    }
    pairs
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct StatBucket {
  #[serde(alias = "_id")]
  pub key:   String,
  pub count: u64
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
  pub total:       u64,
  pub completed:   u64,
  pub pending:     u64,
  #[serde(default)]
  pub by_priority: Vec<StatBucket>,
  #[serde(default)]
  pub by_category: Vec<StatBucket>
}

/// Due dates travel as `YYYY-MM-DD`; full timestamps from the store are
/// truncated to their date.
pub mod due_date_serde {
  use chrono::{
    DateTime,
    NaiveDate
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  const FORMAT: &str = "%Y-%m-%d";

  pub fn parse(
    raw: &str
  ) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(
      trimmed, FORMAT
    )
    .ok()
    .or_else(|| {
      DateTime::parse_from_rfc3339(
        trimmed
      )
      .ok()
      .map(|dt| dt.date_naive())
    })
  }

  pub fn serialize<S>(
    value: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match value {
      | Some(date) => {
        serializer.serialize_str(
          &date.format(FORMAT).to_string()
        )
      }
      | None => serializer.serialize_none()
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      Option::<String>::deserialize(
        deserializer
      )?;
    match raw.as_deref() {
      | None => Ok(None),
      | Some(s) if s.trim().is_empty() => {
        Ok(None)
      }
      | Some(s) => {
        parse(s).map(Some).ok_or_else(
          || {
            serde::de::Error::custom(
              format!(
                "invalid due date: {s}"
              )
            )
          }
        )
      }
    }
  }
}
