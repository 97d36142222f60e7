//! Core types for the BFRB tracker client
//!
//! This module defines the records exchanged with the REST API: recorded
//! instances, users, auth responses and coping strategies. Wire format is
//! camelCase JSON.

use crate::catalog::{self, Category};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted urge strength
pub const MIN_URGE_STRENGTH: u8 = 1;
/// Highest accepted urge strength
pub const MAX_URGE_STRENGTH: u8 = 10;

/// Whether the behavior happened without awareness or by choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionType {
    #[default]
    Automatic,
    Intentional,
}

impl IntentionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentionType::Automatic => "automatic",
            IntentionType::Intentional => "intentional",
        }
    }
}

impl std::str::FromStr for IntentionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" => Ok(IntentionType::Automatic),
            "intentional" => Ok(IntentionType::Intentional),
            other => Err(format!("unknown intention type: {other}")),
        }
    }
}

/// Category selections attached to an instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selections {
    #[serde(default)]
    pub selected_locations: Vec<String>,
    #[serde(default)]
    pub selected_activities: Vec<String>,
    #[serde(default)]
    pub selected_emotions: Vec<String>,
    #[serde(default)]
    pub selected_thoughts: Vec<String>,
    #[serde(default)]
    pub selected_sensations: Vec<String>,
    #[serde(default)]
    pub selected_sensory_triggers: Vec<String>,
}

impl Selections {
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Location => &self.selected_locations,
            Category::Activity => &self.selected_activities,
            Category::Emotion => &self.selected_emotions,
            Category::Thought => &self.selected_thoughts,
            Category::Sensation => &self.selected_sensations,
            Category::SensoryTrigger => &self.selected_sensory_triggers,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Location => &mut self.selected_locations,
            Category::Activity => &mut self.selected_activities,
            Category::Emotion => &mut self.selected_emotions,
            Category::Thought => &mut self.selected_thoughts,
            Category::Sensation => &mut self.selected_sensations,
            Category::SensoryTrigger => &mut self.selected_sensory_triggers,
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.get(*c).is_empty())
    }
}

/// Payload for creating or updating an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstance {
    /// When the behavior happened
    pub time: DateTime<Utc>,
    /// Duration in minutes
    pub duration: u32,
    /// Urge strength (1-10)
    pub urge_strength: u8,
    pub intention_type: IntentionType,
    #[serde(flatten)]
    pub selections: Selections,
    #[serde(default)]
    pub notes: String,
}

impl NewInstance {
    /// Check field ranges; category selections are never required
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_URGE_STRENGTH..=MAX_URGE_STRENGTH).contains(&self.urge_strength) {
            return Err(format!(
                "urge strength must be between {} and {}, got {}",
                MIN_URGE_STRENGTH, MAX_URGE_STRENGTH, self.urge_strength
            ));
        }
        Ok(())
    }
}

/// A recorded behavioral instance as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When the behavior happened; older records only carry `createdAt`
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: u32,
    pub urge_strength: u8,
    #[serde(default)]
    pub intention_type: IntentionType,
    #[serde(flatten)]
    pub selections: Selections,
    #[serde(default)]
    pub notes: String,
}

impl Instance {
    /// Occurrence time, falling back to creation time
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.time.unwrap_or(self.created_at)
    }
}

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pending_approval: Option<bool>,
}

impl User {
    pub fn is_pending(&self) -> bool {
        self.is_pending_approval.unwrap_or(false)
    }
}

/// Response of `/auth/login` and `/auth/register`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `/auth/refresh`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

// ============================================================================
// Strategies
// ============================================================================

/// Reference to a catalog option carried by a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRef {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl From<&catalog::OptionItem> for OptionRef {
    fn from(item: &catalog::OptionItem) -> Self {
        Self {
            id: item.id.to_string(),
            label: item.label.to_string(),
            emoji: Some(item.emoji.to_string()),
        }
    }
}

/// What a strategy is meant to counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// A known option
    Catalog(OptionRef),
    /// Free text entered by the user
    Custom { label: String },
}

impl Trigger {
    pub fn label(&self) -> &str {
        match self {
            Trigger::Catalog(option) => &option.label,
            Trigger::Custom { label } => label,
        }
    }
}

/// Trigger as it appears on the wire: either a bare string or an option object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTrigger {
    Text(String),
    Option {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        emoji: Option<String>,
    },
}

impl RawTrigger {
    /// Resolve to a [`Trigger`]. Strings matching a catalog id or label become
    /// catalog references; blank input is dropped.
    pub fn normalize(self) -> Option<Trigger> {
        match self {
            RawTrigger::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                let known = catalog::find_option(text).or_else(|| catalog::find_by_label(text));
                Some(match known {
                    Some((_, item)) => Trigger::Catalog(item.into()),
                    None => Trigger::Custom {
                        label: text.to_string(),
                    },
                })
            }
            RawTrigger::Option { id, label, emoji } => {
                let id = id.filter(|v| !v.trim().is_empty());
                let label = label.filter(|v| !v.trim().is_empty());
                match (id, label) {
                    (Some(id), Some(label)) => Some(Trigger::Catalog(OptionRef { id, label, emoji })),
                    (Some(id), None) => match catalog::find_option(&id) {
                        Some((_, item)) => Some(Trigger::Catalog(item.into())),
                        None => Some(Trigger::Custom { label: id }),
                    },
                    (None, Some(label)) => RawTrigger::Text(label).normalize(),
                    (None, None) => None,
                }
            }
        }
    }
}

/// Strategy record as received from the API, before normalization
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStrategy {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub triggers: Vec<RawTrigger>,
    /// Single-trigger form used by older records
    #[serde(default)]
    pub trigger: Option<RawTrigger>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A coping strategy with normalized triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<RawStrategy> for Strategy {
    fn from(raw: RawStrategy) -> Self {
        let triggers = raw
            .trigger
            .into_iter()
            .chain(raw.triggers)
            .filter_map(RawTrigger::normalize)
            .fold(Vec::new(), |mut acc: Vec<Trigger>, t| {
                if !acc.contains(&t) {
                    acc.push(t);
                }
                acc
            });

        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            triggers,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

/// Payload for creating or updating a strategy. Triggers are always sent in
/// object form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStrategy {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub triggers: Vec<OptionRef>,
}

impl NewStrategy {
    pub fn new(name: impl Into<String>, description: Option<String>, triggers: &[Trigger]) -> Self {
        Self {
            name: name.into(),
            description,
            triggers: triggers
                .iter()
                .map(|t| match t {
                    Trigger::Catalog(option) => option.clone(),
                    Trigger::Custom { label } => OptionRef {
                        id: label.to_string(),
                        label: label.to_string(),
                        emoji: None,
                    },
                })
                .collect(),
        }
    }
}
