//! History views over fetched instances

use crate::catalog::{Category, OptionItem};
use crate::types::{Instance, IntentionType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Instances that occurred on one UTC day, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    pub date: NaiveDate,
    pub instances: Vec<Instance>,
}

/// Group instances by occurrence day. Days and the instances inside each day
/// are ordered newest first.
pub fn group_by_day(instances: &[Instance]) -> Vec<DayGroup> {
    let mut sorted = instances.to_vec();
    sorted.sort_by_key(|i| std::cmp::Reverse(i.occurred_at()));

    let mut groups: Vec<DayGroup> = Vec::new();
    for instance in sorted {
        let date = instance.occurred_at().date_naive();
        match groups.last_mut() {
            Some(group) if group.date == date => group.instances.push(instance),
            _ => groups.push(DayGroup {
                date,
                instances: vec![instance],
            }),
        }
    }
    groups
}

/// A selected option resolved for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOption {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl ResolvedOption {
    fn resolve(category: Category, id: &str) -> Self {
        match category.lookup(id) {
            Some(OptionItem { label, emoji, .. }) => Self {
                id: id.to_string(),
                label: label.to_string(),
                emoji: Some(emoji.to_string()),
            },
            // Ids no longer in the catalog are shown as stored
            None => Self {
                id: id.to_string(),
                label: id.to_string(),
                emoji: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSection {
    pub category: Category,
    pub title: &'static str,
    pub options: Vec<ResolvedOption>,
}

/// Detail view of one instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDetails {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub duration: u32,
    pub urge_strength: u8,
    pub intention_type: IntentionType,
    /// Only categories with at least one selection
    pub sections: Vec<DetailSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InstanceDetails {
    pub fn from_instance(instance: &Instance) -> Self {
        let sections = Category::ALL
            .into_iter()
            .filter_map(|category| {
                let ids = instance.selections.get(category);
                if ids.is_empty() {
                    return None;
                }
                Some(DetailSection {
                    category,
                    title: category.title(),
                    options: ids
                        .iter()
                        .map(|id| ResolvedOption::resolve(category, id))
                        .collect(),
                })
            })
            .collect();

        let notes = Some(instance.notes.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Self {
            id: instance.id.clone(),
            occurred_at: instance.occurred_at(),
            duration: instance.duration,
            urge_strength: instance.urge_strength,
            intention_type: instance.intention_type,
            sections,
            notes,
        }
    }
}

/// Aggregate numbers for a list of instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub count: usize,
    pub mean_urge_strength: Option<f64>,
    pub automatic: usize,
    pub intentional: usize,
    pub total_minutes: u64,
}

impl HistorySummary {
    pub fn from_instances(instances: &[Instance]) -> Self {
        if instances.is_empty() {
            return Self::default();
        }

        let urge_total: u64 = instances.iter().map(|i| u64::from(i.urge_strength)).sum();
        let automatic = instances
            .iter()
            .filter(|i| i.intention_type == IntentionType::Automatic)
            .count();

        Self {
            count: instances.len(),
            mean_urge_strength: Some(urge_total as f64 / instances.len() as f64),
            automatic,
            intentional: instances.len() - automatic,
            total_minutes: instances.iter().map(|i| u64::from(i.duration)).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Selections;
    use pretty_assertions::assert_eq;

    fn instance(id: &str, at: &str, urge: u8, intention: IntentionType) -> Instance {
        Instance {
            id: id.to_string(),
            user_id: None,
            created_at: at.parse().unwrap(),
            time: Some(at.parse().unwrap()),
            duration: 3,
            urge_strength: urge,
            intention_type: intention,
            selections: Selections::default(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_group_by_day_newest_first() {
        let instances = vec![
            instance("a", "2024-01-14T09:00:00Z", 3, IntentionType::Automatic),
            instance("b", "2024-01-15T08:00:00Z", 5, IntentionType::Automatic),
            instance("c", "2024-01-15T20:00:00Z", 7, IntentionType::Intentional),
        ];

        let groups = group_by_day(&instances);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date.to_string(), "2024-01-15");
        let ids: Vec<&str> = groups[0].instances.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(groups[1].instances[0].id, "a");
    }

    #[test]
    fn test_details_resolve_labels() {
        let mut item = instance("a", "2024-01-14T09:00:00Z", 3, IntentionType::Automatic);
        item.selections.selected_emotions = vec!["anxious".to_string(), "retired_id".to_string()];
        item.notes = "  ".to_string();

        let details = InstanceDetails::from_instance(&item);
        assert_eq!(details.sections.len(), 1);
        assert_eq!(details.sections[0].category, Category::Emotion);
        assert_eq!(details.sections[0].options[0].label, "Anxious");
        assert_eq!(details.sections[0].options[1].label, "retired_id");
        assert_eq!(details.sections[0].options[1].emoji, None);
        assert_eq!(details.notes, None);
    }

    #[test]
    fn test_summary() {
        let instances = vec![
            instance("a", "2024-01-14T09:00:00Z", 3, IntentionType::Automatic),
            instance("b", "2024-01-15T08:00:00Z", 6, IntentionType::Intentional),
        ];
        let summary = HistorySummary::from_instances(&instances);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean_urge_strength, Some(4.5));
        assert_eq!(summary.automatic, 1);
        assert_eq!(summary.intentional, 1);
        assert_eq!(summary.total_minutes, 6);

        assert_eq!(HistorySummary::from_instances(&[]), HistorySummary::default());
    }
}
