//! Tracking wizard
//!
//! A linear, stack-based flow that collects one instance:
//!
//! 1. time & duration
//! 2. urge strength & intention
//! 3. environment (locations, activities)
//! 4. feelings (emotions, sensations, sensory triggers)
//! 5. thoughts
//! 6. notes, then submit
//!
//! The draft lives in memory until [`TrackingWizard::submit`] succeeds or the
//! user cancels.

use crate::api::InstancesApi;
use crate::auth::Route;
use crate::catalog::Category;
use crate::clock::Clock;
use crate::error::ClientError;
use crate::report::{ErrorLevel, ErrorReporter, ErrorSource, ReportOptions};
use crate::types::{
    Instance, IntentionType, NewInstance, Selections, MAX_URGE_STRENGTH, MIN_URGE_STRENGTH,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Default urge strength shown on the slider
pub const DEFAULT_URGE_STRENGTH: u8 = 5;
/// Default duration in minutes
pub const DEFAULT_DURATION_MINUTES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    TimeAndDuration,
    UrgeAndIntention,
    Environment,
    Feelings,
    Thoughts,
    Notes,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::TimeAndDuration,
        WizardStep::UrgeAndIntention,
        WizardStep::Environment,
        WizardStep::Feelings,
        WizardStep::Thoughts,
        WizardStep::Notes,
    ];

    pub fn first() -> WizardStep {
        WizardStep::TimeAndDuration
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<WizardStep> {
        self.index().checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }

    /// Categories edited on this step's pill screens
    pub fn categories(&self) -> &'static [Category] {
        match self {
            WizardStep::Environment => &[Category::Location, Category::Activity],
            WizardStep::Feelings => &[
                Category::Emotion,
                Category::Sensation,
                Category::SensoryTrigger,
            ],
            WizardStep::Thoughts => &[Category::Thought],
            WizardStep::TimeAndDuration | WizardStep::UrgeAndIntention | WizardStep::Notes => &[],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::TimeAndDuration => "When did it happen?",
            WizardStep::UrgeAndIntention => "How strong was the urge?",
            WizardStep::Environment => "Environment",
            WizardStep::Feelings => "Feelings",
            WizardStep::Thoughts => "Thoughts",
            WizardStep::Notes => "Anything else?",
        }
    }
}

/// Ordered, duplicate-free multi-select over a list of option ids
pub struct PillSelection<'a> {
    selected: &'a mut Vec<String>,
}

impl<'a> PillSelection<'a> {
    pub fn new(selected: &'a mut Vec<String>) -> Self {
        Self { selected }
    }

    /// Flip `id`; returns whether it is selected afterwards
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.selected.iter().position(|s| s == id) {
            Some(pos) => {
                self.selected.remove(pos);
                false
            }
            None => {
                self.selected.push(id.to_string());
                true
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}

/// Everything collected so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDraft {
    pub time: DateTime<Utc>,
    pub duration: u32,
    pub urge_strength: u8,
    pub intention_type: IntentionType,
    #[serde(flatten)]
    pub selections: Selections,
    pub notes: String,
}

impl FormDraft {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            time: now,
            duration: DEFAULT_DURATION_MINUTES,
            urge_strength: DEFAULT_URGE_STRENGTH,
            intention_type: IntentionType::Automatic,
            selections: Selections::default(),
            notes: String::new(),
        }
    }

    /// Assemble the create payload. Empty selections stay empty arrays.
    pub fn to_payload(&self) -> NewInstance {
        NewInstance {
            time: self.time,
            duration: self.duration,
            urge_strength: self.urge_strength,
            intention_type: self.intention_type,
            selections: self.selections.clone(),
            notes: self.notes.trim().to_string(),
        }
    }
}

impl Default for FormDraft {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

pub struct TrackingWizard {
    draft: FormDraft,
    stack: Vec<WizardStep>,
    clock: Arc<dyn Clock>,
}

impl TrackingWizard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            draft: FormDraft::new(clock.now()),
            stack: vec![WizardStep::first()],
            clock,
        }
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.stack.last().copied().unwrap_or_else(WizardStep::first)
    }

    /// Steps visited so far, oldest first
    pub fn path(&self) -> &[WizardStep] {
        &self.stack
    }

    /// Move to the next step
    pub fn advance(&mut self) -> Result<WizardStep, ClientError> {
        let next = self
            .step()
            .next()
            .ok_or_else(|| ClientError::Validation("already on the last step".to_string()))?;
        self.stack.push(next);
        debug!(step = ?next, "wizard advanced");
        Ok(next)
    }

    /// Pop the current step. Returns `None` on the first step, where the
    /// caller leaves the wizard.
    pub fn back(&mut self) -> Option<WizardStep> {
        if self.stack.len() <= 1 {
            return None;
        }
        self.stack.pop();
        Some(self.step())
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.draft.time = time;
    }

    pub fn set_duration(&mut self, minutes: u32) {
        self.draft.duration = minutes;
    }

    pub fn set_urge_strength(&mut self, strength: u8) -> Result<(), ClientError> {
        if !(MIN_URGE_STRENGTH..=MAX_URGE_STRENGTH).contains(&strength) {
            return Err(ClientError::Validation(format!(
                "urge strength must be between {MIN_URGE_STRENGTH} and {MAX_URGE_STRENGTH}"
            )));
        }
        self.draft.urge_strength = strength;
        Ok(())
    }

    pub fn set_intention(&mut self, intention: IntentionType) {
        self.draft.intention_type = intention;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.draft.notes = notes.into();
    }

    /// Toggle a catalog option; ids outside the category are rejected
    pub fn toggle(&mut self, category: Category, id: &str) -> Result<bool, ClientError> {
        if category.lookup(id).is_none() {
            return Err(ClientError::Validation(format!(
                "unknown {} option: {id}",
                category.as_str()
            )));
        }
        Ok(PillSelection::new(self.draft.selections.get_mut(category)).toggle(id))
    }

    pub fn is_selected(&self, category: Category, id: &str) -> bool {
        self.draft.selections.get(category).iter().any(|s| s == id)
    }

    pub fn build_payload(&self) -> NewInstance {
        self.draft.to_payload()
    }

    /// Post the draft. On success the wizard resets and the caller should
    /// navigate to history; on failure the draft is kept and the error shown.
    pub async fn submit(
        &mut self,
        api: &InstancesApi,
        reporter: &ErrorReporter,
    ) -> Result<(Instance, Route), ClientError> {
        let payload = self.build_payload();
        match api.create(&payload).await {
            Ok(instance) => {
                info!(id = %instance.id, "instance recorded");
                self.reset();
                Ok((instance, Route::History))
            }
            Err(e) => {
                let source = match ErrorSource::classify(&e) {
                    ErrorSource::Unknown => ErrorSource::Ui,
                    other => other,
                };
                reporter.handle_error(
                    &e,
                    ReportOptions::new(ErrorLevel::Error, source)
                        .display(true)
                        .with_context("step", format!("{:?}", self.step())),
                );
                Err(e)
            }
        }
    }

    /// Discard the draft and leave the wizard
    pub fn cancel(&mut self) -> Route {
        self.reset();
        Route::Home
    }

    /// Resume a saved draft at `step`, rebuilding the back stack
    pub fn restore(&mut self, draft: FormDraft, step: WizardStep) {
        self.draft = draft;
        self.stack = WizardStep::ALL[..=step.index()].to_vec();
    }

    fn reset(&mut self) {
        self.draft = FormDraft::new(self.clock.now());
        self.stack = vec![WizardStep::first()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;

    fn wizard() -> TrackingWizard {
        TrackingWizard::new(Arc::new(ManualClock::at_millis(1_700_000_000_000)))
    }

    #[test]
    fn test_steps_advance_in_order() {
        let mut wizard = wizard();
        let mut visited = vec![wizard.step()];
        while let Ok(step) = wizard.advance() {
            visited.push(step);
        }
        assert_eq!(visited, WizardStep::ALL.to_vec());
        assert!(wizard.step().is_last());
        assert!(wizard.advance().is_err());
    }

    #[test]
    fn test_back_pops_stack() {
        let mut wizard = wizard();
        assert_eq!(wizard.back(), None);

        wizard.advance().unwrap();
        wizard.advance().unwrap();
        assert_eq!(wizard.back(), Some(WizardStep::UrgeAndIntention));
        assert_eq!(wizard.back(), Some(WizardStep::TimeAndDuration));
        assert_eq!(wizard.back(), None);
    }

    #[test]
    fn test_step_categories() {
        assert_eq!(
            WizardStep::Environment.categories(),
            &[Category::Location, Category::Activity]
        );
        assert_eq!(WizardStep::Thoughts.categories(), &[Category::Thought]);
        assert!(WizardStep::Notes.categories().is_empty());
        assert_eq!(WizardStep::Feelings.previous(), Some(WizardStep::Environment));
        assert_eq!(WizardStep::TimeAndDuration.previous(), None);
    }

    #[test]
    fn test_pill_toggle_is_ordered_and_unique() {
        let mut selected = Vec::new();
        let mut pills = PillSelection::new(&mut selected);
        assert!(pills.toggle("anxious"));
        assert!(pills.toggle("bored"));
        assert!(!pills.toggle("anxious"));
        assert!(pills.toggle("anxious"));
        assert!(pills.contains("bored"));
        assert_eq!(selected, vec!["bored".to_string(), "anxious".to_string()]);
    }

    #[test]
    fn test_toggle_validates_against_catalog() {
        let mut wizard = wizard();
        assert!(wizard.toggle(Category::Location, "bedroom").unwrap());
        assert!(wizard.is_selected(Category::Location, "bedroom"));
        assert!(wizard.toggle(Category::Location, "anxious").is_err());
        assert!(wizard.toggle(Category::Emotion, "not-a-feeling").is_err());
    }

    #[test]
    fn test_empty_selections_produce_empty_arrays() {
        let wizard = wizard();
        let payload = wizard.build_payload();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.urge_strength, DEFAULT_URGE_STRENGTH);
        assert_eq!(payload.intention_type, IntentionType::Automatic);

        let json = serde_json::to_value(&payload).unwrap();
        for key in [
            "selectedLocations",
            "selectedActivities",
            "selectedEmotions",
            "selectedThoughts",
            "selectedSensations",
            "selectedSensoryTriggers",
        ] {
            assert_eq!(json[key], serde_json::json!([]), "{key}");
        }
    }

    #[test]
    fn test_urge_strength_bounds() {
        let mut wizard = wizard();
        assert!(wizard.set_urge_strength(0).is_err());
        assert!(wizard.set_urge_strength(11).is_err());
        wizard.set_urge_strength(9).unwrap();
        assert_eq!(wizard.draft().urge_strength, 9);
    }

    #[test]
    fn test_cancel_resets_draft() {
        let mut wizard = wizard();
        wizard.set_notes("picked at cuticles");
        wizard.toggle(Category::Emotion, "anxious").unwrap();
        wizard.advance().unwrap();

        assert_eq!(wizard.cancel(), Route::Home);
        assert_eq!(wizard.step(), WizardStep::TimeAndDuration);
        assert!(wizard.draft().selections.is_empty());
        assert!(wizard.draft().notes.is_empty());
    }

    #[test]
    fn test_restore_rebuilds_back_stack() {
        let mut wizard = wizard();
        let mut draft = wizard.draft().clone();
        draft.notes = "saved".to_string();

        wizard.restore(draft, WizardStep::Feelings);
        assert_eq!(wizard.step(), WizardStep::Feelings);
        assert_eq!(wizard.path().len(), 4);
        assert_eq!(wizard.back(), Some(WizardStep::Environment));
        assert_eq!(wizard.draft().notes, "saved");
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let draft: FormDraft =
            serde_json::from_str(r#"{"urgeStrength": 8, "selectedEmotions": ["bored"]}"#).unwrap();
        assert_eq!(draft.urge_strength, 8);
        assert_eq!(draft.duration, DEFAULT_DURATION_MINUTES);
        assert_eq!(draft.selections.selected_emotions, vec!["bored".to_string()]);
    }
}
