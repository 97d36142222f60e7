//! Static option dictionaries
//!
//! Each wizard category is backed by a fixed list of selectable options. Ids
//! are stable and are what gets stored on an instance; labels and emoji are
//! presentation only.

use serde::{Deserialize, Serialize};

/// A selectable catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionItem {
    pub id: &'static str,
    pub label: &'static str,
    pub emoji: &'static str,
}

const fn opt(id: &'static str, label: &'static str, emoji: &'static str) -> OptionItem {
    OptionItem { id, label, emoji }
}

/// Category of selectable options on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Location,
    Activity,
    Emotion,
    Thought,
    Sensation,
    SensoryTrigger,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Location,
        Category::Activity,
        Category::Emotion,
        Category::Thought,
        Category::Sensation,
        Category::SensoryTrigger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Location => "location",
            Category::Activity => "activity",
            Category::Emotion => "emotion",
            Category::Thought => "thought",
            Category::Sensation => "sensation",
            Category::SensoryTrigger => "sensory_trigger",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::Location => "Where were you?",
            Category::Activity => "What were you doing?",
            Category::Emotion => "How were you feeling?",
            Category::Thought => "What were you thinking?",
            Category::Sensation => "What did you notice in your body?",
            Category::SensoryTrigger => "Any sensory triggers?",
        }
    }

    pub fn options(&self) -> &'static [OptionItem] {
        match self {
            Category::Location => LOCATIONS,
            Category::Activity => ACTIVITIES,
            Category::Emotion => EMOTIONS,
            Category::Thought => THOUGHTS,
            Category::Sensation => SENSATIONS,
            Category::SensoryTrigger => SENSORY_TRIGGERS,
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&'static OptionItem> {
        self.options().iter().find(|o| o.id == id)
    }

    pub fn parse(value: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == value.trim().to_ascii_lowercase())
    }
}

/// Find an option in any category by id
pub fn find_option(id: &str) -> Option<(Category, &'static OptionItem)> {
    Category::ALL
        .into_iter()
        .find_map(|c| c.lookup(id).map(|o| (c, o)))
}

/// Find an option in any category by case-insensitive label
pub fn find_by_label(label: &str) -> Option<(Category, &'static OptionItem)> {
    let wanted = label.trim();
    Category::ALL.into_iter().find_map(|c| {
        c.options()
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(wanted))
            .map(|o| (c, o))
    })
}

pub const LOCATIONS: &[OptionItem] = &[
    opt("bedroom", "Bedroom", "🛏️"),
    opt("bathroom", "Bathroom", "🚿"),
    opt("living_room", "Living room", "🛋️"),
    opt("kitchen", "Kitchen", "🍳"),
    opt("car", "Car", "🚗"),
    opt("office", "Office", "🏢"),
    opt("school", "School", "🏫"),
    opt("public_transport", "Public transport", "🚌"),
    opt("outdoors", "Outdoors", "🌳"),
    opt("other_location", "Somewhere else", "📍"),
];

pub const ACTIVITIES: &[OptionItem] = &[
    opt("screen_time", "Using a screen", "📱"),
    opt("working", "Working", "💼"),
    opt("studying", "Studying", "📚"),
    opt("reading", "Reading", "📖"),
    opt("watching_tv", "Watching TV", "📺"),
    opt("driving", "Driving", "🚘"),
    opt("in_bed", "Lying in bed", "😴"),
    opt("grooming", "Grooming", "🪞"),
    opt("talking", "Talking", "💬"),
    opt("waiting", "Waiting", "⏳"),
];

pub const EMOTIONS: &[OptionItem] = &[
    opt("anxious", "Anxious", "😰"),
    opt("stressed", "Stressed", "😫"),
    opt("bored", "Bored", "🥱"),
    opt("sad", "Sad", "😢"),
    opt("angry", "Angry", "😠"),
    opt("frustrated", "Frustrated", "😤"),
    opt("tired", "Tired", "😩"),
    opt("lonely", "Lonely", "🫥"),
    opt("calm", "Calm", "😌"),
    opt("excited", "Excited", "🤩"),
];

pub const THOUGHTS: &[OptionItem] = &[
    opt("perfectionism", "It has to be perfect", "🎯"),
    opt("self_criticism", "Self-criticism", "🗯️"),
    opt("worry", "Worrying about something", "🌀"),
    opt("rumination", "Replaying the past", "🔁"),
    opt("urge_focus", "Focused on the urge", "🧲"),
    opt("mind_wandering", "Mind wandering", "☁️"),
    opt("no_thoughts", "Not thinking about anything", "⚪"),
];

pub const SENSATIONS: &[OptionItem] = &[
    opt("tension", "Tension", "🪢"),
    opt("itching", "Itching", "🪶"),
    opt("tingling", "Tingling", "✨"),
    opt("restlessness", "Restlessness", "🌪️"),
    opt("heat", "Feeling hot", "🔥"),
    opt("numbness", "Numbness", "🧊"),
    opt("rough_texture", "Rough or uneven texture", "🪨"),
];

pub const SENSORY_TRIGGERS: &[OptionItem] = &[
    opt("visual_imperfection", "Seeing an imperfection", "🔍"),
    opt("touch", "Touching the area", "✋"),
    opt("mirror", "Looking in a mirror", "🪞"),
    opt("bright_light", "Bright light", "💡"),
    opt("noise", "Noise", "🔊"),
    opt("fabric", "Fabric or clothing", "🧶"),
];
