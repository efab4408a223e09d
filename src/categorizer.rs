//! Keyword based category rules.
//!
//! Rules are evaluated in a fixed order and the first hit wins, so a name
//! matching several lists resolves to the earliest one.

use crate::model::{ApplicationItem, Category};

const SYSTEM_IDENTIFIER: &str = "com.apple";

const SYSTEM_NAMES: &[&str] = &[
    "finder",
    "safari",
    "mail",
    "messages",
    "facetime",
    "photos",
    "music",
    "calendar",
    "notes",
    "maps",
    "weather",
    "calculator",
    "preview",
    "textedit",
    "quicktime",
    "app store",
    "dictionary",
    "stocks",
    "voice memos",
    "home",
    "shortcuts",
];

const DEVELOPMENT_NAMES: &[&str] = &[
    "xcode",
    "terminal",
    "visual studio",
    "android studio",
    "intellij",
    "sublime",
    "vscode",
    "atom",
    "vim",
    "emacs",
];

const PRODUCTIVITY_NAMES: &[&str] = &[
    "microsoft word",
    "microsoft excel",
    "microsoft powerpoint",
    "google chrome",
    "firefox",
    "slack",
    "zoom",
    "teams",
    "notion",
    "evernote",
    "trello",
    "asana",
];

const ENTERTAINMENT_NAMES: &[&str] = &[
    "spotify",
    "netflix",
    "youtube",
    "disney",
    "steam",
    "discord",
    "twitch",
    "instagram",
    "facebook",
    "twitter",
];

const FOLDER_RULES: &[(&[&str], Category)] = &[
    (&["utilities", "tools"], Category::Utilities),
    (&["game", "entertainment"], Category::Entertainment),
    (&["develop", "dev", "code"], Category::Development),
    (&["product", "office"], Category::Productivity),
    (&["system"], Category::System),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn categorize(identifier: &str, name: &str) -> Category {
    let name = name.to_lowercase();
    let identifier = identifier.to_lowercase();

    if identifier.contains(SYSTEM_IDENTIFIER) || contains_any(&name, SYSTEM_NAMES) {
        Category::System
    } else if contains_any(&name, DEVELOPMENT_NAMES) {
        Category::Development
    } else if contains_any(&name, PRODUCTIVITY_NAMES) {
        Category::Productivity
    } else if contains_any(&name, ENTERTAINMENT_NAMES) {
        Category::Entertainment
    } else {
        Category::Utilities
    }
}

/// Folder name rules first, then the most common category among `apps`.
/// Ties go to the category that reaches the maximum first in `Category::ALL`
/// order.
pub fn categorize_folder(folder_name: &str, apps: &[ApplicationItem]) -> Category {
    let name = folder_name.to_lowercase();
    if let Some((_, category)) = FOLDER_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&name, keywords))
    {
        return *category;
    }

    let mut best = Category::default();
    let mut best_count = 0;
    for category in Category::ALL {
        let count = apps.iter().filter(|app| app.category == category).count();
        if count > best_count {
            best = category;
            best_count = count;
        }
    }
    best
}
