//! Reads display metadata out of an application bundle.

use crate::categorizer::categorize;
use crate::constants::{
    BUNDLE_RESOURCES, BUNDLE_SUFFIX, INFO_PLIST, LOCALIZED_STRINGS, PREFERRED_LPROJ,
};
use crate::model::ApplicationItem;
use regex::Regex;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    pub localized_name: Option<String>,
    pub display_name: Option<String>,
    pub bundle_name: Option<String>,
    pub identifier: Option<String>,
}

impl BundleInfo {
    pub fn read(bundle: &Path) -> Self {
        let mut info = fs::read_to_string(bundle.join(INFO_PLIST))
            .map(|content| Self {
                localized_name: None,
                display_name: plist_value(&content, "CFBundleDisplayName"),
                bundle_name: plist_value(&content, "CFBundleName"),
                identifier: plist_value(&content, "CFBundleIdentifier"),
            })
            .unwrap_or_default();
        info.localized_name = localized_display_name(bundle);
        info
    }

    fn resolved_name(&self) -> Option<&str> {
        self.localized_name
            .as_deref()
            .or(self.display_name.as_deref())
            .or(self.bundle_name.as_deref())
    }
}

/// Builds an item for `path`, or `None` if it cannot be opened as a bundle.
pub fn read_bundle(path: &Path) -> Option<ApplicationItem> {
    if !path.is_dir() {
        return None;
    }

    let info = BundleInfo::read(path);
    let name = match info.resolved_name() {
        Some(name) => name.to_string(),
        None => file_stem_name(path)?,
    };
    let identifier = info.identifier.unwrap_or_default();
    let category = categorize(&identifier, &name);

    Some(ApplicationItem::new(
        name,
        category,
        identifier,
        path.to_path_buf(),
    ))
}

pub fn is_bundle_name(name: &str) -> bool {
    name.ends_with(BUNDLE_SUFFIX)
}

fn file_stem_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy();
    let name = file_name
        .strip_suffix(BUNDLE_SUFFIX)
        .unwrap_or(&file_name)
        .to_string();
    Some(name)
}

pub fn plist_value(content: &str, key: &str) -> Option<String> {
    let pattern = format!(
        r"<key>{}</key>\s*<string>([^<]+)</string>",
        regex::escape(key)
    );
    let regex = Regex::new(&pattern).ok()?;
    regex
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `"CFBundleDisplayName" = "...";` from the first preferred `.lproj`.
fn localized_display_name(bundle: &Path) -> Option<String> {
    let regex = Regex::new(r#""?CFBundleDisplayName"?\s*=\s*"((?:[^"\\]|\\.)*)"\s*;"#).ok()?;
    let resources = bundle.join(BUNDLE_RESOURCES);

    PREFERRED_LPROJ.iter().find_map(|lproj| {
        let bytes = fs::read(resources.join(lproj).join(LOCALIZED_STRINGS)).ok()?;
        let content = decode_strings_file(&bytes)?;
        regex
            .captures(&content)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

// .strings files are commonly UTF-16 with a BOM.
fn decode_strings_file(bytes: &[u8]) -> Option<String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => Some(decode_utf16(rest, u16::from_le_bytes)),
        [0xFE, 0xFF, rest @ ..] => Some(decode_utf16(rest, u16::from_be_bytes)),
        _ => String::from_utf8(bytes.to_vec()).ok(),
    }
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
