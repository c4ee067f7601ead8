// Package list store for the Flyme allow-lists kept in the global settings table.
// load   : read and dedupe a list, empty when the channel cannot be used
// fetch  : same read, but reports why it failed
// add    : append a package and write the whole list back
// remove : re-read the persisted value, drop a package, write it back

pub use crate::package_list_stt::*;
use crate::shell_channel::PrivilegedChannel;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

impl ListKey {
    pub const ALL: [ListKey; 2] = [ListKey::FrameInterpolation, ListKey::SuperResolution];

    /// Name of the key in the global settings table.
    pub fn settings_key(&self) -> &'static str {
        match self {
            ListKey::FrameInterpolation => "flyme_vpp_frc_pkg_list",
            ListKey::SuperResolution => "flyme_vpp_ais_pkg_list",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            ListKey::FrameInterpolation => "frc",
            ListKey::SuperResolution => "ais",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ListKey::FrameInterpolation => "Frame interpolation",
            ListKey::SuperResolution => "Super resolution",
        }
    }
}

impl FromStr for ListKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frc" | "frame" | "memc" | "flyme_vpp_frc_pkg_list" => Ok(ListKey::FrameInterpolation),
            "ais" | "super" | "sr" | "flyme_vpp_ais_pkg_list" => Ok(ListKey::SuperResolution),
            other => Err(format!(
                "unknown list '{}', expected 'frc' or 'ais'",
                other
            )),
        }
    }
}

impl std::fmt::Display for ListKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Non-empty segments of a raw settings value, duplicates included.
///
/// `settings get` prints `null` for a key that was never written.
fn segments(raw: &str) -> impl Iterator<Item = &str> {
    let raw = raw.trim();
    let raw = if raw == "null" { "" } else { raw };
    raw.split(LIST_DELIMITER).filter(|segment| !segment.is_empty())
}

/// Split a raw settings value into unique identifiers, keeping first occurrences.
pub fn parse_package_list(raw: &str) -> PackageList {
    let mut list: PackageList = Vec::new();
    for segment in segments(raw) {
        if !list.iter().any(|p| p == segment) {
            list.push(segment.to_string());
        }
    }
    list
}

pub fn join_package_list(list: &[String]) -> String {
    list.join(&LIST_DELIMITER.to_string())
}

/// Android package names only use ASCII letters, digits, `_` and `.`
pub fn is_valid_package_id(package_id: &str) -> bool {
    !package_id.is_empty()
        && package_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

pub fn settings_get_command(key: ListKey) -> String {
    format!("settings get global {}", key.settings_key())
}

pub fn settings_put_command(key: ListKey, value: &str) -> String {
    format!(
        "settings put global {} {}",
        key.settings_key(),
        shell_quote(value)
    )
}

/// Quote a value for `sh`. Empty values become `''` so the argument still exists.
fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ',' | '-'));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Append `package` unless it is already present.
/// Returns `None` when nothing changes.
pub(crate) fn with_package(list: &[String], package: &str) -> Option<PackageList> {
    if !is_valid_package_id(package) {
        warn!("Refusing to add invalid package identifier: {:?}", package);
        return None;
    }
    if list.iter().any(|p| p == package) {
        debug!("{} already in list, nothing to add", package);
        return None;
    }
    let mut updated = list.to_vec();
    updated.push(package.to_string());
    Some(updated)
}

impl PackageListStore {
    pub fn new(channel: Arc<dyn PrivilegedChannel>) -> Self {
        Self { channel }
    }

    /// Check whether list operations can currently reach the settings table.
    pub fn probe(&self) -> ChannelState {
        if !self.channel.is_available() {
            ChannelState::Unavailable
        } else if !self.channel.has_permission() {
            ChannelState::Denied
        } else {
            ChannelState::Ready
        }
    }

    pub fn request_permission(&self) {
        self.channel.request_permission();
    }

    /// Read a list, reporting why the read failed.
    pub fn fetch(&self, key: ListKey) -> Result<PackageList, StoreError> {
        Ok(parse_package_list(&self.read_raw(key)?))
    }

    fn read_raw(&self, key: ListKey) -> Result<String, StoreError> {
        match self.probe() {
            ChannelState::Unavailable => return Err(StoreError::Unavailable),
            ChannelState::Denied => return Err(StoreError::Denied),
            ChannelState::Ready => {}
        }
        let raw = self.channel.exec(&settings_get_command(key))?;
        debug!("{} raw value: {:?}", key.settings_key(), raw);
        Ok(raw)
    }

    /// Read a list. Any failure yields an empty list.
    pub fn load(&self, key: ListKey) -> PackageList {
        match self.fetch(key) {
            Ok(list) => list,
            Err(e) => {
                warn!("Failed to load {}: {}", key.settings_key(), e);
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted value with `list`.
    pub fn save(&self, key: ListKey, list: &[String]) -> Result<(), StoreError> {
        let value = join_package_list(list);
        let output = self.channel.exec(&settings_put_command(key, &value))?;
        if !output.is_empty() {
            debug!("settings put {} output: {}", key.settings_key(), output);
        }
        Ok(())
    }

    /// Append `package` to the caller's `list` and persist the result.
    ///
    /// The write outcome is only logged; the returned list is what was sent.
    pub fn add(&self, key: ListKey, list: &[String], package: &str) -> PackageList {
        let Some(updated) = with_package(list, package) else {
            return list.to_vec();
        };
        if let Err(e) = self.save(key, &updated) {
            error!("Failed to write {}: {}", key.settings_key(), e);
        }
        updated
    }

    /// Re-read the persisted value, drop `package` and write the remainder back.
    ///
    /// Other entries are written back as stored, duplicates included.
    pub fn try_remove(&self, key: ListKey, package: &str) -> Result<PackageList, StoreError> {
        let raw = self.read_raw(key)?;
        let updated: PackageList = segments(&raw)
            .filter(|segment| *segment != package)
            .map(str::to_string)
            .collect();
        self.save(key, &updated)?;
        Ok(updated)
    }

    pub fn remove(&self, key: ListKey, package: &str) -> PackageList {
        match self.try_remove(key, package) {
            Ok(list) => list,
            Err(e) => {
                error!("Failed to remove {} from {}: {}", package, key.settings_key(), e);
                Vec::new()
            }
        }
    }
}
