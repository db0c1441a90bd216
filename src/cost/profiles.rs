//! AWS profile discovery from the shared `config` and `credentials` files
//!
//! The files are INI-style. `[profile X]` and `[default]` name profiles in the
//! config file, `[X]` names them in the credentials file. Parsing is lenient:
//! unreadable files count as absent, malformed lines are skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Profile, ProfileSource};

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const ACCESS_KEY_HINT_LEN: usize = 8;

type Section = BTreeMap<String, String>;

/// Locations of the two profile files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePaths {
    pub config: PathBuf,
    pub credentials: PathBuf,
}

impl ProfilePaths {
    pub fn new(config: impl Into<PathBuf>, credentials: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            credentials: credentials.into(),
        }
    }
}

impl Default for ProfilePaths {
    fn default() -> Self {
        Self::new(default_config_path(), default_credentials_path())
    }
}

/// `$AWS_CONFIG_FILE`, else `~/.aws/config`
pub fn default_config_path() -> PathBuf {
    env_path("AWS_CONFIG_FILE").unwrap_or_else(|| aws_dir().join("config"))
}

/// `$AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`
pub fn default_credentials_path() -> PathBuf {
    env_path("AWS_SHARED_CREDENTIALS_FILE").unwrap_or_else(|| aws_dir().join("credentials"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| PathBuf::from(shellexpand::tilde(&v).to_string()))
}

fn aws_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aws")
}

/// Discover profiles from both files, merged by name and ordered by name.
///
/// Never fails: a missing or unreadable file contributes no profiles.
pub fn discover_profiles(config_path: &Path, credentials_path: &Path) -> Vec<Profile> {
    let mut profiles: BTreeMap<String, Profile> = BTreeMap::new();

    if let Some(content) = read_optional(config_path) {
        for (section, entries) in parse_ini(&content) {
            let Some(name) = config_profile_name(&section) else {
                continue;
            };
            let profile = profiles
                .entry(name.clone())
                .or_insert_with(|| Profile::named(name));
            apply_config_entries(profile, &entries);
        }
    }

    if let Some(content) = read_optional(credentials_path) {
        for (section, entries) in parse_ini(&content) {
            let in_config = profiles.contains_key(&section);
            let profile = profiles
                .entry(section.clone())
                .or_insert_with(|| Profile::named(section));
            profile.source = if in_config {
                ProfileSource::Both
            } else {
                ProfileSource::Credentials
            };
            apply_credential_entries(profile, &entries);
        }
    }

    tracing::debug!("Discovered {} AWS profiles", profiles.len());
    profiles.into_values().collect()
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::debug!("Skipping profile file {}: {}", path.display(), e);
            None
        }
    }
}

/// Profile name for a config-file section header
fn config_profile_name(section: &str) -> Option<String> {
    if section == "default" {
        return Some("default".to_string());
    }
    section
        .strip_prefix("profile ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn apply_config_entries(profile: &mut Profile, entries: &Section) {
    if let Some(region) = entries.get("region") {
        profile.region = Some(region.clone());
    }
    if let Some(output) = entries.get("output") {
        profile.output = Some(output.clone());
    }
    if let Some(role_arn) = entries.get("role_arn") {
        profile.role_arn = Some(role_arn.clone());
    }
    if let Some(source) = entries.get("source_profile") {
        profile.source_profile = Some(source.clone());
    }
}

fn apply_credential_entries(profile: &mut Profile, entries: &Section) {
    let access_key = entries.get(ACCESS_KEY_ID);
    let has_secret = entries.contains_key(SECRET_ACCESS_KEY);

    profile.has_credentials = access_key.is_some() && has_secret;
    if let Some(key) = access_key {
        let hint: String = key.chars().take(ACCESS_KEY_HINT_LEN).collect();
        profile.access_key_hint = Some(format!("{}...", hint));
    }

    // Config file wins for region; credentials only fill gaps
    if profile.region.is_none() {
        profile.region = entries.get("region").cloned();
    }
    if profile.role_arn.is_none() {
        profile.role_arn = entries.get("role_arn").cloned();
    }
    if profile.source_profile.is_none() {
        profile.source_profile = entries.get("source_profile").cloned();
    }
}

/// Parse INI content into `(section, entries)` pairs in file order.
///
/// Keys are lowercased; empty values are dropped. Indented lines are nested
/// settings (e.g. `s3 =` blocks) and are skipped.
fn parse_ini(content: &str) -> Vec<(String, Section)> {
    let mut sections: Vec<(String, Section)> = Vec::new();
    let mut current: Option<usize> = None;
    // UTF-8 byte-order mark would otherwise hide the first header
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    for raw in content.lines() {
        if raw.starts_with([' ', '\t']) {
            continue;
        }
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            current = header
                .strip_suffix(']')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| section_index(&mut sections, name));
            continue;
        }

        let Some(index) = current else {
            continue;
        };
        let Some((key, value)) = split_entry(line) else {
            continue;
        };
        if !value.is_empty() {
            sections[index].1.insert(key, value);
        }
    }

    sections
}

/// Index of `name`, appending it if unseen (duplicate headers merge)
fn section_index(sections: &mut Vec<(String, Section)>, name: &str) -> usize {
    if let Some(pos) = sections.iter().position(|(n, _)| n == name) {
        return pos;
    }
    sections.push((name.to_string(), Section::new()));
    sections.len() - 1
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    let value = line[pos + 1..].trim().to_string();
    Some((key, value))
}

/// Caller-owned cache of discovered profiles with explicit refresh.
pub struct ProfileCache {
    paths: ProfilePaths,
    profiles: RwLock<Option<Arc<Vec<Profile>>>>,
}

impl ProfileCache {
    pub fn new(paths: ProfilePaths) -> Self {
        Self {
            paths,
            profiles: RwLock::new(None),
        }
    }

    pub fn paths(&self) -> &ProfilePaths {
        &self.paths
    }

    /// Cached profiles, scanning on first use
    pub fn get(&self) -> Arc<Vec<Profile>> {
        if let Some(profiles) = self.profiles.read().as_ref() {
            return Arc::clone(profiles);
        }
        self.refresh()
    }

    /// Rescan both files and replace the cached set
    pub fn refresh(&self) -> Arc<Vec<Profile>> {
        let scanned = Arc::new(discover_profiles(
            &self.paths.config,
            &self.paths.credentials,
        ));
        *self.profiles.write() = Some(Arc::clone(&scanned));
        scanned
    }

    /// Drop the cached set; the next `get` rescans
    pub fn invalidate(&self) {
        *self.profiles.write() = None;
    }

    /// Look up a profile by name
    pub fn find(&self, name: &str) -> Option<Profile> {
        self.get().iter().find(|p| p.name == name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_files(config: &str, credentials: &str) -> (TempDir, ProfilePaths) {
        let dir = TempDir::new().unwrap();
        let paths = ProfilePaths::new(dir.path().join("config"), dir.path().join("credentials"));
        std::fs::write(&paths.config, config).unwrap();
        std::fs::write(&paths.credentials, credentials).unwrap();
        (dir, paths)
    }

    fn discover(paths: &ProfilePaths) -> Vec<Profile> {
        discover_profiles(&paths.config, &paths.credentials)
    }

    #[test]
    fn test_access_key_without_secret_has_no_credentials() {
        let (_dir, paths) = write_files("", "[prod]\naws_access_key_id = AKIAABCDEFGHIJ\n");
        let profiles = discover(&paths);

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "prod");
        assert!(!profiles[0].has_credentials);
        assert_eq!(profiles[0].access_key_hint.as_deref(), Some("AKIAABCD..."));
    }

    #[test]
    fn test_merges_config_and_credentials() {
        let (_dir, paths) = write_files(
            "[default]\nregion = eu-west-1\n\n[profile staging]\nregion=us-west-2\noutput = table\n",
            "[default]\naws_access_key_id = AKIA1\naws_secret_access_key = secret\n\n[ci]\naws_access_key_id = AKIA2\naws_secret_access_key = s\n",
        );
        let profiles = discover(&paths);
        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ci", "default", "staging"]);

        let default = &profiles[1];
        assert_eq!(default.region.as_deref(), Some("eu-west-1"));
        assert!(default.has_credentials);
        assert_eq!(default.source, ProfileSource::Both);

        let staging = &profiles[2];
        assert_eq!(staging.output.as_deref(), Some("table"));
        assert!(!staging.has_credentials);
        assert_eq!(staging.source, ProfileSource::Config);

        let ci = &profiles[0];
        assert!(ci.has_credentials);
        assert_eq!(ci.region, None);
        assert_eq!(ci.source, ProfileSource::Credentials);
    }

    #[test]
    fn test_missing_files_yield_nothing() {
        let dir = TempDir::new().unwrap();
        let profiles = discover_profiles(
            &dir.path().join("nope-config"),
            &dir.path().join("nope-credentials"),
        );
        assert!(profiles.is_empty());
    }

    #[test]
    fn test_one_missing_file_still_reads_the_other() {
        let dir = TempDir::new().unwrap();
        let creds = dir.path().join("credentials");
        std::fs::write(&creds, "[only]\naws_access_key_id=a\naws_secret_access_key=b\n").unwrap();
        let profiles = discover_profiles(&dir.path().join("missing"), &creds);
        assert_eq!(profiles.len(), 1);
        assert!(profiles[0].has_credentials);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_dir, paths) = write_files(
            "orphan = 1\n[profile ]\nregion = nowhere\n[profile ok\n[profile good]\n# comment\n; other comment\nnot a pair\nregion = ap-south-1\n[sso-session corp]\nsso_region = us-east-1\n",
            "[]\n[broken\naws_access_key_id = x\n",
        );
        let profiles = discover(&paths);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "good");
        assert_eq!(profiles[0].region.as_deref(), Some("ap-south-1"));
    }

    #[test]
    fn test_leading_byte_order_mark_keeps_first_section() {
        let (_dir, paths) = write_files(
            "\u{feff}[default]\nregion = us-east-1\n",
            "\u{feff}[default]\naws_access_key_id = AKIA1\naws_secret_access_key = s\n",
        );
        let profiles = discover(&paths);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "default");
        assert_eq!(profiles[0].region.as_deref(), Some("us-east-1"));
        assert!(profiles[0].has_credentials);
        assert_eq!(profiles[0].source, ProfileSource::Both);
    }

    #[test]
    fn test_nested_settings_and_role_fields() {
        let (_dir, paths) = write_files(
            "[profile admin]\nrole_arn = arn:aws:iam::123456789012:role/Admin\nsource_profile = default\ns3 =\n  max_concurrent_requests = 20\n",
            "",
        );
        let profiles = discover(&paths);
        assert_eq!(profiles.len(), 1);
        assert_eq!(
            profiles[0].role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/Admin")
        );
        assert_eq!(profiles[0].source_profile.as_deref(), Some("default"));
    }

    #[test]
    fn test_cache_refresh_and_invalidate() {
        let (_dir, paths) = write_files("[profile a]\nregion = us-east-1\n", "");
        let cache = ProfileCache::new(paths.clone());
        assert_eq!(cache.get().len(), 1);

        std::fs::write(&paths.config, "[profile a]\n[profile b]\n").unwrap();
        // Still cached
        assert_eq!(cache.get().len(), 1);

        cache.invalidate();
        assert_eq!(cache.get().len(), 2);

        std::fs::write(&paths.config, "").unwrap();
        assert_eq!(cache.refresh().len(), 0);
        assert!(cache.find("a").is_none());
    }
}
