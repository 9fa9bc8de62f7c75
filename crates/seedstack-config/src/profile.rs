//! Profile-scoped configuration.
//!
//! A key decorated with a trailing profile list only survives when at least
//! one of its profiles is active:
//!
//! ```yaml
//! datasource<dev, test>:
//!   url: jdbc:h2:mem:test
//! datasource<prod>:
//!   url: jdbc:postgresql://db/prod
//! ```
//!
//! With `seedstack.profiles=prod` the tree resolves to
//! `datasource.url = jdbc:postgresql://db/prod`. Undecorated keys are always
//! kept. Malformed decorations (`a<dev`, `a<>`, `<dev>`) are literal key text.

use std::collections::BTreeSet;
use std::env;
use std::fmt;

use tracing::trace;

use crate::node::MapNode;
use crate::processor::{descend, TreeProcessor};

/// Name of the setting holding the active profiles.
pub const PROFILES_PROPERTY: &str = "seedstack.profiles";

/// Environment variable fallback for [`PROFILES_PROPERTY`].
pub const PROFILES_ENV: &str = "SEEDSTACK_PROFILES";

/// The set of active profiles.
///
/// Profile names are compared exactly (case-sensitive) after trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveProfiles {
    names: BTreeSet<String>,
}

impl ActiveProfiles {
    /// No active profile.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Parses a comma-separated profile list.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::ActiveProfiles;
    ///
    /// let profiles = ActiveProfiles::parse(" dev, , test ");
    /// assert!(profiles.contains("dev"));
    /// assert!(profiles.contains("test"));
    /// assert_eq!(profiles.len(), 2);
    /// ```
    #[must_use]
    pub fn parse(list: &str) -> Self {
        split_profiles(list).collect()
    }

    /// Reads the active profiles from the process environment.
    ///
    /// Looks up `seedstack.profiles` first, then `SEEDSTACK_PROFILES`.
    /// Returns no profile when neither is set.
    #[must_use]
    pub fn from_env() -> Self {
        env::var(PROFILES_PROPERTY)
            .or_else(|_| env::var(PROFILES_ENV))
            .map(|list| Self::parse(&list))
            .unwrap_or_default()
    }

    /// Returns true if `profile` is active.
    #[must_use]
    pub fn contains(&self, profile: &str) -> bool {
        self.names.contains(profile)
    }

    /// Returns true if any of `profiles` is active.
    #[must_use]
    pub fn intersects<S: AsRef<str>>(&self, profiles: &[S]) -> bool {
        profiles.iter().any(|profile| self.contains(profile.as_ref()))
    }

    /// Number of active profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when no profile is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the active profile names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ActiveProfiles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(Into::into)
                .map(|name: String| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

impl fmt::Display for ActiveProfiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        f.write_str(&names.join(","))
    }
}

fn split_profiles(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|name| !name.is_empty())
}

/// A key split into its bare name and profile list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDecoration<'a> {
    /// The key without decoration.
    pub name: &'a str,
    /// The profiles listed in the decoration.
    pub profiles: Vec<&'a str>,
}

/// Parses the trailing `<p1, p2>` decoration of a key.
///
/// Returns `None` when the key carries no well-formed decoration: no closing
/// `>` at the end, no opening `<`, an empty name, a stray `>` inside the list
/// or an empty profile list.
///
/// # Example
///
/// ```
/// use seedstack_config::parse_decoration;
///
/// let decoration = parse_decoration("cc<profile1, profile3>").unwrap();
/// assert_eq!(decoration.name, "cc");
/// assert_eq!(decoration.profiles, vec!["profile1", "profile3"]);
///
/// assert!(parse_decoration("cc<profile1").is_none());
/// ```
#[must_use]
pub fn parse_decoration(key: &str) -> Option<ProfileDecoration<'_>> {
    let body = key.strip_suffix('>')?;
    let open = body.rfind('<')?;
    let name = body[..open].trim_end();
    let list = &body[open + 1..];
    if name.is_empty() || list.contains('>') {
        return None;
    }
    let profiles: Vec<&str> = split_profiles(list).collect();
    if profiles.is_empty() {
        return None;
    }
    Some(ProfileDecoration { name, profiles })
}

/// Returns `key` without any profile decoration.
#[must_use]
pub fn strip_decoration(key: &str) -> &str {
    let mut name = key;
    while let Some(decoration) = parse_decoration(name) {
        name = decoration.name;
    }
    name
}

/// Keeps only the entries whose profiles match and strips their decoration.
///
/// Stacked decorations (`key<a><b>`) must all match. A dropped entry is never
/// descended into. When two kept variants resolve to the same bare name, the
/// later one wins and takes the position of the first.
#[derive(Debug, Clone, Default)]
pub struct ProfileProcessor {
    active: ActiveProfiles,
}

impl ProfileProcessor {
    /// Creates a processor for the given active profiles.
    #[must_use]
    pub fn new(active: ActiveProfiles) -> Self {
        Self { active }
    }

    /// Returns the active profiles.
    #[must_use]
    pub fn active(&self) -> &ActiveProfiles {
        &self.active
    }

    /// Resolves a raw key: `Some(bare name)` when it survives, `None` when one
    /// of its decorations does not match the active profiles.
    #[must_use]
    pub fn resolve_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        let mut name = key;
        while let Some(decoration) = parse_decoration(name) {
            if !self.active.intersects(&decoration.profiles) {
                return None;
            }
            name = decoration.name;
        }
        Some(name)
    }
}

impl TreeProcessor for ProfileProcessor {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn process(&self, map: &mut MapNode) {
        let entries = std::mem::take(map);
        for (key, mut child) in entries {
            let bare = match self.resolve_key(&key) {
                Some(bare) => bare.to_string(),
                None => {
                    trace!(key = %key, profiles = %self.active, "dropping profile-scoped key");
                    continue;
                }
            };
            descend(&mut child, self);
            map.insert(bare, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, ConfigNode, Format};

    fn process(yaml: &str, profiles: &str) -> ConfigNode {
        let mut node = parse_str(yaml, Format::Yaml).unwrap();
        descend(&mut node, &ProfileProcessor::new(ActiveProfiles::parse(profiles)));
        node
    }

    fn flat(node: &ConfigNode) -> Vec<(String, String)> {
        node.flatten().into_iter().collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_parse_decoration_trims_profiles() {
        let decoration = parse_decoration("key< a ,b,, c >").unwrap();
        assert_eq!(decoration.name, "key");
        assert_eq!(decoration.profiles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_decoration_malformed() {
        assert!(parse_decoration("key").is_none());
        assert!(parse_decoration("key<dev").is_none());
        assert!(parse_decoration("key dev>").is_none());
        assert!(parse_decoration("key<>").is_none());
        assert!(parse_decoration("key< , >").is_none());
        assert!(parse_decoration("<dev>").is_none());
        assert!(parse_decoration("key<dev>x").is_none());
        assert!(parse_decoration("key<a>b>").is_none());
    }

    #[test]
    fn test_strip_decoration() {
        assert_eq!(strip_decoration("key<dev>"), "key");
        assert_eq!(strip_decoration("key<dev><prod>"), "key");
        assert_eq!(strip_decoration("key"), "key");
        assert_eq!(strip_decoration("key<"), "key<");
    }

    #[test]
    fn test_active_profiles_from_iter_trims() {
        let profiles: ActiveProfiles = [" dev ", "", "test"].into_iter().collect();
        assert_eq!(profiles.to_string(), "dev,test");
    }

    #[test]
    fn test_profiles_are_case_sensitive() {
        let node = process("a<Dev>: 1\n", "dev");
        assert!(node.as_map().unwrap().is_empty());
    }

    #[test]
    fn test_no_active_profile_drops_decorated_keys() {
        let node = process("a: 1\nb<profile1>: 2\n", "");
        assert_eq!(flat(&node), pairs(&[("a", "1")]));
    }

    #[test]
    fn test_matching_profile_strips_decoration() {
        let node = process("a: 1\nb<profile1>: 2\n", "profile1");
        assert_eq!(flat(&node), pairs(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_any_listed_profile_is_enough() {
        let yaml = "cc<profile1, profile3>: 5\n";
        assert_eq!(flat(&process(yaml, "profile3")), pairs(&[("cc", "5")]));
        assert!(flat(&process(yaml, "profile2")).is_empty());
    }

    #[test]
    fn test_nested_scoping() {
        let yaml = "c<profile2>:\n  ca: 3\n  cb<profile3>: 4\n  cc<profile1,profile3>: 5\n";
        assert_eq!(flat(&process(yaml, "profile2")), pairs(&[("c.ca", "3")]));
        assert!(flat(&process(yaml, "profile3")).is_empty());
    }

    #[test]
    fn test_stacked_decorations_require_all() {
        let yaml = "a<x><y>: 1\n";
        assert!(flat(&process(yaml, "x")).is_empty());
        assert_eq!(flat(&process(yaml, "x,y")), pairs(&[("a", "1")]));
    }

    #[test]
    fn test_later_variant_wins_in_first_position() {
        let node = process("a<dev>: 1\nb: 2\na<test>: 3\n", "dev,test");
        let keys: Vec<_> = node.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(node.as_map().unwrap()["a"], ConfigNode::from("3"));
    }

    #[test]
    fn test_malformed_decoration_kept_verbatim() {
        let node = process("a<dev: 1\n", "dev");
        assert!(node.as_map().unwrap().contains_key("a<dev"));
    }

    #[test]
    fn test_profiles_inside_arrays() {
        let node = process("items:\n  - name: one\n    debug<dev>: true\n", "");
        let item = &node.as_map().unwrap()["items"].as_array().unwrap()[0];
        assert_eq!(item.as_map().unwrap().len(), 1);
    }
}
