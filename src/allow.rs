use std::collections::BTreeSet;
use std::fmt;

use crate::error::ToolError;

/// Repository allow-list built from a comma-separated pattern string.
///
/// Patterns are lowercased on load. Supported forms:
/// - `*` matches every repository
/// - `owner/*` matches every repository under `owner`
/// - `owner/name` matches exactly that repository
///
/// An empty list places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    patterns: BTreeSet<String>,
}

impl AllowList {
    pub fn parse(raw: &str) -> Self {
        let patterns = raw
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn allows(&self, full_name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let full = full_name.to_lowercase();
        let owner = full.split_once('/').map(|(o, _)| o).unwrap_or(full.as_str());
        self.patterns.iter().any(|pat| {
            if pat == "*" {
                return true;
            }
            if let Some(pat_owner) = pat.strip_suffix("/*") {
                if pat_owner == owner {
                    return true;
                }
            }
            *pat == full
        })
    }

    /// Sorted patterns, or `(no restriction)` when empty.
    pub fn describe(&self) -> String {
        if self.patterns.is_empty() {
            "(no restriction)".to_string()
        } else {
            self.patterns.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

/// A validated `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef(String);

impl RepoRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn owner(&self) -> &str {
        self.0.split_once('/').map(|(o, _)| o).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.0.split_once('/').map(|(_, n)| n).unwrap_or_default()
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_repo_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// True when `s` has the shape `owner/name` with both segments non-empty and
/// restricted to `[A-Za-z0-9_.-]`.
pub fn is_well_formed(s: &str) -> bool {
    let Some((owner, name)) = s.split_once('/') else {
        return false;
    };
    !owner.is_empty()
        && !name.is_empty()
        && owner.chars().all(is_repo_char)
        && name.chars().all(is_repo_char)
}

/// Check shape first, then the allow-list. No I/O.
pub fn validate_repo(repo: &str, allow: &AllowList) -> Result<RepoRef, ToolError> {
    let repo = repo.trim();
    if !is_well_formed(repo) {
        return Err(ToolError::InvalidRepo);
    }
    if !allow.allows(repo) {
        return Err(ToolError::NotAllowed(repo.to_string()));
    }
    Ok(RepoRef(repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rules() {
        let open = AllowList::default();
        assert!(validate_repo("octo/hello-world", &open).is_ok());
        assert!(validate_repo("  octo/hello.world_2  ", &open).is_ok());
        for bad in ["", "octo", "octo/", "/x", "a/b/c", "octo/he llo", "oc!to/x", "octo\\x"] {
            assert!(
                matches!(validate_repo(bad, &open), Err(ToolError::InvalidRepo)),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn owner_wildcard_and_exact() {
        let allow = AllowList::parse("acme/*, Foo/Bar");
        assert!(allow.allows("acme/anything"));
        assert!(allow.allows("ACME/Other"));
        assert!(allow.allows("foo/bar"));
        assert!(!allow.allows("foo/baz"));
        assert!(!allow.allows("other/x"));

        assert!(matches!(
            validate_repo("foo/baz", &allow),
            Err(ToolError::NotAllowed(r)) if r == "foo/baz"
        ));
    }

    #[test]
    fn global_wildcard() {
        let allow = AllowList::parse("*");
        assert!(allow.allows("anyone/anything"));
        assert_eq!(allow.describe(), "*");
    }

    #[test]
    fn empty_entries_ignored() {
        let allow = AllowList::parse(" , ,");
        assert!(allow.is_unrestricted());
        assert_eq!(allow.describe(), "(no restriction)");
        assert_eq!(AllowList::parse("b/*,a/x").describe(), "a/x, b/*");
    }

    #[test]
    fn repo_ref_segments() {
        let r = validate_repo("octo/cat", &AllowList::default()).unwrap();
        assert_eq!(r.owner(), "octo");
        assert_eq!(r.name(), "cat");
        assert_eq!(r.to_string(), "octo/cat");
    }
}
