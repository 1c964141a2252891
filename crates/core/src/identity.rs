//! Identity subsystem: adaptive-length content-addressed ids and content
//! fingerprinting.

use crate::error::{Error, Result, ValidationKind};
use sha2::{Digest, Sha256};
use std::fmt;

const MAX_RETRIES: u8 = 3;
const MAX_HIERARCHY_DEPTH: usize = 3;

/// A parsed issue id: `{prefix}-{base}[.{path}]*`.
///
/// `base` is the base36 hash body. `path` holds the dotted numeric
/// components of a hierarchical child id (`bd-abc.1.2` → `path = [1, 2]`),
/// empty for a top-level id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id {
    prefix: String,
    base: String,
    path: Vec<u32>,
}

impl Id {
    /// Parse an id string of the form `{prefix}-{base}[.{n}]*`.
    pub fn parse(s: &str) -> Result<Self> {
        let (prefix, rest) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidId(s.to_owned()))?;
        if prefix.is_empty() || rest.is_empty() {
            return Err(Error::InvalidId(s.to_owned()));
        }
        let mut parts = rest.split('.');
        let base = parts.next().unwrap();
        if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidId(s.to_owned()));
        }
        let path = parts
            .map(|p| p.parse::<u32>().map_err(|_| Error::InvalidId(s.to_owned())))
            .collect::<Result<Vec<u32>>>()?;
        if path.len() > MAX_HIERARCHY_DEPTH {
            return Err(Error::Validation(ValidationKind::MaxHierarchyDepthExceeded));
        }
        Ok(Id {
            prefix: prefix.to_owned(),
            base: base.to_owned(),
            path,
        })
    }

    /// The project-configured prefix token (e.g. `bd`).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The base36 hash body, excluding prefix and hierarchical path.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Dotted numeric path components of a hierarchical child id.
    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// `true` if this id names a top-level issue (no hierarchical path).
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Build a child id one level deeper than `self`.
    ///
    /// Fails with [`ValidationKind::MaxHierarchyDepthExceeded`] if `self`
    /// is already at the maximum depth of 3.
    pub fn child(&self, index: u32) -> Result<Id> {
        if self.path.len() >= MAX_HIERARCHY_DEPTH {
            return Err(Error::Validation(ValidationKind::MaxHierarchyDepthExceeded));
        }
        let mut path = self.path.clone();
        path.push(index);
        Ok(Id {
            prefix: self.prefix.clone(),
            base: self.base.clone(),
            path,
        })
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.base)?;
        for component in &self.path {
            write!(f, ".{component}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Id::parse(s)
    }
}

/// SHA-256 hex digest over an issue's canonical content fields, used only
/// for import deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the content hash over the canonical field concatenation
    /// `null` is rendered as the literal string `"null"`.
    pub fn compute(fields: ContentHashFields<'_>) -> Self {
        const SEP: u8 = 0;
        let parts: [Option<&str>; 15] = [
            Some(fields.title),
            fields.description,
            fields.design,
            fields.acceptance_criteria,
            fields.notes,
            Some(fields.status),
            Some(fields.priority),
            Some(fields.issue_type),
            fields.assignee,
            fields.owner,
            fields.created_by,
            fields.external_ref,
            fields.source_system,
            Some(fields.pinned),
            Some(fields.is_template),
        ];
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([SEP]);
            }
            hasher.update(part.unwrap_or("null").as_bytes());
        }
        let digest = hasher.finalize();
        ContentHash(hex_encode(&digest))
    }

    /// The hex-encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Borrowed view of the canonical fields hashed by [`ContentHash::compute`].
pub struct ContentHashFields<'a> {
    /// Issue title.
    pub title: &'a str,
    /// Issue description.
    pub description: Option<&'a str>,
    /// Issue design notes.
    pub design: Option<&'a str>,
    /// Issue acceptance criteria.
    pub acceptance_criteria: Option<&'a str>,
    /// Free-form notes.
    pub notes: Option<&'a str>,
    /// Status tag (as serialised, e.g. `"open"`).
    pub status: &'a str,
    /// Priority as a decimal string (`"0"`..`"4"`).
    pub priority: &'a str,
    /// Issue type tag.
    pub issue_type: &'a str,
    /// Assignee.
    pub assignee: Option<&'a str>,
    /// Owner.
    pub owner: Option<&'a str>,
    /// Creator.
    pub created_by: Option<&'a str>,
    /// External reference id.
    pub external_ref: Option<&'a str>,
    /// Source system name.
    pub source_system: Option<&'a str>,
    /// `"true"` or `"false"`.
    pub pinned: &'a str,
    /// `"true"` or `"false"`.
    pub is_template: &'a str,
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").expect("writing to a String never fails");
    }
    s
}

/// Adaptive target length for the base36 id body given the current issue
/// count, chosen so expected pairwise collisions stay below ~0.01%.
pub fn adaptive_length(issue_count: usize) -> usize {
    if issue_count < 1_000 {
        3
    } else if issue_count < 50_000 {
        4
    } else if issue_count < 1_000_000 {
        5
    } else {
        6
    }
}

/// Generates fresh issue ids.
pub struct IdentityGenerator {
    prefix: String,
}

impl IdentityGenerator {
    /// Create a generator using the given project prefix (default `"bd"`).
    pub fn new(prefix: impl Into<String>) -> Self {
        IdentityGenerator {
            prefix: prefix.into(),
        }
    }

    /// Generate a fresh id.
    ///
    /// `exists` is queried after each candidate is built; a collision
    /// grows the target length by one and retries, up to [`MAX_RETRIES`]
    /// times before [`Error::IdGenerationExhausted`] is returned.
    pub fn generate(
        &self,
        title: &str,
        description: Option<&str>,
        created_by: Option<&str>,
        now_nanos: u128,
        nonce: [u8; 16],
        issue_count: usize,
        mut exists: impl FnMut(&str) -> bool,
    ) -> Result<Id> {
        let mut length = adaptive_length(issue_count);
        let digest = Self::digest(title, description, created_by, now_nanos, nonce);
        let leading8: [u8; 8] = digest[0..8].try_into().expect("sha256 digest is 32 bytes");
        let value = u64::from_be_bytes(leading8);
        let encoded = crate::base36::encode(value);

        for attempt in 0..=MAX_RETRIES {
            let body = truncate_base36(&encoded, length);
            if !exists(&body) {
                return Ok(Id {
                    prefix: self.prefix.clone(),
                    base: body,
                    path: Vec::new(),
                });
            }
            length += 1;
            if attempt == MAX_RETRIES {
                return Err(Error::IdGenerationExhausted {
                    attempts: MAX_RETRIES,
                    length,
                });
            }
        }
        unreachable!("loop always returns by the final iteration")
    }

    fn digest(
        title: &str,
        description: Option<&str>,
        created_by: Option<&str>,
        now_nanos: u128,
        nonce: [u8; 16],
    ) -> [u8; 32] {
        const SEP: u8 = 0;
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([SEP]);
        hasher.update(description.unwrap_or("").as_bytes());
        hasher.update([SEP]);
        hasher.update(created_by.unwrap_or("").as_bytes());
        hasher.update([SEP]);
        hasher.update(now_nanos.to_string().as_bytes());
        hasher.update([SEP]);
        hasher.update(nonce);
        hasher.finalize().into()
    }
}

/// Zero-pad `encoded` to at least `length` characters (padding on the
/// left) then take the first `length` characters, so ids of a given
/// adaptive length are visually uniform regardless of the numeric value's
/// natural base36 width.
fn truncate_base36(encoded: &str, length: usize) -> String {
    if encoded.len() >= length {
        encoded[..length].to_string()
    } else {
        let padding = "0".repeat(length - encoded.len());
        format!("{padding}{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_level_id() {
        let id = Id::parse("bd-a1b2").unwrap();
        assert_eq!(id.prefix(), "bd");
        assert_eq!(id.base(), "a1b2");
        assert!(id.is_root());
    }

    #[test]
    fn parses_hierarchical_id() {
        let id = Id::parse("bd-abc.1.2").unwrap();
        assert_eq!(id.path(), &[1, 2]);
        assert_eq!(id.to_string(), "bd-abc.1.2");
    }

    #[test]
    fn rejects_missing_prefix_separator() {
        assert!(Id::parse("bdabc").is_err());
    }

    #[test]
    fn rejects_depth_beyond_three() {
        assert!(Id::parse("bd-abc.1.2.3.4").is_err());
    }

    #[test]
    fn child_increments_depth() {
        let root = Id::parse("bd-abc").unwrap();
        let child = root.child(1).unwrap();
        assert_eq!(child.to_string(), "bd-abc.1");
        let grandchild = child.child(2).unwrap();
        assert_eq!(grandchild.to_string(), "bd-abc.1.2");
        let great = grandchild.child(3).unwrap();
        assert_eq!(great.to_string(), "bd-abc.1.2.3");
        assert!(great.child(4).is_err());
    }

    #[test]
    fn adaptive_length_thresholds() {
        assert_eq!(adaptive_length(0), 3);
        assert_eq!(adaptive_length(999), 3);
        assert_eq!(adaptive_length(1_000), 4);
        assert_eq!(adaptive_length(49_999), 4);
        assert_eq!(adaptive_length(50_000), 5);
        assert_eq!(adaptive_length(999_999), 5);
        assert_eq!(adaptive_length(1_000_000), 6);
    }

    #[test]
    fn generator_produces_prefixed_ids() {
        let gen = IdentityGenerator::new("bd");
        let id = gen
            .generate("Hello", None, None, 1, [0u8; 16], 0, |_| false)
            .unwrap();
        assert_eq!(id.prefix(), "bd");
        assert_eq!(id.base().len(), 3);
    }

    #[test]
    fn generator_retries_on_collision() {
        let gen = IdentityGenerator::new("bd");
        let mut calls = 0;
        let id = gen
            .generate("Hello", None, None, 1, [0u8; 16], 0, |_| {
                calls += 1;
                calls <= 2
            })
            .unwrap();
        assert_eq!(id.base().len(), 5); // two collisions: length 3 -> 4 -> 5
    }

    #[test]
    fn generator_exhausts_retries() {
        let gen = IdentityGenerator::new("bd");
        let err = gen
            .generate("Hello", None, None, 1, [0u8; 16], 0, |_| true)
            .unwrap_err();
        assert!(matches!(err, Error::IdGenerationExhausted { attempts: 3, .. }));
    }

    #[test]
    fn content_hash_is_stable_and_sensitive_to_fields() {
        let base = ContentHashFields {
            title: "Title",
            description: None,
            design: None,
            acceptance_criteria: None,
            notes: None,
            status: "open",
            priority: "2",
            issue_type: "task",
            assignee: None,
            owner: None,
            created_by: None,
            external_ref: None,
            source_system: None,
            pinned: "false",
            is_template: "false",
        };
        let h1 = ContentHash::compute(ContentHashFields { title: "Title", ..base_copy(&base) });
        let h2 = ContentHash::compute(ContentHashFields { title: "Title", ..base_copy(&base) });
        assert_eq!(h1.as_str(), h2.as_str());

        let h3 = ContentHash::compute(ContentHashFields { title: "Different", ..base_copy(&base) });
        assert_ne!(h1.as_str(), h3.as_str());
    }

    fn base_copy<'a>(f: &ContentHashFields<'a>) -> ContentHashFields<'a> {
        ContentHashFields {
            title: f.title,
            description: f.description,
            design: f.design,
            acceptance_criteria: f.acceptance_criteria,
            notes: f.notes,
            status: f.status,
            priority: f.priority,
            issue_type: f.issue_type,
            assignee: f.assignee,
            owner: f.owner,
            created_by: f.created_by,
            external_ref: f.external_ref,
            source_system: f.source_system,
            pinned: f.pinned,
            is_template: f.is_template,
        }
    }
}
