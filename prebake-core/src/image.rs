//! Image reference parsing.
//!
//! An image reference as written in a build file is
//! `[registry/]name[:tag][@digest]`. Stage resolution matches on `name`
//! alone; the tag is carried for diagnostics only, so a reference to a
//! locally declared stage resolves to that stage whatever tag it wears.

use std::fmt;

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Everything up to the last `/`, when present (e.g. `ghcr.io/acme`).
    pub registry: Option<String>,
    /// The bare image or stage name used for internal matching.
    pub name: String,
    /// Optional tag (`:tag`). Advisory for local references.
    pub tag: Option<String>,
    /// Optional content digest (`@sha256:...`).
    pub digest: Option<String>,
}

impl ImageRef {
    /// Parses a raw reference token.
    ///
    /// The digest is split off first, then the registry (everything up to
    /// the last `/`), then the tag. Splitting the registry first keeps a
    /// registry port (`localhost:5000/app`) out of the tag.
    pub fn parse(raw: &str) -> Self {
        let (rest, digest) = match raw.find('@') {
            Some(idx) => (&raw[..idx], Some(raw[idx + 1..].to_string())),
            None => (raw, None),
        };

        let (registry, rest) = match rest.rfind('/') {
            Some(idx) => (Some(rest[..idx].to_string()), &rest[idx + 1..]),
            None => (None, rest),
        };

        let (name, tag) = match rest.rfind(':') {
            Some(idx) => (rest[..idx].to_string(), Some(rest[idx + 1..].to_string())),
            None => (rest.to_string(), None),
        };

        ImageRef { registry, name, tag, digest }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        let r = ImageRef::parse("builder");
        assert_eq!(r.name, "builder");
        assert_eq!(r.registry, None);
        assert_eq!(r.tag, None);
        assert_eq!(r.digest, None);
    }

    #[test]
    fn test_name_with_tag() {
        let r = ImageRef::parse("ubuntu:plucky");
        assert_eq!(r.name, "ubuntu");
        assert_eq!(r.tag.as_deref(), Some("plucky"));
    }

    #[test]
    fn test_registry_prefix() {
        let r = ImageRef::parse("ghcr.io/acme/toolchain:1.2");
        assert_eq!(r.registry.as_deref(), Some("ghcr.io/acme"));
        assert_eq!(r.name, "toolchain");
        assert_eq!(r.tag.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_registry_port_is_not_a_tag() {
        let r = ImageRef::parse("localhost:5000/app");
        assert_eq!(r.registry.as_deref(), Some("localhost:5000"));
        assert_eq!(r.name, "app");
        assert_eq!(r.tag, None);
    }

    #[test]
    fn test_digest_split_before_tag() {
        let r = ImageRef::parse("alpine:3.19@sha256:abcdef");
        assert_eq!(r.name, "alpine");
        assert_eq!(r.tag.as_deref(), Some("3.19"));
        assert_eq!(r.digest.as_deref(), Some("sha256:abcdef"));
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["app", "app:v1", "ghcr.io/acme/app:v1", "alpine@sha256:ff"] {
            assert_eq!(ImageRef::parse(raw).to_string(), raw);
        }
    }
}
