//! Package URL identifiers.
//!
//! See <https://github.com/package-url/purl-spec>. Only construction and
//! canonical formatting are implemented; parsing is left to consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// PURL package type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurlType {
    /// .NET packages from NuGet.
    Nuget,
    /// Software without a dedicated package ecosystem (e.g. OS patches).
    Generic,
}

impl PurlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurlType::Nuget => "nuget",
            PurlType::Generic => "generic",
        }
    }
}

impl fmt::Display for PurlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUrl {
    pub purl_type: PurlType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub qualifiers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
}

impl PackageUrl {
    pub fn new(purl_type: PurlType, name: impl Into<String>) -> Self {
        Self {
            purl_type,
            namespace: None,
            name: name.into(),
            version: None,
            qualifiers: BTreeMap::new(),
            subpath: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qualifiers.insert(key.into().to_lowercase(), value.into());
        self
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.purl_type)?;

        if let Some(namespace) = &self.namespace {
            for segment in namespace.split('/').filter(|s| !s.is_empty()) {
                write!(f, "{}/", encode(segment))?;
            }
        }

        write!(f, "{}", encode(&self.name))?;

        if let Some(version) = &self.version {
            write!(f, "@{}", encode(version))?;
        }

        let qualifiers: Vec<String> = self
            .qualifiers
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", k, encode(v)))
            .collect();
        if !qualifiers.is_empty() {
            write!(f, "?{}", qualifiers.join("&"))?;
        }

        if let Some(subpath) = &self.subpath {
            let segments: Vec<String> = subpath
                .split('/')
                .filter(|s| !s.is_empty() && *s != "." && *s != "..")
                .map(encode)
                .collect();
            if !segments.is_empty() {
                write!(f, "#{}", segments.join("/"))?;
            }
        }

        Ok(())
    }
}

/// Percent-encodes everything outside the unreserved set.
fn encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
