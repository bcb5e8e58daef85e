//! Schema revisions (Level/Version pairs) and their core namespace URIs.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SBML_XMLNS_L1: &str = "http://www.sbml.org/sbml/level1";
pub const SBML_XMLNS_L2V1: &str = "http://www.sbml.org/sbml/level2";
pub const SBML_XMLNS_L2V2: &str = "http://www.sbml.org/sbml/level2/version2";
pub const SBML_XMLNS_L2V3: &str = "http://www.sbml.org/sbml/level2/version3";
pub const SBML_XMLNS_L2V4: &str = "http://www.sbml.org/sbml/level2/version4";
pub const SBML_XMLNS_L2V5: &str = "http://www.sbml.org/sbml/level2/version5";
pub const SBML_XMLNS_L3V1: &str = "http://www.sbml.org/sbml/level3/version1/core";
pub const SBML_XMLNS_L3V2: &str = "http://www.sbml.org/sbml/level3/version2/core";

/// MathML namespace used for `<math>` content in Level 2 and later.
pub const MATHML_XMLNS: &str = "http://www.w3.org/1998/Math/MathML";

/// XHTML namespace expected inside `<notes>`.
pub const XHTML_XMLNS: &str = "http://www.w3.org/1999/xhtml";

/// Prefix given to a namespace displaced from the default slot when the
/// canonical core namespace is added at write time.
pub const ADDED_PREFIX: &str = "addedPrefix";

/// One of the fixed, enumerated Level/Version combinations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "RevisionPair", into = "RevisionPair")]
pub enum Revision {
    L1V1,
    L1V2,
    L2V1,
    L2V2,
    L2V3,
    L2V4,
    L2V5,
    L3V1,
    L3V2,
}

impl Revision {
    pub const DEFAULT: Revision = Revision::L3V2;

    pub const ALL: [Revision; 9] = [
        Revision::L1V1,
        Revision::L1V2,
        Revision::L2V1,
        Revision::L2V2,
        Revision::L2V3,
        Revision::L2V4,
        Revision::L2V5,
        Revision::L3V1,
        Revision::L3V2,
    ];

    /// Look up a revision; `None` for combinations that do not exist.
    pub fn new(level: u32, version: u32) -> Option<Self> {
        match (level, version) {
            (1, 1) => Some(Revision::L1V1),
            (1, 2) => Some(Revision::L1V2),
            (2, 1) => Some(Revision::L2V1),
            (2, 2) => Some(Revision::L2V2),
            (2, 3) => Some(Revision::L2V3),
            (2, 4) => Some(Revision::L2V4),
            (2, 5) => Some(Revision::L2V5),
            (3, 1) => Some(Revision::L3V1),
            (3, 2) => Some(Revision::L3V2),
            _ => None,
        }
    }

    pub fn level(self) -> u32 {
        match self {
            Revision::L1V1 | Revision::L1V2 => 1,
            Revision::L2V1
            | Revision::L2V2
            | Revision::L2V3
            | Revision::L2V4
            | Revision::L2V5 => 2,
            Revision::L3V1 | Revision::L3V2 => 3,
        }
    }

    pub fn version(self) -> u32 {
        match self {
            Revision::L1V1 | Revision::L2V1 | Revision::L3V1 => 1,
            Revision::L1V2 | Revision::L2V2 | Revision::L3V2 => 2,
            Revision::L2V3 => 3,
            Revision::L2V4 => 4,
            Revision::L2V5 => 5,
        }
    }

    /// Position in [`Revision::ALL`]; used to index per-revision tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The core namespace URI written on `<sbml>` for this revision.
    pub fn namespace_uri(self) -> &'static str {
        match self {
            Revision::L1V1 | Revision::L1V2 => SBML_XMLNS_L1,
            Revision::L2V1 => SBML_XMLNS_L2V1,
            Revision::L2V2 => SBML_XMLNS_L2V2,
            Revision::L2V3 => SBML_XMLNS_L2V3,
            Revision::L2V4 => SBML_XMLNS_L2V4,
            Revision::L2V5 => SBML_XMLNS_L2V5,
            Revision::L3V1 => SBML_XMLNS_L3V1,
            Revision::L3V2 => SBML_XMLNS_L3V2,
        }
    }

    /// Whether `uri` is the core namespace of this revision.
    ///
    /// Level 1 shares one URI across both versions.
    pub fn matches_namespace(self, uri: &str) -> bool {
        self.namespace_uri() == uri
    }

    /// Short label such as `L2V4`, used in messages.
    pub fn label(self) -> String {
        format!("L{}V{}", self.level(), self.version())
    }
}

impl Default for Revision {
    fn default() -> Self {
        Revision::DEFAULT
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {} Version {}", self.level(), self.version())
    }
}

/// Whether `uri` is the core namespace of any revision.
pub fn is_core_namespace(uri: &str) -> bool {
    Revision::ALL.iter().any(|rev| rev.matches_namespace(uri))
}

/// Levels that use `uri` as their core namespace (both L1 versions share one).
pub fn revisions_for_namespace(uri: &str) -> Vec<Revision> {
    Revision::ALL
        .iter()
        .copied()
        .filter(|rev| rev.matches_namespace(uri))
        .collect()
}

/// Whether `uri` looks like a Level 3 package namespace
/// (`http://www.sbml.org/sbml/level3/versionN/<pkg>/versionM`).
pub fn is_level3_package_namespace(uri: &str) -> bool {
    uri.starts_with("http://www.sbml.org/sbml/level3/version") && !is_core_namespace(uri)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RevisionPair {
    level: u32,
    version: u32,
}

impl TryFrom<RevisionPair> for Revision {
    type Error = String;

    fn try_from(pair: RevisionPair) -> Result<Self, Self::Error> {
        Revision::new(pair.level, pair.version).ok_or_else(|| {
            format!(
                "level {} version {} is not a valid SBML revision",
                pair.level, pair.version
            )
        })
    }
}

impl From<Revision> for RevisionPair {
    fn from(rev: Revision) -> Self {
        RevisionPair {
            level: rev.level(),
            version: rev.version(),
        }
    }
}
