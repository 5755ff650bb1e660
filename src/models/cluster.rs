use serde::{Deserialize, Serialize};

/// One of the configured backend clusters, ordered by footprint.
///
/// `ecs` doubles as the fallback target: keep-alives, metadata statements,
/// unresolvable follow-ups and routing failures all land there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterName {
    #[serde(rename = "ecs")]
    Ecs,
    #[serde(rename = "emr-standard")]
    EmrStandard,
    #[serde(rename = "emr-optimized")]
    EmrOptimized,
}

impl ClusterName {
    pub const ALL: [ClusterName; 3] =
        [ClusterName::Ecs, ClusterName::EmrStandard, ClusterName::EmrOptimized];

    pub const FALLBACK: ClusterName = ClusterName::Ecs;

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterName::Ecs => "ecs",
            ClusterName::EmrStandard => "emr-standard",
            ClusterName::EmrOptimized => "emr-optimized",
        }
    }

    pub fn parse(name: &str) -> Option<ClusterName> {
        match name {
            "ecs" => Some(ClusterName::Ecs),
            "emr-standard" => Some(ClusterName::EmrStandard),
            "emr-optimized" => Some(ClusterName::EmrOptimized),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClusterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClusterName::parse(s).ok_or_else(|| format!("unknown cluster name: {}", s))
    }
}
