use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A collaboration site found by display-name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteReference {
    pub id: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

/// The document library (drive) of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveReference {
    pub id: String,
}

/// Resolved location every folder, upload and retention call runs against.
///
/// Built once per run by the resolver and passed explicitly to each later
/// step, so a step cannot run before resolution has produced a drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveContext {
    pub site: SiteReference,
    pub drive: DriveReference,
}

impl DriveContext {
    pub fn new(site: SiteReference, drive: DriveReference) -> Self {
        Self { site, drive }
    }

    pub fn drive_id(&self) -> &str {
        &self.drive.id
    }
}

/// How to pick a site when the search returns more than one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteSelection {
    /// Take the first result in response order.
    #[default]
    First,
    /// Fail unless exactly one site matched.
    Unique,
}

impl FromStr for SiteSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(SiteSelection::First),
            "unique" => Ok(SiteSelection::Unique),
            _ => Err(anyhow::anyhow!("Invalid site selection policy: {}", s)),
        }
    }
}

impl Display for SiteSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SiteSelection::First => write!(f, "first"),
            SiteSelection::Unique => write!(f, "unique"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_selection_parses_case_insensitively() {
        assert_eq!("First".parse::<SiteSelection>().unwrap(), SiteSelection::First);
        assert_eq!(" unique ".parse::<SiteSelection>().unwrap(), SiteSelection::Unique);
        assert!("any".parse::<SiteSelection>().is_err());
    }

    #[test]
    fn site_reference_deserializes_graph_shape() {
        let site: SiteReference = serde_json::from_str(
            r#"{"id":"contoso.sharepoint.com,1,2","displayName":"Backups","webUrl":"x"}"#,
        )
        .unwrap();
        assert_eq!(site.id, "contoso.sharepoint.com,1,2");
        assert_eq!(site.display_name.as_deref(), Some("Backups"));
    }
}
