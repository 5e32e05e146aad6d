use crate::logic::version_order::VersionOrder;

/// API versions the platform currently offers. Loaded once from
/// configuration and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiCatalog {
    versions: Vec<String>,
}

impl ApiCatalog {
    pub fn new<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            versions: VersionOrder::sort(versions),
        }
    }

    /// Ascending list of versions, restricted to those at or above
    /// `min_floor` when one is given. An empty floor means no restriction.
    pub fn list_versions(&self, min_floor: Option<&str>) -> Vec<String> {
        match min_floor.filter(|floor| !floor.is_empty()) {
            Some(floor) => VersionOrder::at_least(self.versions.iter().cloned(), floor),
            None => self.versions.clone(),
        }
    }

    /// Whether `version` is offered and satisfies `min_floor`
    pub fn allows(&self, version: &str, min_floor: Option<&str>) -> bool {
        self.list_versions(min_floor).iter().any(|v| v == version)
    }

    /// Lowest offered version, if any
    pub fn oldest(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
