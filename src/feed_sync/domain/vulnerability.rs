use serde::Serialize;
use std::collections::BTreeMap;

/// Value stored in `version_prev` when a feed entry carries no `prev` attribute.
///
/// Known ambiguity: the sentinel cannot be told apart from an explicit
/// `prev="0"` in the source document.
pub const VERSION_PREV_UNSET: u32 = 0;

/// One publicly identified vulnerability, keyed by its CVE identifier.
///
/// `attributes` holds every attribute of the source entry verbatim
/// (`name`, `seq`, `published`, `modified`, `severity`, `CVSS_*`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnerabilityRecord {
    id: String,
    description: String,
    attributes: BTreeMap<String, String>,
}

impl VulnerabilityRecord {
    pub fn new(id: String, description: String, attributes: BTreeMap<String, String>) -> Self {
        Self {
            id,
            description,
            attributes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn published(&self) -> Option<&str> {
        self.attribute("published")
    }

    pub fn modified(&self) -> Option<&str> {
        self.attribute("modified")
    }

    pub fn severity(&self) -> Option<&str> {
        self.attribute("severity")
    }
}

/// Link between a vulnerability and one product version it affects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AffectedProductVersion {
    cve_id: String,
    product: String,
    vendor: String,
    version: String,
    version_prev: u32,
}

impl AffectedProductVersion {
    pub fn new(
        cve_id: String,
        product: String,
        vendor: String,
        version: String,
        version_prev: u32,
    ) -> Self {
        Self {
            cve_id,
            product,
            vendor,
            version,
            version_prev,
        }
    }

    pub fn cve_id(&self) -> &str {
        &self.cve_id
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The "version before" marker; `VERSION_PREV_UNSET` when absent
    pub fn version_prev(&self) -> u32 {
        self.version_prev
    }
}
