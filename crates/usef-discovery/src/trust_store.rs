//! Typed schema of the YAML trust-store file.
//!
//! ```yaml
//! participants:
//!   - domain-name: agr.example.com
//!     spec-version: "2015"
//!     public-keys: cs1.ABCDEF cs1.GHIJKL
//!     agr-role:
//!       - url: https://agr.example.com/USEF/2015/SignedMessage
//!         public-keys: cs1.ROLEKEY
//! ```
//!
//! Unknown keys are rejected so a typo fails at load time rather than
//! silently dropping a role.

use serde::{Deserialize, Deserializer};
use usef_crypto::strip_key_prefix;
use usef_types::{endpoint_url, Participant, ParticipantRole, RoleKind};

use crate::DiscoveryError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustStoreFile {
    #[serde(default)]
    pub participants: Option<Vec<TrustStoreParticipant>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TrustStoreParticipant {
    pub domain_name: String,
    #[serde(deserialize_with = "version_string")]
    pub spec_version: String,
    /// Whitespace-delimited keys, each optionally tagged `cs1.`.
    #[serde(default)]
    pub public_keys: Option<String>,
    #[serde(default)]
    pub agr_role: Option<Vec<TrustStoreRole>>,
    #[serde(default)]
    pub brp_role: Option<Vec<TrustStoreRole>>,
    #[serde(default)]
    pub dso_role: Option<Vec<TrustStoreRole>>,
    #[serde(default)]
    pub cro_role: Option<Vec<TrustStoreRole>>,
    #[serde(default)]
    pub mdc_role: Option<Vec<TrustStoreRole>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TrustStoreRole {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub public_keys: Option<String>,
}

/// Parses trust-store YAML.
///
/// # Errors
///
/// Returns [`DiscoveryError::TrustStoreMalformed`] if the document does not
/// match the schema.
pub fn parse_trust_store(yaml: &str) -> Result<TrustStoreFile, DiscoveryError> {
    if yaml.trim().is_empty() {
        return Ok(TrustStoreFile::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| DiscoveryError::TrustStoreMalformed(e.to_string()))
}

impl TrustStoreFile {
    /// Returns the listed participants, or `EmptyParticipantList` if none.
    pub fn participants(&self) -> Result<&[TrustStoreParticipant], DiscoveryError> {
        match self.participants.as_deref() {
            Some(list) if !list.is_empty() => Ok(list),
            _ => Err(DiscoveryError::EmptyParticipantList),
        }
    }
}

impl TrustStoreParticipant {
    fn role_entries(&self, role: RoleKind) -> Option<&[TrustStoreRole]> {
        match role {
            RoleKind::Agr => self.agr_role.as_deref(),
            RoleKind::Brp => self.brp_role.as_deref(),
            RoleKind::Dso => self.dso_role.as_deref(),
            RoleKind::Cro => self.cro_role.as_deref(),
            RoleKind::Mdc => self.mdc_role.as_deref(),
        }
    }

    /// Returns `true` if the entry declares `role`.
    pub fn declares(&self, role: RoleKind) -> bool {
        self.role_entries(role).is_some()
    }

    /// Converts the entry into the normalized participant model.
    ///
    /// A role without `url` gets the derived endpoint URL, matching what DNS
    /// discovery produces for the same domain.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::TrustStoreMalformed`] if a role lists more
    /// than one entry.
    pub fn to_participant(&self) -> Result<Participant, DiscoveryError> {
        let mut roles = Vec::new();
        for role in RoleKind::ALL {
            let entry = match self.role_entries(role) {
                None => continue,
                Some([]) => TrustStoreRole::default(),
                Some([entry]) => entry.clone(),
                Some(entries) => {
                    return Err(DiscoveryError::TrustStoreMalformed(format!(
                        "{}: {}-role lists {} entries, expected one",
                        self.domain_name,
                        role.dns_label(),
                        entries.len()
                    )))
                }
            };
            roles.push(ParticipantRole {
                role,
                url: entry
                    .url
                    .unwrap_or_else(|| endpoint_url(&self.domain_name, &self.spec_version)),
                public_keys: split_keys(entry.public_keys.as_deref()),
            });
        }

        Ok(Participant {
            domain_name: self.domain_name.clone(),
            spec_version: self.spec_version.clone(),
            public_keys: split_keys(self.public_keys.as_deref()),
            roles,
        })
    }
}

fn split_keys(keys: Option<&str>) -> Vec<String> {
    keys.unwrap_or_default()
        .split_whitespace()
        .map(|key| strip_key_prefix(key).to_string())
        .collect()
}

/// Accepts `spec-version: 2015` as well as `spec-version: "2015"`.
fn version_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Number(u64),
    }

    Ok(match Version::deserialize(deserializer)? {
        Version::Text(text) => text,
        Version::Number(number) => number.to_string(),
    })
}
