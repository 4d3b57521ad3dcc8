//! Local trust-store discovery strategy.

use std::path::{Path, PathBuf};
use usef_types::{Participant, RoleKind};

use crate::trust_store::{parse_trust_store, TrustStoreFile};
use crate::{DiscoveryError, ParticipantResolver};

/// Trust-store file consulted when no configured path exists.
pub const DEFAULT_TRUST_STORE_PATH: &str = "participants_dns_info.yaml";

/// Resolves participants from a YAML trust-store file, re-read on every call.
#[derive(Debug, Clone)]
pub struct LocalParticipantResolver {
    configured_path: Option<PathBuf>,
    default_path: PathBuf,
}

impl LocalParticipantResolver {
    pub fn new(configured_path: Option<PathBuf>) -> Self {
        Self {
            configured_path,
            default_path: PathBuf::from(DEFAULT_TRUST_STORE_PATH),
        }
    }

    /// Overrides the fallback path.
    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = path.into();
        self
    }

    /// Configured path if it exists, otherwise the default path.
    fn effective_path(&self) -> &Path {
        match &self.configured_path {
            Some(path) if path.exists() => path,
            Some(path) => {
                tracing::debug!(
                    configured = %path.display(),
                    fallback = %self.default_path.display(),
                    "configured trust store not found, using default path"
                );
                &self.default_path
            }
            None => &self.default_path,
        }
    }

    fn load(&self) -> Result<TrustStoreFile, DiscoveryError> {
        let path = self.effective_path();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "trust store unreadable");
            DiscoveryError::EmptyParticipantList
        })?;
        parse_trust_store(&contents)
    }
}

impl ParticipantResolver for LocalParticipantResolver {
    fn find_participant(
        &self,
        domain: &str,
        role: RoleKind,
    ) -> Result<Participant, DiscoveryError> {
        let domain = domain.trim_end_matches('.');
        let store = self.load()?;
        let entry = store
            .participants()?
            .iter()
            .find(|p| p.domain_name == domain && p.declares(role))
            .ok_or_else(|| DiscoveryError::not_found(domain, role))?;

        tracing::debug!(%domain, %role, "resolved participant from trust store");
        entry.to_participant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).expect("write trust store");
        path
    }

    const TWO_AGRS: &str = "participants:
  - domain-name: agr.example.com
    spec-version: \"2015\"
    public-keys: cs1.FIRST
    agr-role:
      - {}
  - domain-name: agr.example.com
    spec-version: \"2015\"
    public-keys: cs1.SECOND
    agr-role:
      - {}
    brp-role:
      - {}
";

    #[test]
    fn first_matching_entry_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "store.yaml", TWO_AGRS);
        let resolver = LocalParticipantResolver::new(Some(path));

        let agr = resolver
            .find_public_keys("agr.example.com", RoleKind::Agr)
            .expect("agr");
        assert_eq!(agr, vec!["FIRST"]);

        // The first entry lacks the role, so the scan continues.
        let brp = resolver
            .find_public_keys("agr.example.com", RoleKind::Brp)
            .expect("brp");
        assert_eq!(brp, vec!["SECOND"]);
    }

    #[test]
    fn no_match_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "store.yaml", TWO_AGRS);
        let resolver = LocalParticipantResolver::new(Some(path));

        assert_eq!(
            resolver.find_participant("dso.example.com", RoleKind::Dso),
            Err(DiscoveryError::ParticipantNotFound {
                domain: "dso.example.com".to_string(),
                role: RoleKind::Dso,
            })
        );
    }

    #[test]
    fn missing_configured_path_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default = write(&dir, "default.yaml", TWO_AGRS);
        let resolver = LocalParticipantResolver::new(Some(dir.path().join("absent.yaml")))
            .with_default_path(default);

        assert!(resolver
            .find_participant("agr.example.com", RoleKind::Agr)
            .is_ok());
    }

    #[test]
    fn unreadable_or_empty_store_is_empty_participant_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = LocalParticipantResolver::new(None)
            .with_default_path(dir.path().join("nothing-here.yaml"));
        assert_eq!(
            resolver.find_participant("agr.example.com", RoleKind::Agr),
            Err(DiscoveryError::EmptyParticipantList)
        );

        let empty = write(&dir, "empty.yaml", "");
        let resolver = LocalParticipantResolver::new(Some(empty));
        assert_eq!(
            resolver.find_participant("agr.example.com", RoleKind::Agr),
            Err(DiscoveryError::EmptyParticipantList)
        );
    }

    #[test]
    fn file_is_reread_on_every_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "store.yaml", "participants: []\n");
        let resolver = LocalParticipantResolver::new(Some(path.clone()));
        assert!(resolver
            .find_participant("agr.example.com", RoleKind::Agr)
            .is_err());

        std::fs::write(&path, TWO_AGRS).expect("rewrite");
        assert!(resolver
            .find_participant("agr.example.com", RoleKind::Agr)
            .is_ok());
    }
}
