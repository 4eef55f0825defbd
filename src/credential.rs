//! Lazily fetched, memoised management-plane credential.

use std::fmt;

use tokio::sync::OnceCell;
use tracing::info;

use crate::ontap::OntapError;
use crate::secret::SecretSource;

/// Password used for basic authentication against the management API.
///
/// The value never appears in `Debug` output.
#[derive(Clone, Eq, PartialEq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Single-owner cache for the management password.
///
/// The first call to [`CredentialCache::get`] performs the secret lookup;
/// later calls reuse the memoised value. Concurrent first use is serialised
/// by a [`OnceCell`], so the lookup runs at most once per successful
/// initialisation. A failed lookup leaves the cache empty.
#[derive(Debug)]
pub struct CredentialCache<S> {
    source: S,
    secret_name: String,
    region: String,
    cell: OnceCell<Credential>,
}

impl<S: SecretSource> CredentialCache<S> {
    /// Creates an empty cache for `secret_name` in `region`.
    #[must_use]
    pub fn new(source: S, secret_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            source,
            secret_name: secret_name.into(),
            region: region.into(),
            cell: OnceCell::new(),
        }
    }

    /// Returns `true` once a credential has been fetched.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the credential, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::SecretUnavailable`] when the lookup fails or
    /// yields an empty value.
    pub async fn get(&self) -> Result<Credential, OntapError> {
        let credential = self.cell.get_or_try_init(|| self.fetch()).await?;
        Ok(credential.clone())
    }

    async fn fetch(&self) -> Result<Credential, OntapError> {
        info!(
            secret = %self.secret_name,
            region = %self.region,
            "fetching management credential"
        );
        let value = self
            .source
            .fetch(&self.secret_name, &self.region)
            .await
            .map_err(|err| self.unavailable(err.to_string()))?;
        if value.trim().is_empty() {
            return Err(self.unavailable(String::from("secret value is empty")));
        }
        Ok(Credential::new(value))
    }

    fn unavailable(&self, message: String) -> OntapError {
        OntapError::SecretUnavailable {
            secret: self.secret_name.clone(),
            region: self.region.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticSecretSource;
    use rstest::rstest;

    #[tokio::test]
    async fn get_fetches_once_and_memoises() {
        let source = StaticSecretSource::new("hunter2");
        let cache = CredentialCache::new(source.clone(), "fsx-admin", "us-east-1");
        assert!(!cache.is_resolved());

        let first = cache.get().await.expect("first fetch");
        let second = cache.get().await.expect("memoised fetch");

        assert_eq!(first.expose(), "hunter2");
        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
        assert!(cache.is_resolved());
    }

    #[tokio::test]
    async fn concurrent_first_use_performs_single_lookup() {
        let source = StaticSecretSource::new("hunter2");
        let cache = CredentialCache::new(source.clone(), "fsx-admin", "us-east-1");

        let (left, right) = tokio::join!(cache.get(), cache.get());

        assert!(left.is_ok() && right.is_ok());
        assert_eq!(source.calls(), 1);
    }

    #[rstest]
    #[case(StaticSecretSource::new(""))]
    #[case(StaticSecretSource::new(" \n"))]
    #[case(StaticSecretSource::missing())]
    #[tokio::test]
    async fn empty_or_missing_secret_is_unavailable(#[case] source: StaticSecretSource) {
        let cache = CredentialCache::new(source, "fsx-admin", "us-east-1");

        let err = cache.get().await.expect_err("lookup should fail");

        assert!(
            matches!(
                err,
                OntapError::SecretUnavailable { ref secret, ref region, .. }
                    if secret == "fsx-admin" && region == "us-east-1"
            ),
            "unexpected error: {err:?}"
        );
        assert!(!cache.is_resolved());
    }

    #[tokio::test]
    async fn failed_lookup_is_retried_on_next_use() {
        let source = StaticSecretSource::missing();
        let cache = CredentialCache::new(source.clone(), "fsx-admin", "us-east-1");

        assert!(cache.get().await.is_err());
        assert!(cache.get().await.is_err());
        assert_eq!(source.calls(), 2);
    }

    #[rstest]
    fn debug_output_redacts_the_secret() {
        let rendered = format!("{:?}", Credential::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
