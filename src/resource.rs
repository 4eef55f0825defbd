//! Caller-facing descriptions of the ONTAP endpoint and the resources the
//! lifecycle manager operates on.

use thiserror::Error;

/// Errors raised when a request is missing a required value.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a required field is empty after trimming.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

pub(crate) fn require_field(field: &str, value: &str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::Validation(field.to_owned()));
    }
    Ok(())
}

pub(crate) fn require_name<'v>(field: &str, value: &'v str) -> Result<&'v str, RequestError> {
    let trimmed = value.trim();
    require_field(field, trimmed)?;
    Ok(trimmed)
}

/// Connection details for the ONTAP management plane.
///
/// Immutable once built; the manager that owns it also owns the cached
/// credential looked up through `secret_name` and `region`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagementEndpoint {
    /// Management address (IP or host name) of the file system.
    pub admin_address: String,
    /// ONTAP user, for example `vsadmin` or `fsxadmin`.
    pub username: String,
    /// Name of the secret that holds the password.
    pub secret_name: String,
    /// Region where the secret is stored.
    pub region: String,
}

impl ManagementEndpoint {
    /// Builds an endpoint, trimming every field.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] naming the first blank field.
    pub fn new(
        admin_address: impl Into<String>,
        username: impl Into<String>,
        secret_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, RequestError> {
        let endpoint = Self {
            admin_address: admin_address.into().trim().to_owned(),
            username: username.into().trim().to_owned(),
            secret_name: secret_name.into().trim().to_owned(),
            region: region.into().trim().to_owned(),
        };
        require_field("admin_address", &endpoint.admin_address)?;
        require_field("username", &endpoint.username)?;
        require_field("secret_name", &endpoint.secret_name)?;
        require_field("region", &endpoint.region)?;
        Ok(endpoint)
    }

    /// Base URL of the REST API.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}/api", self.admin_address)
    }
}

/// Human-assigned volume name, optionally scoped to a storage virtual
/// machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeRef {
    /// Volume name.
    pub name: String,
    /// Storage virtual machine that owns the volume, when known.
    pub svm: Option<String>,
}

impl VolumeRef {
    /// Creates an unscoped reference, trimming the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            svm: None,
        }
    }

    /// Sets the optional SVM scope. Blank scopes are treated as absent.
    #[must_use]
    pub fn in_svm(mut self, svm: Option<String>) -> Self {
        self.svm = svm
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self
    }

    /// Validates that the name is present.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when the name is blank.
    pub fn validate(&self) -> Result<(), RequestError> {
        require_field("volume", &self.name)
    }
}

/// Request to materialise a FlexClone volume from an existing snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CloneSpec {
    /// Name of the parent volume.
    pub source_volume: String,
    /// Name of the parent snapshot on `source_volume`.
    pub source_snapshot: String,
    /// Name of the clone volume to create.
    pub clone_volume: String,
    /// Storage virtual machine in which the clone is created.
    pub svm: String,
    /// Free-form comment stored on the clone.
    pub comment: Option<String>,
}

impl CloneSpec {
    /// Starts a builder for a [`CloneSpec`].
    #[must_use]
    pub fn builder() -> CloneSpecBuilder {
        CloneSpecBuilder::default()
    }

    /// Validates that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] naming the first blank field.
    pub fn validate(&self) -> Result<(), RequestError> {
        require_field("source_volume", &self.source_volume)?;
        require_field("source_snapshot", &self.source_snapshot)?;
        require_field("clone_volume", &self.clone_volume)?;
        require_field("svm", &self.svm)?;
        Ok(())
    }

    /// Comment sent with the create request.
    #[must_use]
    pub fn comment_text(&self) -> String {
        self.comment.clone().unwrap_or_else(|| {
            format!("FlexClone from snapshot {}", self.source_snapshot)
        })
    }

    /// Reference to the clone volume inside its SVM.
    #[must_use]
    pub fn target(&self) -> VolumeRef {
        VolumeRef::new(&self.clone_volume).in_svm(Some(self.svm.clone()))
    }
}

/// Builder for [`CloneSpec`] that trims and validates on build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CloneSpecBuilder {
    source_volume: String,
    source_snapshot: String,
    clone_volume: String,
    svm: String,
    comment: Option<String>,
}

impl CloneSpecBuilder {
    /// Sets the parent volume name.
    #[must_use]
    pub fn source_volume(mut self, value: impl Into<String>) -> Self {
        self.source_volume = value.into();
        self
    }

    /// Sets the parent snapshot name.
    #[must_use]
    pub fn source_snapshot(mut self, value: impl Into<String>) -> Self {
        self.source_snapshot = value.into();
        self
    }

    /// Sets the clone volume name.
    #[must_use]
    pub fn clone_volume(mut self, value: impl Into<String>) -> Self {
        self.clone_volume = value.into();
        self
    }

    /// Sets the storage virtual machine.
    #[must_use]
    pub fn svm(mut self, value: impl Into<String>) -> Self {
        self.svm = value.into();
        self
    }

    /// Overrides the default comment.
    #[must_use]
    pub fn comment(mut self, value: Option<String>) -> Self {
        self.comment = value;
        self
    }

    /// Builds and validates the [`CloneSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when a required field is blank.
    pub fn build(self) -> Result<CloneSpec, RequestError> {
        let spec = CloneSpec {
            source_volume: self.source_volume.trim().to_owned(),
            source_snapshot: self.source_snapshot.trim().to_owned(),
            clone_volume: self.clone_volume.trim().to_owned(),
            svm: self.svm.trim().to_owned(),
            comment: self
                .comment
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
        };
        spec.validate()?;
        Ok(spec)
    }
}
