//! Service principal credentials
//!
//! Read from the cloud provider JSON file Kubernetes nodes carry at
//! `/etc/kubernetes/azure.json`. Only four keys are used; the rest of the
//! file is ignored.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use dns_sync_core::{Error, Result};
use serde::Deserialize;

/// Service principal used to authenticate against Azure Resource Manager
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureCredentials {
    #[serde(default)]
    pub tenant_id: String,

    #[serde(default)]
    pub subscription_id: String,

    #[serde(default)]
    pub aad_client_id: String,

    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub aad_client_secret: String,
}

impl AzureCredentials {
    /// Read and validate the credential file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Parsing Azure configuration from {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let credentials: Self = serde_json::from_reader(reader)?;
        credentials.validate()?;

        Ok(credentials)
    }

    /// Parse and validate credentials held in memory
    pub fn from_json_str(json: &str) -> Result<Self> {
        let credentials: Self = serde_json::from_str(json)?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Check every key is present, reporting the first missing one
    pub fn validate(&self) -> Result<()> {
        let keys = [
            ("tenantId", &self.tenant_id),
            ("subscriptionId", &self.subscription_id),
            ("aadClientId", &self.aad_client_id),
            ("aadClientSecret", &self.aad_client_secret),
        ];

        match keys.into_iter().find(|(_, value)| value.is_empty()) {
            Some((key, _)) => Err(Error::missing_credential(key)),
            None => Ok(()),
        }
    }
}

// Custom Debug implementation that hides the client secret
impl std::fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .field("aad_client_id", &self.aad_client_id)
            .field("aad_client_secret", &"<REDACTED>")
            .finish()
    }
}
