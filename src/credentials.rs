// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent provisioning of the OIDC client credential.
//!
//! The credential is generated once and then read back on every later run;
//! regenerating it would invalidate the client already registered with the
//! identity provider.

use crate::constants::{credential::RANDOM_BYTES, gitlab, nodes};
use crate::error::{ProvisionError, Result};
use crate::graph::{Resource, ResourceNode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{api::ObjectMeta, Api, Client};
use rand::{rngs::OsRng, RngCore};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, instrument};

/// A shared secret between GitLab and the identity provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Generate a new credential from 64 bytes of OS randomness
    pub fn generate() -> Self {
        let mut raw = [0u8; RANDOM_BYTES];
        OsRng.fill_bytes(&mut raw);
        Self(URL_SAFE_NO_PAD.encode(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value = std::str::from_utf8(bytes).map_err(|e| {
            ProvisionError::CredentialLookup(format!("stored credential is not valid UTF-8: {}", e))
        })?;
        Ok(Self(value.to_string()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Outcome of looking up the credential secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredCredential {
    Found(Credential),
    Absent,
}

/// The declared credential secret together with the plaintext value
#[derive(Debug, Clone)]
pub struct ProvisionedCredential {
    pub node: ResourceNode,
    pub credential: Credential,
    /// Whether the credential was generated during this run
    pub generated: bool,
}

pub struct OidcProvisioner {
    secrets: Api<Secret>,
    namespace: String,
    name: String,
}

impl OidcProvisioner {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            secrets: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            name: gitlab::OIDC_SECRET.to_string(),
        }
    }

    /// Read the credential secret. Only a 404 counts as absent; every other
    /// API failure is a `CredentialLookup` error.
    #[instrument(skip(self), fields(secret = %format!("{}/{}", self.namespace, self.name)))]
    pub async fn lookup(&self) -> Result<StoredCredential> {
        let secret = match self.secrets.get(&self.name).await {
            Ok(secret) => secret,
            Err(kube::Error::Api(err)) if err.code == 404 => return Ok(StoredCredential::Absent),
            Err(e) => {
                return Err(ProvisionError::CredentialLookup(format!(
                    "failed to read secret {}/{}: {}",
                    self.namespace, self.name, e
                )))
            }
        };

        read_credential(&secret).map(StoredCredential::Found)
    }

    /// Reuse the stored credential or generate one, and declare the secret holding it
    pub async fn provision(&self) -> Result<ProvisionedCredential> {
        let (credential, generated) = match self.lookup().await? {
            StoredCredential::Found(credential) => {
                info!(
                    "Reusing OIDC client credential from {}/{}",
                    self.namespace, self.name
                );
                (credential, false)
            }
            StoredCredential::Absent => {
                info!(
                    "No OIDC client credential at {}/{}, generating one",
                    self.namespace, self.name
                );
                (Credential::generate(), true)
            }
        };

        let node = ResourceNode::new(
            nodes::OIDC_CREDENTIAL,
            Resource::Secret(credential_secret(&self.namespace, &self.name, &credential)),
        )
        .delete_before_replace();

        Ok(ProvisionedCredential {
            node,
            credential,
            generated,
        })
    }
}

/// Build the secret declaring only the credential key. Server-side apply
/// removes keys this field manager stopped declaring; keys written by other
/// managers stay in the live secret.
pub fn credential_secret(namespace: &str, name: &str, credential: &Credential) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            gitlab::OIDC_CLIENT_SECRET_KEY.to_string(),
            ByteString(credential.as_str().as_bytes().to_vec()),
        )])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Extract the credential from a stored secret
pub fn read_credential(secret: &Secret) -> Result<Credential> {
    let Some(value) = secret
        .data
        .as_ref()
        .and_then(|d| d.get(gitlab::OIDC_CLIENT_SECRET_KEY))
    else {
        return Err(ProvisionError::CredentialLookup(format!(
            "secret does not contain '{}' key",
            gitlab::OIDC_CLIENT_SECRET_KEY
        )));
    };

    Credential::from_bytes(&value.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{not_found_json, secret_json, status_json, MockService};

    const SECRET_PATH: &str = "/api/v1/namespaces/openunison/secrets/gitlab-oidc";

    fn declared_secret(provisioned: &ProvisionedCredential) -> &Secret {
        match &provisioned.node.resource {
            Resource::Secret(s) => s,
            other => panic!("unexpected resource {}", other.kind()),
        }
    }

    #[test]
    fn test_generated_credential_shape() {
        let credential = Credential::generate();

        // 64 bytes, unpadded URL-safe base64
        assert_eq!(credential.as_str().len(), 86);
        assert!(credential
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(URL_SAFE_NO_PAD.decode(credential.as_str()).unwrap().len(), 64);
        assert_ne!(credential, Credential::generate());
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential("super-secret".to_string());
        assert!(!format!("{:?}", credential).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_absent_secret_generates_credential() {
        let mock = MockService::new().on_get(SECRET_PATH, 404, &not_found_json("secrets", "gitlab-oidc"));
        let provisioner = OidcProvisioner::new(mock.clone().into_client(), "openunison");

        let provisioned = provisioner.provision().await.unwrap();

        assert!(provisioned.generated);
        assert_eq!(provisioned.credential.as_str().len(), 86);
        assert_eq!(provisioned.node.id.as_str(), "gitlab-oidc");
        assert!(provisioned.node.options.delete_before_replace);
        assert!(!provisioned.node.options.retain_on_delete);

        // The declared secret reads back to the same value
        let secret = declared_secret(&provisioned);
        assert_eq!(secret.metadata.namespace.as_deref(), Some("openunison"));
        assert_eq!(secret.data.as_ref().unwrap().len(), 1);
        assert_eq!(read_credential(secret).unwrap(), provisioned.credential);
    }

    #[tokio::test]
    async fn test_existing_secret_is_reused() {
        let stored = Credential::generate();
        let mock = MockService::new().on_get(
            SECRET_PATH,
            200,
            &secret_json(
                "openunison",
                "gitlab-oidc",
                &[("gitlab.oidc.client_secret", stored.as_str().as_bytes())],
            ),
        );
        let provisioner = OidcProvisioner::new(mock.into_client(), "openunison");

        let first = provisioner.provision().await.unwrap();
        let second = provisioner.provision().await.unwrap();

        assert!(!first.generated);
        assert_eq!(first.credential, stored);
        assert_eq!(second.credential, stored);
        assert_eq!(
            declared_secret(&first).data,
            declared_secret(&second).data
        );
    }

    #[tokio::test]
    async fn test_generated_credential_read_back_after_apply() {
        use crate::graph::{Applier, Operation};
        use crate::kubernetes::{HelmCli, KubeApplier};
        use std::path::PathBuf;

        let mock = MockService::new().storing_applies();
        let provisioner = OidcProvisioner::new(mock.clone().into_client(), "openunison");
        let applier = KubeApplier::new(
            mock.clone().into_client(),
            HelmCli::new(PathBuf::from("/nonexistent/helm"), None),
        );

        let first = provisioner.provision().await.unwrap();
        assert!(first.generated);
        applier.apply(&first.node, Operation::Create).await.unwrap();

        let second = provisioner.provision().await.unwrap();

        assert!(!second.generated);
        assert_eq!(second.credential, first.credential);
        assert_eq!(
            declared_secret(&first).data,
            declared_secret(&second).data
        );
        let methods: Vec<String> = mock.requests().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, vec!["GET", "PATCH", "GET"]);
    }

    #[tokio::test]
    async fn test_declared_secret_omits_foreign_keys() {
        let stored = Credential::generate();
        let mock = MockService::new().on_get(
            SECRET_PATH,
            200,
            &secret_json(
                "openunison",
                "gitlab-oidc",
                &[
                    ("gitlab.oidc.client_secret", stored.as_str().as_bytes()),
                    ("added-by-hand", b"x"),
                ],
            ),
        );
        let provisioner = OidcProvisioner::new(mock.into_client(), "openunison");

        let provisioned = provisioner.provision().await.unwrap();

        let data = declared_secret(&provisioned).data.as_ref().unwrap();
        assert_eq!(
            data.keys().collect::<Vec<_>>(),
            vec!["gitlab.oidc.client_secret"]
        );
        assert_eq!(provisioned.credential, stored);
    }

    #[tokio::test]
    async fn test_api_error_is_not_treated_as_absent() {
        let mock = MockService::new().on_get(
            SECRET_PATH,
            500,
            &status_json(500, "InternalError", "etcdserver: request timed out"),
        );
        let provisioner = OidcProvisioner::new(mock.clone().into_client(), "openunison");

        let err = provisioner.provision().await.unwrap_err();

        assert!(matches!(err, ProvisionError::CredentialLookup(_)));
        assert!(!mock.has_writes());
    }

    #[tokio::test]
    async fn test_forbidden_is_not_treated_as_absent() {
        let mock = MockService::new().on_get(
            SECRET_PATH,
            403,
            &status_json(403, "Forbidden", "secrets \"gitlab-oidc\" is forbidden"),
        );
        let provisioner = OidcProvisioner::new(mock.into_client(), "openunison");

        let err = provisioner.lookup().await.unwrap_err();
        assert!(matches!(err, ProvisionError::CredentialLookup(_)));
    }

    #[tokio::test]
    async fn test_secret_without_key_fails_lookup() {
        let mock = MockService::new().on_get(
            SECRET_PATH,
            200,
            &secret_json("openunison", "gitlab-oidc", &[("other", b"value")]),
        );
        let provisioner = OidcProvisioner::new(mock.into_client(), "openunison");

        let err = provisioner.provision().await.unwrap_err();
        assert!(matches!(err, ProvisionError::CredentialLookup(_)));
    }

    #[test]
    fn test_non_utf8_credential_rejected() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                gitlab::OIDC_CLIENT_SECRET_KEY.to_string(),
                ByteString(vec![0xff, 0xfe]),
            )])),
            ..Default::default()
        };

        assert!(matches!(
            read_credential(&secret),
            Err(ProvisionError::CredentialLookup(_))
        ));
    }
}
