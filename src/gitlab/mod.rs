// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Composition of the GitLab deployment's resource graph.

pub mod sso;
pub mod values;

use crate::config::Config;
use crate::constants::{gitlab, nodes, timeouts, trust};
use crate::credentials::{Credential, ProvisionedCredential};
use crate::error::{ProvisionError, Result};
use crate::graph::{CustomTimeouts, Resource, ResourceGraph, ResourceNode};
use crate::types::certificate::{go_duration, CertificateSpec, IssuerRef, PrivateKey};
use crate::types::{Certificate, HelmRelease};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::time::Duration;

pub use sso::SsoProvider;

const CERTIFICATE_VALIDITY: Duration = Duration::from_secs(2160 * 3600);
const CERTIFICATE_RENEW_BEFORE: Duration = Duration::from_secs(360 * 3600);

/// Everything resolved before the graph can be composed
#[derive(Debug, Clone)]
pub struct DeploymentInputs {
    pub chart_version: String,
    pub ca_bundle: ByteString,
    pub credential: ProvisionedCredential,
}

/// Compose the namespace, secrets, certificate and Helm release for one
/// GitLab deployment. The release depends on the SSO secret, the CA secret and
/// the wildcard certificate; the SSO secret depends on the credential secret.
pub fn build_graph(config: &Config, inputs: DeploymentInputs) -> Result<ResourceGraph> {
    if config.oidc_namespace == config.gitlab_namespace {
        return Err(ProvisionError::GraphError(format!(
            "OIDC credential and SSO configuration would both be {}/{}",
            config.gitlab_namespace,
            gitlab::OIDC_SECRET
        )));
    }

    let suffix = config.dns_suffix.as_str();
    let ns = config.gitlab_namespace.as_str();
    let mut graph = ResourceGraph::new();

    let namespace = graph.add(
        ResourceNode::new(nodes::NAMESPACE, Resource::Namespace(namespace(ns))).retain_on_delete(),
        &[],
    )?;

    let credential = inputs.credential.credential.clone();
    let credential_secret = graph.add(inputs.credential.node, &[])?;

    let sso_config = graph.add(
        ResourceNode::new(
            nodes::SSO_CONFIG,
            Resource::Secret(sso_secret(ns, suffix, &credential)?),
        )
        .delete_before_replace(),
        &[&namespace, &credential_secret],
    )?;

    let ca_bundle = graph.add(
        ResourceNode::new(
            nodes::CA_BUNDLE,
            Resource::Secret(ca_secret(ns, suffix, &inputs.ca_bundle)),
        )
        .delete_before_replace(),
        &[&namespace],
    )?;

    let certificate = graph.add(
        ResourceNode::new(
            nodes::CERTIFICATE,
            Resource::Certificate(wildcard_certificate(ns, suffix)),
        )
        .with_timeouts(CustomTimeouts::uniform(timeouts::CERTIFICATE_MINUTES)),
        &[&namespace],
    )?;

    graph.add(
        ResourceNode::new(
            nodes::RELEASE,
            Resource::Release(release(config, &inputs.chart_version)),
        )
        .with_timeouts(CustomTimeouts {
            create: Duration::from_secs(timeouts::RELEASE_CREATE_MINUTES * 60),
            ..CustomTimeouts::default()
        }),
        &[&namespace, &ca_bundle, &sso_config, &certificate],
    )?;

    Ok(graph)
}

fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn opaque_secret(namespace: &str, name: &str, data: BTreeMap<String, ByteString>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Secret holding the omniauth provider document, with the credential embedded
pub fn sso_secret(namespace: &str, dns_suffix: &str, credential: &Credential) -> Result<Secret> {
    let provider = SsoProvider::openid_connect(dns_suffix, credential).to_yaml()?;
    Ok(opaque_secret(
        namespace,
        gitlab::OIDC_SECRET,
        BTreeMap::from([(
            gitlab::SSO_PROVIDER_KEY.to_string(),
            ByteString(provider.into_bytes()),
        )]),
    ))
}

/// Secret publishing the CA bundle under every key GitLab looks it up by
pub fn ca_secret(namespace: &str, dns_suffix: &str, bundle: &ByteString) -> Secret {
    let data = values::ca_bundle_keys(dns_suffix)
        .into_iter()
        .map(|key| (key, bundle.clone()))
        .collect();
    opaque_secret(namespace, gitlab::CA_SECRET, data)
}

pub fn wildcard_certificate(namespace: &str, dns_suffix: &str) -> Certificate {
    let wildcard = format!("*.{}", dns_suffix);
    let mut certificate = Certificate::new(
        gitlab::CERTIFICATE,
        CertificateSpec {
            common_name: Some(wildcard.clone()),
            dns_names: vec![dns_suffix.to_string(), wildcard],
            duration: Some(go_duration(CERTIFICATE_VALIDITY)),
            renew_before: Some(go_duration(CERTIFICATE_RENEW_BEFORE)),
            is_ca: false,
            issuer_ref: IssuerRef {
                group: Some("cert-manager.io".to_string()),
                kind: Some("ClusterIssuer".to_string()),
                name: trust::CLUSTER_ISSUER.to_string(),
            },
            private_key: Some(PrivateKey {
                algorithm: "RSA".to_string(),
                encoding: "PKCS1".to_string(),
                size: 2048,
            }),
            secret_name: gitlab::TLS_SECRET.to_string(),
            usages: vec!["server auth".to_string(), "client auth".to_string()],
        },
    );
    certificate.metadata.namespace = Some(namespace.to_string());
    certificate
}

fn release(config: &Config, chart_version: &str) -> HelmRelease {
    HelmRelease {
        name: gitlab::RELEASE_NAME.to_string(),
        namespace: config.gitlab_namespace.clone(),
        chart: gitlab::CHART_NAME.to_string(),
        version: chart_version.to_string(),
        repository: config.chart_repository.clone(),
        values: values::helm_values(&config.dns_suffix),
        wait: true,
    }
}
