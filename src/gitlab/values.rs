// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::gitlab::{CA_SECRET, OIDC_SECRET, SSO_PROVIDER_KEY, TLS_SECRET};
use serde_json::{json, Value};

/// Keys under which the CA bundle is published in the CA secret
pub fn ca_bundle_keys(dns_suffix: &str) -> Vec<String> {
    vec![
        "tls.crt".to_string(),
        dns_suffix.to_string(),
        format!("gitlab.{}", dns_suffix),
    ]
}

/// Values for the GitLab chart, wiring ingress TLS, omniauth and custom CAs
/// to the secrets created alongside the release
pub fn helm_values(dns_suffix: &str) -> Value {
    json!({
        "global": {
            "hosts": {
                "domain": dns_suffix,
                "ssh": format!("gitlab-ssh.{}", dns_suffix),
            },
            "edition": "ce",
            "ingress": {
                "configureCertmanager": false,
                "enabled": true,
                "class": "nginx",
                "tls": {
                    "enabled": true,
                    "secretName": TLS_SECRET,
                },
            },
            "appConfig": {
                "omniauth": {
                    "enabled": true,
                    "allowSingleSignOn": ["openid_connect"],
                    "providers": [
                        { "secret": OIDC_SECRET, "key": SSO_PROVIDER_KEY }
                    ],
                },
            },
            "certificates": {
                "customCAs": [
                    { "secret": CA_SECRET, "keys": ca_bundle_keys(dns_suffix) }
                ],
            },
        },
        "nginx-ingress": { "enabled": false },
        "certmanager": { "install": false },
        "certsSecretName": CA_SECRET,
        "gitlab-runner": {
            "install": false,
            "certsSecretName": CA_SECRET,
        },
    })
}
