// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! GitLab omniauth provider document for the OpenUnison identity provider

use crate::constants::gitlab::OIDC_CLIENT_ID;
use crate::credentials::Credential;
use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SsoProvider {
    pub name: String,
    pub label: String,
    pub args: ProviderArgs,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ProviderArgs {
    pub name: String,
    pub scope: Vec<String>,
    pub response_type: String,
    pub issuer: String,
    pub discovery: bool,
    pub client_auth_method: String,
    pub uid_field: String,
    pub send_scope_to_token_endpoint: bool,
    pub pkce: bool,
    pub client_options: ClientOptions,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ClientOptions {
    pub identifier: String,
    pub secret: String,
    pub redirect_uri: String,
}

impl SsoProvider {
    pub fn openid_connect(dns_suffix: &str, credential: &Credential) -> Self {
        Self {
            name: "openid_connect".to_string(),
            label: "OpenUnison".to_string(),
            args: ProviderArgs {
                name: "openid_connect".to_string(),
                scope: vec!["openid".to_string(), "profile".to_string()],
                response_type: "code".to_string(),
                issuer: format!("https://k8sou.{}/auth/idp/k8sIdp", dns_suffix),
                discovery: true,
                client_auth_method: "query".to_string(),
                uid_field: "sub".to_string(),
                send_scope_to_token_endpoint: false,
                pkce: true,
                client_options: ClientOptions {
                    identifier: OIDC_CLIENT_ID.to_string(),
                    secret: credential.as_str().to_string(),
                    redirect_uri: format!(
                        "https://gitlab.{}/users/auth/openid_connect/callback",
                        dns_suffix
                    ),
                },
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ProvisionError::GraphError(format!("failed to render SSO provider: {}", e)))
    }
}
