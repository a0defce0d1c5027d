// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The field manager used for server-side apply
pub const FIELD_MANAGER: &str = "gitlab-provisioner";

/// cert-manager objects read from the control-plane cluster
pub mod trust {
    /// ClusterIssuer holding the enterprise trust anchor
    pub const CLUSTER_ISSUER: &str = "enterprise-ca";
    /// Namespace where cert-manager keeps the CA secrets of cluster issuers
    pub const ISSUER_SECRET_NAMESPACE: &str = "cert-manager";
    /// Key of the CA certificate inside the issuer secret
    pub const CA_CERT_KEY: &str = "tls.crt";
}

/// Names of the objects created for the GitLab deployment
pub mod gitlab {
    pub const RELEASE_NAME: &str = "gitlab";
    pub const CHART_NAME: &str = "gitlab";
    pub const CHART_INDEX_PATH: &str = "index.yaml";
    pub const OIDC_SECRET: &str = "gitlab-oidc";
    /// Key of the OIDC client secret in the credential secret
    pub const OIDC_CLIENT_SECRET_KEY: &str = "gitlab.oidc.client_secret";
    /// Key of the omniauth provider document in the SSO secret
    pub const SSO_PROVIDER_KEY: &str = "provider";
    pub const CA_SECRET: &str = "internal-ca";
    pub const CERTIFICATE: &str = "gitlab-wildcard-certificate";
    pub const TLS_SECRET: &str = "gitlab-wildcard-tls";
    /// Client identifier registered with the identity provider
    pub const OIDC_CLIENT_ID: &str = "gitlab";
}

/// Resource graph node identifiers
pub mod nodes {
    pub const NAMESPACE: &str = "gitlab-namespace";
    pub const OIDC_CREDENTIAL: &str = "gitlab-oidc";
    pub const SSO_CONFIG: &str = "gitlab-oidc-cfg";
    pub const CA_BUNDLE: &str = "internal-ca-secret";
    pub const CERTIFICATE: &str = "gitlab-wildcard-certificate";
    pub const RELEASE: &str = "gitlab";
}

/// Per-node operation budgets, in minutes
pub mod timeouts {
    pub const DEFAULT_MINUTES: u64 = 10;
    pub const CERTIFICATE_MINUTES: u64 = 30;
    pub const RELEASE_CREATE_MINUTES: u64 = 8;
}

/// Credential generation
pub mod credential {
    /// Number of random bytes behind a generated credential
    pub const RANDOM_BYTES: usize = 64;
}
