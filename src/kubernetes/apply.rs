// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Applies resource graph nodes to the workload cluster

use crate::constants::FIELD_MANAGER;
use crate::error::{ProvisionError, Result};
use crate::graph::{Applier, Operation, Resource, ResourceNode};
use crate::kubernetes::helm::HelmCli;
use crate::types::Certificate;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{DeleteParams, Patch, PatchParams, PostParams},
    runtime::wait::await_condition,
    Api, Client, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument, warn};

pub struct KubeApplier {
    client: Client,
    helm: HelmCli,
}

impl KubeApplier {
    pub fn new(client: Client, helm: HelmCli) -> Self {
        Self { client, helm }
    }

    fn namespaced<K>(&self, obj: &K) -> Result<Api<K>>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        let namespace = obj.namespace().ok_or_else(|| {
            ProvisionError::GraphError(format!("{} has no namespace", obj.name_any()))
        })?;
        Ok(Api::namespaced(self.client.clone(), &namespace))
    }

    /// Apply a secret; an update rejected as invalid (e.g. an immutable field
    /// changed) is turned into delete + create when the node allows it
    async fn apply_secret(&self, secret: &Secret, replace: bool) -> Result<()> {
        let api = self.namespaced(secret)?;
        match server_side_apply(&api, secret).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 422 && replace => {
                warn!(
                    "Secret {} rejected in-place update ({}), replacing it",
                    secret.name_any(),
                    err.message
                );
                api.delete(&secret.name_any(), &DeleteParams::default())
                    .await?;
                api.create(&PostParams::default(), secret).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_certificate(&self, certificate: &Certificate) -> Result<()> {
        let api = self.namespaced(certificate)?;
        let name = certificate.name_any();
        let applied = server_side_apply(&api, certificate).await?;

        info!(
            "Waiting for certificate {} to become ready (generation {:?})",
            name, applied.metadata.generation
        );
        await_condition(api, &name, certificate_ready(applied.metadata.generation))
            .await
        .map_err(|e| ProvisionError::WaitError(format!("certificate {}: {}", name, e)))?;
        Ok(())
    }
}

#[async_trait]
impl Applier for KubeApplier {
    async fn exists(&self, node: &ResourceNode) -> Result<bool> {
        let found = match &node.resource {
            Resource::Namespace(ns) => Api::<Namespace>::all(self.client.clone())
                .get_opt(&ns.name_any())
                .await?
                .is_some(),
            Resource::Secret(s) => self.namespaced(s)?.get_opt(&s.name_any()).await?.is_some(),
            Resource::Certificate(c) => self.namespaced(c)?.get_opt(&c.name_any()).await?.is_some(),
            Resource::Release(r) => self.helm.release_exists(r).await?,
        };
        Ok(found)
    }

    #[instrument(skip(self, node), fields(node = %node.id))]
    async fn apply(&self, node: &ResourceNode, op: Operation) -> Result<()> {
        debug!("Applying {} {}", node.resource.kind(), node.resource.display_name());
        match &node.resource {
            Resource::Namespace(ns) => {
                server_side_apply(&Api::<Namespace>::all(self.client.clone()), ns).await?;
            }
            Resource::Secret(s) => self.apply_secret(s, node.options.delete_before_replace).await?,
            Resource::Certificate(c) => self.apply_certificate(c).await?,
            Resource::Release(r) => {
                if op == Operation::Update && self.helm.is_current(r).await? {
                    info!(
                        "Release {} already runs {} {} with the declared values",
                        r.name, r.chart, r.version
                    );
                } else {
                    self.helm.upgrade_install(r, node.timeouts.budget(op)).await?;
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self, node), fields(node = %node.id))]
    async fn delete(&self, node: &ResourceNode) -> Result<()> {
        let dp = DeleteParams::default();
        let result = match &node.resource {
            Resource::Namespace(ns) => Api::<Namespace>::all(self.client.clone())
                .delete(&ns.name_any(), &dp)
                .await
                .map(|_| ()),
            Resource::Secret(s) => self.namespaced(s)?.delete(&s.name_any(), &dp).await.map(|_| ()),
            Resource::Certificate(c) => self.namespaced(c)?.delete(&c.name_any(), &dp).await.map(|_| ()),
            Resource::Release(r) => {
                return self
                    .helm
                    .uninstall(r, node.timeouts.budget(Operation::Delete))
                    .await
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} already gone", node.resource.display_name());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Ready for the applied generation; an older Ready condition is ignored
fn certificate_ready(generation: Option<i64>) -> impl Fn(Option<&Certificate>) -> bool {
    move |obj: Option<&Certificate>| obj.is_some_and(|c| c.is_ready_since(generation))
}

/// Server-side apply owning every field of `obj`
async fn server_side_apply<K>(api: &Api<K>, obj: &K) -> std::result::Result<K, kube::Error>
where
    K: kube::Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let pp = PatchParams::apply(FIELD_MANAGER).force();
    api.patch(&obj.name_any(), &pp, &Patch::Apply(obj)).await
}
