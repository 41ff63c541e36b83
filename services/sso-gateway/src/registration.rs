//! Client registration and removal across the lifecycle and every store.
//!
//! Registration is a saga: every config is built and validated before the
//! first write, then the client record and each config are written in turn.
//! A failed write triggers compensating deletes for what was already written.
//! Removal is best effort and reports what it actually removed.

use crate::client::{ClientId, ClientLifecycle, ClientSecret};
use crate::error::GatewayError;
use crate::factory::{BuiltConfig, FactoryRegistry};
use crate::feature::kind_of;
use crate::metrics;
use crate::storage::{ConfigRetriever, ConfigStore};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a successful registration. The secret is shown only here.
#[derive(Debug)]
pub struct Registration {
    /// New client id
    pub client_id: ClientId,
    /// New client secret
    pub secret: ClientSecret,
    /// Per-feature data to echo back, keyed by feature
    pub side_outputs: Map<String, Value>,
}

impl Registration {
    /// Response body: `{"client": {"id", "secret"}, ...side outputs}`.
    #[must_use]
    pub fn to_response(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "client".to_string(),
            json!({ "id": self.client_id.as_str(), "secret": self.secret.expose() }),
        );
        for (feature, output) in &self.side_outputs {
            body.insert(feature.clone(), output.clone());
        }
        Value::Object(body)
    }
}

/// Registers clients.
#[derive(Clone)]
pub struct Registrar {
    lifecycle: ClientLifecycle,
    factories: FactoryRegistry,
    retriever: ConfigRetriever,
}

struct Planned {
    feature: String,
    store: Arc<dyn ConfigStore>,
    built: BuiltConfig,
}

impl Registrar {
    /// Create a registrar.
    pub const fn new(
        lifecycle: ClientLifecycle,
        factories: FactoryRegistry,
        retriever: ConfigRetriever,
    ) -> Self {
        Self {
            lifecycle,
            factories,
            retriever,
        }
    }

    /// Register a client from a JSON body mapping feature keys to inputs.
    ///
    /// Keys no factory handles are ignored, as are features whose `#` selector
    /// matches no factory. A required feature skipped this way still fails the
    /// registration.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed body, rejected feature input or a missing
    ///   required feature. Nothing is written.
    /// - `Configuration` if a built config has no store.
    /// - `Storage` if a write fails. Earlier writes are compensated.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: &Value) -> Result<Registration, GatewayError> {
        let result = self.try_register(input).await;
        match &result {
            Ok(registration) => {
                metrics::record_registration("success");
                info!(client_id = %registration.client_id, "Client registered");
            }
            Err(e) if e.is_client_error() => {
                metrics::record_registration("rejected");
                debug!(error = %e, "Registration rejected");
            }
            Err(e) => {
                metrics::record_registration("failed");
                error!(error = %e, "Registration failed");
            }
        }
        result
    }

    async fn try_register(&self, input: &Value) -> Result<Registration, GatewayError> {
        let plan = self.plan(input)?;
        let features: Vec<String> = plan.iter().map(|p| p.feature.clone()).collect();

        let client_id = self.lifecycle.create(&features).await?;
        let secret = ClientSecret::generate();

        let mut written: Vec<Arc<dyn ConfigStore>> = Vec::with_capacity(plan.len());
        let mut side_outputs = Map::new();
        for planned in plan {
            if let Err(e) = planned
                .store
                .persist(&client_id, planned.built.config.as_ref(), &secret)
                .await
            {
                if let Err(partial) = self.compensate(&client_id, &written).await {
                    error!(error = %partial, cause = %e, "Registration rollback incomplete");
                }
                return Err(e);
            }
            written.push(planned.store);
            if let Some(output) = planned.built.side_output {
                side_outputs.insert(planned.feature, output);
            }
        }

        Ok(Registration {
            client_id,
            secret,
            side_outputs,
        })
    }

    /// Build every declared feature and check required ones, without writing.
    fn plan(&self, input: &Value) -> Result<Vec<Planned>, GatewayError> {
        let Value::Object(fields) = input else {
            return Err(GatewayError::validation(
                "registration body must be a JSON object",
            ));
        };

        let mut plan: Vec<Planned> = Vec::new();
        for (feature, value) in fields {
            if !self.factories.handles(feature) {
                debug!(feature = %feature, "Ignoring unknown feature key");
                continue;
            }
            let Some(built) = self.factories.build_selected(feature, value)? else {
                debug!(feature = %feature, "No factory matches selector, skipping feature");
                continue;
            };
            let store = self
                .retriever
                .store_for(kind_of(built.config.as_ref()))
                .cloned()
                .ok_or_else(|| {
                    GatewayError::configuration(format!("no store for feature '{feature}'"))
                })?;
            if plan.iter().any(|p| Arc::ptr_eq(&p.store, &store)) {
                return Err(GatewayError::configuration(format!(
                    "feature '{feature}' shares store '{}' with another feature",
                    store.namespace()
                )));
            }
            plan.push(Planned {
                feature: feature.clone(),
                store,
                built,
            });
        }

        for store in self.retriever.stores() {
            if store.is_required() && !plan.iter().any(|p| Arc::ptr_eq(&p.store, store)) {
                return Err(GatewayError::validation(format!(
                    "{}: required feature missing",
                    store.feature()
                )));
            }
        }

        Ok(plan)
    }

    /// Undo a partial registration. Leftovers are left for the sweep and
    /// reported as a `PartialFailure`.
    async fn compensate(
        &self,
        client_id: &ClientId,
        written: &[Arc<dyn ConfigStore>],
    ) -> Result<(), GatewayError> {
        let ids = std::slice::from_ref(client_id);
        let mut orphaned = 0;

        for store in written {
            if let Err(e) = store.remove(ids).await {
                warn!(client_id = %client_id, namespace = %store.namespace(), error = %e, "Compensating delete failed");
                orphaned += 1;
            }
        }
        if let Err(e) = self.lifecycle.remove(ids).await {
            warn!(client_id = %client_id, error = %e, "Compensating client delete failed");
            orphaned += ClientLifecycle::keys_for(client_id).len();
        }

        if orphaned > 0 {
            metrics::record_registration("partial_failure");
            return Err(GatewayError::PartialFailure {
                client_id: client_id.to_string(),
                orphaned,
            });
        }
        Ok(())
    }
}

/// Outcome of a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Client records removed
    pub clients: u64,
    /// Configs removed, per namespace
    pub configs: BTreeMap<String, u64>,
    /// Namespaces (or `client`) whose delete failed
    pub failed: Vec<String>,
}

impl RemovalReport {
    /// Whether every delete went through.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Removes clients from the lifecycle and from every store.
#[derive(Clone)]
pub struct ClientRemover {
    lifecycle: ClientLifecycle,
    retriever: ConfigRetriever,
}

impl ClientRemover {
    /// Create a remover.
    pub const fn new(lifecycle: ClientLifecycle, retriever: ConfigRetriever) -> Self {
        Self {
            lifecycle,
            retriever,
        }
    }

    /// Remove `ids` everywhere, continuing past individual failures.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn remove(&self, ids: &[ClientId]) -> RemovalReport {
        let mut report = RemovalReport::default();
        if ids.is_empty() {
            return report;
        }

        for store in self.retriever.stores() {
            match store.remove(ids).await {
                Ok(count) => {
                    report.configs.insert(store.namespace().to_string(), count);
                }
                Err(e) => {
                    warn!(namespace = %store.namespace(), error = %e, "Config removal failed");
                    report.failed.push(store.namespace().to_string());
                }
            }
        }

        match self.lifecycle.remove(ids).await {
            Ok(count) => report.clients = count,
            Err(e) => {
                warn!(error = %e, "Client record removal failed");
                report.failed.push("client".to_string());
            }
        }

        info!(clients = report.clients, failed = report.failed.len(), "Clients removed");
        report
    }
}
