//! Wiring of the built-in features into ready-to-use services.

use crate::client::ClientLifecycle;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::GatewayError;
use crate::factory::{self, FactoryRegistry, JsonFetcherFactory};
use crate::feature::{JsonFetcherConfig, JwtTokenizerConfig};
use crate::fetch::JsonFetcher;
use crate::issuance::TokenIssuer;
use crate::jwt::JwtTokenizer;
use crate::payload::{Extensions, PayloadComposer};
use crate::registration::{ClientRemover, Registrar};
use crate::storage::{ConfigRetriever, ConfigStore, NamespacedConfigStore};
use crate::sweep::InactiveSweep;
use rust_common::KvBackend;
use std::sync::Arc;

/// All gateway services over one backend.
#[derive(Clone)]
pub struct Gateway {
    /// Client registration
    pub registrar: Registrar,
    /// Client removal
    pub remover: ClientRemover,
    /// Token issuance
    pub issuer: TokenIssuer,
    /// Inactivity sweep
    pub sweep: InactiveSweep,
}

impl Gateway {
    /// Build the gateway with the `jwt` (required) and `fetch` features.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the registries are ambiguous or the
    /// HTTP client cannot be built.
    pub fn new(
        kv: Arc<dyn KvBackend>,
        clock: Arc<dyn Clock>,
        config: &Config,
        extensions: Extensions,
    ) -> Result<Self, GatewayError> {
        let lifecycle = ClientLifecycle::new(kv.clone(), clock.clone());

        let mut factories = factory::jwt::all()?;
        factories.push(Arc::new(JsonFetcherFactory));
        let factories = FactoryRegistry::new(factories)?;

        let stores: Vec<Arc<dyn ConfigStore>> = vec![
            Arc::new(NamespacedConfigStore::for_config::<JwtTokenizerConfig>(
                kv.clone(),
                JwtTokenizerConfig::FEATURE,
                true,
            )),
            Arc::new(NamespacedConfigStore::for_config::<JsonFetcherConfig>(
                kv,
                JsonFetcherConfig::FEATURE,
                false,
            )),
        ];
        let retriever = ConfigRetriever::new(stores)?;

        let composer = PayloadComposer::new(
            extensions,
            vec![Arc::new(JsonFetcher::new(&config.http())?)],
        );
        let tokenizer = JwtTokenizer::new(config.token_issuer.clone(), clock.clone());

        let remover = ClientRemover::new(lifecycle.clone(), retriever.clone());
        Ok(Self {
            registrar: Registrar::new(lifecycle.clone(), factories, retriever.clone()),
            issuer: TokenIssuer::new(
                lifecycle.clone(),
                retriever,
                composer,
                vec![Arc::new(tokenizer)],
            ),
            sweep: InactiveSweep::new(lifecycle, remover.clone(), clock, config.client_retention),
            remover,
        })
    }
}
