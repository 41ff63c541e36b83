//! Login-time token issuance.

use crate::client::{ClientId, ClientLifecycle, ClientSecret};
use crate::error::GatewayError;
use crate::feature::{JsonFetcherConfig, JwtTokenizerConfig};
use crate::jwt::Tokenizer;
use crate::payload::{PayloadComposer, SessionAttributes};
use crate::storage::ConfigRetriever;
use std::any::TypeId;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What the session layer knows after authentication.
#[derive(Debug, Clone)]
pub struct LoginContext {
    /// Client the login is for
    pub client_id: ClientId,
    /// Secret presented by the client
    pub secret: ClientSecret,
    /// Authenticated subject
    pub subject: String,
    /// Session attributes
    pub attributes: SessionAttributes,
}

/// Loads a client's configs and issues its token.
#[derive(Clone)]
pub struct TokenIssuer {
    lifecycle: ClientLifecycle,
    retriever: ConfigRetriever,
    composer: PayloadComposer,
    tokenizers: Vec<Arc<dyn Tokenizer>>,
    tokenizer_kind: TypeId,
    fetcher_kind: Option<TypeId>,
}

impl TokenIssuer {
    /// Create an issuer reading the `jwt` tokenizer and `fetch` fetcher configs.
    pub fn new(
        lifecycle: ClientLifecycle,
        retriever: ConfigRetriever,
        composer: PayloadComposer,
        tokenizers: Vec<Arc<dyn Tokenizer>>,
    ) -> Self {
        Self {
            lifecycle,
            retriever,
            composer,
            tokenizers,
            tokenizer_kind: TypeId::of::<JwtTokenizerConfig>(),
            fetcher_kind: Some(TypeId::of::<JsonFetcherConfig>()),
        }
    }

    /// Read other config kinds for the tokenizer and the optional fetcher.
    #[must_use]
    pub const fn with_kinds(mut self, tokenizer: TypeId, fetcher: Option<TypeId>) -> Self {
        self.tokenizer_kind = tokenizer;
        self.fetcher_kind = fetcher;
        self
    }

    /// Issue a token for an authenticated login.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the client is unknown or the secret is wrong.
    /// - `Configuration` if no tokenizer or fetcher handles the stored configs.
    /// - `Transport` if the claim fetch fails.
    #[instrument(skip(self, login), fields(client_id = %login.client_id))]
    pub async fn issue(&self, login: &LoginContext) -> Result<String, GatewayError> {
        let tokenizer_config = self
            .retriever
            .find_dyn(self.tokenizer_kind, &login.client_id, &login.secret)
            .await?
            .ok_or(GatewayError::NotFound)?;
        self.lifecycle.touch(&login.client_id).await?;

        let fetcher_config = match self.fetcher_kind {
            Some(kind) if self.retriever.store_for(kind).is_some() => {
                self.retriever
                    .find_dyn(kind, &login.client_id, &login.secret)
                    .await?
            }
            _ => None,
        };

        let payload = self
            .composer
            .compose(
                &login.client_id,
                &login.subject,
                &login.attributes,
                tokenizer_config.as_ref(),
                fetcher_config.as_deref(),
            )
            .await?;

        let tokenizer = self
            .tokenizers
            .iter()
            .find(|t| t.supports(tokenizer_config.as_ref()))
            .ok_or_else(|| {
                GatewayError::configuration(format!(
                    "no tokenizer handles a '{}' config",
                    tokenizer_config.feature()
                ))
            })?;

        let token = tokenizer.tokenize(&login.subject, payload, tokenizer_config.as_ref())?;
        debug!(fetched = fetcher_config.is_some(), "Token issued for login");
        Ok(token)
    }
}
