//! Builds the claim set handed to the tokenizer.

use super::{Claims, Extensions, SessionAttributes, extract_claims};
use crate::client::ClientId;
use crate::error::GatewayError;
use crate::feature::FeatureConfig;
use crate::fetch::Fetcher;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Composes a payload from session attributes, extensions and an optional
/// external fetch. Fetched claims are merged last and win on collision.
#[derive(Clone, Default)]
pub struct PayloadComposer {
    extensions: Extensions,
    fetchers: Vec<Arc<dyn Fetcher>>,
}

impl PayloadComposer {
    /// Create a composer.
    #[must_use]
    pub const fn new(extensions: Extensions, fetchers: Vec<Arc<dyn Fetcher>>) -> Self {
        Self {
            extensions,
            fetchers,
        }
    }

    /// Compose the payload for one issuance.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `fetcher_config` has no matching
    /// fetcher, or the fetcher's transport error.
    #[instrument(skip_all, fields(client_id = %client_id))]
    pub async fn compose(
        &self,
        client_id: &ClientId,
        subject: &str,
        attributes: &SessionAttributes,
        tokenizer_config: &dyn FeatureConfig,
        fetcher_config: Option<&dyn FeatureConfig>,
    ) -> Result<Claims, GatewayError> {
        let local = extract_claims(tokenizer_config.claim_names(), attributes);
        let mut claims = self.extensions.run(client_id, subject, local);

        let Some(fetcher_config) = fetcher_config else {
            return Ok(claims);
        };

        let fetcher = self
            .fetchers
            .iter()
            .find(|f| f.supports(fetcher_config))
            .ok_or_else(|| {
                GatewayError::configuration(format!(
                    "no fetcher handles a '{}' config",
                    fetcher_config.feature()
                ))
            })?;

        let request = extract_claims(fetcher_config.claim_names(), attributes);
        let fetched = fetcher.fetch(fetcher_config, &request).await?;
        debug!(local = claims.len(), fetched = fetched.len(), "Merging fetched claims");
        claims.extend(fetched);
        Ok(claims)
    }
}
