use std::sync::Arc;

use assist_provider::AssistProvider;
use assist_provider_http::{HttpProvider, HttpProviderConfig};
use conversation_store::ConversationLimits;

use crate::config::AssistConfig;
use crate::error::AssistError;

/// Provider plus history limits for one exchange.
pub struct Connection {
    pub provider: Arc<dyn AssistProvider>,
    pub limits: ConversationLimits,
}

/// Builds a provider from freshly read configuration, once per exchange.
pub trait ProviderFactory {
    fn connect(&self) -> Result<Connection, AssistError>;
}

/// Reads [`AssistConfig`] and connects the matching HTTP provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProviderFactory;

impl HttpProviderFactory {
    pub fn connection_for(config: AssistConfig) -> Connection {
        let provider = HttpProvider::new(
            HttpProviderConfig::new(config.provider, config.credential)
                .with_model(config.model)
                .with_web_search(config.web_search),
        );
        Connection {
            provider: Arc::new(provider),
            limits: config.limits,
        }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn connect(&self) -> Result<Connection, AssistError> {
        Ok(Self::connection_for(AssistConfig::load()?))
    }
}

#[cfg(test)]
mod tests {
    use assist_provider::ProviderKind;

    use super::*;

    #[test]
    fn connection_carries_profile_and_limits() {
        let limits = ConversationLimits::new(4, 800).expect("limits");
        let connection = HttpProviderFactory::connection_for(AssistConfig {
            provider: ProviderKind::OpenAi,
            model: "gpt-test".to_string(),
            credential: "k".to_string(),
            web_search: true,
            limits,
        });

        let profile = connection.provider.profile();
        assert_eq!(profile.kind, ProviderKind::OpenAi);
        assert_eq!(profile.model_id, "gpt-test");
        assert!(profile.web_search);
        assert_eq!(connection.limits, limits);
    }
}
