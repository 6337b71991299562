//! Tests for the provider system

#[cfg(test)]
mod tests {
    use crate::{
        config::{LlmConfig, LlmModelConfig, LlmProviderConfig},
        providers::{
            LlmRegistry, ModelPricing, OpenAIProvider, ProviderKind, ProviderRegistry, TokenUsage,
        },
        testing::MockLlm,
        Error,
    };
    use std::sync::Arc;

    fn openai_entry(api_key: Option<&str>) -> LlmProviderConfig {
        LlmProviderConfig {
            name: "OpenAI".to_string(),
            kind: ProviderKind::OpenAI,
            api_key: api_key.map(str::to_string),
            base_url: None,
            models: vec![
                LlmModelConfig {
                    name: "gpt-4o-mini".to_string(),
                    prompt_token_cost_per_1000: 0.00015,
                    output_token_cost_per_1000: 0.0006,
                },
                LlmModelConfig {
                    name: "gpt-4o".to_string(),
                    prompt_token_cost_per_1000: 0.0025,
                    output_token_cost_per_1000: 0.01,
                },
            ],
        }
    }

    #[test]
    fn test_openai_metadata() {
        let metadata = OpenAIProvider::static_metadata();

        assert_eq!(metadata.kind, ProviderKind::OpenAI);
        assert_eq!(metadata.display_name, "OpenAI");
        assert!(!metadata.models.is_empty());
    }

    #[test]
    fn test_registry_discovery() {
        let providers = ProviderRegistry::global().list_providers();
        assert!(providers.iter().any(|p| p.kind == ProviderKind::OpenAI));
    }

    #[test]
    fn test_provider_not_registered() {
        let registry = ProviderRegistry::new();
        let result = registry.create(&openai_entry(Some("sk-test")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let result = ProviderRegistry::global().create(&openai_entry(None));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_model_ids_follow_config_order() {
        let config = LlmConfig {
            providers: vec![openai_entry(Some("sk-test"))],
            ..LlmConfig::default()
        };
        let registry = LlmRegistry::from_config(&config).unwrap();

        assert_eq!(
            registry.model_ids(),
            vec!["OpenAI: gpt-4o-mini".to_string(), "OpenAI: gpt-4o".to_string()]
        );
        assert!(registry.contains("OpenAI: gpt-4o"));
        assert!(!registry.contains("gpt-4o"));
    }

    #[test]
    fn test_pricing_formula() {
        let pricing = ModelPricing {
            prompt_token_cost_per_1000: 0.5,
            output_token_cost_per_1000: 1.5,
        };
        let usage = TokenUsage {
            prompt_tokens: 2000,
            completion_tokens: 1000,
            total_tokens: 3000,
        };
        assert!((pricing.cost(&usage) - 2.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_prompt_routes_to_provider() {
        let mock = Arc::new(MockLlm::with_response("<SQL>SELECT 1</SQL>"));
        let mut registry = LlmRegistry::new();
        registry.add_provider(mock.clone(), vec!["fake-model".to_string()]);

        let answer = registry.prompt("Mock: fake-model", "hello").await.unwrap();
        assert_eq!(answer.answer, "<SQL>SELECT 1</SQL>");
        assert_eq!(answer.model, "fake-model");
        assert_eq!(mock.prompts(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_model_id() {
        let registry = LlmRegistry::new();
        let result = registry.prompt("Nobody: nothing", "hello").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
