pub mod normalize;
pub mod providers;

pub use normalize::{normalize, NormalizeError};
pub use providers::{
    build_provider, AnthropicProvider, MockProvider, OllamaProvider, OpenAiProvider,
    ProviderRegistry, ProviderSettings, MOCK_PROVIDER,
};
