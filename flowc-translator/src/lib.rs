pub mod composite;
pub mod default_strategy;
pub mod strategy;

pub use composite::CompositeTranslator;
pub use default_strategy::DefaultStrategyFactory;
pub use strategy::{
    ClusterBuilder, EndpointBuilder, ListenerBuilder, RouteBuilder, StrategyConfig,
    StrategyFactory, StrategySet, TransportStrategy, TranslationContext,
};
