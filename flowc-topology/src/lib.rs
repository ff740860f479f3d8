pub mod deployment;
pub mod dto;
pub mod environment;
pub mod gateway;
pub mod listener;

pub use deployment::DeploymentService;
pub use dto::{
    CreateEnvironmentSpec, CreateGatewayRequest, CreateListenerSpec, DeploymentStats,
    UpdateEnvironmentRequest, UpdateGatewayRequest, UpdateListenerRequest,
};
pub use environment::EnvironmentService;
pub use gateway::GatewayService;
pub use listener::ListenerService;
