pub mod cancel;
pub mod config;
pub mod deployment;
pub mod entity;
pub mod error;
pub mod ir;
pub mod resource;

pub use cancel::CancellationToken;
pub use config::ControlPlaneConfig;
pub use deployment::{Deployment, DeploymentStatus};
pub use entity::{Environment, Gateway, GatewayStatus, Listener};
pub use error::FlowcError;
pub use ir::Ir;
pub use resource::ResourceBundle;
