pub mod handlers;
pub mod response;
pub mod server;
pub mod state;

pub use response::{ok, ApiError};
pub use server::{build_admin_router, AdminServer};
pub use state::AppState;
