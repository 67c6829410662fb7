pub mod router;
pub mod types;
pub mod handlers {
    pub mod chat;
    pub mod common;
    pub mod crud;
    pub mod custom;
    pub mod health;
    pub mod meta;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
