pub mod agent;
pub mod crud;
