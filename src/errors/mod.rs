mod accounts;
mod aggregate;
mod backend;
mod config;
mod directory;
mod gateway;
mod init;

pub use accounts::AccountsError;
pub use aggregate::AggregateError;
pub use backend::BackendError;
pub use config::ConfigValidationError;
pub use directory::DirectoryError;
pub use gateway::GatewayError;
pub use init::InitializationError;
