mod backend;
mod fanout;
mod gateway;
mod http;
mod logging;

pub use backend::Config as BackendConfig;
pub use fanout::Config as FanoutConfig;
pub use gateway::Config as GatewayConfig;
pub use http::Config as HttpConfig;
pub use logging::Config as LoggingConfig;
