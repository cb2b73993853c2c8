pub mod bus_address;
pub mod config;
pub mod duration;
pub mod error;

pub use bus_address::BusAddress;
pub use config::EngineConfig;
pub use duration::Seconds;
pub use error::RuleError;
