pub mod api;
pub mod config;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use node::AicurateNode;
