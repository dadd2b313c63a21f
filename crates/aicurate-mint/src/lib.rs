pub mod chain;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod types;

pub use chain::{SimulatedContract, TokenContract};
pub use error::{MintError, Result};
pub use gateway::{MintGateway, MintReceipt};
pub use limiter::RateLimiter;
pub use types::{Cur8Amount, MintConfig};
