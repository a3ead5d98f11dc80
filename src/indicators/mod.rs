// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the descriptive indicators shown
// on the dashboard. Series functions return `Vec<T>` (empty on insufficient
// data); `latest_*` helpers return `Option<T>` so callers are forced to handle
// short or degenerate inputs.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::latest_ema;
pub use macd::{latest_macd, MacdPoint};
pub use rsi::current_rsi;
pub use sma::latest_sma;
