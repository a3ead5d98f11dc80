pub mod client;
pub mod series;

pub use client::MarketDataClient;
pub use series::PriceSeries;
