//! Fee calculation and fee reconstruction

pub mod calculator;
pub mod parser;

pub use calculator::FeeCalculator;
pub use parser::FeeParser;

/// Signature fee assumed when the node reports no fee schedule
pub const DEFAULT_LAMPORTS_PER_SIGNATURE: u64 = 5000;

/// Smallest top-up the relay accepts; smaller amounts are rounded up
pub const MIN_TOP_UP_AMOUNT: u64 = 10_000;

/// Slippage applied when converting fees into the paying token
pub const TOP_UP_SLIPPAGE: f64 = 0.01;
