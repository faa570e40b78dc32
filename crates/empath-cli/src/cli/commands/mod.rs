pub mod dispatch;
pub mod export;
pub mod infer;
pub mod log;
pub mod score;

pub use dispatch::dispatch;
