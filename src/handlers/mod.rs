pub mod analyze;
pub mod recipe;

pub use analyze::{AnalyzeError, AnalyzeHandler};
pub use recipe::RetryPolicy;
