pub mod retry;
pub mod summary_service;

pub use retry::RetryPolicy;
pub use summary_service::SummaryService;
