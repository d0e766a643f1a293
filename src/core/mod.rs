//! Core infrastructure shared by the workflow: configuration and the call
//! policy applied to external services.

mod config;
mod retry;

pub use config::{
    AiConfig, AnalyzerKind, Config, CopySource, GeneralConfig, LoggingConfig, PhaseOrder,
    ProviderKind, SearchConfig, StoreBackend, StoreConfig, WorkflowConfig, USER_ENV,
};
pub use retry::{retry_async, CallError, RetryConfig, RetryResult};
