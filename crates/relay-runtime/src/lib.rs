//! The skill-agnostic half of the per-skill session runtime: C9–C13.
//! Generic over the [`client::ApiClient`] trait so no concrete external
//! service SDK is a compile-time dependency of this crate — that's
//! `relay-telegram`'s job.

pub mod api;
pub mod client;
pub mod dispatch;
pub mod lifecycle;
pub mod setup;
pub mod summary;
pub mod triggers;

pub use api::{ApiResult, CacheFirstApi};
pub use client::{ApiClient, IngestDeps};
pub use dispatch::{ToolFuture, ToolHandler, ToolRegistry};
pub use lifecycle::{ClientBuilder, LifecycleController, LifecycleState, ToolRegistryBuilder};
pub use setup::{SetupCompletion, SetupStepHandler, SetupWizardEngine, WriteConfigCompletion};
pub use summary::SummaryScheduler;
pub use triggers::TriggerRegistry;
