//! Typed async client for the EventHorizon control-plane API.
//!
//! The crate covers the full `/v1` surface: tenants, environments, runners
//! and their queues and tokens, GitHub connections, workstreams, tasks and
//! turns with streaming logs, authorization policies, and feature flags.
//! Requests are validated locally, sent through a single pipeline with
//! pluggable authentication, and decoded into typed responses or rich error
//! values. A background [`uploader::LogUploader`] batches turn logs by
//! count, bytes, and age.
//!
//! ```no_run
//! use eventhorizon_client::{Client, ClientConfig};
//! use eventhorizon_client::client::tenants::GetTenantRequest;
//!
//! # async fn demo() -> Result<(), eventhorizon_client::Error> {
//! let client = Client::new(ClientConfig::new("https://api.eventhorizon.example"))?;
//! let tenant = client
//!     .get_tenant(&GetTenantRequest {
//!         tenant_id: "acme".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", tenant.name);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod bits;
pub mod client;
pub mod error;
pub mod paths;
pub mod patch;
pub mod policy;
pub mod types;
pub mod uploader;

pub use client::{Client, ClientConfig};
pub use error::{CurrentObject, Error, ObjectType};
pub use patch::{Patch, RequestFields};
pub use types::{FeatureFlags, LogRecord, Page};
pub use uploader::{LogSink, LogUploader, LogUploaderOptions, TurnRoute};
