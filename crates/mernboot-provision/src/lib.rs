//! MERNBoot Atlas provisioning
//!
//! This crate drives the provisioning of a MongoDB Atlas backend for a
//! freshly generated MERN project: project, free-tier cluster, database user
//! and network access, followed by a readiness wait and the resolution of a
//! `MONGO_URI` connection string.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  MERNBoot CLI                    │
//! │            (mernboot atlas setup/url)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               mernboot-provision                 │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │              Pipeline                     │   │
//! │  │  Authenticate → ... → AwaitReady          │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐ ┌──────────────┐ ┌─────────┐  │
//! │  │ RecordStore  │ │    Poller    │ │Resolver │  │
//! │  └──────────────┘ └──────────────┘ └─────────┘  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait AtlasGateway { ... }               │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ mernboot-atlas│
//!           │  (atlas CLI)  │
//!           └───────────────┘
//! ```

pub mod error;
pub mod pipeline;
pub mod poller;
pub mod provider;
pub mod record;
pub mod resolver;
pub mod step;

#[cfg(test)]
mod testing;

// Re-exports
pub use error::{ProvisionError, Result};
pub use pipeline::{
    NoopObserver, Pipeline, PipelineObserver, PipelineOutcome, PipelineReport,
    ProvisioningRequest,
};
pub use poller::{PollPolicy, Readiness, await_ready, await_ready_with};
pub use provider::{AccessRule, AtlasGateway, ClusterSpec, ClusterStatus, DatabaseUser};
pub use record::{ProvisioningRecord, RecordStore};
pub use resolver::{
    ConnectionString, EnvFile, LOCAL_PLACEHOLDER_URI, MONGO_URI_KEY, NIL_SENTINEL, Resolution,
    build_connection_string, local_placeholder, merge_entry, parse_manual, resolve,
};
pub use step::{PipelineStep, StepOutcome};
