//! Read-only client of a [MLflow](https://mlflow.org) tracking server.
//!
//! [`MlflowTrackingClient`] implements [`TrackingSource`](mlflow_audit_core::TrackingSource)
//! on top of the REST API, so the audit pipeline can walk the experiments, runs, metric
//! histories, artifacts and registered models of a server:
//!
//! ```no_run
//! use anyhow::Result;
//! use mlflow_audit_core::{AuditConfig, ExperimentSweep};
//! use mlflow_audit_tracking::{MlflowTrackingClient, TrackingSettings};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     env_logger::init();
//!
//!     let settings = TrackingSettings::from_env()?;
//!     let client = MlflowTrackingClient::from_settings(&settings, Duration::from_secs(30))?;
//!     let sweep = ExperimentSweep::new(&client, &AuditConfig::default()).run()?;
//!     println!("{} runs", sweep.records.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! Every listing endpoint is paginated; the client follows `next_page_token` until the last page.
mod artifact;
mod client;
mod experiment;
mod model_registry;
mod run;
mod settings;
pub use client::MlflowTrackingClient;
pub use settings::{
    TrackingSettings, TRACKING_PASSWORD_ENV, TRACKING_URI_ENV, TRACKING_USERNAME_ENV,
};
