//! dpx-cloud: Google Cloud collaborators for dpx
//!
//! Acquires an OAuth access token through the gcloud CLI and answers the
//! cluster, job and instance lookups the session needs over the Dataproc
//! and Compute Engine v1 REST APIs.

pub mod auth;
pub mod locator;

pub use auth::{credentials_file_notice, AccessToken, GcloudCredentials};
pub use locator::RestLocator;
