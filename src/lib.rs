//! Agency-client authorization core for the HireLink job portal.
//!
//! The crate owns the lifecycle of an agency's permission to post and manage
//! jobs on behalf of a client company: verification, client confirmation,
//! admin review, permission evaluation at job-mutation time, and the dual
//! attribution of a job to its hiring company and posting agency.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
