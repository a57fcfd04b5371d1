//! HostAudit - host security posture auditing
//!
//! Runs a catalog of compliance probes against the local machine, rolls
//! their outcomes into one severity-weighted score and renders text or
//! JSON reports.

pub mod config;
pub mod engine;
pub mod history;
pub mod models;
pub mod organizer;
pub mod probes;
pub mod reporters;
pub mod scoring;
