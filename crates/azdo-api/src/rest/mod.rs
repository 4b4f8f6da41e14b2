//! Client trait implementations for [`Connection`](crate::Connection).
//!
//! Each module maps one REST area onto its routes. Organization-scoped
//! routes live on the organization host; graph and identity routes on
//! the identity service host.

mod build;
mod feature;
mod git;
mod graph;
mod identity;
mod policy;
mod projects;
mod security;
mod wit;
