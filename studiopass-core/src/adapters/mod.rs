//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - HTTPS callable-functions client for the ServiceGateway port
//! - In-memory record store, auth, storage, and catalogs for demo mode
//!   and tests
//! - Scripted gateway for tests that need call recording and failure
//!   injection

pub mod callable;
pub mod gateway_mock;
pub mod memory;
