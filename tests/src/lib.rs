//! # Payment Gateway Test Suite
//!
//! Cross-crate tests for the validation engine, run against the in-memory
//! broker and cache.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs     # Gateway + scripted backend fixtures
//!     ├── scenarios.rs   # Merchant and role validation outcomes
//!     ├── properties.rs  # Concurrency, cache and timing properties
//!     ├── startup.rs     # Fail-fast startup and consumer groups
//!     └── http.rs        # Full router through the runtime crate
//! tests/benches/
//! └── validation_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pg-gateway-tests
//! cargo test -p pg-gateway-tests integration::properties::
//! cargo bench -p pg-gateway-tests
//! ```
