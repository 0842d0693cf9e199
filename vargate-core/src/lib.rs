// vargate-core/src/lib.rs

#![allow(missing_docs)]
// 1. Memory safety
#![deny(unsafe_code)]
// 2. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 3. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contract every warehouse engine adapter fulfils.
pub mod ports;

// 2. Domain (business core)
// Statement guard, authorizer policy, lineage DAG, confidence, evaluation.
// Depends on nothing else in the crate (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// SQLite / DuckDB read-only connections, settings, catalogs, Jinja.
pub mod infrastructure;

// 4. Application (Use Cases)
// Query executor, template registry, lineage report, run session.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::VargateError;
