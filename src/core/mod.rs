// src/core/mod.rs

/// Targets, categories, outcomes and the frozen session report.
pub mod models;

pub mod error;

/// Bounded-concurrency execution of probe batches.
pub mod dispatcher;

/// Turns an outcome stream into a category report.
pub mod collector;

pub mod deadline;

/// Static lookup tables: ports, blacklist zones, reference headers, user agents.
pub mod knowledge_base;

/// The probe sets and the session orchestration built on top of them.
pub mod scanner;
