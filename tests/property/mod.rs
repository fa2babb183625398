//! Property-based tests for the hashing and transformation guarantees

mod determinism;
