//! End-to-end tests that exercise the governance kernel the way a real
//! boot would: a genome file on disk, a `KernelContext` bootstrapped
//! from it, several requests pushed through `governed()`, and the
//! resulting audit log read back and verified.
//!
//! Per-crate unit tests cover each stage in isolation; this crate covers
//! the cross-cutting scenarios from spec.md §8 that only show up once
//! the pieces are wired together: genome-id stability under key
//! reordering (S1), threshold counting with duplicate signers (S6),
//! proof tamper detection at the end of a real pipeline run (S5), and
//! audit-chain integrity across a mixed allow/deny session.
