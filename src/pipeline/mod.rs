//! The shared fetch → parse → filter → classify → dedupe → merge pipeline.
//!
//! # Stages
//!
//! | Stage | Module | Notes |
//! |-------|--------|-------|
//! | Relevance | [`filter`] | Case-insensitive substring test on title + abstract |
//! | Category | [`classify`] | Recognition terms first, then generation, default Recognition |
//! | Identity | [`dedupe`] | First record per `id` wins, no field merging |
//! | Orchestration | [`aggregate`] | Per-source isolation, merge, sort, split |
//!
//! Sources themselves live in [`crate::scrapers`]; the aggregator only sees
//! them through the [`crate::scrapers::PaperSource`] trait.

pub mod aggregate;
pub mod classify;
pub mod dedupe;
pub mod filter;
