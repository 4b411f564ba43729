//! Fetch-cache-process-emit engine for the SOFA security-release feed pipeline.
//!
//! This crate has no binary entry point of its own; `sofa-cli`, `sofa-runner`,
//! and `sofa-admin` all drive it through [`orchestrator::Pipeline`]. Everything
//! below that is organized the way the design document's component list is:
//! a content-addressed cache, one module per source fetcher, and a chain of
//! pure functions (extractor -> kev_detector -> gdmf_merge ->
//! component_normalizer -> retention -> feed_assembler) that the orchestrator
//! composes stage by stage.

/// Scoped temp-file write helper shared by the Emit stage and the admin/CLI binaries.
pub mod atomic;
/// Content-addressed HTTP cache with conditional revalidation (§4.1).
pub mod cache;
/// Maps free-text Apple component names onto the fixed category taxonomy (§4.6).
pub mod component_normalizer;
/// Typed, layered configuration (§10.1).
pub mod config;
/// Error taxonomy shared by every stage (§7, §10.2).
pub mod error;
/// Parses cached HTML into canonical release facts (§4.3).
pub mod extractor;
/// Per-source fetchers sitting on top of the HTTP cache (§4.2).
pub mod fetch;
/// Assembles retained releases into v1/v2 feed documents (§4.8).
pub mod feed_assembler;
/// Folds Apple's GDMF asset manifest into a release's device/build facts (§4.5).
pub mod gdmf_merge;
/// CVE exploitation-signal detector and cross-platform enricher (§4.4).
pub mod kev_detector;
/// Three-stage Fetch/Process/Emit controller (§4.9).
pub mod orchestrator;
/// Resolves the on-disk data-root layout (§6).
pub mod paths;
/// Per-platform retention policy and explicit pinning (§4.7).
pub mod retention;
/// Decouples pipeline control flow from progress display (§10.3).
pub mod reporter;
/// RSS 2.0 view over the retained release list (§4.8).
pub mod rss;
