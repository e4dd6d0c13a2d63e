//! `asyncapi-hoist` — post-bundle schema hoisting and reference
//! normalization for AsyncAPI documents whose external references have
//! already been resolved and inlined.
//!
//! See [`normalize`] for the main entry point and [`rewrite_channels`] for
//! the independent channel-ref pass.

mod alias_consolidator;
mod channel_rewriter;
mod collector;
mod discriminator;
mod emitter;
mod engine;
pub mod format;
mod fingerprint;
mod local_dereference;
mod metrics;
mod naming;
mod origin_lookup;
mod reference_rewriter;
mod registry;
mod schema_walker;

pub mod document;

pub use engine::{normalize, rewrite_channels};
pub use metrics::{ChannelRewriteStats, NormalizationStats, NormalizationWarning};
