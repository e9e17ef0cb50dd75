//! Speech text preparation.
//!
//! Components:
//! - `lexicon`: fixed contraction, filler, pause-marker and pronunciation tables
//! - `optimizer`: the rewrite pipeline applied to assistant replies before TTS

pub mod lexicon;
pub mod optimizer;

pub use optimizer::{detect_language, Language, SpeechOptimizer};
