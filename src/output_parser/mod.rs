//! # Question Output Parser
//!
//! Turns an unstructured model response into validated [`Question`]s
//! without calling the model again.
//!
//! ```text
//! raw text ──► extract_json_array ──► sanitize ──► parse_questions ──► Vec<Question>
//!               (fence / bare / regex)  (commas,     (per-object, then
//!                                        newlines,    whole array)
//!                                        brackets)
//! ```
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`extract_json_array`] | Locate the candidate array in prose or fences |
//! | [`sanitize`] | Repair trailing commas, raw newlines, truncation |
//! | [`parse_questions`] | Tolerant two-pass decoding |
//! | [`questions_from_response`] | All three steps in order |
//! | [`repair_lenient`] | Second-chance rewrite of JSON-ish syntax |
//! | [`strip_think_tags`] | Remove `<think>` blocks |
//!
//! [`Question`]: crate::question::Question

pub mod extract;
pub mod lenient;
pub mod questions;
pub mod sanitize;
pub mod scan;

pub use extract::{extract_json_array, strip_think_tags};
pub use lenient::repair_lenient;
pub use questions::{parse_questions, questions_from_response, ParsedBatch};
pub use sanitize::sanitize;
