//! Evaluation of Java code fragments against a suspended debuggee.
//!
//! A fragment is parsed ([`parser`]), lowered to an evaluator tree with every
//! name resolved and every conversion explicit ([`builder`]), and evaluated
//! against a frame of a remote VM ([`evaluator`], [`remote`]). The [`api`]
//! module ties these together.

pub mod api;
pub mod builder;
pub mod casting;
pub mod evaluator;
pub mod parser;
pub mod remote;
pub mod scope_stack;
pub mod types;
pub mod values;
