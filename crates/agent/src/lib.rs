//! Relay runtime: decides whether an inbound chat message gets an answer,
//! asks the completion backend for it and hands the reply to a transport.
//!
//! # Flow
//!
//! Every inbound event runs the same straight-line pipeline in
//! [`runtime::AgentRuntime::handle`]:
//! 1. **Routing** (`chatrelay_core::routing`) - pick the trigger text or ignore
//! 2. **Guardrails** (`guardrails`) - canned answers that skip the backend
//! 3. **Admission** (`chatrelay_core::admission`) - per-user sliding window
//! 4. **Completion** (`llm`) - bounded history plus system prompt, hard timeout
//! 5. **Reply** (`sink`) - delivery through the transport, never retried
//!
//! Failures of one event never leak into another: the backend failure is
//! folded into a fixed apology and delivery errors are only logged.

pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod sink;

pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{
    BackendError, CompletionBackend, CompletionClient, CompletionRequest, CompletionSettings,
    OpenAiBackend,
};
pub use runtime::{AgentRuntime, ReplyOutcome, ReplyTexts};
pub use sink::{ReplySink, SentMessage};
