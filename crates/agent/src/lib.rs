//! Agent runtime: the model-facing half of steward.
//!
//! This crate turns an acquired message into an analysis and drives it through its lifecycle:
//! - `tools` exposes the pure skills from `steward-core` to the model under stable names
//! - `brain` runs the bounded reasoning loop against an `LlmClient`
//! - `openrouter` is the OpenAI-compatible HTTP backend
//! - `runtime` coordinates NEW → ANALYZED → RESOLVED for one message at a time
//!
//! # Safety Principle
//!
//! The model only chooses which skills to run. Every field of the analysis comes from a
//! deterministic skill or a fixed fallback, and nothing is executed without an approval
//! decision from the configured surface.

pub mod brain;
pub mod conversation;
pub mod llm;
pub mod openrouter;
pub mod prompts;
pub mod runtime;
pub mod tools;

pub use brain::{LoopOutcome, ReasoningLoop, StopReason, ToolCallRecord};
pub use conversation::{ChatMessage, ChatRole, Conversation, ToolCallRequest};
pub use llm::{LlmClient, ModelRequest, ModelTurn, ScriptedModel, ScriptedTurn, SkillSweep};
pub use openrouter::OpenAiCompatibleClient;
pub use runtime::{MessageCoordinator, ProcessedMessage, ResolvedMessage};
pub use tools::{Tool, ToolRegistry, ToolSpec};
