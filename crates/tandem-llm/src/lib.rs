//! Tandem LLM - Completion Channel Abstraction
//!
//! This crate provides the completion channel used by every Tandem agent:
//! - Message: conversation turns (system / user / assistant)
//! - Completion: request and response types
//! - Provider: the `LlmProvider` trait each channel implements
//! - OpenAI-compatible: HTTP provider for any `/chat/completions` endpoint
//! - Mock: scripted provider for tests and offline development

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai_compat;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use provider::{LlmProvider, SharedProvider};
