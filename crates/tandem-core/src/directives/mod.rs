//! Directives embedded in agent replies
//!
//! Agents steer shared state by writing marker sections in their free text:
//!
//! ```text
//! Here is my take on the login flow...
//!
//! SUMMARY_UPDATE:
//! Login page ships Friday; backend owns session storage.
//! ```
//!
//! Parsing never fails. A malformed payload is treated as no directive.
//! The task detector and sentiment scorer live alongside the parser.

mod parser;
mod signals;

pub use parser::{
    parse_directives, persona_update_from, section_after, summary_update_from, Directives,
    MEMORY_MARKER, PERSONA_MARKER, SUMMARY_MARKER,
};
pub use signals::{detect_task, score_sentiment, TASK_KEYWORDS};
