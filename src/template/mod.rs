//! Query template subsystem.
//!
//! # Data Flow
//! ```text
//! "SELECT * FROM t WHERE id = :{Int}params.id:"
//!     → parser.rs (find references, resolve against RequestContext)
//!     → QueryDescriptor { text: "... id = ?v1?", values: [7], metadata: [Int] }
//!     → executor placeholders (?v1? → $1 / ? / @v1)
//! ```
//!
//! # Design Decisions
//! - Descriptors are built per request and never cached
//! - Placeholder tokens are backend neutral; each adapter rewrites them
//! - Every occurrence is a separate position, even for the same reference

pub mod parser;

pub use parser::{parse, placeholder, TemplateError};

/// Optional type annotation of a reference: `{NVarChar(50)}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMeta {
    /// Type name, e.g. `NVarChar`.
    pub ty: Option<String>,
    /// Parenthesised arguments; `None` when no parentheses were written.
    pub type_args: Option<Vec<u32>>,
}

/// A template rewritten for execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    /// Template text with every reference replaced by `?vN?` (1-based).
    pub text: String,
    /// Resolved values, in template order.
    pub values: Vec<serde_json::Value>,
    /// One entry per value.
    pub metadata: Vec<ParamMeta>,
}
