//! Pipeline stages for image-to-build-plan generation.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the error taxonomy stays precise.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ request ──▶ backend ──▶ extract ──▶ validate
//! (path/URL) (resize)     (prompt)    (VLM)       (fences)    (schema)
//! ```
//!
//! 1. [`input`]    : read a local file or download a URL into memory
//! 2. [`normalize`]: decode, cap the longest edge, re-encode
//! 3. [`request`]  : assemble the transport-free [`request::GenerationRequest`]
//! 4. [`backend`]  : the only stage with network I/O; one call, no retries
//! 5. [`extract`]  : strip Markdown fences the model added anyway
//! 6. [`validate`] : parse JSON, then check it against the plan schema

pub mod backend;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod request;
pub mod validate;
