#![cfg_attr(not(test), deny(unsafe_code))]

//! Display side of the incremental chat pipeline: stabilize a truncated
//! markdown buffer so it is safe to render mid-stream, and turn markdown
//! into HTML with highlighted, copyable code blocks.

pub mod render;
pub mod stabilize;

pub use render::{MarkdownRenderer, block_id};
pub use stabilize::stabilize;
