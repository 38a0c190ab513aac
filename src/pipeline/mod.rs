//! Pipeline stages for statement extraction.
//!
//! Each submodule implements one step, so each can be tested alone and the
//! rendering engine or model backend can change without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm
//! (intake)  (pdfium)   (JPEG)     (request + parse)
//! ```
//!
//! 1. [`input`] : the upload and its declared-type gate
//! 2. [`render`]: rasterise every page; runs in `spawn_blocking` because
//!    pdfium blocks and is not `Send`
//! 3. [`encode`]: JPEG-encode and base64-wrap each page image
//! 4. [`llm`]   : build the one model request; parse and validate the answer

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
