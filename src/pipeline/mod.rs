//! External-boundary pipeline stages.
//!
//! Each submodule implements exactly one transformation step ahead of the
//! parse/classify/match/merge core. Keeping stages separate makes each
//! independently testable and lets us swap implementations (e.g. switch the
//! rendering backend, or inject a fake model) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm
//! (URL/path)  (pdfium)  (base64)  (vision model)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`] — rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] — PNG-encode and base64-wrap each `DynamicImage` for the
//!    multimodal API request body
//! 4. [`llm`]    — drive the model call with retry/backoff; the only stage
//!    with network I/O. Per-page failures surface as empty transcripts.
//!
//! Everything after this point (`parse` onward) is deterministic and
//! synchronous.

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
