//! Pipeline stages for capturing and publishing a clipboard image.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the external collaborators (helper process, object storage) sit
//! behind traits that tests can replace.
//!
//! ## Data Flow
//!
//! ```text
//! resolve ──▶ ensure ──▶ capture ──▶ publish
//! (path)      (mkdir)    (helper)    (upload)
//! ```
//!
//! 1. [`resolve`] — compute the image path from document, selection and the
//!    configured subdirectory (pure, synchronous)
//! 2. [`ensure`]  — create the image directory if it is missing (one level)
//! 3. [`capture`] — run the platform clipboard helper; the only stage that
//!    spawns a process
//! 4. [`publish`] — upload the image and return its public URL; the only
//!    stage with network I/O

pub mod capture;
pub mod ensure;
pub mod publish;
pub mod resolve;
