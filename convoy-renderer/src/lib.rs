//! # convoy-renderer
//!
//! Tera-based rendering of task documents, and the parser that reads their
//! repository information back.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use convoy_core::Job;
//! use convoy_renderer::{parse_document, TaskContext, TemplateEngine};
//!
//! fn render_one(job: &Job) {
//!     let engine = TemplateEngine::new(None).expect("embedded templates");
//!     let ctx = TaskContext::new("001_svc_main", 1, job, Path::new("/w/svc"), "guide", "task");
//!     let doc = engine.render(&ctx).expect("render");
//!     let parsed = parse_document("001_svc_main", &doc).expect("parse");
//!     assert_eq!(&parsed.job, job);
//! }
//! ```

pub mod artifact;
pub mod context;
pub mod engine;
pub mod error;

pub use artifact::{parse_artifact, parse_document, sequence_of, ParsedDocument};
pub use context::TaskContext;
pub use engine::{TemplateEngine, TASK_TEMPLATE};
pub use error::RenderError;
