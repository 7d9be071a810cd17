//! Tera rendering engine for task documents.
//!
//! The embedded `task.md.tera` can be overridden by dropping a file with the
//! same name into `<root>/templates/`. An override must keep the four
//! repository information fields, because the scheduler reads them back via
//! [`crate::parse_artifact`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::TaskContext;
use crate::error::RenderError;

/// Name of the task document template.
pub const TASK_TEMPLATE: &str = "task.md.tera";

// Baked into the binary at compile time.
const TPLS: &[(&str, &str)] = &[(TASK_TEMPLATE, include_str!("templates/task.md.tera"))];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

// Template sources only; rendered guide and task text is left as written.
fn normalize_line_endings(source: &str) -> String {
    source.replace("\r\n", "\n")
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            normalize_line_endings(content),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, normalize_line_endings(&content));
        }
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for task documents with optional user overrides.
///
/// Create once per run and reuse for every job.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Embedded templates plus any `.tera` overrides in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render the task document for `ctx`.
    pub fn render(&self, ctx: &TaskContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self.tera.render(TASK_TEMPLATE, &tera_ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
