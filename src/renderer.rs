//! Template rendering for dockergen.
//! Renders one template file at a time against a directory's effective
//! configuration and the helper namespaces, resolving `import` calls
//! recursively through an explicit stack of [`RenderFrame`]s.

use crate::config::{strip_template_suffix, Configuration};
use crate::error::{Error, Result};
use crate::helpers::HelperRegistry;
use crate::processor::write_file;
use log::{debug, info};
use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, ErrorKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// MiniJinja-based template engine.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    /// MiniJinja environment instance
    env: Environment<'static>,
    /// Template suffix without the leading dot
    suffix: String,
}

impl TemplateEngine {
    /// Creates an engine for templates ending in `.<suffix>`.
    pub fn new(suffix: impl Into<String>) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env, suffix: suffix.into() }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Renders `template` against `config`.
    ///
    /// Files staged by helpers during rendering (`docker.copy_tmpl`) are
    /// written under `output_dir`.
    ///
    /// # Errors
    /// * `Error::IoError` if the template cannot be read
    /// * `Error::ImportCycle` if the template imports itself transitively
    /// * `Error::TemplateError` for any other evaluation failure
    pub fn render_file(
        self: &Arc<Self>,
        template: &Path,
        config: &Arc<Configuration>,
        output_dir: &Path,
    ) -> Result<String> {
        RenderFrame::new(Arc::clone(self), Arc::clone(config), template, output_dir)?.render()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        TemplateEngine::new(crate::constants::DEFAULT_TEMPLATE_SUFFIX)
    }
}

/// One level of the render stack.
///
/// A frame is immutable: entering an import or a staged template produces a
/// new frame with the entered path pushed onto `active`.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    engine: Arc<TemplateEngine>,
    config: Arc<Configuration>,
    output_dir: PathBuf,
    /// Template the helper namespaces are bound to
    helper_template: PathBuf,
    /// Template currently rendering
    template: PathBuf,
    /// Canonical paths of the templates being rendered, outermost first
    active: Vec<PathBuf>,
}

impl RenderFrame {
    pub fn new(
        engine: Arc<TemplateEngine>,
        config: Arc<Configuration>,
        template: &Path,
        output_dir: &Path,
    ) -> Result<Self> {
        let key = fs::canonicalize(template)?;
        Ok(Self {
            engine,
            config,
            output_dir: output_dir.to_path_buf(),
            helper_template: template.to_path_buf(),
            template: template.to_path_buf(),
            active: vec![key],
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn suffix(&self) -> &str {
        self.engine.suffix()
    }

    fn enter(&self, template: &Path, rebind_helpers: bool) -> Result<Self> {
        let key = fs::canonicalize(template)?;
        if self.active.contains(&key) {
            let mut chain = self.active.clone();
            chain.push(key);
            return Err(Error::ImportCycle { path: template.to_path_buf(), chain });
        }
        let mut active = self.active.clone();
        active.push(key);
        Ok(Self {
            engine: Arc::clone(&self.engine),
            config: Arc::clone(&self.config),
            output_dir: self.output_dir.clone(),
            helper_template: if rebind_helpers {
                template.to_path_buf()
            } else {
                self.helper_template.clone()
            },
            template: template.to_path_buf(),
            active,
        })
    }

    fn dir_of(path: &Path) -> &Path {
        path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Renders the frame's template.
    pub fn render(&self) -> Result<String> {
        debug!("Rendering {}", self.template.display());
        let source = fs::read_to_string(&self.template)?;
        let name = self.template.display().to_string();
        self.engine
            .env
            .render_named_str(&name, &source, self.context())
            .map_err(Error::from_render)
    }

    /// Renders `relative` (resolved against the directory of the template
    /// currently rendering) with the same configuration and helper bindings,
    /// wrapped in start/end marker lines naming the resolved path.
    pub fn import(&self, relative: &str) -> Result<String> {
        let path = Self::dir_of(&self.template).join(relative);
        info!("  => {}", path.display());
        let rendered = self.enter(&path, false)?.render()?;
        let body = rendered.strip_suffix('\n').unwrap_or(&rendered);
        Ok(format!(
            "##### start: {path} #####\n{body}\n##### end: {path} #####",
            path = path.display(),
            body = body
        ))
    }

    /// Renders `relative` (resolved against the directory of the template the
    /// helpers are bound to) and writes it into the output directory under its
    /// name minus the template suffix. Returns that name.
    pub fn stage_template(&self, relative: &str) -> Result<String> {
        let source = Self::dir_of(&self.helper_template).join(relative);
        let file_name = source
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| Error::TemplateError(format!("invalid template path '{}'", relative)))?;
        let name = strip_template_suffix(&file_name, self.suffix());
        let target = self.output_dir.join(&name);

        let content = self.enter(&source, true)?.render()?;
        write_file(&target, &content)?;
        println!("Rendered: '{}'", target.display());
        Ok(name.display().to_string())
    }

    fn context(&self) -> Value {
        let mut ctx: BTreeMap<String, Value> = self
            .config
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
            .collect();
        ctx.insert("config".to_string(), Value::from_serialize(&*self.config));

        let config = Arc::clone(&self.config);
        ctx.insert(
            "lookup".to_string(),
            Value::from_function(move |key_path: String| -> Value {
                config
                    .lookup(&key_path)
                    .map(Value::from_serialize)
                    .unwrap_or(Value::UNDEFINED)
            }),
        );

        let frame = self.clone();
        ctx.insert(
            "import".to_string(),
            Value::from_function(
                move |relative: String| -> std::result::Result<String, minijinja::Error> {
                    frame.import(&relative).map_err(|e| callback_error("import failed", e))
                },
            ),
        );

        for (name, helper) in HelperRegistry::bind(self) {
            ctx.insert(name.to_string(), helper);
        }
        Value::from(ctx)
    }
}

/// Wraps a dockergen error raised inside a template callback so that it
/// survives as the source of the resulting minijinja error.
pub(crate) fn callback_error(context: &str, err: Error) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, context.to_string()).with_source(err)
}
