//! Helper namespaces exposed to templates.
//!
//! The set is fixed: `apt`, `git`, `docker` and `misc`. Each namespace is
//! instantiated per render call, bound to the effective configuration and
//! the template being rendered.

mod apt;
mod docker;
mod git;
mod misc;

pub use apt::{Apt, DEFAULT_APT_PREFIX};
pub use docker::Docker;
pub use git::Git;
pub use misc::Misc;

use crate::renderer::RenderFrame;
use minijinja::value::Value;
use minijinja::{Error, ErrorKind};

/// The helper namespaces available to every template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    Apt,
    Git,
    Docker,
    Misc,
}

impl HelperKind {
    pub const ALL: [HelperKind; 4] =
        [HelperKind::Apt, HelperKind::Git, HelperKind::Docker, HelperKind::Misc];

    /// Name under which the namespace is visible in templates.
    pub fn name(self) -> &'static str {
        match self {
            HelperKind::Apt => "apt",
            HelperKind::Git => "git",
            HelperKind::Docker => "docker",
            HelperKind::Misc => "misc",
        }
    }

    fn bind(self, frame: &RenderFrame) -> Value {
        match self {
            HelperKind::Apt => Value::from_object(Apt::from_config(frame.config())),
            HelperKind::Git => Value::from_object(Git),
            HelperKind::Docker => Value::from_object(Docker::new(frame.clone())),
            HelperKind::Misc => Value::from_object(Misc),
        }
    }
}

/// Instantiates the helper namespaces for one render call.
pub struct HelperRegistry;

impl HelperRegistry {
    pub fn bind(frame: &RenderFrame) -> Vec<(&'static str, Value)> {
        HelperKind::ALL
            .iter()
            .map(|kind| (kind.name(), kind.bind(frame)))
            .collect()
    }
}

/// Accepts a single string or a sequence of values as a list of words.
fn words(value: &Value) -> Result<Vec<String>, Error> {
    if value.is_undefined() || value.is_none() {
        return Ok(Vec::new());
    }
    if let Some(s) = value.as_str() {
        return Ok(vec![s.to_string()]);
    }
    Ok(value.try_iter()?.map(|item| item.to_string()).collect())
}

fn no_args(method: &str, args: &[Value]) -> Result<(), Error> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::TooManyArguments,
            format!("{}() takes no arguments", method),
        ))
    }
}

fn unknown_method(namespace: &str, method: &str) -> Error {
    Error::new(
        ErrorKind::UnknownMethod,
        format!("{} has no method named {}", namespace, method),
    )
}
