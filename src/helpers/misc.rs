use super::unknown_method;
use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, ErrorKind, State};
use serde::Serialize;
use std::sync::Arc;

/// `misc` namespace: formatting utilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Misc;

impl Misc {
    /// Serializes `value` as YAML without document delimiters or the trailing newline.
    pub fn yaml_string<T: Serialize>(&self, value: &T) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(value)?;
        let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
        let yaml = yaml.strip_suffix("...\n").unwrap_or(yaml);
        Ok(yaml.trim_end_matches('\n').to_string())
    }
}

impl Object for Misc {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "yaml_string" => {
                let (value,): (Value,) = from_args(args)?;
                self.yaml_string(&value).map(Value::from).map_err(|e| {
                    Error::new(ErrorKind::BadSerialization, "cannot serialize value as YAML")
                        .with_source(e)
                })
            }
            _ => Err(unknown_method("misc", method)),
        }
    }
}
