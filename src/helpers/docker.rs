use super::{no_args, unknown_method};
use crate::config::string_list;
use crate::renderer::{callback_error, RenderFrame};
use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, State};
use std::sync::Arc;

/// `docker` namespace: emits Dockerfile instructions.
#[derive(Debug, Clone)]
pub struct Docker {
    frame: RenderFrame,
}

impl Docker {
    pub fn new(frame: RenderFrame) -> Self {
        Self { frame }
    }

    /// One `EXPOSE` line per entry of the configured `ports`.
    pub fn ports(&self) -> crate::error::Result<String> {
        let ports = string_list(self.frame.config().get("ports"), "ports")?;
        Ok(ports
            .iter()
            .map(|port| format!("EXPOSE {}", port))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Renders `file` into the output directory now and returns the `COPY`
    /// instruction placing it at `dest`.
    pub fn copy_tmpl(&self, file: &str, dest: &str) -> crate::error::Result<String> {
        let name = self.frame.stage_template(file)?;
        Ok(format!("COPY {} {}", name, dest))
    }
}

impl Object for Docker {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "ports" => {
                no_args(method, args)?;
                self.ports()
                    .map(Value::from)
                    .map_err(|e| callback_error("docker.ports failed", e))
            }
            "copy_tmpl" => {
                let (file, dest): (String, String) = from_args(args)?;
                self.copy_tmpl(&file, &dest)
                    .map(Value::from)
                    .map_err(|e| callback_error("docker.copy_tmpl failed", e))
            }
            _ => Err(unknown_method("docker", method)),
        }
    }
}
