use super::{no_args, unknown_method, words};
use crate::config::Configuration;
use minijinja::value::{from_args, Kwargs, Object, Value};
use minijinja::{Error, State};
use std::sync::Arc;

/// Prefix used for apt commands unless `apt.command_prefix` overrides it
pub const DEFAULT_APT_PREFIX: &str = "DEBIAN_FRONTEND=noninteractive";

/// `apt` namespace: emits `RUN` lines driving apt-get and dpkg.
#[derive(Debug, Clone)]
pub struct Apt {
    command_prefix: String,
}

impl Apt {
    pub fn new(command_prefix: impl Into<String>) -> Self {
        Self { command_prefix: command_prefix.into() }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.lookup_str("apt.command_prefix", DEFAULT_APT_PREFIX))
    }

    fn run<I, S>(&self, words: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = vec!["RUN".to_string()];
        if !self.command_prefix.is_empty() {
            line.push(self.command_prefix.clone());
        }
        line.extend(words.into_iter().map(|w| w.as_ref().to_string()));
        line.join(" ")
    }

    pub fn update(&self) -> String {
        self.run(["apt-get update"])
    }

    pub fn install(
        &self,
        packages: &[String],
        options: &[String],
        recommends: bool,
        suggests: bool,
    ) -> String {
        let mut words = vec!["apt-get install -y".to_string()];
        if !suggests {
            words.push("--no-install-suggests".to_string());
        }
        if !recommends {
            words.push("--no-install-recommends".to_string());
        }
        words.extend(options.iter().cloned());
        words.extend(packages.iter().cloned());
        self.run(words)
    }

    pub fn reconfigure(&self, package: &str) -> String {
        self.run(["dpkg-reconfigure", package])
    }
}

impl Object for Apt {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "update" => {
                no_args(method, args)?;
                Ok(Value::from(self.update()))
            }
            // apt.install(packages, options=..., recommends=true, suggests=true)
            "install" => {
                let (packages, kwargs): (Value, Kwargs) = from_args(args)?;
                let options = kwargs
                    .get::<Option<Value>>("options")?
                    .unwrap_or(Value::UNDEFINED);
                let recommends = kwargs.get::<Option<bool>>("recommends")?.unwrap_or(true);
                let suggests = kwargs.get::<Option<bool>>("suggests")?.unwrap_or(true);
                kwargs.assert_all_used()?;
                Ok(Value::from(self.install(
                    &words(&packages)?,
                    &words(&options)?,
                    recommends,
                    suggests,
                )))
            }
            "reconfigure" => {
                let (package,): (String,) = from_args(args)?;
                Ok(Value::from(self.reconfigure(&package)))
            }
            _ => Err(unknown_method("apt", method)),
        }
    }
}
