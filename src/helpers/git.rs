use super::unknown_method;
use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, State};
use std::sync::Arc;

/// `git` namespace: emits `RUN` lines that fetch sources at build time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl Git {
    /// Clones `repo` into `path` unless `path` already exists, then checks out
    /// `revision` when one is given.
    pub fn import_or_clone(&self, path: &str, repo: &str, revision: Option<&str>) -> String {
        let clone = format!("git clone '{}' '{}'", repo, path);
        let fetch = match revision {
            Some(revision) => format!("({} && git -C '{}' checkout '{}')", clone, path, revision),
            None => clone,
        };
        format!("RUN bash -c \"[ -d '{}' ] || {}\"", path, fetch)
    }
}

impl Object for Git {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            // git.import_or_clone(path, repo[, revision])
            "import_or_clone" => {
                let (path, repo, revision): (String, String, Option<String>) = from_args(args)?;
                Ok(Value::from(self.import_or_clone(&path, &repo, revision.as_deref())))
            }
            _ => Err(unknown_method("git", method)),
        }
    }
}
