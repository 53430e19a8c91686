//! Expansion and normalization of configured paths.
//!
//! Settings may refer to well-known directories as `${home}`, `${config}`,
//! `${data}` and `${temp}`, and may start with `~`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Named values substituted into `${name}` placeholders
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    /// Variables for the current user's standard directories
    pub fn from_env() -> Self {
        let mut vars = Self::default();
        let known = [
            ("home", dirs::home_dir()),
            ("config", dirs::config_dir()),
            ("data", dirs::data_dir()),
            ("temp", Some(std::env::temp_dir())),
        ];
        for (name, dir) in known {
            match dir {
                Some(dir) => vars.set(name, dir.to_string_lossy()),
                None => {}
            }
        }
        vars
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every `${name}` with its value. Unknown names are left as written.
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("${");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Expand ~ to home directory
pub fn expand_tilde(path_str: &str) -> PathBuf {
    match path_str.starts_with('~') {
        true => match dirs::home_dir() {
            Some(home) => match path_str {
                "~" => home,
                _ => match path_str.strip_prefix("~/") {
                    Some(rest) => home.join(rest),
                    None => PathBuf::from(path_str),
                },
            },
            None => PathBuf::from(path_str),
        },
        false => PathBuf::from(path_str),
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    match parts.is_empty() {
        true => PathBuf::from("."),
        false => parts.iter().collect(),
    }
}

/// Make `path` absolute against the current directory and normalize it.
/// Falls back to the plain normalized path when there is no usable
/// current directory.
pub fn absolute(path: &Path) -> PathBuf {
    match std::path::absolute(path) {
        Ok(abs) => normalize(&abs),
        Err(_) => normalize(path),
    }
}

/// Expand variables and `~`, then make absolute and normalize
pub fn resolve(raw: &str, vars: &Variables) -> PathBuf {
    absolute(&expand_tilde(&vars.expand(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_known_variable() {
        let vars = Variables::default().with("data", "/srv/data");
        assert_eq!(vars.expand("${data}/anonfile"), "/srv/data/anonfile");
    }

    #[test]
    fn test_expand_unknown_variable_left_alone() {
        let vars = Variables::default();
        assert_eq!(vars.expand("${nope}/x"), "${nope}/x");
        assert_eq!(vars.expand("open ${brace"), "open ${brace");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c/")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve_combines_steps() {
        let vars = Variables::default().with("temp", "/tmp");
        assert_eq!(resolve("${temp}/x/../scratch", &vars), PathBuf::from("/tmp/scratch"));
    }

    #[test]
    fn test_resolve_relative_becomes_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let resolved = resolve("scratch/../notes", &Variables::default());
        assert!(resolved.is_absolute());
        assert_eq!(resolved, normalize(&cwd.join("notes")));
    }
}
