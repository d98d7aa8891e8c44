use std::path::{Component, Path};

/// Name based ignore rules shared by the scanner, the tree and the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreFilter {
    suffixes: Vec<String>,
    directories: Vec<String>,
}

impl IgnoreFilter {
    pub fn new<S, D>(
        suffixes: impl IntoIterator<Item = S>,
        directories: impl IntoIterator<Item = D>,
    ) -> Self
    where
        S: Into<String>,
        D: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|suffix| {
                    let suffix: String = suffix.into();
                    suffix.trim_start_matches('.').to_string()
                })
                .filter(|suffix| !suffix.is_empty())
                .collect(),
            directories: directories.into_iter().map(Into::into).collect(),
        }
    }

    /// True when `name` ends in `.<suffix>` for one of the ignored suffixes.
    pub fn is_suffix_filtered(&self, name: &str) -> bool {
        self.suffixes.iter().any(|suffix| {
            name.strip_suffix(suffix.as_str())
                .is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
        })
    }

    pub fn is_directory_filtered(&self, name: &str) -> bool {
        self.directories.iter().any(|dir| dir == name)
    }

    /// Checks every component of `path` against the directory rules and the
    /// final one against the suffix rules.
    pub fn is_filtered(&self, path: &Path) -> bool {
        let names: Vec<_> = path
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect();

        if names.iter().any(|name| self.is_directory_filtered(name)) {
            return true;
        }
        names
            .last()
            .is_some_and(|name| self.is_suffix_filtered(name))
    }
}
