use std::path::{Component, Path, PathBuf};

/// Display helpers for paths that appear in logs and error messages.
pub trait PathDisplayExt {
    /// Canonical form when the path exists, otherwise a lexically normalized one.
    fn best_effort_display(&self) -> String;

    /// The `Normal` components of a relative path, or `None` when it climbs
    /// out with `..` or is rooted.
    fn normal_components(&self) -> Option<Vec<String>>;
}

impl PathDisplayExt for Path {
    fn best_effort_display(&self) -> String {
        match self.canonicalize() {
            Ok(canonical) => canonical.display().to_string(),
            Err(_) => lexically_normalized(self).display().to_string(),
        }
    }

    fn normal_components(&self) -> Option<Vec<String>> {
        let mut names = Vec::new();
        for component in self.components() {
            match component {
                Component::Normal(name) => names.push(name.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return None;
                }
            }
        }
        Some(names)
    }
}

fn lexically_normalized(path: &Path) -> PathBuf {
    let mut kept: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match kept.last() {
                Some(Component::Normal(_)) => {
                    kept.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => kept.push(component),
            },
            _ => kept.push(component),
        }
    }
    kept.iter().collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/does/not/exist/../here", "/does/not/here")]
    #[case("/does/./not/exist", "/does/not/exist")]
    #[case("/..", "/")]
    #[case("relative/../../up", "../up")]
    fn missing_paths_are_normalized(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Path::new(input).best_effort_display(), expected);
    }

    #[test]
    fn existing_paths_are_canonicalized() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();

        let shown = nested.join("..").join("a").best_effort_display();
        assert_eq!(shown, nested.canonicalize().unwrap().display().to_string());
    }

    #[rstest]
    #[case("src/lib.rs", Some(vec!["src", "lib.rs"]))]
    #[case("./src//lib.rs", Some(vec!["src", "lib.rs"]))]
    #[case("", Some(vec![]))]
    #[case("../outside", None)]
    #[case("/absolute", None)]
    fn normal_components_of_relative_paths(
        #[case] input: &str,
        #[case] expected: Option<Vec<&str>>,
    ) {
        let expected =
            expected.map(|names| names.into_iter().map(str::to_string).collect::<Vec<_>>());
        assert_eq!(Path::new(input).normal_components(), expected);
    }
}
