use std::path::Path;

/// Error from path normalization or expansion.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing to normalize.
    #[error("path is empty")]
    Empty,
    /// `$HOME` is not set but is required to expand `~` in a path.
    #[error("$HOME not set, cannot expand '~' in path: {0}")]
    HomeNotSet(String),
    /// Installation paths are never resolved against a working directory.
    #[error("path must be absolute: {0}")]
    Relative(String),
}

/// A normalized absolute file path.
///
/// Tilde expanded, `..` and `.` components collapsed (logical, no
/// filesystem access), duplicate and trailing separators removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath(pub(crate) String);

impl NormalizedPath {
    /// Normalize an installation path.
    ///
    /// Steps:
    /// 1. Expand leading `~` to `$HOME`
    /// 2. Reject relative paths
    /// 3. Collapse `..` and `.` components logically
    /// 4. Collapse duplicate `/` separators and remove trailing `/`
    pub fn new(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let path = if let Some(rest) = raw.strip_prefix('~') {
            if !(rest.is_empty() || rest.starts_with('/')) {
                // `~user` forms need a passwd lookup
                return Err(PathError::Relative(raw.to_string()));
            }
            let home = std::env::var("HOME").map_err(|_| PathError::HomeNotSet(raw.to_string()))?;
            format!("{home}{rest}")
        } else {
            raw.to_string()
        };

        if !path.starts_with('/') {
            return Err(PathError::Relative(raw.to_string()));
        }

        let mut components: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                other => components.push(other),
            }
        }

        let result = if components.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", components.join("/"))
        };

        Ok(NormalizedPath(result))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Whether `self` lies strictly below `folder`.
    pub fn is_inside(&self, folder: &NormalizedPath) -> bool {
        if folder.0 == "/" {
            return self.0 != "/";
        }
        self.0
            .strip_prefix(&folder.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for NormalizedPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> String {
        std::env::var("HOME").unwrap()
    }

    #[test]
    fn new_absolute_path_unchanged() {
        assert_eq!(
            NormalizedPath::new("/var/lib/sigmadsp").unwrap().as_str(),
            "/var/lib/sigmadsp"
        );
    }

    #[test]
    fn new_relative_path_rejected() {
        assert_eq!(
            NormalizedPath::new("var/lib").unwrap_err(),
            PathError::Relative("var/lib".into())
        );
    }

    #[test]
    fn new_empty_path_rejected() {
        assert_eq!(NormalizedPath::new("  ").unwrap_err(), PathError::Empty);
    }

    #[test]
    fn new_tilde_expands_home() {
        let h = home();
        assert_eq!(
            NormalizedPath::new("~/sigmadsp_temp").unwrap().as_str(),
            NormalizedPath::new(&format!("{h}/sigmadsp_temp"))
                .unwrap()
                .as_str()
        );
    }

    #[test]
    fn new_tilde_user_rejected() {
        assert!(matches!(
            NormalizedPath::new("~pi/temp"),
            Err(PathError::Relative(_))
        ));
    }

    #[test]
    fn new_dotdot_collapses() {
        assert_eq!(
            NormalizedPath::new("/var/lib/../tmp/./sigmadsp")
                .unwrap()
                .as_str(),
            "/var/tmp/sigmadsp"
        );
    }

    #[test]
    fn new_duplicate_and_trailing_slashes_removed() {
        assert_eq!(
            NormalizedPath::new("/var//lib///sigmadsp/").unwrap().as_str(),
            "/var/lib/sigmadsp"
        );
    }

    #[test]
    fn new_root_stays_root() {
        assert_eq!(NormalizedPath::new("/").unwrap().as_str(), "/");
    }

    #[test]
    fn is_inside_requires_separator_boundary() {
        let folder = NormalizedPath::new("/var/lib/sigmadsp").unwrap();
        let inside = NormalizedPath::new("/var/lib/sigmadsp/config.kdl").unwrap();
        let sibling = NormalizedPath::new("/var/lib/sigmadsp2/config.kdl").unwrap();
        assert!(inside.is_inside(&folder));
        assert!(!sibling.is_inside(&folder));
        assert!(!folder.is_inside(&folder));
    }
}
