//! Relative asset paths that cannot escape the save directory.

use std::fmt;

/// Errors related to asset path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component is not allowed.
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
    /// The path string is invalid as a whole.
    InvalidPath { message: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidComponent {
                component,
                position,
                message,
            } => {
                write!(
                    f,
                    "invalid path component '{}' at position {}: {}",
                    component, position, message
                )
            }
            PathError::InvalidPath { message } => {
                write!(f, "invalid path: {}", message)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A validated relative path to a file or folder under the save directory.
///
/// Components are separated by `/`. Paths coming from the server (an
/// inventory `local_path`) go through the same validation as local ones,
/// so `..`, absolute paths and backslashes are rejected everywhere.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AssetPath {
    components: Vec<String>,
}

impl AssetPath {
    /// Parse a path string, validating components.
    ///
    /// - Components are separated by `/`
    /// - Empty components are ignored (normalizes `//` and trailing `/`)
    /// - A leading `/` makes the path absolute and is rejected
    ///
    /// ```rust
    /// use cloudsync::AssetPath;
    ///
    /// let path = AssetPath::parse("assets/entities/ddnet.png").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path.extension().as_deref(), Some("png"));
    ///
    /// assert!(AssetPath::parse("../settings_ddnet.cfg").is_err());
    /// assert!(AssetPath::parse("/etc/passwd").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.starts_with('/') {
            return Err(PathError::InvalidPath {
                message: format!("'{}' is absolute", s),
            });
        }

        let components: Vec<String> = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();

        if components.is_empty() {
            return Err(PathError::InvalidPath {
                message: "path is empty".to_string(),
            });
        }

        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }

        Ok(AssetPath { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        let message = if component == "." || component == ".." {
            "relative directory references are not allowed"
        } else if component.contains('\0') {
            "contains a NUL byte"
        } else if component.contains('\\') {
            "contains a backslash"
        } else if position == 0 && component.len() == 2 && component.ends_with(':') {
            "looks like a drive prefix"
        } else {
            return Ok(());
        };

        Err(PathError::InvalidComponent {
            component: component.to_string(),
            position,
            message: message.to_string(),
        })
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false: an asset path has at least one component.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate over components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// The last component.
    pub fn file_name(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    /// Lower-cased extension of the last component, without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(i) => Some(name[i + 1..].to_ascii_lowercase()),
        }
    }

    /// The containing directory, or `None` for a top-level entry.
    pub fn parent(&self) -> Option<AssetPath> {
        if self.components.len() < 2 {
            return None;
        }
        Some(AssetPath {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Every directory leading to this path, shallowest first.
    ///
    /// `sub/dir/file.cfg` yields `sub` then `sub/dir`.
    pub fn ancestors(&self) -> Vec<AssetPath> {
        (1..self.components.len())
            .map(|end| AssetPath {
                components: self.components[..end].to_vec(),
            })
            .collect()
    }

    /// Append one more component.
    pub fn join(&self, name: &str) -> Result<AssetPath, PathError> {
        let child = AssetPath::parse(name)?;
        let mut components = self.components.clone();
        components.extend(child.components);
        Ok(AssetPath { components })
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &AssetPath) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> AssetPath {
        AssetPath::parse(s).unwrap()
    }

    #[test]
    fn parse_basic_paths() {
        assert_eq!(path("settings_ddnet.cfg").len(), 1);
        assert_eq!(path("assets/game").len(), 2);
        assert_eq!(path("assets/game/default.png").len(), 3);
    }

    #[test]
    fn normalize_slashes() {
        assert_eq!(path("sub/dir/"), path("sub/dir"));
        assert_eq!(path("sub//dir"), path("sub/dir"));
    }

    #[test]
    fn dotted_names_are_fine() {
        assert_eq!(path(".hidden/a..b.cfg").len(), 2);
    }

    #[test]
    fn escaping_paths_rejected() {
        assert!(AssetPath::parse("").is_err());
        assert!(AssetPath::parse("/").is_err());
        assert!(AssetPath::parse("/abs/file").is_err());
        assert!(AssetPath::parse("../up").is_err());
        assert!(AssetPath::parse("sub/../../up").is_err());
        assert!(AssetPath::parse("./here").is_err());
        assert!(AssetPath::parse("sub\\dir").is_err());
        assert!(AssetPath::parse("C:/Windows").is_err());
        assert!(AssetPath::parse("nul\0byte").is_err());
    }

    #[test]
    fn error_reports_position() {
        let err = AssetPath::parse("sub/../x").unwrap_err();
        assert!(matches!(
            err,
            PathError::InvalidComponent { position: 1, .. }
        ));
    }

    #[test]
    fn ancestors_are_shallowest_first() {
        let ancestors = path("sub/dir/file.cfg").ancestors();
        assert_eq!(ancestors, vec![path("sub"), path("sub/dir")]);
        assert!(path("file.cfg").ancestors().is_empty());
    }

    #[test]
    fn parent_and_file_name() {
        let p = path("sub/dir/file.cfg");
        assert_eq!(p.parent(), Some(path("sub/dir")));
        assert_eq!(p.file_name(), "file.cfg");
        assert_eq!(path("file.cfg").parent(), None);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(path("a/B.CFG").extension().as_deref(), Some("cfg"));
        assert_eq!(path("identities.json").extension().as_deref(), Some("json"));
        assert_eq!(path("Makefile").extension(), None);
        assert_eq!(path(".bashrc").extension(), None);
    }

    #[test]
    fn join_validates_child() {
        assert_eq!(path("assets/hud").join("x.png").unwrap(), path("assets/hud/x.png"));
        assert!(path("assets").join("..").is_err());
    }

    #[test]
    fn has_prefix_works() {
        let p = path("assets/game/x.png");
        assert!(p.has_prefix(&path("assets")));
        assert!(p.has_prefix(&path("assets/game")));
        assert!(!p.has_prefix(&path("game")));
    }

    #[test]
    fn display_uses_forward_slashes() {
        assert_eq!(path("sub/dir/file.cfg").to_string(), "sub/dir/file.cfg");
    }
}
