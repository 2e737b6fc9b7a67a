//! Remote path abstraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalized path inside a remote project namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemotePath {
    /// Path segments, never containing `.`, `..` or empty parts
    pub segments: Vec<String>,
}

impl RemotePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::root().join(path)
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        for part in name.as_ref().split('/').filter(|s| !s.is_empty()) {
            if part == ".." {
                segments.pop();
            } else if part != "." {
                segments.push(part.to_string());
            }
        }
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.name().and_then(|n| n.rsplit_once('.')).map(|(_, ext)| ext)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` equals `other` or lies below it.
    pub fn starts_with(&self, other: &RemotePath) -> bool {
        self.segments.starts_with(&other.segments)
    }

    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }

    /// Mirror this remote path under a local base directory.
    ///
    /// `/output/sub/c.txt` under `./` becomes `./output/sub/c.txt`.
    pub fn to_local(&self, base: &Path) -> PathBuf {
        let mut local = base.to_path_buf();
        for seg in &self.segments {
            local.push(seg);
        }
        local
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

impl From<&str> for RemotePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let path = RemotePath::new("/output/sub/c.txt");
        assert_eq!(path.segments, vec!["output", "sub", "c.txt"]);
    }

    #[test]
    fn test_new_handles_empty_segments() {
        let path = RemotePath::new("//output//sub//");
        assert_eq!(path.segments, vec!["output", "sub"]);
    }

    #[test]
    fn test_new_cannot_escape_root() {
        let path = RemotePath::new("/../../etc/passwd");
        assert_eq!(path.segments, vec!["etc", "passwd"]);
    }

    #[test]
    fn test_root() {
        let path = RemotePath::root();
        assert!(path.segments.is_empty());
        assert!(path.is_root());
        assert_eq!(path.to_path_string(), "/");
    }

    #[test]
    fn test_join() {
        let path = RemotePath::new("/output/").join("a.csv");
        assert_eq!(path.to_path_string(), "/output/a.csv");
    }

    #[test]
    fn test_join_with_dotdot_and_dot() {
        let path = RemotePath::new("/output/sub");
        assert_eq!(path.join("../other").segments, vec!["output", "other"]);
        assert_eq!(path.join("./c.txt").segments, vec!["output", "sub", "c.txt"]);
    }

    #[test]
    fn test_parent() {
        let path = RemotePath::new("/output/sub/c.txt");
        assert_eq!(path.parent().unwrap().to_path_string(), "/output/sub");
        assert!(RemotePath::root().parent().is_none());
    }

    #[test]
    fn test_name_and_extension() {
        let path = RemotePath::new("/output/archive.tar.gz");
        assert_eq!(path.name(), Some("archive.tar.gz"));
        assert_eq!(path.extension(), Some("gz"));
        assert!(RemotePath::new("/output/README").extension().is_none());
        assert!(RemotePath::root().name().is_none());
    }

    #[test]
    fn test_starts_with() {
        let dir = RemotePath::new("/output");
        assert!(RemotePath::new("/output/sub/c.txt").starts_with(&dir));
        assert!(dir.starts_with(&dir));
        assert!(!RemotePath::new("/outputs/c.txt").starts_with(&dir));
    }

    #[test]
    fn test_to_local() {
        let path = RemotePath::new("/output/sub/c.txt");
        assert_eq!(
            path.to_local(Path::new(".")),
            PathBuf::from("./output/sub/c.txt")
        );
        assert_eq!(RemotePath::root().to_local(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_display_and_equality() {
        let path1 = RemotePath::new("/output/sub");
        let path2 = RemotePath::from("output/sub/");
        assert_eq!(path1, path2);
        assert_eq!(format!("{}", path1), "/output/sub");
    }
}
