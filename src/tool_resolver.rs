//! # Tool Path Resolver
//!
//! Finds the external optimizer executables. Lookup order:
//! - the tools directory from `Config::tools_dir`
//! - the directory named by `IMAGE_TRANSFORMER_TOOLS_DIR`
//! - every entry of the system `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "IMAGE_TRANSFORMER_TOOLS_DIR";

/// Resolves optimizer tool names to executable paths
#[derive(Debug, Clone, Default)]
pub struct ToolPathResolver {
    /// Directories searched before PATH, in order
    search_dirs: Vec<PathBuf>,
    /// Skip the system PATH entirely
    skip_system_path: bool,
}

impl ToolPathResolver {
    /// Create a resolver honouring an explicit tools directory and the
    /// environment override
    pub fn new(tools_dir: Option<&Path>) -> Self {
        let mut search_dirs = Vec::new();

        if let Some(dir) = tools_dir {
            search_dirs.push(dir.to_path_buf());
        }

        if let Some(dir) = env::var_os(TOOLS_DIR_ENV) {
            let dir = PathBuf::from(dir);
            if dir.is_dir() {
                debug!("Using tools directory from {}: {:?}", TOOLS_DIR_ENV, dir);
                search_dirs.push(dir);
            }
        }

        Self {
            search_dirs,
            skip_system_path: false,
        }
    }

    /// Resolver restricted to the given directories, ignoring PATH
    pub fn isolated(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: dirs.into_iter().collect(),
            skip_system_path: true,
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let file_name = executable_name(tool_name);

        if let Some(path) = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| is_executable(path))
        {
            debug!("Resolved {} in tools directory: {:?}", tool_name, path);
            return Some(path);
        }

        if self.skip_system_path {
            return None;
        }

        let path = env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&file_name))
            .find(|path| is_executable(path));

        if let Some(ref path) = path {
            debug!("Resolved {} in PATH: {:?}", tool_name, path);
        }
        path
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

/// Installation instructions for a tool on Debian-like systems
pub fn install_hint(tool_name: &str) -> String {
    match tool_name {
        "jpegtran" => "sudo apt-get install libjpeg-turbo-progs".to_string(),
        "jpegoptim" => "sudo apt-get install jpegoptim".to_string(),
        "oxipng" => "cargo install oxipng  # or download from: https://github.com/shssoichiro/oxipng/releases".to_string(),
        "optipng" => "sudo apt-get install optipng".to_string(),
        "pngcrush" => "sudo apt-get install pngcrush".to_string(),
        "gifsicle" => "sudo apt-get install gifsicle".to_string(),
        "cwebp" => "sudo apt-get install webp".to_string(),
        _ => format!("sudo apt-get install {}", tool_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install_tool(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(executable_name(name));
        std::fs::write(&path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    #[test]
    fn test_resolves_from_tools_dir() {
        let dir = TempDir::new().unwrap();
        let tool = install_tool(dir.path(), "fakeopt");

        let resolver = ToolPathResolver::isolated([dir.path().to_path_buf()]);
        assert_eq!(resolver.resolve_tool("fakeopt"), Some(tool));
        assert!(resolver.resolve_tool("otheropt").is_none());
    }

    #[test]
    fn test_directories_are_not_tools() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(executable_name("oxipng"))).unwrap();

        let resolver = ToolPathResolver::isolated([dir.path().to_path_buf()]);
        assert!(resolver.resolve_tool("oxipng").is_none());
    }

    #[test]
    fn test_explicit_dir_searched_first() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        for dir in [&first, &second] {
            install_tool(dir.path(), "gifsicle");
        }

        let resolver =
            ToolPathResolver::isolated([first.path().to_path_buf(), second.path().to_path_buf()]);
        assert!(resolver.resolve_tool("gifsicle").unwrap().starts_with(first.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_does_not_shadow_later_tool() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("gifsicle"), b"not a program").unwrap();
        let tool = install_tool(second.path(), "gifsicle");

        let resolver =
            ToolPathResolver::isolated([first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(resolver.resolve_tool("gifsicle"), Some(tool));
    }

    #[test]
    fn test_install_hint() {
        assert!(install_hint("gifsicle").contains("gifsicle"));
        assert_eq!(install_hint("unknowntool"), "sudo apt-get install unknowntool");
    }
}
