// Platform probe - OS family detection and executable naming conventions

/// Platform family governing executable naming and shell selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Windows,
    Unix,
}

impl PlatformFamily {
    /// Detect the family of the host OS
    pub fn host() -> Self {
        if cfg!(windows) {
            PlatformFamily::Windows
        } else {
            PlatformFamily::Unix
        }
    }

    /// Executable suffix for this family
    pub fn exe_suffix(self) -> &'static str {
        match self {
            PlatformFamily::Windows => ".exe",
            PlatformFamily::Unix => "",
        }
    }

    /// The platform's command interpreter and its "run one command string" flag
    pub fn interpreter(self) -> (&'static str, &'static str) {
        match self {
            PlatformFamily::Windows => ("cmd", "/C"),
            PlatformFamily::Unix => ("sh", "-c"),
        }
    }

    /// Append `.exe` on Windows when missing; leave other names untouched
    pub fn ensure_exe_suffix(self, name: &str) -> String {
        match self {
            PlatformFamily::Windows if !name.to_lowercase().ends_with(".exe") => {
                format!("{name}.exe")
            }
            _ => name.to_string(),
        }
    }

    /// Strip a trailing `.exe` on non-Windows families
    pub fn strip_exe_suffix(self, name: &str) -> String {
        match self {
            PlatformFamily::Unix if name.to_lowercase().ends_with(".exe") => {
                name[..name.len() - 4].to_string()
            }
            _ => name.to_string(),
        }
    }
}

/// Prefix a local-directory marker so the shell resolves the executable
/// from the working directory rather than the search path
pub fn ensure_local_prefix(name: &str) -> String {
    if name.starts_with("./") {
        name.to_string()
    } else {
        format!("./{name}")
    }
}

/// Per-platform subdirectory holding prebuilt estimation binaries
pub fn host_bin_subdir() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "mac"
    } else {
        "win"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_appends_exe_suffix() {
        let p = PlatformFamily::Windows;
        assert_eq!(p.ensure_exe_suffix("pestpp"), "pestpp.exe");
        assert_eq!(p.ensure_exe_suffix("pestpp.exe"), "pestpp.exe");
        assert_eq!(p.ensure_exe_suffix("pestpp.EXE"), "pestpp.EXE");
    }

    #[test]
    fn unix_strips_exe_suffix() {
        let p = PlatformFamily::Unix;
        assert_eq!(p.strip_exe_suffix("pestpp.exe"), "pestpp");
        assert_eq!(p.strip_exe_suffix("pestpp"), "pestpp");
        // Appending is a Windows-only convention
        assert_eq!(p.ensure_exe_suffix("pestpp"), "pestpp");
    }

    #[test]
    fn local_prefix_is_idempotent() {
        assert_eq!(ensure_local_prefix("pestpp"), "./pestpp");
        assert_eq!(ensure_local_prefix("./pestpp"), "./pestpp");
        assert_eq!(ensure_local_prefix("bin/pestpp"), "./bin/pestpp");
    }

    #[test]
    fn interpreter_matches_family() {
        assert_eq!(PlatformFamily::Unix.interpreter(), ("sh", "-c"));
        assert_eq!(PlatformFamily::Windows.interpreter(), ("cmd", "/C"));
    }
}
