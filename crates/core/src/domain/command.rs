// Command-string rewriting for the one-shot command runner

use super::error::{DomainError, Result};
use super::platform::{ensure_local_prefix, PlatformFamily};

/// Rewrite a command string's first token to match the platform's
/// executable-naming conventions.
///
/// On Windows a missing `.exe` suffix is appended. Elsewhere a trailing
/// `.exe` is stripped, and when the named executable exists inside the
/// working directory (reported by `exe_exists_locally`) the whole command
/// is prefixed with `./` so the shell resolves it locally.
pub fn rewrite_command_line(
    cmd_str: &str,
    platform: PlatformFamily,
    exe_exists_locally: impl Fn(&str) -> bool,
) -> Result<String> {
    let mut tokens: Vec<String> = cmd_str.split_whitespace().map(str::to_string).collect();
    let exe_name = tokens.first().cloned().ok_or(DomainError::EmptyCommandLine)?;

    match platform {
        PlatformFamily::Windows => {
            tokens[0] = platform.ensure_exe_suffix(&exe_name);
            Ok(tokens.join(" "))
        }
        PlatformFamily::Unix => {
            let stripped = platform.strip_exe_suffix(&exe_name);
            tokens[0] = stripped.clone();
            let joined = tokens.join(" ");
            if exe_exists_locally(&stripped) && !stripped.starts_with("./") {
                Ok(format!("./{joined}"))
            } else {
                Ok(joined)
            }
        }
    }
}
