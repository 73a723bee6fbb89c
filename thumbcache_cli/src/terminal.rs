//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdout};

/// Environment variables set by common CI systems
const CI_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "JENKINS_URL",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "TRAVIS",
    "CIRCLECI",
    "BUILDKITE",
    "DRONE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() || is_ci_environment() {
        return false;
    }

    env::var("DEBIAN_FRONTEND").unwrap_or_default() != "noninteractive"
}

/// Check if the terminal understands ANSI escape codes
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    if cfg!(windows) {
        // Windows 10+ consoles handle ANSI even without TERM
        return term != "dumb";
    }
    !(term.is_empty() || term == "dumb")
}

/// Check if stderr is a terminal (progress bars draw there)
pub fn stderr_is_terminal() -> bool {
    stderr().is_terminal()
}

fn is_ci_environment() -> bool {
    CI_VARS.iter().any(|var| env::var(var).is_ok())
}

/// Whether progress bars should be drawn when the user did not opt out
pub fn should_show_progress_by_default() -> bool {
    is_interactive() && stderr_is_terminal() && supports_ansi()
}

/// Force colors off when disabled in config or unsupported by the terminal
///
/// `NO_COLOR` is honored by `colored` itself.
pub fn apply_color_preference(color_enabled: bool) {
    if !color_enabled || !supports_ansi() {
        colored::control::set_override(false);
    }
}
