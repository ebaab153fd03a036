//! Diagnostic logging setup.
//!
//! Everything goes to stderr so it never interleaves with the chat
//! transcript on stdout.

use tracing_subscriber::EnvFilter;

/// Filter directives are read from this variable first, then `RUST_LOG`.
pub const LOG_ENV: &str = "NEBRAS_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "nebras=debug,warn";

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(verbose: bool) {
    let filter = build_filter(verbose, |key| std::env::var(key).ok());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_filter<F>(verbose: bool, lookup: F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    let directive = filter_directive(verbose, lookup);
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn filter_directive<F>(verbose: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if verbose {
        return VERBOSE_DIRECTIVE.to_string();
    }
    [LOG_ENV, "RUST_LOG"]
        .iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_wins_over_environment() {
        let directive = filter_directive(true, |_| Some("error".to_string()));
        assert_eq!(directive, VERBOSE_DIRECTIVE);
    }

    #[test]
    fn own_variable_is_preferred_over_rust_log() {
        let directive = filter_directive(false, |key| match key {
            LOG_ENV => Some("nebras=trace".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(directive, "nebras=trace");

        let directive = filter_directive(false, |key| match key {
            LOG_ENV => Some("  ".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(directive, "info");
    }

    #[test]
    fn falls_back_to_warnings_only() {
        assert_eq!(filter_directive(false, |_| None), DEFAULT_DIRECTIVE);
    }
}
