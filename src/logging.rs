//! Tracing setup shared by the binaries

use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

/// Default directive for this crate and the calling binary
fn directive(target: &str, verbose: bool) -> Result<Directive, ParseError> {
    let level = if verbose { "debug" } else { "info" };
    format!("{}={}", target.replace('-', "_"), level).parse()
}

/// Install the global subscriber
///
/// `RUST_LOG` directives are kept; `verbose` raises this crate and `binary`
/// to debug. Does nothing if a subscriber is already installed.
pub fn init(binary: &str, verbose: bool) -> Result<(), ParseError> {
    let filter = EnvFilter::from_default_env()
        .add_directive(directive("rtp_mesh", verbose)?)
        .add_directive(directive(binary, verbose)?);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive() {
        let quiet = directive("rtp-config", false).unwrap().to_string();
        assert!(quiet.starts_with("rtp_config"));
        assert!(quiet.to_lowercase().ends_with("info"));

        let verbose = directive("rtp_mesh", true).unwrap().to_string();
        assert!(verbose.to_lowercase().ends_with("debug"));
    }

    #[test]
    fn test_init_twice() {
        assert!(init("rtp-sender", false).is_ok());
        assert!(init("rtp-sender", true).is_ok());
    }
}
