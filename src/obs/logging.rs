// crates.io
use clap::ValueEnum;
use tracing_subscriber::{
	EnvFilter, fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt,
};
// self
use crate::{_prelude::*, error::ConfigError};

/// Output format of the global subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Human-readable single-line output with ANSI colors.
	#[default]
	Compact,
	/// Flattened JSON lines without ANSI colors.
	Json,
}
impl LogFormat {
	/// Returns the CLI spelling of the format.
	pub const fn as_str(self) -> &'static str {
		match self {
			LogFormat::Compact => "compact",
			LogFormat::Json => "json",
		}
	}
}
impl Display for LogFormat {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Builds the filter for `level`, which accepts any `EnvFilter` directive (e.g. `info` or
/// `catalog_mcp=debug,reqwest=warn`).
///
/// A blank `level` defers to `RUST_LOG`, then to `info`.
pub fn log_filter(level: &str) -> Result<EnvFilter, ConfigError> {
	if level.trim().is_empty() {
		return Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
	}

	EnvFilter::try_new(level)
		.map_err(|_| ConfigError::InvalidLogFilter { directive: level.to_owned() })
}

/// Installs the global tracing subscriber.
///
/// Fails when the directive does not parse or when another subscriber is already installed.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), ConfigError> {
	let registry = tracing_subscriber::registry().with(log_filter(level)?);
	let installed = match format {
		LogFormat::Json => registry
			.with(
				fmt::layer()
					.json()
					.with_timer(UtcTime::rfc_3339())
					.flatten_event(true)
					.with_ansi(false),
			)
			.try_init(),
		LogFormat::Compact => registry
			.with(fmt::layer().compact().with_timer(UtcTime::rfc_3339()).with_ansi(true))
			.try_init(),
	};

	installed.map_err(|_| ConfigError::SubscriberInstalled)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn log_filter_accepts_directives_and_rejects_garbage() {
		assert!(log_filter("info").is_ok());
		assert!(log_filter("catalog_mcp=debug,reqwest=warn").is_ok());
		assert!(log_filter("").is_ok());
		assert!(matches!(
			log_filter("catalog_mcp=loudest"),
			Err(ConfigError::InvalidLogFilter { directive }) if directive == "catalog_mcp=loudest"
		));
	}

	#[test]
	fn log_format_uses_cli_spelling() {
		assert_eq!(LogFormat::default(), LogFormat::Compact);
		assert_eq!(LogFormat::Json.to_string(), "json");
		assert_eq!(
			LogFormat::from_str("json", true).expect("Known format should parse."),
			LogFormat::Json
		);
	}
}
