use std::net::SocketAddr;
use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3000")]
    pub address: SocketAddr,

    /// Seconds between two drain cycles.
    #[envconfig(from = "DRAIN_PERIOD_SECS", default = "10")]
    pub drain_period: EnvSecsDuration,

    /// Log write operations instead of applying them. Local debug only.
    #[envconfig(default = "false")]
    pub print_store: bool,

    /// Path to a JSON array of collection configurations for the in-process
    /// store. Production deployments read this from the store itself.
    pub processor_config: Option<String>,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EnvSecsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvSecsDurationError;

impl FromStr for EnvSecsDuration {
    type Err = ParseEnvSecsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs = s.parse::<u64>().map_err(|_| ParseEnvSecsDurationError)?;

        Ok(EnvSecsDuration(time::Duration::from_secs(secs)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{EnvSecsDuration, ParseEnvSecsDurationError};

    #[test]
    fn drain_period_parses_from_seconds() {
        let period: EnvSecsDuration = "10".parse().unwrap();
        assert_eq!(period.0, Duration::from_secs(10));

        assert!(matches!(
            "ten".parse::<EnvSecsDuration>(),
            Err(ParseEnvSecsDurationError)
        ));
    }
}
