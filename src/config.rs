/*!
 * Module Parameters
 * Load-time configuration from a parameter string or the environment
 */

use crate::core::errors::{HoldError, HoldResult};
use crate::core::types::{is_valid_pid, Pid, PID_UNCONFIGURED};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable holding the pid to protect
pub const ENV_CLIENT_PID: &str = "PROCHOLD_CLIENT_PID";
/// Environment variable selecting JSON log output
pub const ENV_TRACE_JSON: &str = "PROCHOLD_TRACE_JSON";

/// Parameters given to the module when it is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleParams {
    /// hold process pid
    pub client_pid: Pid,
    pub trace_json: bool,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            client_pid: PID_UNCONFIGURED,
            trace_json: false,
        }
    }
}

impl ModuleParams {
    pub fn with_client_pid(mut self, pid: Pid) -> Self {
        self.client_pid = pid;
        self
    }

    /// Whether a real pid was configured
    pub fn has_client(&self) -> bool {
        is_valid_pid(self.client_pid)
    }

    /// Parse a whitespace-separated `key=value` string, as given to insmod
    ///
    /// Later assignments override earlier ones.
    pub fn parse(input: &str) -> HoldResult<Self> {
        let mut params = Self::default();
        for assignment in input.split_whitespace() {
            let (key, value) = assignment.split_once('=').ok_or_else(|| {
                HoldError::InvalidConfig(format!("expected key=value, got '{}'", assignment))
            })?;
            params.set(key, value)?;
        }
        Ok(params)
    }

    /// Read parameters from `PROCHOLD_*` environment variables
    pub fn from_env() -> HoldResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> HoldResult<Self> {
        let mut params = Self::default();
        if let Some(value) = lookup(ENV_CLIENT_PID) {
            params.set("client_pid", value.trim())?;
        }
        if let Some(value) = lookup(ENV_TRACE_JSON) {
            params.set("trace_json", value.trim())?;
        }
        Ok(params)
    }

    fn set(&mut self, key: &str, value: &str) -> HoldResult<()> {
        match key {
            "client_pid" => {
                self.client_pid = value.parse().map_err(|_| {
                    HoldError::InvalidConfig(format!("client_pid: '{}' is not an integer", value))
                })?;
            }
            "trace_json" => self.trace_json = parse_bool(value)?,
            other => {
                return Err(HoldError::InvalidConfig(format!(
                    "unknown parameter '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

impl FromStr for ModuleParams {
    type Err = HoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_bool(value: &str) -> HoldResult<bool> {
    match value {
        "1" | "y" | "Y" | "true" | "on" => Ok(true),
        "0" | "n" | "N" | "false" | "off" => Ok(false),
        _ => Err(HoldError::InvalidConfig(format!(
            "'{}' is not a boolean",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_is_unconfigured() {
        let params = ModuleParams::default();
        assert_eq!(params.client_pid, -1);
        assert!(!params.has_client());
        assert_eq!(ModuleParams::parse("").unwrap(), params);
    }

    #[test]
    fn test_parse_param_string() {
        let params = ModuleParams::parse("client_pid=500 trace_json=1").unwrap();
        assert_eq!(params.client_pid, 500);
        assert!(params.trace_json);
        assert!(params.has_client());

        let params: ModuleParams = "client_pid=7 client_pid=9".parse().unwrap();
        assert_eq!(params.client_pid, 9);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["client_pid", "client_pid=abc", "pid=5", "trace_json=maybe"] {
            assert!(
                matches!(ModuleParams::parse(input), Err(HoldError::InvalidConfig(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> =
            [(ENV_CLIENT_PID, " 1234 "), (ENV_TRACE_JSON, "true")].into();
        let params = ModuleParams::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(
            params,
            ModuleParams {
                client_pid: 1234,
                trace_json: true
            }
        );

        let empty = ModuleParams::from_lookup(|_| None).unwrap();
        assert_eq!(empty, ModuleParams::default());
    }

    #[test]
    fn test_serde_defaults() {
        let params: ModuleParams = serde_json::from_str(r#"{"client_pid": 42}"#).unwrap();
        assert_eq!(params.client_pid, 42);
        assert!(!params.trace_json);
    }
}
