//! Environment-variable configuration (spec.md §6: "environment variables
//! only; no config files in core"). Pure parsing, no hot-reload, defaults
//! embedded in code — the same shape as
//! `agenticlaw_core::openclaw_config::OpenclawConfig::load`, minus the file.

#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// `STERLING_INTENT_RESOLVE`: 1 enables expansion retry, 0 yields
    /// `blocked_intent_resolution_disabled` (60s TTL).
    pub intent_resolve_enabled: bool,
    /// `STERLING_PLANNING_SERVICE_URL`: passed through to whatever
    /// `ReasonerClient` the binary wires up. The core never parses it.
    pub planning_service_url: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            intent_resolve_enabled: std::env::var("STERLING_INTENT_RESOLVE")
                .map(|v| v != "0")
                .unwrap_or(true),
            planning_service_url: std::env::var("STERLING_PLANNING_SERVICE_URL").ok(),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            intent_resolve_enabled: true,
            planning_service_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_intent_resolve() {
        let cfg = EnvConfig::default();
        assert!(cfg.intent_resolve_enabled);
        assert!(cfg.planning_service_url.is_none());
    }
}
