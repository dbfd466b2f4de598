//! Application handle threaded through every handler: explicit fields
//! rather than module-level globals.

use crate::parameter_source::HttpParameterSource;
use dashmap::DashMap;
use firewall_config_cache::{ConfigCache, ParameterSource};
use firewall_core::{Firewall, SlashRegistry};
use firewall_engines::HttpSimulatorClient;
use firewall_types::{Clock, FirewallConfig, SystemClock};
use std::sync::Arc;
use std::time::Instant;

/// Generic over the parameter source so tests can substitute an in-memory
/// fake instead of talking to a real chain RPC; production code always
/// instantiates this as `FirewallApp<HttpParameterSource>` via [`FirewallApp::new`].
pub struct FirewallApp<S: ParameterSource + 'static = HttpParameterSource> {
    pub base_config: FirewallConfig,
    pub clock: Arc<dyn Clock>,
    pub global_firewall: Arc<Firewall>,
    pub principal_firewalls: DashMap<String, Arc<Firewall>>,
    pub slash_registry: Arc<SlashRegistry>,
    pub config_cache: Arc<ConfigCache<S>>,
    pub upstream_client: reqwest::Client,
    pub default_upstream: String,
    pub simulator_endpoint: String,
    pub started_at: Instant,
}

impl FirewallApp<HttpParameterSource> {
    pub fn new(base_config: FirewallConfig, default_upstream: String) -> Self {
        let parameter_source = HttpParameterSource::new(default_upstream.clone());
        Self::with_parameter_source(base_config, default_upstream, parameter_source)
    }
}

impl<S: ParameterSource + 'static> FirewallApp<S> {
    pub fn with_parameter_source(
        base_config: FirewallConfig,
        default_upstream: String,
        parameter_source: S,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let slash_registry = Arc::new(SlashRegistry::new(
            base_config.revert_strike_max,
            base_config.revert_strike_window_secs,
        ));
        let simulator_endpoint = base_config.simulator.endpoint.clone();
        let global_firewall = Arc::new(Firewall::new(
            base_config.clone(),
            clock.clone(),
            HttpSimulatorClient::new(simulator_endpoint.clone()),
            slash_registry.clone(),
            None,
        ));
        let config_cache = Arc::new(ConfigCache::new(
            parameter_source,
            base_config.clone(),
            base_config.config_cache_ttl_secs,
            clock.clone(),
        ));

        Self {
            base_config,
            clock,
            global_firewall,
            principal_firewalls: DashMap::new(),
            slash_registry,
            config_cache,
            upstream_client: reqwest::Client::new(),
            default_upstream,
            simulator_endpoint,
            started_at: Instant::now(),
        }
    }

    /// Resolves the per-principal firewall, building it lazily on first
    /// use. `DashMap::entry` makes construction idempotent under
    /// concurrent callers.
    pub fn firewall_for(&self, principal: &str, config: FirewallConfig) -> Arc<Firewall> {
        self.principal_firewalls
            .entry(principal.to_string())
            .or_insert_with(|| {
                Arc::new(Firewall::new(
                    config,
                    self.clock.clone(),
                    HttpSimulatorClient::new(self.simulator_endpoint.clone()),
                    self.slash_registry.clone(),
                    Some(principal.to_string()),
                ))
            })
            .clone()
    }
}
