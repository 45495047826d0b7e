//! Presence registry implementation
//!
//! The central registry that tracks booth identity and liveness. Booths
//! register once, then heartbeat periodically; a background sweep marks
//! booths offline after a missed-heartbeat threshold, so a kiosk that dies
//! without a clean shutdown never reports stale "online" forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::booth::{Availability, Booth, BoothId, BoothInfo, BoothStatus};
use super::config::RegistryConfig;
use super::error::RegistryError;

/// Central registry for all known booths
///
/// Map-of-locks layout: the outer `RwLock` guards the map shape only, each
/// booth entry has its own lock, so concurrent heartbeats from unrelated
/// booths never contend.
pub struct PresenceRegistry {
    /// Map of booth id to booth entry
    booths: RwLock<HashMap<BoothId, Arc<RwLock<Booth>>>>,

    /// Registration counter, for deterministic `list()` order
    next_seq: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl PresenceRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            booths: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a booth
    ///
    /// Allocates a fresh id and stores the booth as online and idle. Ids are
    /// process-scoped: a registry restart invalidates all of them.
    pub async fn register(
        &self,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<BoothId, RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let id = BoothId::generate();
        let address = address.into();

        let mut booths = self.booths.write().await;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        tracing::info!(booth = %id, name = %name, address = %address, "Booth registered");
        booths.insert(id, Arc::new(RwLock::new(Booth::new(id, name, address, seq))));

        Ok(id)
    }

    /// Record a heartbeat for a booth
    ///
    /// Refreshes the liveness timestamp and brings the booth back online if
    /// the sweep had marked it offline.
    pub async fn heartbeat(&self, id: BoothId) -> Result<(), RegistryError> {
        let entry = self.entry(id).await?;
        let mut booth = entry.write().await;

        if booth.status == BoothStatus::Offline {
            tracing::info!(booth = %id, "Booth back online");
        }
        booth.last_heartbeat = Instant::now();
        booth.status = BoothStatus::Online;

        Ok(())
    }

    /// Record an availability transition reported by the booth's orchestrator
    pub async fn set_availability(
        &self,
        id: BoothId,
        availability: Availability,
    ) -> Result<(), RegistryError> {
        let entry = self.entry(id).await?;
        let mut booth = entry.write().await;

        if booth.availability != availability {
            tracing::debug!(booth = %id, ?availability, "Booth availability changed");
            booth.availability = availability;
        }

        Ok(())
    }

    /// Snapshot all known booths, in registration order
    pub async fn list(&self) -> Vec<BoothInfo> {
        let booths = self.booths.read().await;

        let mut entries = Vec::with_capacity(booths.len());
        for entry in booths.values() {
            let booth = entry.read().await;
            entries.push((booth.seq, BoothInfo::from_booth(&booth)));
        }
        entries.sort_by_key(|(seq, _)| *seq);

        entries.into_iter().map(|(_, info)| info).collect()
    }

    /// Get total number of registered booths
    pub async fn booth_count(&self) -> usize {
        self.booths.read().await.len()
    }

    /// Run the liveness sweep once
    ///
    /// Any booth whose last heartbeat is at least `liveness_timeout` old is
    /// marked offline. Booths are never removed; a late heartbeat brings
    /// them back.
    pub async fn sweep(&self, now: Instant) {
        let booths = self.booths.read().await;

        for entry in booths.values() {
            let mut booth = entry.write().await;

            if booth.status == BoothStatus::Online
                && now.duration_since(booth.last_heartbeat) >= self.config.liveness_timeout
            {
                booth.status = BoothStatus::Offline;
                tracing::warn!(
                    booth = %booth.id,
                    name = %booth.name,
                    gap_secs = now.duration_since(booth.last_heartbeat).as_secs(),
                    "Booth swept offline"
                );
            }
        }
    }

    /// Spawn the background sweep task
    ///
    /// Runs on the heartbeat interval. Returns a handle that must be aborted
    /// on shutdown to release the schedule.
    pub fn spawn_sweep_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.sweep(Instant::now()).await;
            }
        })
    }

    async fn entry(&self, id: BoothId) -> Result<Arc<RwLock<Booth>>, RegistryError> {
        let booths = self.booths.read().await;
        booths
            .get(&id)
            .cloned()
            .ok_or(RegistryError::BoothNotFound(id))
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_register_and_list() {
        let registry = PresenceRegistry::new();

        let a = registry.register("pier", "10.0.0.1:9000").await.unwrap();
        let b = registry.register("mall", "10.0.0.2:9000").await.unwrap();

        let booths = registry.list().await;
        assert_eq!(booths.len(), 2);
        // Registration order is preserved
        assert_eq!(booths[0].id, a);
        assert_eq!(booths[1].id, b);
        assert_eq!(booths[0].status, BoothStatus::Online);
        assert_eq!(booths[0].availability, Availability::Idle);
    }

    #[tokio::test]
    async fn test_register_empty_name() {
        let registry = PresenceRegistry::new();

        let result = registry.register("   ", "10.0.0.1:9000").await;
        assert_eq!(result, Err(RegistryError::EmptyName));
        assert_eq!(registry.booth_count().await, 0);
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_booth() {
        let registry = PresenceRegistry::new();
        let unknown = {
            let other = PresenceRegistry::new();
            other.register("ghost", "x").await.unwrap()
        };

        let result = registry.heartbeat(unknown).await;
        assert_eq!(result, Err(RegistryError::BoothNotFound(unknown)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_marks_offline_after_gap() {
        let config = RegistryConfig::default().heartbeat_interval(Duration::from_secs(5));
        let registry = PresenceRegistry::with_config(config);
        let id = registry.register("pier", "10.0.0.1:9000").await.unwrap();

        // Gaps below the 15s liveness timeout keep the booth online
        tokio::time::advance(Duration::from_secs(10)).await;
        registry.sweep(Instant::now()).await;
        assert_eq!(registry.list().await[0].status, BoothStatus::Online);

        registry.heartbeat(id).await.unwrap();
        tokio::time::advance(Duration::from_secs(14)).await;
        registry.sweep(Instant::now()).await;
        assert_eq!(registry.list().await[0].status, BoothStatus::Online);

        // A gap at the timeout flips it offline
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.sweep(Instant::now()).await;
        assert_eq!(registry.list().await[0].status, BoothStatus::Offline);

        // Repeated sweeps are idempotent on an offline booth
        registry.sweep(Instant::now()).await;
        assert_eq!(registry.list().await[0].status, BoothStatus::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_revives_offline_booth() {
        let registry = PresenceRegistry::new();
        let id = registry.register("pier", "10.0.0.1:9000").await.unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        registry.sweep(Instant::now()).await;
        assert_eq!(registry.list().await[0].status, BoothStatus::Offline);

        registry.heartbeat(id).await.unwrap();
        assert_eq!(registry.list().await[0].status, BoothStatus::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_is_monotone() {
        let registry = PresenceRegistry::new();
        let id = registry.register("pier", "10.0.0.1:9000").await.unwrap();

        let first = registry.list().await[0].last_heartbeat;
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.heartbeat(id).await.unwrap();
        let second = registry.list().await[0].last_heartbeat;

        assert!(second >= first);
    }

    #[tokio::test]
    async fn test_set_availability() {
        let registry = PresenceRegistry::new();
        let id = registry.register("pier", "10.0.0.1:9000").await.unwrap();

        registry.set_availability(id, Availability::Busy).await.unwrap();
        assert_eq!(registry.list().await[0].availability, Availability::Busy);
        assert!(!registry.list().await[0].is_available());

        registry.set_availability(id, Availability::Idle).await.unwrap();
        assert!(registry.list().await[0].is_available());
    }
}
