//! Shared synthesis audio cache
//!
//! Memoizes TTS output for `(language, voice_identifier, text)` triples
//! across calls, under a per-language byte budget with LRU eviction.
//! The cache is a process-wide singleton; if the backing store is
//! unreachable at startup every operation degrades to a miss.
//!
//! Key layout mirrors a flat KV store:
//! - data:      `audio_cache:{lang}:{voice}:{text}`
//! - size:      `audio_cache:size:{lang}` (plain integer counter)
//! - metadata:  `audio_cache:info:{lang}` hash with per-entry fields
//!   `{key}:last_access`, `{key}:popularity`, `{key}:size`
//!
//! The read-modify-write on the size counter is deliberately not
//! serialized across writers; the counter may transiently drift by up
//! to one in-flight entry per writer, and entry TTLs repair any drift.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::PipelineError;

/// Minimal async KV contract the cache needs from its backing store.
///
/// Counters and hashes live in separate namespaces from data keys, the
/// way a Redis deployment would hold them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn ping(&self) -> Result<(), PipelineError>;
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn delete(&self, key: &str) -> bool;
    async fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
    async fn counter_get(&self, key: &str) -> i64;
    async fn counter_add(&self, key: &str, delta: i64) -> i64;
    async fn counter_set(&self, key: &str, value: i64);
    async fn hash_get(&self, key: &str, field: &str) -> Option<String>;
    async fn hash_set(&self, key: &str, field: &str, value: String);
    async fn hash_get_all(&self, key: &str) -> HashMap<String, String>;
    async fn hash_delete(&self, key: &str, fields: &[String]);
    async fn hash_clear(&self, key: &str);
}

struct StoredValue {
    data: Vec<u8>,
    expires_at_epoch_ms: i64,
}

/// In-process [`CacheStore`] with lazy TTL expiry.
///
/// Stands in for the external store in tests and single-node
/// deployments; the production store lives behind the same trait.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, StoredValue>>,
    counters: Mutex<HashMap<String, i64>>,
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn ping(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut data = self.data.lock().expect("store lock poisoned");
        match data.get(key) {
            Some(value) if value.expires_at_epoch_ms > Self::now_ms() => Some(value.data.clone()),
            Some(_) => {
                data.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        self.data.lock().expect("store lock poisoned").insert(
            key.to_string(),
            StoredValue {
                data: value,
                expires_at_epoch_ms: Self::now_ms() + ttl.as_millis() as i64,
            },
        );
    }

    async fn delete(&self, key: &str) -> bool {
        self.data
            .lock()
            .expect("store lock poisoned")
            .remove(key)
            .is_some()
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.data
            .lock()
            .expect("store lock poisoned")
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    async fn counter_get(&self, key: &str) -> i64 {
        *self
            .counters
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .unwrap_or(&0)
    }

    async fn counter_add(&self, key: &str, delta: i64) -> i64 {
        let mut counters = self.counters.lock().expect("store lock poisoned");
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += delta;
        *value
    }

    async fn counter_set(&self, key: &str, value: i64) {
        self.counters
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), value);
    }

    async fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        self.hashes
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .and_then(|h| h.get(field).cloned())
    }

    async fn hash_set(&self, key: &str, field: &str, value: String) {
        self.hashes
            .lock()
            .expect("store lock poisoned")
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    async fn hash_get_all(&self, key: &str) -> HashMap<String, String> {
        self.hashes
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) {
        if let Some(hash) = self.hashes.lock().expect("store lock poisoned").get_mut(key) {
            for field in fields {
                hash.remove(field);
            }
        }
    }

    async fn hash_clear(&self, key: &str) {
        self.hashes.lock().expect("store lock poisoned").remove(key);
    }
}

static SHARED_CACHE: OnceCell<Arc<AudioCache>> = OnceCell::const_new();

/// Process-wide audio cache shared by all calls.
pub struct AudioCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    disabled: bool,
}

impl AudioCache {
    /// The shared instance, created on first use over an in-process
    /// store. Deployments wire a real store via [`AudioCache::connect`]
    /// before any call touches this.
    pub async fn shared() -> Arc<AudioCache> {
        SHARED_CACHE
            .get_or_init(|| async {
                AudioCache::connect(Arc::new(MemoryStore::new()), CacheConfig::default()).await
            })
            .await
            .clone()
    }

    /// Install a specific store/config pair as the shared instance.
    /// Later calls to [`AudioCache::shared`] return whichever instance
    /// won the race; a second connect returns the already-shared one.
    pub async fn connect_shared(store: Arc<dyn CacheStore>, config: CacheConfig) -> Arc<AudioCache> {
        SHARED_CACHE
            .get_or_init(|| async { AudioCache::connect(store, config).await })
            .await
            .clone()
    }

    /// Build a cache over a store, probing it once. If the probe fails
    /// the cache comes up disabled: every operation is a miss/no-op.
    /// Disabled is a valid state, not an error.
    pub async fn connect(store: Arc<dyn CacheStore>, config: CacheConfig) -> Arc<AudioCache> {
        let disabled = match store.ping().await {
            Ok(()) => false,
            Err(err) => {
                warn!("cache store ping failed at startup, disabling audio cache: {err}");
                true
            }
        };
        Arc::new(Self {
            store,
            config,
            disabled,
        })
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Languages without an explicit budget share the default bucket.
    fn bucket<'a>(&self, language: &'a str) -> &'a str {
        if self.config.language_budgets.contains_key(language) {
            language
        } else {
            "default"
        }
    }

    fn data_key(language: &str, voice_identifier: &str, text: &str) -> String {
        format!("audio_cache:{language}:{voice_identifier}:{text}")
    }

    fn size_key(language: &str) -> String {
        format!("audio_cache:size:{language}")
    }

    fn info_key(language: &str) -> String {
        format!("audio_cache:info:{language}")
    }

    /// Look up synthesized audio. A hit refreshes the entry's access
    /// time and bumps its popularity counter.
    pub async fn get(&self, language: &str, voice_identifier: &str, text: &str) -> Option<Vec<u8>> {
        if self.disabled {
            return None;
        }
        let language = self.bucket(language);
        let audio_key = Self::data_key(language, voice_identifier, text);
        let audio = self.store.get(&audio_key).await?;
        debug!("audio cache hit for {voice_identifier} ({} bytes)", audio.len());
        self.touch(language, &audio_key).await;
        Some(audio)
    }

    /// Store synthesized audio under the language's byte budget,
    /// evicting least-recently-used entries to make room.
    pub async fn set(
        &self,
        language: &str,
        voice_identifier: &str,
        text: &str,
        audio: Vec<u8>,
        ttl: Option<Duration>,
    ) {
        if self.disabled {
            warn!("audio cache is disabled, dropping write");
            return;
        }
        let language = self.bucket(language);
        let audio_key = Self::data_key(language, voice_identifier, text);
        let info_key = Self::info_key(language);
        let size_key = Self::size_key(language);

        // Overwrite: retire the old entry's size before accounting the new
        if let Some(existing) = self.store.hash_get(&info_key, &format!("{audio_key}:size")).await {
            if let Ok(existing_size) = existing.parse::<i64>() {
                self.store.counter_add(&size_key, -existing_size).await;
            }
        }

        let audio_size = audio.len() as i64;
        self.ensure_capacity(language, audio_size).await;

        let ttl = ttl.unwrap_or(Duration::from_secs(self.config.default_ttl_seconds));
        self.store.set_with_ttl(&audio_key, audio, ttl).await;

        self.touch(language, &audio_key).await;
        self.store
            .hash_set(&info_key, &format!("{audio_key}:size"), audio_size.to_string())
            .await;
        self.store.counter_add(&size_key, audio_size).await;
    }

    /// Refresh last-access and bump popularity for LRU bookkeeping.
    /// Access times carry sub-second resolution so rapid writers still
    /// order correctly.
    async fn touch(&self, language: &str, audio_key: &str) {
        let info_key = Self::info_key(language);
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        self.store
            .hash_set(&info_key, &format!("{audio_key}:last_access"), now.to_string())
            .await;
        let popularity = self
            .store
            .hash_get(&info_key, &format!("{audio_key}:popularity"))
            .await
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        self.store
            .hash_set(
                &info_key,
                &format!("{audio_key}:popularity"),
                (popularity + 1).to_string(),
            )
            .await;
    }

    /// Make room for a new entry if the language bucket would overflow.
    /// In warn-only mode the write proceeds over budget and TTL expiry
    /// is left to shrink the bucket back down.
    async fn ensure_capacity(&self, language: &str, new_item_size: i64) {
        let max = self.config.budget_for(language) as i64;
        let current = self.store.counter_get(&Self::size_key(language)).await;
        if current + new_item_size <= max {
            return;
        }
        info!(
            "audio cache bucket {language} would exceed budget: current {current}, new {new_item_size}, max {max}"
        );
        if self.config.evict_on_overflow {
            self.evict_lru(language, current + new_item_size - max).await;
        } else {
            warn!("eviction disabled, bucket {language} over budget");
        }
    }

    /// Delete least-recently-used entries until `bytes_to_free` is
    /// reclaimed.
    async fn evict_lru(&self, language: &str, bytes_to_free: i64) {
        let info_key = Self::info_key(language);
        let cache_info = self.store.hash_get_all(&info_key).await;
        if cache_info.is_empty() {
            return;
        }

        // Metadata fields are `{entry_key}:{attribute}`; fold them back
        // into per-entry records.
        let mut entries: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for (field, value) in &cache_info {
            let Some((entry_key, attribute)) = field.rsplit_once(':') else {
                continue;
            };
            if let Ok(number) = value.parse::<f64>() {
                entries
                    .entry(entry_key.to_string())
                    .or_default()
                    .insert(attribute.to_string(), number);
            }
        }

        let mut sorted: Vec<(String, f64, i64)> = entries
            .into_iter()
            .filter_map(|(key, attrs)| {
                let last_access = attrs.get("last_access")?;
                let size = attrs.get("size")?;
                Some((key, *last_access, *size as i64))
            })
            .collect();
        sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let size_key = Self::size_key(language);
        let mut bytes_freed = 0i64;
        for (entry_key, _, entry_size) in sorted {
            if bytes_freed >= bytes_to_free {
                break;
            }
            self.store.delete(&entry_key).await;
            self.store
                .hash_delete(
                    &info_key,
                    &[
                        format!("{entry_key}:last_access"),
                        format!("{entry_key}:popularity"),
                        format!("{entry_key}:size"),
                    ],
                )
                .await;
            self.store.counter_add(&size_key, -entry_size).await;
            bytes_freed += entry_size;
            debug!("evicted {entry_key} from audio cache ({entry_size} bytes)");
        }
        info!("freed {bytes_freed} bytes from audio cache bucket {language}");
    }

    /// Drop every entry for a language and reset its accounting.
    pub async fn clear(&self, language: &str) {
        if self.disabled {
            return;
        }
        let language = self.bucket(language);
        let keys = self
            .store
            .keys_with_prefix(&format!("audio_cache:{language}:"))
            .await;
        for key in keys {
            self.store.delete(&key).await;
        }
        self.store.counter_set(&Self::size_key(language), 0).await;
        self.store.hash_clear(&Self::info_key(language)).await;
        info!("audio cache bucket {language} cleared");
    }

    /// Current accounted size of a language bucket in bytes.
    pub async fn bucket_size(&self, language: &str) -> i64 {
        if self.disabled {
            return 0;
        }
        self.store.counter_get(&Self::size_key(self.bucket(language))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnreachableStore;

    #[async_trait]
    impl CacheStore for UnreachableStore {
        async fn ping(&self) -> Result<(), PipelineError> {
            Err(PipelineError::Transport("connection refused".into()))
        }
        async fn get(&self, _key: &str) -> Option<Vec<u8>> {
            panic!("disabled cache must not reach the store")
        }
        async fn set_with_ttl(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {
            panic!("disabled cache must not reach the store")
        }
        async fn delete(&self, _key: &str) -> bool {
            unreachable!()
        }
        async fn keys_with_prefix(&self, _prefix: &str) -> Vec<String> {
            unreachable!()
        }
        async fn counter_get(&self, _key: &str) -> i64 {
            unreachable!()
        }
        async fn counter_add(&self, _key: &str, _delta: i64) -> i64 {
            unreachable!()
        }
        async fn counter_set(&self, _key: &str, _value: i64) {
            unreachable!()
        }
        async fn hash_get(&self, _key: &str, _field: &str) -> Option<String> {
            unreachable!()
        }
        async fn hash_set(&self, _key: &str, _field: &str, _value: String) {
            unreachable!()
        }
        async fn hash_get_all(&self, _key: &str) -> HashMap<String, String> {
            unreachable!()
        }
        async fn hash_delete(&self, _key: &str, _fields: &[String]) {
            unreachable!()
        }
        async fn hash_clear(&self, _key: &str) {
            unreachable!()
        }
    }

    fn small_config() -> CacheConfig {
        CacheConfig {
            language_budgets: HashMap::from([("es".to_string(), 1000u64)]),
            default_budget: 500,
            default_ttl_seconds: 60,
            evict_on_overflow: true,
        }
    }

    #[tokio::test]
    async fn test_get_miss_then_hit() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        assert!(cache.get("es", "v1", "hola").await.is_none());

        cache.set("es", "v1", "hola", vec![1, 2, 3], None).await;
        assert_eq!(cache.get("es", "v1", "hola").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.bucket_size("es").await, 3);
    }

    #[tokio::test]
    async fn test_overwrite_adjusts_size_counter() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        cache.set("es", "v1", "hola", vec![0; 100], None).await;
        cache.set("es", "v1", "hola", vec![0; 40], None).await;
        assert_eq!(cache.bucket_size("es").await, 40);
    }

    #[tokio::test]
    async fn test_lru_eviction_respects_budget() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        cache.set("es", "v1", "uno", vec![0; 400], None).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.set("es", "v1", "dos", vec![0; 400], None).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // 400 more bytes would put the bucket at 1200 > 1000; the
        // oldest entry goes.
        cache.set("es", "v1", "tres", vec![0; 400], None).await;

        assert!(cache.get("es", "v1", "uno").await.is_none());
        assert!(cache.get("es", "v1", "dos").await.is_some());
        assert!(cache.get("es", "v1", "tres").await.is_some());
        assert!(cache.bucket_size("es").await <= 1000);
    }

    #[tokio::test]
    async fn test_get_refreshes_lru_position() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        cache.set("es", "v1", "uno", vec![0; 400], None).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.set("es", "v1", "dos", vec![0; 400], None).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Touch "uno" so "dos" becomes the LRU victim.
        assert!(cache.get("es", "v1", "uno").await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.set("es", "v1", "tres", vec![0; 400], None).await;

        assert!(cache.get("es", "v1", "uno").await.is_some());
        assert!(cache.get("es", "v1", "dos").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_language_uses_default_bucket() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        cache.set("zh", "v1", "nihao", vec![0; 10], None).await;
        assert_eq!(cache.bucket_size("zh").await, 10);
        assert_eq!(cache.bucket_size("default").await, 10);
        assert_eq!(cache.bucket_size("es").await, 0);
    }

    #[tokio::test]
    async fn test_clear_resets_bucket() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        cache.set("es", "v1", "hola", vec![0; 100], None).await;
        cache.clear("es").await;
        assert!(cache.get("es", "v1", "hola").await.is_none());
        assert_eq!(cache.bucket_size("es").await, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let cache = AudioCache::connect(Arc::new(UnreachableStore), small_config()).await;
        assert!(cache.is_disabled());
        assert!(cache.get("es", "v1", "hola").await.is_none());
        cache.set("es", "v1", "hola", vec![1], None).await;
        cache.clear("es").await;
        assert_eq!(cache.bucket_size("es").await, 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_a_miss() {
        let cache = AudioCache::connect(Arc::new(MemoryStore::new()), small_config()).await;
        cache
            .set("es", "v1", "hola", vec![1, 2], Some(Duration::from_millis(20)))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("es", "v1", "hola").await.is_none());
    }
}
