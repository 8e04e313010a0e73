use async_trait::async_trait;
use parking_lot::Mutex;
use snip_core::error::Result;
use snip_core::{
    DeletionRequest, ItemRequest, ItemResponse, Resolution, ShortCode, Shortened, Store,
    StoreError, UrlRecord, MAX_GENERATION_ATTEMPTS,
};
use snip_generator::{Generator, RandomGenerator};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
struct Entry {
    original_url: String,
    user_id: String,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Maps {
    /// Every record ever created, live or deleted.
    by_code: HashMap<ShortCode, Entry>,
    /// user id -> original url -> code, live records only.
    by_owner: HashMap<String, HashMap<String, ShortCode>>,
}

impl Maps {
    fn live_code(&self, user_id: &str, original_url: &str) -> Option<&ShortCode> {
        self.by_owner.get(user_id)?.get(original_url)
    }

    fn owned_by(&self, user_id: &str) -> Vec<UrlRecord> {
        let mut records: Vec<_> = self
            .by_owner
            .get(user_id)
            .into_iter()
            .flat_map(|urls| urls.iter())
            .map(|(original_url, code)| UrlRecord {
                short_code: code.clone(),
                original_url: original_url.clone(),
                user_id: user_id.to_owned(),
                deleted: false,
            })
            .collect();
        records.sort_by(|a, b| a.short_code.cmp(&b.short_code));
        records
    }

    fn add<G: Generator>(
        &mut self,
        generator: &G,
        original_url: &str,
        user_id: &str,
    ) -> Result<Shortened> {
        if let Some(code) = self.live_code(user_id, original_url) {
            return Ok(Shortened::Existing(code.clone()));
        }

        let code = self.free_code(generator)?;
        self.by_code.insert(
            code.clone(),
            Entry {
                original_url: original_url.to_owned(),
                user_id: user_id.to_owned(),
                deleted: false,
            },
        );
        self.by_owner
            .entry(user_id.to_owned())
            .or_default()
            .insert(original_url.to_owned(), code.clone());

        Ok(Shortened::Created(code))
    }

    /// Codes of deleted records stay taken.
    fn free_code<G: Generator>(&self, generator: &G) -> Result<ShortCode> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let code: ShortCode = generator.generate().into();
            if !self.by_code.contains_key(&code) {
                return Ok(code);
            }
            trace!(code = %code, "short code collision, retrying");
        }

        Err(StoreError::GeneratorExhausted {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }
}

/// Process-local store.
///
/// Both indexes live behind one mutex so the owner lookup, the collision
/// check and the insert happen in a single critical section.
#[derive(Debug)]
pub struct MemoryStore<G = RandomGenerator> {
    maps: Mutex<Maps>,
    generator: G,
}

impl MemoryStore<RandomGenerator> {
    /// Creates an empty store using the random code generator.
    pub fn new() -> Self {
        Self::with_generator(RandomGenerator::new())
    }
}

impl Default for MemoryStore<RandomGenerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Generator> MemoryStore<G> {
    /// Creates an empty store drawing codes from `generator`.
    pub fn with_generator(generator: G) -> Self {
        Self {
            maps: Mutex::new(Maps::default()),
            generator,
        }
    }

    /// Number of records held, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.maps.lock().by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<G: Generator> Store for MemoryStore<G> {
    async fn add_url(&self, original_url: &str, user_id: &str) -> Result<Shortened> {
        let outcome = self.maps.lock().add(&self.generator, original_url, user_id)?;
        debug!(code = %outcome.code(), existing = outcome.is_existing(), "added url");
        Ok(outcome)
    }

    async fn add_urls(&self, items: &[ItemRequest], user_id: &str) -> Result<Vec<ItemResponse>> {
        let mut maps = self.maps.lock();
        let mut responses = Vec::with_capacity(items.len());

        for item in items {
            match maps.add(&self.generator, &item.original_url, user_id) {
                Ok(outcome) => responses.push(ItemResponse {
                    correlation_id: item.correlation_id.clone(),
                    short_code: outcome.into_code(),
                }),
                Err(err) => {
                    warn!(correlation_id = %item.correlation_id, error = %err, "skipping batch item");
                }
            }
        }

        Ok(responses)
    }

    async fn get_original_url(&self, code: &ShortCode, _user_id: &str) -> Result<Resolution> {
        let maps = self.maps.lock();
        let resolution = match maps.by_code.get(code) {
            None => Resolution::NotFound,
            Some(entry) if entry.deleted => Resolution::Gone(entry.original_url.clone()),
            Some(entry) => Resolution::Active(entry.original_url.clone()),
        };
        Ok(resolution)
    }

    async fn user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        Ok(self.maps.lock().owned_by(user_id))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut guard = self.maps.lock();
        let maps = &mut *guard;
        for request in batch {
            let Some(entry) = maps.by_code.get_mut(&request.short_code) else {
                continue;
            };
            if entry.deleted || entry.user_id != request.user_id {
                continue;
            }

            entry.deleted = true;
            if let Some(urls) = maps.by_owner.get_mut(&entry.user_id) {
                urls.remove(&entry.original_url);
            }
        }

        Ok(())
    }
}
