use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snip_core::error::Result;
use snip_core::{
    DeletionRequest, ItemRequest, ItemResponse, Resolution, ShortCode, Shortened, Store,
    StoreError, UrlRecord, MAX_GENERATION_ATTEMPTS,
};
use snip_generator::{Generator, RandomGenerator};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// One line of the storage file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FileRecord {
    uuid: String,
    short_url: ShortCode,
    original_url: String,
    user_id: String,
    #[serde(default)]
    is_deleted: bool,
}

#[derive(Debug, Default)]
struct State {
    by_code: BTreeMap<ShortCode, FileRecord>,
    /// user id -> original url -> code, live records only.
    by_owner: HashMap<String, HashMap<String, ShortCode>>,
}

impl State {
    fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut state = State::default();
        for record in records {
            state.by_code.insert(record.short_url.clone(), record);
        }
        for record in state.by_code.values().filter(|r| !r.is_deleted) {
            state
                .by_owner
                .entry(record.user_id.clone())
                .or_default()
                .insert(record.original_url.clone(), record.short_url.clone());
        }
        state
    }

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

    /// Adds a record in memory only; the caller persists.
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
            FileRecord {
                uuid: Uuid::new_v4().to_string(),
                short_url: code.clone(),
                original_url: original_url.to_owned(),
                user_id: user_id.to_owned(),
                is_deleted: false,
            },
        );
        self.by_owner
            .entry(user_id.to_owned())
            .or_default()
            .insert(original_url.to_owned(), code.clone());

        Ok(Shortened::Created(code))
    }

    fn forget(&mut self, code: &ShortCode) {
        if let Some(record) = self.by_code.remove(code) {
            if let Some(urls) = self.by_owner.get_mut(&record.user_id) {
                urls.remove(&record.original_url);
            }
        }
    }

    fn set_deleted(&mut self, code: &ShortCode, deleted: bool) {
        let Some(record) = self.by_code.get_mut(code) else {
            return;
        };
        record.is_deleted = deleted;

        let urls = self.by_owner.entry(record.user_id.clone()).or_default();
        if deleted {
            urls.remove(&record.original_url);
        } else {
            urls.insert(record.original_url.clone(), code.clone());
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for record in self.by_code.values() {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            buf.push(b'\n');
        }
        Ok(buf)
    }
}

/// Store mirrored to a JSON-lines file.
///
/// Every successful write rewrites the whole file while the state lock is
/// held, so memory is never more than the in-flight operation ahead of
/// disk. A failed rewrite rolls the in-memory change back.
#[derive(Debug)]
pub struct FileStore<G = RandomGenerator> {
    path: PathBuf,
    state: Mutex<State>,
    generator: G,
}

impl FileStore<RandomGenerator> {
    /// Opens the store at `path` using the random code generator.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_generator(path, RandomGenerator::new()).await
    }
}

impl<G: Generator> FileStore<G> {
    /// Opens the store at `path`, replaying every line of the file.
    ///
    /// A missing file yields an empty store; an unreadable file or a
    /// malformed line is an error.
    pub async fn open_with_generator(path: impl Into<PathBuf>, generator: G) -> Result<Self> {
        let path = path.into();
        let records = load(&path).await?;
        let state = State::from_records(records);
        info!(path = %path.display(), records = state.by_code.len(), "loaded file store");

        Ok(Self {
            path,
            state: Mutex::new(state),
            generator,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &State) -> Result<()> {
        let bytes = state.encode()?;
        if let Err(err) = write_atomically(&self.path, &bytes).await {
            error!(path = %self.path.display(), error = %err, "failed to persist file store");
            return Err(err.into());
        }
        Ok(())
    }
}

async fn load(path: &Path) -> Result<Vec<FileRecord>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "storage file not found, starting empty");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<FileRecord>(line).map_err(|e| {
                StoreError::InvalidData(format!(
                    "{} line {}: {e}",
                    path.display(),
                    index + 1
                ))
            })
        })
        .collect()
}

/// Writes to a sibling temp file, then renames it over `path`.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = write_and_rename(&tmp, path, bytes).await;
    if result.is_err() {
        if let Err(err) = tokio::fs::remove_file(&tmp).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %err, "failed to remove temp file");
            }
        }
    }
    result
}

async fn write_and_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, path).await
}

#[async_trait]
impl<G: Generator> Store for FileStore<G> {
    async fn add_url(&self, original_url: &str, user_id: &str) -> Result<Shortened> {
        let mut state = self.state.lock().await;

        let outcome = state.add(&self.generator, original_url, user_id)?;
        if let Shortened::Created(code) = &outcome {
            if let Err(err) = self.persist(&state).await {
                state.forget(code);
                return Err(err);
            }
        }

        debug!(code = %outcome.code(), existing = outcome.is_existing(), "added url");
        Ok(outcome)
    }

    async fn add_urls(&self, items: &[ItemRequest], user_id: &str) -> Result<Vec<ItemResponse>> {
        let mut state = self.state.lock().await;
        let mut responses = Vec::with_capacity(items.len());
        let mut created = Vec::new();

        for item in items {
            match state.add(&self.generator, &item.original_url, user_id) {
                Ok(outcome) => {
                    if let Shortened::Created(code) = &outcome {
                        created.push(code.clone());
                    }
                    responses.push(ItemResponse {
                        correlation_id: item.correlation_id.clone(),
                        short_code: outcome.into_code(),
                    });
                }
                Err(err) => {
                    warn!(correlation_id = %item.correlation_id, error = %err, "skipping batch item");
                }
            }
        }

        if !created.is_empty() {
            if let Err(err) = self.persist(&state).await {
                for code in &created {
                    state.forget(code);
                }
                return Err(err);
            }
        }

        Ok(responses)
    }

    async fn get_original_url(&self, code: &ShortCode, _user_id: &str) -> Result<Resolution> {
        let state = self.state.lock().await;
        let resolution = match state.by_code.get(code) {
            None => Resolution::NotFound,
            Some(record) if record.is_deleted => Resolution::Gone(record.original_url.clone()),
            Some(record) => Resolution::Active(record.original_url.clone()),
        };
        Ok(resolution)
    }

    async fn user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        Ok(self.state.lock().await.owned_by(user_id))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        let mut changed = Vec::new();

        for request in batch {
            let owned_and_live = state
                .by_code
                .get(&request.short_code)
                .is_some_and(|r| !r.is_deleted && r.user_id == request.user_id);
            if owned_and_live {
                state.set_deleted(&request.short_code, true);
                changed.push(request.short_code.clone());
            }
        }

        if changed.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.persist(&state).await {
            for code in &changed {
                state.set_deleted(code, false);
            }
            return Err(err);
        }

        debug!(count = changed.len(), "soft-deleted urls");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snip_generator::ScriptedGenerator;
    use tempfile::TempDir;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn item(id: &str, url: &str) -> ItemRequest {
        ItemRequest {
            correlation_id: id.to_string(),
            original_url: url.to_string(),
        }
    }

    fn data_path(dir: &TempDir) -> PathBuf {
        dir.path().join("data.json")
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(data_path(&dir)).await.unwrap();

        let got = store.get_original_url(&code("abc123"), "u1").await.unwrap();
        assert_eq!(got, Resolution::NotFound);
        assert!(!data_path(&dir).exists());
    }

    #[tokio::test]
    async fn add_then_resolve() {
        let dir = TempDir::new().unwrap();
        let store =
            FileStore::open_with_generator(data_path(&dir), ScriptedGenerator::new(["abc123"]))
                .await
                .unwrap();

        let added = store.add_url("https://example.com", "u1").await.unwrap();
        assert_eq!(added, Shortened::Created(code("abc123")));

        let again = store.add_url("https://example.com", "u1").await.unwrap();
        assert_eq!(again, Shortened::Existing(code("abc123")));

        let got = store.get_original_url(&code("abc123"), "u1").await.unwrap();
        assert_eq!(got, Resolution::Active("https://example.com".to_string()));
    }

    #[tokio::test]
    async fn writes_one_json_object_per_line() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(data_path(&dir)).await.unwrap();
        store.add_url("https://one.example", "u1").await.unwrap();
        store.add_url("https://two.example", "u2").await.unwrap();

        let content = std::fs::read_to_string(data_path(&dir)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            for key in ["uuid", "short_url", "original_url", "user_id", "is_deleted"] {
                assert!(value.get(key).is_some(), "missing {key} in {line}");
            }
        }
    }

    #[tokio::test]
    async fn reload_reproduces_mappings() {
        let dir = TempDir::new().unwrap();
        let mut expected = Vec::new();
        {
            let store = FileStore::open(data_path(&dir)).await.unwrap();
            for i in 0..20 {
                let url = format!("https://example{i}.com");
                let added = store.add_url(&url, &format!("u{}", i % 3)).await.unwrap();
                expected.push((added.into_code(), url));
            }
        }

        let reopened = FileStore::open(data_path(&dir)).await.unwrap();
        for (code, url) in expected {
            let got = reopened.get_original_url(&code, "anyone").await.unwrap();
            assert_eq!(got, Resolution::Active(url));
        }
    }

    #[tokio::test]
    async fn reload_keeps_deletions_and_owner_index() {
        let dir = TempDir::new().unwrap();
        let (deleted, kept) = {
            let store = FileStore::open(data_path(&dir)).await.unwrap();
            let deleted = store.add_url("https://gone.example", "u1").await.unwrap();
            let kept = store.add_url("https://kept.example", "u1").await.unwrap();
            store
                .delete_urls(&[DeletionRequest::new(deleted.code().clone(), "u1")])
                .await
                .unwrap();
            (deleted.into_code(), kept.into_code())
        };

        let reopened = FileStore::open(data_path(&dir)).await.unwrap();
        assert_eq!(
            reopened.get_original_url(&deleted, "u1").await.unwrap(),
            Resolution::Gone("https://gone.example".to_string())
        );
        assert_eq!(
            reopened.add_url("https://kept.example", "u1").await.unwrap(),
            Shortened::Existing(kept)
        );
        assert!(!reopened
            .add_url("https://gone.example", "u1")
            .await
            .unwrap()
            .is_existing());
    }

    #[tokio::test]
    async fn later_lines_win_for_the_same_code() {
        let dir = TempDir::new().unwrap();
        let lines = [
            r#"{"uuid":"1","short_url":"abc123","original_url":"https://old.example","user_id":"u1"}"#,
            "",
            r#"{"uuid":"2","short_url":"abc123","original_url":"https://new.example","user_id":"u1"}"#,
        ];
        std::fs::write(data_path(&dir), lines.join("\n")).unwrap();

        let store = FileStore::open(data_path(&dir)).await.unwrap();

        assert_eq!(
            store.get_original_url(&code("abc123"), "u1").await.unwrap(),
            Resolution::Active("https://new.example".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_line_fails_open() {
        let dir = TempDir::new().unwrap();
        std::fs::write(data_path(&dir), "{not json}\n").unwrap();

        let err = FileStore::open(data_path(&dir)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("files").join("data.json");
        let store = FileStore::open(&path).await.unwrap();

        store.add_url("https://example.com", "u1").await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn failed_write_rolls_back_memory() {
        let dir = TempDir::new().unwrap();
        let store =
            FileStore::open_with_generator(data_path(&dir), ScriptedGenerator::new(["abc123"]))
                .await
                .unwrap();
        // A directory squatting on the temp path makes every rewrite fail.
        std::fs::create_dir(dir.path().join("data.json.tmp")).unwrap();

        let err = store.add_url("https://example.com", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        assert_eq!(
            store.get_original_url(&code("abc123"), "u1").await.unwrap(),
            Resolution::NotFound
        );
    }

    #[tokio::test]
    async fn delete_is_owner_scoped() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(data_path(&dir)).await.unwrap();
        let added = store.add_url("https://example.com", "alice").await.unwrap();

        store
            .delete_urls(&[DeletionRequest::new(added.code().clone(), "bob")])
            .await
            .unwrap();
        assert!(!store
            .get_original_url(added.code(), "alice")
            .await
            .unwrap()
            .is_deleted());

        store
            .delete_urls(&[DeletionRequest::new(added.code().clone(), "alice")])
            .await
            .unwrap();
        assert!(store
            .get_original_url(added.code(), "alice")
            .await
            .unwrap()
            .is_deleted());
    }

    #[tokio::test]
    async fn batch_is_persisted_once_and_reports_existing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(data_path(&dir)).await.unwrap();
        let existing = store.add_url("https://old.example", "u1").await.unwrap();

        let responses = store
            .add_urls(
                &[
                    item("a", "https://old.example"),
                    item("b", "https://new1.example"),
                    item("c", "https://new2.example"),
                ],
                "u1",
            )
            .await
            .unwrap();

        assert_eq!(responses.len(), 3);
        let old = responses.iter().find(|r| r.correlation_id == "a").unwrap();
        assert_eq!(&old.short_code, existing.code());

        let content = std::fs::read_to_string(data_path(&dir)).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(data_path(&dir)).await.unwrap();
        // A non-empty directory at the target path cannot be replaced by rename.
        std::fs::create_dir(data_path(&dir)).unwrap();
        std::fs::write(data_path(&dir).join("keep"), b"x").unwrap();

        let err = store.add_url("https://example.com", "u1").await.unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert!(!dir.path().join("data.json.tmp").exists());
        assert!(store.user_urls("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_urls_survive_reload() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open_with_generator(
                data_path(&dir),
                ScriptedGenerator::new(["bbbbbb", "aaaaaa", "cccccc"]),
            )
            .await
            .unwrap();
            store.add_url("https://two.example", "u1").await.unwrap();
            store.add_url("https://one.example", "u1").await.unwrap();
            store.add_url("https://other.example", "u2").await.unwrap();
            store
                .delete_urls(&[DeletionRequest::new(code("aaaaaa"), "u1")])
                .await
                .unwrap();
        }

        let reopened = FileStore::open(data_path(&dir)).await.unwrap();
        let listed = reopened.user_urls("u1").await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].short_code, code("bbbbbb"));
        assert_eq!(listed[0].original_url, "https://two.example");
        assert!(!listed[0].deleted);
        assert!(reopened.user_urls("nobody").await.unwrap().is_empty());
    }
}
