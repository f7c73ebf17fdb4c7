//! End-to-end runs of the indexer over temporary photo directories.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use shutter_core::pipeline::discovery::is_supported;
use shutter_core::pipeline::indexer::cache_key;
use shutter_core::processor::{reuse_cached, WorkerPoolProcessor};
use shutter_core::{
    CacheFile, CacheStore, Config, FileStats, FullPhoto, PerFileRequest, PhotoIndexer,
    PhotoProcessor, ProcessOutcome, ProcessedPhoto, ProcessedResult, ProcessingOptions, Scope,
    CACHE_VERSION,
};

/// Follows the processor contract but fakes extraction, counting calls.
struct CountingProcessor {
    extractions: Arc<AtomicUsize>,
    reverse: bool,
}

impl CountingProcessor {
    fn new(extractions: Arc<AtomicUsize>) -> Self {
        Self {
            extractions,
            reverse: false,
        }
    }

    fn reversed(extractions: Arc<AtomicUsize>) -> Self {
        Self {
            extractions,
            reverse: true,
        }
    }
}

#[async_trait]
impl PhotoProcessor for CountingProcessor {
    fn name(&self) -> &str {
        "counting"
    }

    async fn process(
        &self,
        requests: Vec<PerFileRequest>,
        _cancel: &CancellationToken,
    ) -> Vec<ProcessedResult> {
        let formats = vec!["jpg".to_string(), "png".to_string()];
        let mut results: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let outcome = if !is_supported(&request.image_path, &formats) {
                    ProcessOutcome::Unsupported
                } else if let Some(photo) = reuse_cached(&request) {
                    ProcessOutcome::Cached { photo }
                } else {
                    self.extractions.fetch_add(1, Ordering::SeqCst);
                    ProcessOutcome::Extracted {
                        photo: photo(640, 480),
                    }
                };
                ProcessedResult::new(request.image_path, outcome, 0)
            })
            .collect();
        if self.reverse {
            results.reverse();
        }
        results
    }
}

fn photo(width: u32, height: u32) -> ProcessedPhoto {
    ProcessedPhoto {
        width,
        height,
        blur_data_url: None,
        date_time_original_ms: None,
        thumbnail_src: None,
    }
}

fn setup() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.general.public_dir = dir.path().join("public");
    config.general.photos_dir = dir.path().join("public/photos");
    config.general.storage_dir = dir.path().join("storage");
    std::fs::create_dir_all(config.photos_dir()).unwrap();
    (dir, config)
}

fn write_bytes(config: &Config, name: &str, len: usize) {
    std::fs::write(config.photos_dir().join(name), vec![0u8; len]).unwrap();
}

fn key(config: &Config, name: &str) -> String {
    cache_key(&config.photos_dir().join(name))
}

async fn seed_cache(config: &Config, options: ProcessingOptions, entries: &[(&str, u64, u32, u32)]) {
    let photos = entries
        .iter()
        .map(|(name, size, w, h)| {
            (
                key(config, name),
                FullPhoto::new(
                    photo(*w, *h),
                    FileStats {
                        file_size: *size,
                        modified_at: 0,
                    },
                    format!("/photos/{name}"),
                ),
            )
        })
        .collect();
    let store = CacheStore::new(config.storage_dir());
    assert!(store.save(&Scope::Root, &CacheFile::new(options, photos)).await);
}

fn read_cache(config: &Config) -> serde_json::Value {
    let path = config.storage_dir().join("photos.json");
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn counting(config: &Config, extractions: &Arc<AtomicUsize>) -> PhotoIndexer {
    PhotoIndexer::new(config, Box::new(CountingProcessor::new(extractions.clone())))
}

#[tokio::test]
async fn fresh_and_cached_files_with_skipped_text() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 200);
    write_bytes(&config, "b.png", 300);
    write_bytes(&config, "notes.txt", 10);
    seed_cache(&config, config.processing_options(), &[("b.png", 300, 10, 20)]).await;

    let extractions = Arc::new(AtomicUsize::new(0));
    let (photos, stats) = counting(&config, &extractions)
        .index_with_stats(&Scope::Root, false)
        .await
        .unwrap();

    assert_eq!(extractions.load(Ordering::SeqCst), 1);
    assert_eq!((stats.extracted, stats.cached, stats.unsupported), (1, 1, 1));

    let a = &photos[&key(&config, "a.jpg")];
    assert_eq!((a.photo.width, a.stats.file_size), (640, 200));
    let b = &photos[&key(&config, "b.png")];
    assert_eq!((b.photo.width, b.photo.height), (10, 20));
    assert_eq!(b.src, "/photos/b.png");

    let cache = read_cache(&config);
    assert_eq!(cache["version"], CACHE_VERSION);
    let entries = cache["photos"].as_object().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(!entries.contains_key(&key(&config, "notes.txt")));
}

#[tokio::test]
async fn unchanged_rerun_extracts_nothing() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 200);
    write_bytes(&config, "b.png", 300);

    let extractions = Arc::new(AtomicUsize::new(0));
    let indexer = counting(&config, &extractions);
    let first = indexer.index(&Scope::Root).await.unwrap();
    let first_cache = read_cache(&config);
    assert_eq!(extractions.load(Ordering::SeqCst), 2);

    let (second, stats) = indexer.index_with_stats(&Scope::Root, false).await.unwrap();
    assert_eq!(extractions.load(Ordering::SeqCst), 2);
    assert_eq!(stats.cached, 2);
    assert_eq!(first, second);
    assert_eq!(first_cache, read_cache(&config));
}

#[tokio::test]
async fn size_change_forces_extraction() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 150);
    seed_cache(&config, config.processing_options(), &[("a.jpg", 100, 10, 20)]).await;

    let extractions = Arc::new(AtomicUsize::new(0));
    let photos = counting(&config, &extractions)
        .index(&Scope::Root)
        .await
        .unwrap();

    assert_eq!(extractions.load(Ordering::SeqCst), 1);
    assert_eq!(photos[&key(&config, "a.jpg")].photo.width, 640);
    assert_eq!(photos[&key(&config, "a.jpg")].stats.file_size, 150);
}

#[tokio::test]
async fn changed_options_invalidate_whole_cache() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 100);
    write_bytes(&config, "b.png", 300);
    let stale = ProcessingOptions {
        use_thumbnails: true,
        disable_blur_generation: false,
    };
    seed_cache(&config, stale, &[("a.jpg", 100, 10, 20), ("b.png", 300, 10, 20)]).await;

    let extractions = Arc::new(AtomicUsize::new(0));
    counting(&config, &extractions)
        .index(&Scope::Root)
        .await
        .unwrap();

    assert_eq!(extractions.load(Ordering::SeqCst), 2);
    assert_eq!(read_cache(&config)["processingOptions"]["useThumbnails"], false);
}

#[tokio::test]
async fn older_cache_version_is_ignored() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 100);
    seed_cache(&config, config.processing_options(), &[("a.jpg", 100, 10, 20)]).await;

    let path = config.storage_dir().join("photos.json");
    let mut doc = read_cache(&config);
    doc["version"] = serde_json::json!("0.9.0");
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let extractions = Arc::new(AtomicUsize::new(0));
    counting(&config, &extractions)
        .index(&Scope::Root)
        .await
        .unwrap();
    assert_eq!(extractions.load(Ordering::SeqCst), 1);
    assert_eq!(read_cache(&config)["version"], CACHE_VERSION);
}

#[tokio::test]
async fn corrupt_cache_degrades_to_full_run() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 100);
    std::fs::create_dir_all(config.storage_dir()).unwrap();
    std::fs::write(config.storage_dir().join("photos.json"), b"{ not json").unwrap();

    let extractions = Arc::new(AtomicUsize::new(0));
    let photos = counting(&config, &extractions)
        .index(&Scope::Root)
        .await
        .unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(extractions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn forced_run_reprocesses_and_persists() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 100);
    seed_cache(&config, config.processing_options(), &[("a.jpg", 100, 10, 20)]).await;

    let extractions = Arc::new(AtomicUsize::new(0));
    let (photos, stats) = counting(&config, &extractions)
        .index_with_stats(&Scope::Root, true)
        .await
        .unwrap();

    assert_eq!(stats.extracted, 1);
    assert_eq!(photos[&key(&config, "a.jpg")].photo.width, 640);
    assert_eq!(
        read_cache(&config)["photos"][key(&config, "a.jpg")]["width"],
        640
    );
}

#[tokio::test]
async fn removed_files_are_dropped_from_cache() {
    let (_dir, config) = setup();
    write_bytes(&config, "a.jpg", 100);
    seed_cache(
        &config,
        config.processing_options(),
        &[("a.jpg", 100, 10, 20), ("gone.jpg", 5, 1, 1)],
    )
    .await;

    let extractions = Arc::new(AtomicUsize::new(0));
    let photos = counting(&config, &extractions)
        .index(&Scope::Root)
        .await
        .unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(read_cache(&config)["photos"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn merge_ignores_completion_order() {
    let (_dir, config) = setup();
    for name in ["a.jpg", "b.jpg", "c.png"] {
        write_bytes(&config, name, 100);
    }

    let in_order = counting(&config, &Arc::new(AtomicUsize::new(0)))
        .index_with_stats(&Scope::Root, true)
        .await
        .unwrap()
        .0;
    let reversed = PhotoIndexer::new(
        &config,
        Box::new(CountingProcessor::reversed(Arc::new(AtomicUsize::new(0)))),
    )
    .index_with_stats(&Scope::Root, true)
    .await
    .unwrap()
    .0;

    assert_eq!(in_order, reversed);
}

#[tokio::test]
async fn named_scopes_have_separate_caches() {
    let (_dir, config) = setup();
    write_bytes(&config, "root.jpg", 10);
    let nested = config.photos_dir().join("2023 summer");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("beach.jpg"), [0u8; 20]).unwrap();

    let indexer = counting(&config, &Arc::new(AtomicUsize::new(0)));
    let root = indexer.index(&Scope::Root).await.unwrap();
    let summer = indexer
        .index(&Scope::parse(Some("2023 summer")).unwrap())
        .await
        .unwrap();

    assert_eq!(root.len(), 1);
    assert_eq!(summer.len(), 1);
    assert!(config.storage_dir().join("photos.json").exists());
    assert!(config
        .storage_dir()
        .join("photos-2023%20summer.json")
        .exists());
}

#[tokio::test]
async fn worker_pool_end_to_end() {
    let (_dir, mut config) = setup();
    config.processing.parallel_workers = 2;
    image::RgbImage::new(30, 20)
        .save(config.photos_dir().join("a.png"))
        .unwrap();
    image::RgbImage::new(16, 16)
        .save(config.photos_dir().join("b.jpg"))
        .unwrap();
    std::fs::write(config.photos_dir().join("broken.jpg"), b"nope").unwrap();
    std::fs::write(config.photos_dir().join("readme.txt"), b"hi").unwrap();

    let indexer = PhotoIndexer::new(&config, Box::new(WorkerPoolProcessor::from_config(&config)));
    let (photos, stats) = indexer.index_with_stats(&Scope::Root, false).await.unwrap();

    assert_eq!(photos.len(), 2);
    assert_eq!((stats.extracted, stats.failed, stats.unsupported), (2, 1, 1));
    let a = &photos[&key(&config, "a.png")];
    assert_eq!((a.photo.width, a.photo.height), (30, 20));
    assert!(a
        .photo
        .blur_data_url
        .as_deref()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let (again, stats) = indexer.index_with_stats(&Scope::Root, false).await.unwrap();
    assert_eq!((stats.extracted, stats.cached, stats.failed), (0, 2, 1));
    assert_eq!(photos, again);
}
