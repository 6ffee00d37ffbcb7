//! Configuration parsing and validation.

use std::path::PathBuf;
use std::time::Duration;

use vidsync::config::{load_config, parse_config, CatalogBackend};
use vidsync_av::OffsetStrategy;
use vidsync_common::IdentityStrategy;
use vidsync_db::NewMediaRoot;

#[test]
fn test_empty_config_uses_defaults() {
    let config = parse_config("").unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.catalog.backend, CatalogBackend::Sqlite);
    assert_eq!(config.catalog.path, PathBuf::from("vidsync.db"));
    assert_eq!(config.sync.identity, IdentityStrategy::Path);
    assert_eq!(config.sync.workers, 4);
    assert_eq!(config.sync.interval(), Duration::ZERO);
    assert!(config.sync.run_on_start);
    assert!(!config.sync.reclaim_unreachable_roots);
    assert!(config.sync.extensions.iter().any(|e| e == "mkv"));
    assert_eq!(config.tools.timeout(), Duration::from_secs(120));
    assert!(config.roots.is_empty());
    assert_eq!(
        config.thumbnail.offset_strategy(),
        OffsetStrategy::Fixed(Duration::from_secs(1))
    );
}

#[test]
fn test_full_config() {
    let config = parse_config(
        r#"
        [server]
        host = "127.0.0.1"
        port = 9000

        [catalog]
        backend = "memory"

        [sync]
        extensions = ["mp4", ".MKV"]
        thumbnail_dir = "/var/cache/vidsync"
        identity = "fingerprint"
        workers = 8
        interval_secs = 600
        run_on_start = false
        reclaim_unreachable_roots = true

        [thumbnail]
        random_seed = 7
        random_max_secs = 60

        [tools]
        ffprobe_path = "/opt/ffmpeg/bin/ffprobe"
        timeout_secs = 30

        [[roots]]
        name = "Movies"
        path = "/media/movies"

        [[roots]]
        name = "Clips"
        path = "/media/clips"
        recursive = false
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.catalog.backend, CatalogBackend::Memory);
    assert_eq!(config.sync.identity, IdentityStrategy::Fingerprint);
    assert_eq!(config.sync.workers, 8);
    assert_eq!(config.sync.interval(), Duration::from_secs(600));
    assert!(!config.sync.run_on_start);
    assert!(config.sync.reclaim_unreachable_roots);
    assert_eq!(config.sync.thumbnail_dir, PathBuf::from("/var/cache/vidsync"));
    assert_eq!(
        config.tools.ffprobe_path,
        Some(PathBuf::from("/opt/ffmpeg/bin/ffprobe"))
    );
    assert_eq!(config.tools.timeout(), Duration::from_secs(30));
    assert_eq!(
        config.thumbnail.offset_strategy(),
        OffsetStrategy::SeededRandom {
            seed: 7,
            max: Duration::from_secs(60)
        }
    );

    assert_eq!(config.roots.len(), 2);
    assert!(config.roots[0].recursive);
    let clips = NewMediaRoot::from(&config.roots[1]);
    assert_eq!(clips.name, "Clips");
    assert!(!clips.recursive);
}

#[test]
fn test_settings_from_config() {
    let config = parse_config(
        r#"
        [sync]
        extensions = [".MP4"]
        identity = "fingerprint"
        "#,
    )
    .unwrap();
    let settings = vidsync::sync::SyncSettings::from_config(&config.sync);

    assert_eq!(settings.identity, IdentityStrategy::Fingerprint);
    assert!(settings.extensions.matches(std::path::Path::new("clip.mp4")));
    assert!(!settings.extensions.matches(std::path::Path::new("clip.mkv")));
}

#[test]
fn test_rejects_invalid_values() {
    let cases = [
        ("[server]\nport = 0", "port"),
        ("[sync]\nworkers = 0", "workers"),
        ("[sync]\nextensions = []", "extensions"),
        ("[sync]\nextensions = [\".\", \"\"]", "extensions"),
        ("[thumbnail]\noffset_secs = -2.0", "offset_secs"),
        ("[sync]\nidentity = \"inode\"", "parse"),
        (
            "[[roots]]\nname = \"\"\npath = \"/media/a\"",
            "empty name",
        ),
        (
            "[[roots]]\nname = \"A\"\npath = \"/media/a\"\n[[roots]]\nname = \"B\"\npath = \"/media/a\"",
            "more than once",
        ),
    ];

    for (toml, expected) in cases {
        let err = parse_config(toml).unwrap_err();
        let message = format!("{err:#}");
        assert!(
            message.contains(expected),
            "{toml:?}: expected {expected:?} in {message:?}"
        );
    }
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vidsync.toml");
    std::fs::write(&path, "[server]\nport = 9999\n").unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.port, 9999);

    assert!(load_config(&dir.path().join("missing.toml")).is_err());
}
