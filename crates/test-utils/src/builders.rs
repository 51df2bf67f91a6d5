#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use watchquery::clock::ClockValue;
use watchquery::config::{ConfigFile, ConfigSection, QuerySection, RawConfigFile};
use watchquery::errors::Result;
use watchquery::file::{FileInformation, FileKind, FileRecord};
use watchquery::fs::mock::MockFileSystem;
use watchquery::types::{IndeterminatePolicy, MissingEntryPolicy, WatcherBackendKind};

/// Parse a TOML value written inline, e.g. `["not", "empty"]`.
pub fn expr(src: &str) -> toml::Value {
    let doc: toml::Table =
        toml::from_str(&format!("v = {src}")).expect("expression is not valid TOML");
    doc["v"].clone()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                query: QuerySection::default(),
            },
        }
    }

    pub fn expression(mut self, src: &str) -> Self {
        self.config.query.expression = expr(src);
        self
    }

    pub fn since(mut self, cursor: &str) -> Self {
        self.config.query.since = Some(cursor.to_string());
        self
    }

    pub fn indeterminate(mut self, policy: IndeterminatePolicy) -> Self {
        self.config.query.indeterminate = policy;
        self
    }

    pub fn paths(mut self, paths: &[&str]) -> Self {
        self.config.query.paths = Some(paths.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn parallel(mut self, val: bool) -> Self {
        self.config.query.parallel = val;
        self
    }

    pub fn watcher(mut self, kind: WatcherBackendKind) -> Self {
        self.config.config.watcher = kind;
        self
    }

    pub fn case_sensitive(mut self, val: bool) -> Self {
        self.config.config.case_sensitive = val;
        self
    }

    pub fn missing_entry(mut self, policy: MissingEntryPolicy) -> Self {
        self.config.config.missing_entry = policy;
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.config.settle_ms = ms;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for store records, as a root would hold them.
pub struct FileRecordBuilder {
    record: FileRecord,
}

impl FileRecordBuilder {
    pub fn file(name: &str, size: u64) -> Self {
        let clock = ClockValue::new(1, SystemTime::UNIX_EPOCH);
        Self {
            record: FileRecord {
                name: PathBuf::from(name),
                exists: true,
                info: Some(FileInformation {
                    kind: FileKind::File,
                    size,
                    mode: 0o644,
                    accessed: Some(SystemTime::UNIX_EPOCH),
                    modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1)),
                    changed: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1)),
                }),
                symlink_target: None,
                created: clock,
                observed: clock,
            },
        }
    }

    pub fn dir(name: &str) -> Self {
        let mut builder = Self::file(name, 0);
        if let Some(info) = builder.record.info.as_mut() {
            info.kind = FileKind::Dir;
        }
        builder
    }

    pub fn removed(mut self) -> Self {
        self.record.exists = false;
        self
    }

    pub fn without_info(mut self) -> Self {
        self.record.info = None;
        self
    }

    pub fn observed_at(mut self, ticks: u64) -> Self {
        self.record.observed = ClockValue::new(ticks, SystemTime::UNIX_EPOCH);
        self
    }

    pub fn created_at(mut self, ticks: u64) -> Self {
        self.record.created = ClockValue::new(ticks, SystemTime::UNIX_EPOCH);
        self
    }

    pub fn build(self) -> FileRecord {
        self.record
    }
}

/// A mock filesystem holding `files` (path, contents) under `root`.
pub fn mock_tree(root: &str, files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir(root);
    for (path, contents) in files {
        fs.add_file(format!("{root}/{path}"), contents.as_bytes().to_vec());
    }
    fs
}
