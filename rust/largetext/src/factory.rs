//! Configuration and construction of [`LargeText`] instances.

use std::{path::Path, sync::Arc, time::Duration};

use largetext_charset::{Charset, CodingErrorAction, DecoderOptions};
use largetext_common::{Error, Result, verify_arg};
use largetext_io::{FileReader, MmapReader, ReadAt};
use serde::{Deserialize, Serialize};

use crate::{
    cache::{BufferCache, DEFAULT_CACHE_EXPIRY},
    engine::DecodeEngine,
    sequence::SequenceFactory,
    text::{LargeText, SyncLargeText, UnsyncLargeText},
};

/// Default number of bytes decoded per window.
pub const DEFAULT_WINDOW_SIZE: u64 = 2 * 1024 * 1024;

/// Windows must stay strictly below this size.
pub const MAX_WINDOW_SIZE: u64 = i32::MAX as u64;

/// Units for expressing the window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeUnit {
    B,
    KiB,
    MiB,
    GiB,
    KB,
    MB,
    GB,
}

impl SizeUnit {
    pub fn bytes(&self) -> u64 {
        match self {
            SizeUnit::B => 1,
            SizeUnit::KiB => 1 << 10,
            SizeUnit::MiB => 1 << 20,
            SizeUnit::GiB => 1 << 30,
            SizeUnit::KB => 1_000,
            SizeUnit::MB => 1_000_000,
            SizeUnit::GB => 1_000_000_000,
        }
    }

    /// Size of `quantity` units, saturating at `u64::MAX`.
    pub fn size_in_bytes(&self, quantity: u64) -> u64 {
        quantity.saturating_mul(self.bytes())
    }
}

/// How file bytes are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// Every window is served by its own read-only memory mapping.
    #[default]
    Mmap,
    /// Positional reads into heap buffers.
    Positional,
}

/// Settings of a [`LargeTextFactory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LargeTextConfig {
    pub charset: Charset,
    pub on_malformed: CodingErrorAction,
    pub on_unmappable: CodingErrorAction,
    pub replacement: char,
    /// Bytes decoded per window.
    pub window_size: u64,
    #[serde(with = "millis")]
    pub cache_expiry: Duration,
    /// Pick the thread-safe facade when opening through [`LargeTextFactory::open`].
    pub thread_safe: bool,
    pub io_mode: IoMode,
}

impl Default for LargeTextConfig {
    fn default() -> LargeTextConfig {
        let options = DecoderOptions::default();
        LargeTextConfig {
            charset: options.charset,
            on_malformed: options.on_malformed,
            on_unmappable: options.on_unmappable,
            replacement: options.replacement,
            window_size: DEFAULT_WINDOW_SIZE,
            cache_expiry: DEFAULT_CACHE_EXPIRY,
            thread_safe: true,
            io_mode: IoMode::Mmap,
        }
    }
}

impl LargeTextConfig {
    pub fn validate(&self) -> Result<()> {
        let window_size = self.window_size;
        verify_arg!(window_size, window_size > 0);
        if window_size < self.charset.max_bytes_per_char() as u64 {
            return Err(Error::invalid_arg(
                "window_size",
                format!(
                    "{window_size} bytes cannot hold a {} character ({} bytes)",
                    self.charset,
                    self.charset.max_bytes_per_char()
                ),
            ));
        }
        verify_arg!(window_size, window_size < MAX_WINDOW_SIZE);
        Ok(())
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            charset: self.charset,
            on_malformed: self.on_malformed,
            on_unmappable: self.on_unmappable,
            replacement: self.replacement,
        }
    }
}

/// Opens large text files with a validated configuration.
///
/// ```rust,no_run
/// use largetext::{LargeText, LargeTextFactory, SizeUnit};
/// use largetext_charset::CodingErrorAction;
///
/// let factory = LargeTextFactory::builder()
///     .charset_by_name("windows-1252")?
///     .on_unmappable(CodingErrorAction::Replace)
///     .window_size(512, SizeUnit::KiB)
///     .build()?;
/// let text = factory.open("server.log")?;
/// println!("{}", text.char_at(1_000_000)?);
/// # Ok::<(), largetext_common::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct LargeTextFactory {
    config: LargeTextConfig,
}

impl LargeTextFactory {
    pub fn builder() -> LargeTextFactoryBuilder {
        LargeTextFactoryBuilder::default()
    }

    /// Factory with the default configuration: UTF-8, reported decode errors,
    /// 2 MiB windows, thread-safe texts.
    pub fn default_factory() -> LargeTextFactory {
        LargeTextFactory {
            config: LargeTextConfig::default(),
        }
    }

    pub fn from_config(config: LargeTextConfig) -> Result<LargeTextFactory> {
        config.validate()?;
        Ok(LargeTextFactory { config })
    }

    pub fn config(&self) -> &LargeTextConfig {
        &self.config
    }

    /// Opens the file at `path`, picking the facade flavor from the
    /// configuration.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Box<dyn LargeText>> {
        self.open_from_source(self.file_source(path.as_ref())?)
    }

    pub fn open_unsync(&self, path: impl AsRef<Path>) -> Result<UnsyncLargeText> {
        self.open_unsync_from_source(self.file_source(path.as_ref())?)
    }

    pub fn open_sync(&self, path: impl AsRef<Path>) -> Result<SyncLargeText> {
        self.open_sync_from_source(self.file_source(path.as_ref())?)
    }

    pub fn open_from_source(&self, source: Arc<dyn ReadAt>) -> Result<Box<dyn LargeText>> {
        if self.config.thread_safe {
            Ok(Box::new(self.open_sync_from_source(source)?))
        } else {
            Ok(Box::new(self.open_unsync_from_source(source)?))
        }
    }

    pub fn open_unsync_from_source(&self, source: Arc<dyn ReadAt>) -> Result<UnsyncLargeText> {
        Ok(UnsyncLargeText::new(self.start(source)?))
    }

    pub fn open_sync_from_source(&self, source: Arc<dyn ReadAt>) -> Result<SyncLargeText> {
        Ok(SyncLargeText::new(self.start(source)?))
    }

    fn start(&self, source: Arc<dyn ReadAt>) -> Result<Arc<SequenceFactory>> {
        let options = self.config.decoder_options();
        let engine = DecodeEngine::start(source.clone(), options, self.config.window_size as usize)?;
        let cache = BufferCache::new(source, options).with_expiry(self.config.cache_expiry);
        Ok(SequenceFactory::new(engine, cache))
    }

    fn file_source(&self, path: &Path) -> Result<Arc<dyn ReadAt>> {
        let context = || path.display().to_string();
        let source: Arc<dyn ReadAt> = match self.config.io_mode {
            IoMode::Mmap => {
                Arc::new(MmapReader::open(path).map_err(|e| Error::io(context(), e))?)
            }
            IoMode::Positional => {
                Arc::new(FileReader::open(path).map_err(|e| Error::io(context(), e))?)
            }
        };
        Ok(source)
    }
}

impl Default for LargeTextFactory {
    fn default() -> LargeTextFactory {
        LargeTextFactory::default_factory()
    }
}

/// Builder of a [`LargeTextFactory`]; validation happens in [`build`].
///
/// [`build`]: LargeTextFactoryBuilder::build
#[derive(Debug, Clone, Default)]
pub struct LargeTextFactoryBuilder {
    config: LargeTextConfig,
}

impl LargeTextFactoryBuilder {
    pub fn charset(mut self, charset: Charset) -> Self {
        self.config.charset = charset;
        self
    }

    pub fn charset_by_name(self, name: &str) -> Result<Self> {
        Ok(self.charset(Charset::for_name(name)?))
    }

    pub fn on_malformed(mut self, action: CodingErrorAction) -> Self {
        self.config.on_malformed = action;
        self
    }

    pub fn on_unmappable(mut self, action: CodingErrorAction) -> Self {
        self.config.on_unmappable = action;
        self
    }

    /// Sets both the malformed and the unmappable input actions.
    pub fn on_decode_error(self, action: CodingErrorAction) -> Self {
        self.on_malformed(action).on_unmappable(action)
    }

    pub fn replacement(mut self, replacement: char) -> Self {
        self.config.replacement = replacement;
        self
    }

    pub fn window_size(mut self, quantity: u64, unit: SizeUnit) -> Self {
        self.config.window_size = unit.size_in_bytes(quantity);
        self
    }

    pub fn window_size_bytes(mut self, bytes: u64) -> Self {
        self.config.window_size = bytes;
        self
    }

    pub fn cache_expiry(mut self, expiry: Duration) -> Self {
        self.config.cache_expiry = expiry;
        self
    }

    pub fn thread_safe(mut self, thread_safe: bool) -> Self {
        self.config.thread_safe = thread_safe;
        self
    }

    pub fn io_mode(mut self, io_mode: IoMode) -> Self {
        self.config.io_mode = io_mode;
        self
    }

    pub fn build(self) -> Result<LargeTextFactory> {
        LargeTextFactory::from_config(self.config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use largetext_charset::{Charset, CodingErrorAction};
    use largetext_common::ErrorKind;

    use super::{DEFAULT_WINDOW_SIZE, IoMode, LargeTextConfig, LargeTextFactory, SizeUnit};

    #[test]
    fn test_size_units() {
        assert_eq!(SizeUnit::KiB.size_in_bytes(3), 3072);
        assert_eq!(SizeUnit::MB.size_in_bytes(2), 2_000_000);
        assert_eq!(SizeUnit::GiB.size_in_bytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_window_size_validation() {
        let err = LargeTextFactory::builder()
            .window_size(0, SizeUnit::B)
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "window_size"));

        assert!(
            LargeTextFactory::builder()
                .charset(Charset::Utf16Le)
                .window_size_bytes(3)
                .build()
                .is_err()
        );
        assert!(
            LargeTextFactory::builder()
                .charset(Charset::Iso8859_1)
                .window_size_bytes(1)
                .build()
                .is_ok()
        );
        assert!(
            LargeTextFactory::builder()
                .window_size(2, SizeUnit::GiB)
                .build()
                .is_err()
        );
        assert!(
            LargeTextFactory::builder()
                .window_size(2047, SizeUnit::MiB)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_builder_and_defaults() {
        let factory = LargeTextFactory::default_factory();
        assert_eq!(factory.config().window_size, DEFAULT_WINDOW_SIZE);
        assert!(factory.config().thread_safe);

        let factory = LargeTextFactory::builder()
            .charset_by_name("latin1")
            .unwrap()
            .on_decode_error(CodingErrorAction::Ignore)
            .thread_safe(false)
            .build()
            .unwrap();
        let options = factory.config().decoder_options();
        assert_eq!(options.charset, Charset::Iso8859_1);
        assert_eq!(options.on_unmappable, CodingErrorAction::Ignore);
        assert!(LargeTextFactory::builder().charset_by_name("klingon").is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = LargeTextConfig {
            charset: Charset::Windows1252,
            on_unmappable: CodingErrorAction::Replace,
            window_size: 4096,
            cache_expiry: Duration::from_millis(1500),
            io_mode: IoMode::Positional,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"cache_expiry\":1500"));
        assert!(json.contains("\"positional\""));
        let parsed: LargeTextConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let partial: LargeTextConfig =
            serde_json::from_str(r#"{"charset": "UTF-16BE", "thread_safe": false}"#).unwrap();
        assert_eq!(partial.charset, Charset::Utf16Be);
        assert_eq!(partial.window_size, DEFAULT_WINDOW_SIZE);
        assert!(!partial.thread_safe);
        assert_eq!(partial.io_mode, IoMode::Mmap);
        assert!(LargeTextFactory::from_config(partial).is_ok());
    }
}
