use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

/// Configuration for the test log subscriber.
///
/// # Examples
///
/// ```
/// use viewtest::observability::TracingConfig;
/// use tracing::Level;
///
/// TracingConfig::new().level(Level::DEBUG).init();
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output logs as JSON.
    pub json: bool,
    /// The minimum log level, used when `RUST_LOG` is not set.
    pub level: Level,
    /// Include the target (module path) in logs.
    pub with_target: bool,
    /// Include the source file name in logs.
    pub with_file: bool,
    /// Include the source line number in logs.
    pub with_line_number: bool,
    /// Route output through the test harness so it is captured per test.
    pub test_writer: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: Level::WARN,
            with_target: true,
            with_file: false,
            with_line_number: false,
            test_writer: true,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables JSON output format.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_file(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self
    }

    pub fn with_line_number(mut self, enabled: bool) -> Self {
        self.with_line_number = enabled;
        self
    }

    /// Writes straight to stdout instead of the captured test output.
    pub fn without_test_writer(mut self) -> Self {
        self.test_writer = false;
        self
    }

    /// Installs the subscriber.
    ///
    /// Returns `false` when a global subscriber is already set, which is the
    /// normal case for every test after the first.
    pub fn init(self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));
        let builder = fmt()
            .with_env_filter(filter)
            .with_target(self.with_target)
            .with_file(self.with_file)
            .with_line_number(self.with_line_number);

        match (self.json, self.test_writer) {
            (true, true) => builder.json().with_test_writer().try_init().is_ok(),
            (true, false) => builder.json().try_init().is_ok(),
            (false, true) => builder.with_test_writer().try_init().is_ok(),
            (false, false) => builder.try_init().is_ok(),
        }
    }
}

/// Installs the default test subscriber, honouring `RUST_LOG`.
pub fn init_test_logging() {
    TracingConfig::default().init();
}
