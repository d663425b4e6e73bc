pub mod config;
pub mod correlator;
pub mod discovery;
pub mod parser;
pub mod results;
pub mod runner;
pub mod session;

pub use config::{Config, ConfigError, DiscoveryConfig, RunnerConfig};
pub use correlator::{resolve_key, strip_ansi, Correlator, MatchTier, Span};
pub use discovery::{
    discover, discover_directory, discover_with_summary, group_by_file, DiscoveryCache,
    DiscoveryError, TestFile, TestFunction, TestMarker,
};
pub use parser::{classify_line, parse_line, LineEvent, Outcome};
pub use results::{SuiteStatus, TestResult, TestStatus, TestSuiteResult};
pub use runner::{
    drive, execute, OutputStream, ProcessRunner, RunnerError, StaticRunner, TestRunner,
};
pub use session::{RunEvent, RunId, TestSession, TestView};
