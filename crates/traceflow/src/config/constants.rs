use crate::config::{LogFormat, ReportFormat};
use std::time::Duration;

/// The default value for `format`.
pub const DEFAULT_REPORT_FORMAT: ReportFormat = ReportFormat::Vertical;

/// The default value for `dedup`.
pub const DEFAULT_DEDUP: bool = false;

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Pretty;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "traceflow=debug";

/// The minimum capture socket read timeout.
pub const MIN_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// The maximum capture socket read timeout.
pub const MAX_READ_TIMEOUT: Duration = Duration::from_millis(1000);
