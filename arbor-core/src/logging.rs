//! 日志初始化
//!
//! 配置来源（优先级从高到低）：
//! 1. `RUST_LOG`：完整的过滤指令，出现时其余级别设置不生效
//! 2. `Environment` 中的 `logging.*` 属性（配置文件的 `[logging]` 段、带前缀的环境变量）
//! 3. `ARBOR_LOG_LEVEL` / `ARBOR_LOG_CONTAINER_LEVEL` / `ARBOR_LOG_FORMAT`
//!
//! 容器自身（`arbor_beans`、`arbor_context`）的级别可以单独设置，
//! 只打开 Bean 创建过程的 trace 而不影响应用日志。

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::Environment;
use crate::error::{ContainerError, ContainerResult};

/// 容器自身的日志 target
pub const CONTAINER_TARGETS: [&str; 2] = ["arbor_beans", "arbor_context"];

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ContainerError::Config(format!("Invalid log level: '{}'", s))),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 与 EnvFilter 指令的写法一致
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 紧凑格式（默认）
    Compact,
    Full,
    Json,
    /// 多行美化，适合开发时阅读 Bean 创建过程
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ContainerError::Config(format!("Invalid log format: '{}'", s))),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 全局级别（默认 info）
    pub level: LogLevel,

    /// 容器内部 target 的级别，未设置时跟随全局级别
    pub container_level: Option<LogLevel>,

    pub format: LogFormat,

    pub show_timestamp: bool,

    pub show_target: bool,

    /// 排查并发创建单例时很有用
    pub show_thread_ids: bool,

    /// 完整的过滤指令，设置后忽略 `level` 和 `container_level`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            container_level: None,
            format: LogFormat::Compact,
            show_timestamp: true,
            show_target: false,
            show_thread_ids: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// 单独设置容器内部日志的级别
    pub fn container_level(mut self, level: LogLevel) -> Self {
        self.container_level = Some(level);
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_timestamp(mut self, show: bool) -> Self {
        self.show_timestamp = show;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn show_thread_ids(mut self, show: bool) -> Self {
        self.show_thread_ids = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从 `ARBOR_LOG_*` 和 `RUST_LOG` 环境变量读取
    ///
    /// 无法识别的取值被忽略并保留默认值
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = env_var("ARBOR_LOG_LEVEL").and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(level) = env_var("ARBOR_LOG_CONTAINER_LEVEL").and_then(|v| v.parse().ok()) {
            config.container_level = Some(level);
        }
        if let Some(format) = env_var("ARBOR_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config.filter = env_var("RUST_LOG");
        config
    }

    /// 在 [`LoggingConfig::from_env`] 的基础上叠加 `Environment` 中的 `logging.*` 属性
    ///
    /// 配置文件里写错的级别或格式直接报错
    pub fn from_environment(environment: &Environment) -> ContainerResult<Self> {
        let mut config = Self::from_env();
        if let Some(level) = environment.get_string("logging.level") {
            config.level = level.parse()?;
        }
        if let Some(level) = environment.get_string("logging.container-level") {
            config.container_level = Some(level.parse()?);
        }
        if let Some(format) = environment.get_string("logging.format") {
            config.format = format.parse()?;
        }
        if let Some(show) = environment.get_bool("logging.show-timestamp") {
            config.show_timestamp = show;
        }
        if let Some(show) = environment.get_bool("logging.show-target") {
            config.show_target = show;
        }
        if let Some(show) = environment.get_bool("logging.show-thread-ids") {
            config.show_thread_ids = show;
        }
        if config.filter.is_none() {
            config.filter = environment.get_string("logging.filter");
        }
        Ok(config)
    }

    /// 生成的过滤指令，例如 `warn,arbor_beans=trace,arbor_context=trace`
    pub fn directives(&self) -> String {
        if let Some(filter) = &self.filter {
            return filter.clone();
        }
        let mut directives = vec![self.level.to_string()];
        if let Some(container) = self.container_level {
            directives.extend(
                CONTAINER_TARGETS
                    .iter()
                    .map(|target| format!("{}={}", target, container)),
            );
        }
        directives.join(",")
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids);
        match (self.format, self.show_timestamp) {
            (LogFormat::Compact, true) => layer.compact().boxed(),
            (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
            (LogFormat::Full, true) => layer.boxed(),
            (LogFormat::Full, false) => layer.without_time().boxed(),
            (LogFormat::Json, _) => layer.json().boxed(),
            (LogFormat::Pretty, _) => layer.pretty().boxed(),
        }
    }

    /// 安装全局 subscriber
    ///
    /// 只能成功一次，重复调用或过滤指令无效时返回 `LoggingInitFailed`
    pub fn init(self) -> ContainerResult<()> {
        let filter = EnvFilter::try_new(self.directives())
            .map_err(|e| ContainerError::LoggingInitFailed(e.to_string()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(self.fmt_layer())
            .try_init()
            .map_err(|e| ContainerError::LoggingInitFailed(e.to_string()))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
