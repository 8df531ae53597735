//! 日志初始化模块.
//!
//! 双输出:
//! - console: stderr, 彩色, 默认 warn (stdout 留给探测结果)
//! - file: 仅在 -v 及以上时启用, 无色, 按天滚动到 $cwd/logs/{prefix}.{date}.log
//!
//! 级别由 -v/-vv 控制, TAO_LOG 环境变量可覆盖. 库中 `log` 宏的记录经
//! tracing-subscriber 自带的 log 桥接一并输出.

use chrono::{Datelike, Local, Timelike};
use std::sync::OnceLock;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 日志目录
const LOG_DIR: &str = "logs";

fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn filter_for(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env("TAO_LOG").unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
}

/// 初始化日志系统
///
/// - `file_prefix`: 日志文件前缀
/// - `verbosity`: 0=warn, 1=debug, 2+=trace
pub fn init(file_prefix: &str, verbosity: u8) {
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(ConsoleFormatter)
        .with_filter(filter_for(verbosity));

    let file_layer = if verbosity > 0 {
        match open_log_file(file_prefix) {
            Ok(appender) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                LOG_GUARD.set(guard).ok();
                Some(
                    fmt::Layer::default()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .event_format(FileFormatter)
                        .with_filter(filter_for(verbosity)),
                )
            }
            Err(e) => {
                eprintln!("警告: 无法创建日志文件, 仅输出到控制台: {e}");
                None
            }
        }
    } else {
        None
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn open_log_file(file_prefix: &str) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(LOG_DIR).map_err(|e| e.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(LOG_DIR)
        .map_err(|e| e.to_string())
}

/// Console 格式: 彩色, 带时间戳
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write!(
            writer,
            "[{:02}:{:02}:{:02}.{:03}] {}{:5}\x1b[0m > ",
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis(),
            color,
            meta.level(),
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File 格式: 无色, 日期时间 + 级别 + 模块 + 消息
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        write!(
            writer,
            "[{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}] {:5} {} > ",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis(),
            meta.level(),
            meta.target(),
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
