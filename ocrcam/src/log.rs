use std::fs::OpenOptions;

use anyhow::Result;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::{Layer, fmt, registry};

use crate::args::Args;

/// 日志时间格式
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 创建日志记录器
///
/// 返回的 `Dispatch` 由调用方在需要的范围内启用, 不设置全局默认记录器
///
/// # 参数
///
/// * `args` - 命令行参数
pub fn init_log(args: &Args) -> Result<Dispatch> {
    let level_filter = args
        .log_level()
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF);

    let filter = Targets::new()
        .with_default(level_filter)
        .with_target("ort", LevelFilter::ERROR);

    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_filter(filter.clone());

    let file_layer = match &args.log_file {
        Some(log_file) => {
            let file_writer = OpenOptions::new()
                .write(true)
                .append(args.append_log)
                .truncate(!args.append_log)
                .create(true)
                .open(log_file)?;
            Some(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_timer(fmt::time::ChronoLocal::new(TIME_FORMAT.to_string()))
                    .with_filter(filter.clone()),
            )
        }
        None => None,
    };

    let subscriber = registry().with(console_layer).with(file_layer);
    Ok(Dispatch::new(subscriber))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tracing::Level;

    use super::*;

    #[test]
    fn test_init_log_writes_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log_file = dir.path().join("ocrcam.log");
        let args = Args::try_parse_from([
            "ocrcam",
            "-d",
            "--log-file",
            log_file.to_str().unwrap_or_default(),
        ])?;

        let dispatch = init_log(&args)?;
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("日志测试");
            tracing::debug!("不应写入");
        });

        let content = std::fs::read_to_string(&log_file)?;
        assert!(content.contains("日志测试"));
        assert!(!content.contains("不应写入"));
        Ok(())
    }

    #[test]
    fn test_init_log_quiet() -> Result<()> {
        let args = Args::try_parse_from(["ocrcam", "-d", "-q"])?;
        assert_eq!(args.log_level(), None::<Level>);
        let dispatch = init_log(&args)?;
        tracing::dispatcher::with_default(&dispatch, || {
            assert!(!tracing::enabled!(Level::ERROR));
        });
        Ok(())
    }
}
