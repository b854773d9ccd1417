use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::Level;

use crate::error::OcrcamError;

/// 图片与实时画面文字识别工具
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 实时识别模式 (摄像头或屏幕画面, 按 Esc 退出)
    #[arg(short = 'd', long, default_value_t = false)]
    pub on_demand: bool,

    /// 待识别的图片文件列表
    #[arg(short, long, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// 增加日志详细程度, 可重复使用 (如 -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// 调试模式
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// 不输出任何日志
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// 配置文件路径 (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 日志文件路径
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// 追加日志到文件
    #[arg(long, default_value_t = false)]
    pub append_log: bool,

    /// OCR 识别模型路径, 覆盖配置文件
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// 字符字典路径, 覆盖配置文件
    #[arg(long)]
    pub dict: Option<PathBuf>,
}

/// 运行模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// 识别图片文件
    Files(Vec<PathBuf>),
    /// 实时识别
    OnDemand,
}

impl Args {
    /// 创建命令行参数解析器
    pub fn new() -> Self {
        Self::parse()
    }

    /// 确定运行模式, `--on-demand` 与 `--files` 必须且只能指定一个
    pub fn mode(&self) -> Result<Mode, OcrcamError> {
        match (self.on_demand, self.files.is_empty()) {
            (true, true) => Ok(Mode::OnDemand),
            (false, false) => Ok(Mode::Files(self.files.clone())),
            _ => Err(OcrcamError::InvalidArguments(
                "必须且只能指定 --on-demand 或 --files 其中之一".to_string(),
            )),
        }
    }

    /// 日志等级, `None` 表示关闭日志
    ///
    /// 默认与 `-v` 为 info, `-vv` 或 `--debug` 为 debug, `-vvv` 及以上为 trace
    pub fn log_level(&self) -> Option<Level> {
        if self.quiet {
            return None;
        }
        let verbose = if self.debug {
            self.verbose.max(2)
        } else {
            self.verbose
        };
        Some(match verbose {
            0 | 1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        })
    }
}
