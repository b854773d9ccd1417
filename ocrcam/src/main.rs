use std::io::Write;

use anyhow::Context;
use ocr::PPOcr;
use settings::Settings;
use tracing::{debug, error, info};

use crate::{
    args::{Args, Mode},
    batch::recognize_files,
    enhance::Enhancer,
    error::OcrcamError,
    live::{CaptureSession, SystemClock},
    log::init_log,
    recognizer::Recognizer,
};

mod args;
mod batch;
mod enhance;
mod error;
mod live;
mod log;
mod recognizer;

/// 加载配置, 命令行参数优先
///
/// # 参数
///
/// * `args` - 命令行参数
fn load_settings(args: &Args) -> Result<Settings, OcrcamError> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(model) = &args.model {
        settings.engine.model_path = model.clone();
    }
    if let Some(dict) = &args.dict {
        settings.engine.dict_path = dict.clone();
    }
    Ok(settings)
}

/// 程序入口
fn application(args: &Args) -> Result<(), OcrcamError> {
    let mode = args.mode()?;

    info!("欢迎使用 ocrcam 文字识别工具");
    debug!("{:?}", args);

    let settings = load_settings(args)?;
    // 图像增强
    let enhancer = Enhancer::new(settings.enhance.block_size, settings.enhance.bias)?;
    // OCR 识别
    let pp_ocr = PPOcr::new(
        &settings.engine.model_path,
        &settings.engine.dict_path,
        settings.engine.intra_threads,
    )
    .context("OCR 引擎初始化失败")?;
    let recognizer = Recognizer::new(&pp_ocr, &enhancer);

    match mode {
        Mode::Files(files) => {
            for report in recognize_files(&recognizer, &files) {
                if let Ok(text) = report.outcome {
                    println!("{}: {}", report.path.display(), text);
                }
            }
        }
        Mode::OnDemand => {
            info!("进入实时识别模式");
            let device = capture::create_device(&settings.live)?;
            let display = capture::create_display(&settings.live)?;
            let clock = SystemClock;
            let mut session = CaptureSession::new(device, display, &settings.live, &clock);
            session.run(&recognizer, |text| println!("{}", text))?;
            if session.exit_requested() {
                info!("已按退出键结束实时识别");
            }
        }
    }
    Ok(())
}

/// 输出执行结果, 返回进程退出码
///
/// # 参数
///
/// * `result` - 执行结果
/// * `quiet` - 是否为静默模式
/// * `stderr` - 静默模式下参数错误的输出位置
fn exit_code(result: Result<(), OcrcamError>, quiet: bool, stderr: &mut impl Write) -> i32 {
    match result {
        Ok(_) => {
            info!("程序已执行完毕");
            0
        }
        Err(e) => {
            // 静默模式下参数错误仍输出到 stderr
            if quiet && matches!(e, OcrcamError::InvalidArguments(_)) {
                let _ = writeln!(stderr, "{}", e);
            }
            error!("程序存在异常: {:#}", e);
            1
        }
    }
}

fn main() {
    let args = Args::new();

    let dispatch = match init_log(&args) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("初始化日志失败: {:#}", e);
            std::process::exit(1);
        }
    };

    let code = tracing::dispatcher::with_default(&dispatch, || {
        exit_code(application(&args), args.quiet, &mut std::io::stderr())
    });
    std::process::exit(code);
}
