use std::path::PathBuf;

use tracing::{error, info};

use crate::{error::OcrcamError, recognizer::Recognizer};

/// 单个文件的识别结果
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: Result<String, OcrcamError>,
}

/// 依次识别图片文件
///
/// 单个文件失败只记录日志, 不影响其余文件
///
/// # 参数
///
/// * `recognizer` - 文字识别器
/// * `files` - 图片文件列表
pub fn recognize_files(recognizer: &Recognizer, files: &[PathBuf]) -> Vec<FileReport> {
    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        info!("正在识别文件: {}", path.display());
        let outcome = recognizer.recognize_file(path);
        match &outcome {
            Ok(text) if text.is_empty() => info!("未识别到文字"),
            Ok(text) => info!("识别结果: {}", text),
            Err(e) => error!("识别文件 {} 失败: {}", path.display(), e),
        }
        reports.push(FileReport {
            path: path.clone(),
            outcome,
        });
    }
    let failed = reports.iter().filter(|report| report.outcome.is_err()).count();
    info!(
        "文件识别完成: 成功 {} 个, 失败 {} 个",
        reports.len() - failed,
        failed
    );
    reports
}
