use common::ImageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrcamError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("画面采集设备不可用: {0}")]
    DeviceUnavailable(String),
    #[error("OCR 引擎识别失败: {0:#}")]
    Engine(anyhow::Error),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}
