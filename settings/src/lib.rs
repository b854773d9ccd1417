use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use common::Point;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 图像增强参数
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnhanceSettings {
    #[schemars(title = "自适应阈值窗口边长(奇数且大于 1)")]
    pub block_size: u32,
    #[schemars(title = "自适应阈值偏移常量")]
    pub bias: i32,
}

impl EnhanceSettings {
    /// 自适应阈值窗口边长上限
    pub const MAX_BLOCK_SIZE: u32 = 65535;
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            block_size: 21,
            bias: 5,
        }
    }
}

/// 实时画面来源
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    #[schemars(title = "摄像头")]
    Camera,
    #[schemars(title = "主显示器")]
    Screen,
}

/// 实时识别参数
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LiveSettings {
    #[schemars(title = "画面来源")]
    pub source: CaptureSource,
    #[schemars(title = "摄像头序号")]
    pub camera_index: u32,
    #[schemars(title = "两次识别最小间隔(单位: 毫秒)")]
    pub poll_interval_ms: u64,
    #[schemars(title = "按键轮询等待时长(单位: 毫秒)")]
    pub key_poll_timeout_ms: u64,
    #[schemars(title = "提示文字位置")]
    pub label_position: Point,
    #[schemars(title = "等待识别时的提示文字")]
    pub idle_label: String,
    #[schemars(title = "识别中的提示文字")]
    pub busy_label: String,
    #[schemars(title = "预览窗口标题")]
    pub window_title: String,
    #[schemars(title = "提示文字字体文件路径(为空时使用内置字体)")]
    pub font_path: Option<PathBuf>,
    #[schemars(title = "提示文字字号")]
    pub font_scale: f32,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            source: CaptureSource::Camera,
            camera_index: 0,
            poll_interval_ms: 1000,
            key_poll_timeout_ms: 20,
            label_position: Point { x: 40, y: 40 },
            idle_label: "Detecting...".to_string(),
            busy_label: "Recognizing...".to_string(),
            window_title: "preview".to_string(),
            font_path: None,
            font_scale: 48.0,
        }
    }
}

impl LiveSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn key_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.key_poll_timeout_ms)
    }
}

/// OCR 引擎参数
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    #[schemars(title = "PP-OCR 识别模型路径(ONNX)")]
    pub model_path: PathBuf,
    #[schemars(title = "字符字典路径")]
    pub dict_path: PathBuf,
    #[schemars(title = "推理线程数")]
    pub intra_threads: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/rec.onnx"),
            dict_path: PathBuf::from("models/dict.txt"),
            intra_threads: 4,
        }
    }
}

/// 程序配置
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    #[schemars(title = "图像增强")]
    pub enhance: EnhanceSettings,
    #[schemars(title = "实时识别")]
    pub live: LiveSettings,
    #[schemars(title = "OCR 引擎")]
    pub engine: EngineSettings,
}

impl Settings {
    /// 通过文件名加载配置
    ///
    /// # 参数
    ///
    /// * `settings_file` - 配置文件名
    pub fn load(settings_file: impl AsRef<Path>) -> Result<Settings> {
        let settings_file = settings_file.as_ref();
        let settings_data = fs::read(settings_file)
            .with_context(|| format!("读取配置文件 {} 失败", settings_file.display()))?;
        let settings = serde_yaml::from_slice::<Settings>(settings_data.as_slice())
            .context("解析配置文件失败, 请检查格式是否正确")?;
        settings.validate()?;
        debug!("加载配置: {:?}", settings);
        Ok(settings)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        let block_size = self.enhance.block_size;
        if block_size <= 1 || block_size % 2 == 0 || block_size > EnhanceSettings::MAX_BLOCK_SIZE
        {
            bail!(
                "自适应阈值窗口边长必须为大于 1 且不超过 {} 的奇数, 当前为 {}",
                EnhanceSettings::MAX_BLOCK_SIZE,
                block_size
            );
        }
        if self.live.poll_interval_ms == 0 {
            bail!("识别间隔不能为 0");
        }
        if self.live.key_poll_timeout_ms == 0 {
            bail!("按键轮询等待时长不能为 0");
        }
        if self.engine.intra_threads == 0 {
            bail!("推理线程数不能为 0");
        }
        Ok(())
    }
}
