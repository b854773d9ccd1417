use std::path::Path;

use common::RawImage;
use ocr::Ocr;
use tracing::{Span, debug, info_span};

use crate::{
    enhance::{EnhancedImage, Enhancer},
    error::OcrcamError,
};

/// 文字识别器
///
/// 封装 OCR 引擎, 调用方无需关心图像来自文件、画面帧还是已增强的图像
pub struct Recognizer<'a> {
    ocr: &'a dyn Ocr,
    enhancer: &'a Enhancer,
    span: Span,
}

impl<'a> Recognizer<'a> {
    /// 创建识别器
    ///
    /// # 参数
    ///
    /// * `ocr` - 文字识别引擎
    /// * `enhancer` - 图像增强器
    pub fn new(ocr: &'a dyn Ocr, enhancer: &'a Enhancer) -> Self {
        Self {
            ocr,
            enhancer,
            span: info_span!("recognizer"),
        }
    }

    /// 识别已增强的图像
    ///
    /// 按引擎返回顺序以单个空格拼接各片段文字, 未识别到文字时返回空字符串
    ///
    /// # 参数
    ///
    /// * `image` - 增强后的图像
    pub fn recognize(&self, image: &EnhancedImage) -> Result<String, OcrcamError> {
        let _enter = self.span.enter();
        let fragments = self
            .ocr
            .recognize(image.as_gray())
            .map_err(OcrcamError::Engine)?;
        debug!("识别到 {} 个文字片段", fragments.len());
        Ok(fragments
            .iter()
            .map(|fragment| fragment.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// 识别原始画面帧
    ///
    /// # 参数
    ///
    /// * `frame` - 原始图像
    pub fn recognize_raw_image(&self, frame: &RawImage) -> Result<String, OcrcamError> {
        let enhanced = self.enhancer.enhance(frame);
        self.recognize(&enhanced)
    }

    /// 识别图片文件
    ///
    /// # 参数
    ///
    /// * `path` - 图片文件路径
    pub fn recognize_file(&self, path: &Path) -> Result<String, OcrcamError> {
        let raw_image = {
            let _enter = self.span.enter();
            debug!("读取图片: {}", path.display());
            RawImage::open(path)?
        };
        self.recognize_raw_image(&raw_image)
    }
}
