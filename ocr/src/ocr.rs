use anyhow::Result;
use common::Region;
use image::GrayImage;

/// OCR 识别片段
#[derive(Debug, Clone, PartialEq)]
pub struct OcrFragment {
    pub region: Region,
    pub text: String,
    pub confidence: f32,
}

/// OCR 接口
pub trait Ocr {
    /// 识别图片中的文字
    ///
    /// 按引擎给出的顺序返回识别片段, 未识别到文字时返回空列表
    ///
    /// # 参数
    ///
    /// * `image` - 待识别的图片 (已增强的单通道图像)
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrFragment>>;
}
