use std::{fs, path::Path};

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result, anyhow};
use common::{Point, point_offset};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

/// 内置字体
const DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// 加载提示文字字体, 未指定字体文件时使用内置字体
///
/// # 参数
///
/// * `font_path` - 字体文件路径
pub fn load_font(font_path: Option<&Path>) -> Result<FontVec> {
    match font_path {
        Some(path) => {
            let data = fs::read(path)
                .with_context(|| format!("读取字体文件 {} 失败", path.display()))?;
            FontVec::try_from_vec(data)
                .map_err(|e| anyhow!("解析字体文件 {} 失败: {}", path.display(), e))
        }
        None => FontVec::try_from_vec(DEFAULT_FONT.to_vec())
            .map_err(|e| anyhow!("解析内置字体失败: {}", e)),
    }
}

/// 在画面上绘制提示文字 (白字黑影)
///
/// # 参数
///
/// * `image` - 画面
/// * `label` - 提示文字
/// * `position` - 文字左上角坐标
/// * `font` - 字体
/// * `scale` - 字号
pub fn render_label(
    image: &mut RgbImage,
    label: &str,
    position: Point,
    font: &FontVec,
    scale: f32,
) {
    let scale = PxScale::from(scale);
    let shadow = point_offset(&position, Some(2), Some(2));
    draw_text_mut(image, Rgb([0, 0, 0]), shadow.x, shadow.y, scale, font, label);
    draw_text_mut(image, Rgb([255, 255, 255]), position.x, position.y, scale, font, label);
}
