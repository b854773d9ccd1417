//! 图像增强
//!
//! 灰度化 -> 归一化 -> 反色 -> 自适应阈值 -> 反色, 每一步都生成新的图像.
//! 自适应阈值按 "亮底暗字" 的极性调校, 两次反色的顺序不能调换或省略.

use common::{Channels, RawImage};
use image::{GrayImage, Luma};
use settings::EnhanceSettings;
use tracing::trace;

use crate::error::OcrcamError;

/// 增强后的图像
///
/// 单通道, 像素值只有 0 和 255, 尺寸与原图一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedImage(GrayImage);

impl EnhancedImage {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

/// 图像增强器
#[derive(Debug, Clone, Copy)]
pub struct Enhancer {
    block_size: u32,
    bias: i32,
}

impl Enhancer {
    /// 创建图像增强器
    ///
    /// # 参数
    ///
    /// * `block_size` - 自适应阈值窗口边长, 必须为大于 1 且不超过
    ///   [`EnhanceSettings::MAX_BLOCK_SIZE`] 的奇数
    /// * `bias` - 自适应阈值偏移常量
    pub fn new(block_size: u32, bias: i32) -> Result<Self, OcrcamError> {
        if block_size <= 1 || block_size % 2 == 0 || block_size > EnhanceSettings::MAX_BLOCK_SIZE
        {
            return Err(OcrcamError::InvalidArguments(format!(
                "自适应阈值窗口边长必须为大于 1 且不超过 {} 的奇数, 当前为 {}",
                EnhanceSettings::MAX_BLOCK_SIZE,
                block_size
            )));
        }
        Ok(Self { block_size, bias })
    }

    /// 增强图像
    ///
    /// # 参数
    ///
    /// * `image` - 原始图像
    pub fn enhance(&self, image: &RawImage) -> EnhancedImage {
        let gray = to_grayscale(image);
        let normalized = normalize(&gray);
        let inverted = invert(&normalized);
        let binary = adaptive_threshold(&inverted, self.block_size, self.bias);
        let enhanced = invert(&binary);
        trace!(
            "图像增强完成: {}x{}",
            enhanced.width(),
            enhanced.height()
        );
        EnhancedImage(enhanced)
    }
}

impl Default for Enhancer {
    fn default() -> Self {
        Self {
            block_size: 21,
            bias: 5,
        }
    }
}

/// 灰度化
///
/// 按 0.299R + 0.587G + 0.114B 加权 (14 位定点数), 单通道图像直接复制
///
/// # 参数
///
/// * `image` - 原始图像
pub fn to_grayscale(image: &RawImage) -> GrayImage {
    let (width, height) = (image.width(), image.height());
    match image.channels() {
        Channels::Gray => GrayImage::from_raw(width, height, image.data().to_vec())
            .unwrap_or_else(|| GrayImage::new(width, height)),
        Channels::Rgb => {
            let data = image
                .data()
                .chunks_exact(3)
                .map(|rgb| {
                    let (r, g, b) = (rgb[0] as u32, rgb[1] as u32, rgb[2] as u32);
                    ((r * 4899 + g * 9617 + b * 1868 + 8192) >> 14) as u8
                })
                .collect();
            GrayImage::from_raw(width, height, data)
                .unwrap_or_else(|| GrayImage::new(width, height))
        }
    }
}

/// 归一化, 将像素值线性拉伸到 [0, 255]
///
/// 所有像素相同时结果全为 0
///
/// # 参数
///
/// * `image` - 灰度图像
pub fn normalize(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(min, max), pixel| {
            (min.min(pixel.0[0]), max.max(pixel.0[0]))
        });
    if min >= max {
        return GrayImage::new(image.width(), image.height());
    }
    let range = (max - min) as u32;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = (image.get_pixel(x, y).0[0] - min) as u32;
        Luma([((value * 255 + range / 2) / range) as u8])
    })
}

/// 反色
///
/// # 参数
///
/// * `image` - 灰度图像
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut inverted = image.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

/// 自适应阈值
///
/// 以每个像素为中心取 `block_size` x `block_size` 窗口 (边缘像素复制填充) 的均值,
/// 像素值大于 `均值 - bias` 时为 255, 否则为 0
///
/// # 参数
///
/// * `image` - 灰度图像
/// * `block_size` - 窗口边长
/// * `bias` - 偏移常量
pub fn adaptive_threshold(image: &GrayImage, block_size: u32, bias: i32) -> GrayImage {
    let means = box_mean(image, block_size / 2);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y).0[0] as i32;
        let mean = means[(y * image.width() + x) as usize] as i32;
        if value > mean - bias {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// 窗口均值, 先横向后纵向滑动求和
///
/// 阈值结果依赖均值的四舍五入取整, 因此不使用 `imageproc::filter::box_filter`
///
/// # 参数
///
/// * `image` - 灰度图像
/// * `radius` - 窗口半径
fn box_mean(image: &GrayImage, radius: u32) -> Vec<u8> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let radius = radius as isize;
    let clamp = |value: isize, len: usize| value.clamp(0, len as isize - 1) as usize;
    let pixels = image.as_raw();

    let mut rows = vec![0u64; width * height];
    for y in 0..height {
        let row = &pixels[y * width..(y + 1) * width];
        let mut sum: u64 = (-radius..=radius)
            .map(|dx| row[clamp(dx, width)] as u64)
            .sum();
        for x in 0..width {
            rows[y * width + x] = sum;
            let x = x as isize;
            sum += row[clamp(x + radius + 1, width)] as u64;
            sum -= row[clamp(x - radius, width)] as u64;
        }
    }

    let side = (2 * radius + 1) as u64;
    let area = side * side;
    let mut means = vec![0u8; width * height];
    for x in 0..width {
        let mut sum: u64 = (-radius..=radius)
            .map(|dy| rows[clamp(dy, height) * width + x])
            .sum();
        for y in 0..height {
            means[y * width + x] = ((sum + area / 2) / area) as u8;
            let y = y as isize;
            sum += rows[clamp(y + radius + 1, height) * width + x];
            sum -= rows[clamp(y - radius, height) * width + x];
        }
    }
    means
}
