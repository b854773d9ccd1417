use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use thiserror::Error;

/// 图像错误
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("无效的图像数据: {0}")]
    InvalidImage(String),
    #[error("图像文件 {} 不存在", .0.display())]
    FileNotFound(PathBuf),
    #[error("图像文件 {} 解码失败: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// 像素通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Rgb,
}

impl Channels {
    /// 每个像素的字节数
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }

    fn from_count(count: u8) -> Result<Self, ImageError> {
        match count {
            1 => Ok(Channels::Gray),
            3 => Ok(Channels::Rgb),
            _ => Err(ImageError::InvalidImage(format!(
                "不支持的通道数: {}",
                count
            ))),
        }
    }
}

/// 原始图像
///
/// 摄像头帧或文件解码后的 8 位像素数据, 构造时校验, 之后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl RawImage {
    /// 创建原始图像
    ///
    /// # 参数
    ///
    /// * `width` - 宽度
    /// * `height` - 高度
    /// * `channels` - 通道数 (1 或 3)
    /// * `data` - 按行排列的像素数据
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, ImageError> {
        let channels = Channels::from_count(channels)?;
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidImage(format!(
                "图像尺寸为空: {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(ImageError::InvalidImage(format!(
                "像素数据长度 {} 与尺寸 {}x{}x{} 不符",
                data.len(),
                width,
                height,
                channels.count()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// 从 `image` 库的图像转换
    ///
    /// 灰度图保持单通道, 其余格式统一转为 RGB
    ///
    /// # 参数
    ///
    /// * `image` - 解码后的图像
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImageError> {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray),
            other if !other.color().has_color() => Self::from_gray(other.to_luma8()),
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    /// 从灰度图转换
    pub fn from_gray(image: GrayImage) -> Result<Self, ImageError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, 1, image.into_raw())
    }

    /// 从 RGB 图转换
    pub fn from_rgb(image: RgbImage) -> Result<Self, ImageError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, 3, image.into_raw())
    }

    /// 从 RGBA 图转换, 丢弃透明通道
    pub fn from_rgba(image: RgbaImage) -> Result<Self, ImageError> {
        Self::from_rgb(DynamicImage::ImageRgba8(image).to_rgb8())
    }

    /// 从文件读取图像
    ///
    /// # 参数
    ///
    /// * `path` - 图像文件路径
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ImageError::FileNotFound(path.to_path_buf()));
        }
        let image = image::open(path).map_err(|source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dynamic(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 转为 RGB 图像, 用于预览显示
    pub fn to_rgb_image(&self) -> RgbImage {
        match self.channels {
            Channels::Rgb => RgbImage::from_raw(self.width, self.height, self.data.clone())
                .unwrap_or_else(|| RgbImage::new(self.width, self.height)),
            Channels::Gray => RgbImage::from_fn(self.width, self.height, |x, y| {
                let value = self.data[(y * self.width + x) as usize];
                image::Rgb([value, value, value])
            }),
        }
    }
}
