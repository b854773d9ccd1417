use anyhow::{Context, Result};
use common::RawImage;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
};
use tracing::{debug, warn};

use crate::device::CaptureDevice;

/// 摄像头
pub struct CameraDevice {
    index: u32,
    camera: Option<Camera>,
}

impl CameraDevice {
    /// 创建摄像头实例
    ///
    /// # 参数
    ///
    /// * `index` - 摄像头序号
    pub fn new(index: u32) -> Self {
        Self {
            index,
            camera: None,
        }
    }
}

impl CaptureDevice for CameraDevice {
    fn open(&mut self) -> Result<()> {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(self.index), format)
            .with_context(|| format!("打开摄像头 {} 失败", self.index))?;
        camera.open_stream().context("开启摄像头画面失败")?;
        debug!(
            "摄像头 {} 已打开, 分辨率: {:?}",
            self.index,
            camera.resolution()
        );
        self.camera = Some(camera);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RawImage>> {
        let Some(camera) = self.camera.as_mut() else {
            return Ok(None);
        };
        let buffer = camera.frame().context("读取摄像头画面失败")?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .context("解码摄像头画面失败")?;
        let (width, height) = (decoded.width(), decoded.height());
        Ok(Some(RawImage::new(width, height, 3, decoded.into_raw())?))
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                warn!("关闭摄像头画面失败: {}", e);
            }
            debug!("摄像头 {} 已释放", self.index);
        }
    }
}
