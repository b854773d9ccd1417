#[cfg(feature = "camera")]
mod camera;
mod device;
mod overlay;
#[cfg(feature = "preview")]
mod preview;
#[cfg(feature = "screen")]
mod screen;

use anyhow::Result;
#[cfg(not(all(feature = "camera", feature = "screen", feature = "preview")))]
use anyhow::bail;
use settings::{CaptureSource, LiveSettings};

#[cfg(feature = "camera")]
pub use camera::CameraDevice;
pub use device::{CaptureDevice, Display, Key};
pub use overlay::{load_font, render_label};
#[cfg(feature = "preview")]
pub use preview::PreviewWindow;
#[cfg(feature = "screen")]
pub use screen::ScreenDevice;

/// 按配置创建画面采集设备 (尚未打开)
///
/// # 参数
///
/// * `settings` - 实时识别参数
pub fn create_device(settings: &LiveSettings) -> Result<Box<dyn CaptureDevice>> {
    match settings.source {
        #[cfg(feature = "camera")]
        CaptureSource::Camera => Ok(Box::new(CameraDevice::new(settings.camera_index))),
        #[cfg(not(feature = "camera"))]
        CaptureSource::Camera => bail!("当前程序未启用摄像头支持 (camera 特性)"),
        #[cfg(feature = "screen")]
        CaptureSource::Screen => Ok(Box::new(ScreenDevice::new())),
        #[cfg(not(feature = "screen"))]
        CaptureSource::Screen => bail!("当前程序未启用屏幕采集支持 (screen 特性)"),
    }
}

/// 按配置创建预览窗口
///
/// # 参数
///
/// * `settings` - 实时识别参数
pub fn create_display(settings: &LiveSettings) -> Result<Box<dyn Display>> {
    #[cfg(feature = "preview")]
    {
        Ok(Box::new(PreviewWindow::new(settings)?))
    }
    #[cfg(not(feature = "preview"))]
    {
        let _ = settings;
        bail!("当前程序未启用预览窗口支持 (preview 特性)")
    }
}
