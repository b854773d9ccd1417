use anyhow::{Result, anyhow};
use common::RawImage;
use tracing::debug;
use xcap::Monitor;

use crate::device::CaptureDevice;

/// 寻找主显示器
fn find_primary_monitor() -> Result<Monitor> {
    for monitor in Monitor::all()? {
        if monitor.is_primary()? {
            debug!("成功找到主显示器 '{}'", monitor.name()?);
            return Ok(monitor);
        }
    }
    Err(anyhow!("未找到主显示器"))
}

/// 主显示器画面
#[derive(Default)]
pub struct ScreenDevice {
    monitor: Option<Monitor>,
}

impl ScreenDevice {
    /// 创建屏幕采集实例
    pub fn new() -> Self {
        Self { monitor: None }
    }
}

impl CaptureDevice for ScreenDevice {
    fn open(&mut self) -> Result<()> {
        self.monitor = Some(find_primary_monitor()?);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RawImage>> {
        let Some(monitor) = self.monitor.as_ref() else {
            return Ok(None);
        };
        Ok(Some(RawImage::from_rgba(monitor.capture_image()?)?))
    }

    fn release(&mut self) {
        if self.monitor.take().is_some() {
            debug!("屏幕采集已释放");
        }
    }
}
