use std::time::Duration;

use anyhow::Result;
use common::RawImage;

/// 按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// 退出键
    Escape,
    /// 字符键
    Char(char),
    /// 预览窗口被关闭
    WindowClosed,
    /// 其他按键
    Other,
}

/// 画面采集设备接口
pub trait CaptureDevice {
    /// 打开设备
    fn open(&mut self) -> Result<()>;
    /// 读取下一帧
    ///
    /// 返回 `None` 表示画面已结束
    fn read_frame(&mut self) -> Result<Option<RawImage>>;
    /// 释放设备
    fn release(&mut self);
}

/// 预览显示接口
pub trait Display {
    /// 显示画面并在固定位置绘制提示文字
    ///
    /// # 参数
    ///
    /// * `frame` - 画面
    /// * `label` - 提示文字
    fn show(&mut self, frame: &RawImage, label: &str) -> Result<()>;
    /// 等待按键, 超时返回 `None`
    ///
    /// # 参数
    ///
    /// * `timeout` - 等待时长
    fn poll_key(&mut self, timeout: Duration) -> Option<Key>;
    /// 关闭显示
    fn close(&mut self);
}
