use std::{thread, time::Duration};

use ab_glyph::FontVec;
use anyhow::{Result, anyhow};
use common::{Point, RawImage};
use minifb::{KeyRepeat, Window, WindowOptions};
use settings::LiveSettings;
use tracing::debug;

use crate::{
    device::{Display, Key},
    overlay::{load_font, render_label},
};

/// 将 minifb 按键转换为程序按键
fn map_key(key: minifb::Key) -> Key {
    match key {
        minifb::Key::Escape => Key::Escape,
        minifb::Key::Space => Key::Char(' '),
        minifb::Key::Q => Key::Char('q'),
        _ => Key::Other,
    }
}

/// 预览窗口
pub struct PreviewWindow {
    title: String,
    label_position: Point,
    font: FontVec,
    font_scale: f32,
    window: Option<Window>,
}

impl PreviewWindow {
    /// 创建预览窗口, 窗口在第一帧显示时打开
    ///
    /// # 参数
    ///
    /// * `settings` - 实时识别参数
    pub fn new(settings: &LiveSettings) -> Result<Self> {
        let font = load_font(settings.font_path.as_deref())?;
        Ok(Self {
            title: settings.window_title.clone(),
            label_position: settings.label_position,
            font,
            font_scale: settings.font_scale,
            window: None,
        })
    }

    /// 获取窗口, 不存在时按画面尺寸创建
    ///
    /// # 参数
    ///
    /// * `width` - 画面宽度
    /// * `height` - 画面高度
    fn window(&mut self, width: usize, height: usize) -> Result<&mut Window> {
        if self.window.is_none() {
            let window = Window::new(
                &self.title,
                width,
                height,
                WindowOptions {
                    resize: true,
                    ..WindowOptions::default()
                },
            )
            .map_err(|e| anyhow!("创建预览窗口失败: {}", e))?;
            debug!("预览窗口已打开: {}x{}", width, height);
            self.window = Some(window);
        }
        self.window
            .as_mut()
            .ok_or_else(|| anyhow!("预览窗口不存在"))
    }
}

impl Display for PreviewWindow {
    fn show(&mut self, frame: &RawImage, label: &str) -> Result<()> {
        let mut image = frame.to_rgb_image();
        render_label(
            &mut image,
            label,
            self.label_position,
            &self.font,
            self.font_scale,
        );

        let buffer: Vec<u32> = image
            .pixels()
            .map(|pixel| {
                let [r, g, b] = pixel.0;
                ((r as u32) << 16) | ((g as u32) << 8) | b as u32
            })
            .collect();
        let (width, height) = (image.width() as usize, image.height() as usize);

        let title = format!("{} - {}", self.title, label);
        let window = self.window(width, height)?;
        window.set_title(&title);
        window
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| anyhow!("刷新预览窗口失败: {}", e))
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        thread::sleep(timeout);
        let window = self.window.as_mut()?;
        window.update();
        if !window.is_open() {
            return Some(Key::WindowClosed);
        }
        window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .next()
            .map(map_key)
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            debug!("预览窗口已关闭");
        }
    }
}
