use std::time::Instant;

use capture::{CaptureDevice, Display, Key};
use common::RawImage;
use settings::LiveSettings;
use tracing::{Span, debug, info, info_span, warn};

use crate::{error::OcrcamError, recognizer::Recognizer};

/// 时钟接口
pub trait Clock {
    fn now(&self) -> Instant;
}

/// 系统时钟
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 实时识别状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Previewing,
    Recognizing,
    Closed,
}

/// 实时识别结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 按下退出键或关闭了预览窗口
    ExitKey,
    /// 画面结束
    EndOfStream,
    /// 读取画面失败
    DeviceError,
    /// 显示画面失败
    DisplayError,
}

/// 实时识别统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub reason: CloseReason,
    pub frames: u64,
    pub recognitions: u64,
    /// 识别到的文字, 按识别顺序
    pub texts: Vec<String>,
}

/// 实时识别会话
///
/// 独占采集设备和预览窗口, 结束时 (包括提前释放) 保证只释放一次
pub struct CaptureSession<'a> {
    device: Box<dyn CaptureDevice>,
    display: Box<dyn Display>,
    settings: &'a LiveSettings,
    clock: &'a dyn Clock,
    state: SessionState,
    label: String,
    last_recognition: Instant,
    exit: bool,
    span: Span,
}

impl<'a> CaptureSession<'a> {
    /// 创建实时识别会话
    ///
    /// # 参数
    ///
    /// * `device` - 画面采集设备 (未打开)
    /// * `display` - 预览窗口
    /// * `settings` - 实时识别参数
    /// * `clock` - 时钟
    pub fn new(
        device: Box<dyn CaptureDevice>,
        display: Box<dyn Display>,
        settings: &'a LiveSettings,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            device,
            display,
            settings,
            clock,
            state: SessionState::Opening,
            label: settings.idle_label.clone(),
            last_recognition: clock.now(),
            exit: false,
            span: info_span!("live"),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 是否由用户退出
    pub fn exit_requested(&self) -> bool {
        self.exit
    }

    /// 打开设备并读取第一帧
    fn open(&mut self) -> Result<RawImage, OcrcamError> {
        self.device
            .open()
            .map_err(|e| OcrcamError::DeviceUnavailable(format!("{:#}", e)))?;
        match self.device.read_frame() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(OcrcamError::DeviceUnavailable(
                "未读取到第一帧画面".to_string(),
            )),
            Err(e) => Err(OcrcamError::DeviceUnavailable(format!(
                "读取第一帧画面失败: {:#}",
                e
            ))),
        }
    }

    /// 开始实时识别, 直到按下退出键或画面结束
    ///
    /// 识别在画面循环中同步执行, 识别期间画面暂停刷新
    ///
    /// # 参数
    ///
    /// * `recognizer` - 文字识别器
    /// * `report` - 识别到文字时的回调, 文字同时记录在返回的统计中
    pub fn run(
        &mut self,
        recognizer: &Recognizer,
        mut report: impl FnMut(&str),
    ) -> Result<SessionReport, OcrcamError> {
        let span = self.span.clone();
        let _enter = span.enter();

        let mut frame = match self.open() {
            Ok(frame) => frame,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };
        info!("实时识别已开始, 按 Esc 退出");

        self.state = SessionState::Previewing;
        self.last_recognition = self.clock.now();
        let poll_interval = self.settings.poll_interval();
        let key_poll_timeout = self.settings.key_poll_timeout();
        let mut frames = 1;
        let mut recognitions = 0;
        let mut texts = vec![];

        let reason = loop {
            if let Err(e) = self.display.show(&frame, &self.label) {
                warn!("显示画面失败, 结束实时识别: {:#}", e);
                break CloseReason::DisplayError;
            }

            frame = match self.device.read_frame() {
                Ok(Some(next)) => next,
                Ok(None) => {
                    info!("画面已结束");
                    break CloseReason::EndOfStream;
                }
                Err(e) => {
                    warn!("读取画面失败, 结束实时识别: {:#}", e);
                    break CloseReason::DeviceError;
                }
            };
            frames += 1;

            if let Some(key) = self.display.poll_key(key_poll_timeout) {
                if matches!(key, Key::Escape | Key::WindowClosed) {
                    debug!("收到退出按键: {:?}", key);
                    self.exit = true;
                    break CloseReason::ExitKey;
                }
            }

            if self.clock.now().duration_since(self.last_recognition) > poll_interval {
                recognitions += 1;
                if let Some(text) = self.recognize_frame(recognizer, &frame) {
                    report(&text);
                    texts.push(text);
                }
                self.last_recognition = self.clock.now();
            }
        };

        self.close();
        let session_report = SessionReport {
            reason,
            frames,
            recognitions,
            texts,
        };
        info!("实时识别已结束: {:?}", session_report);
        Ok(session_report)
    }

    /// 识别当前画面
    ///
    /// 识别到文字时更新提示文字, 未识别到或识别失败时恢复原提示文字
    ///
    /// # 参数
    ///
    /// * `recognizer` - 文字识别器
    /// * `frame` - 当前画面
    fn recognize_frame(&mut self, recognizer: &Recognizer, frame: &RawImage) -> Option<String> {
        self.state = SessionState::Recognizing;
        let previous_label =
            std::mem::replace(&mut self.label, self.settings.busy_label.clone());
        if let Err(e) = self.display.show(frame, &self.label) {
            debug!("显示识别提示失败: {:#}", e);
        }

        let result = recognizer.recognize_raw_image(frame);
        self.state = SessionState::Previewing;

        match result {
            Ok(text) if !text.is_empty() => {
                info!("识别结果: {}", text);
                self.label = text.clone();
                Some(text)
            }
            Ok(_) => {
                debug!("未识别到文字");
                self.label = previous_label;
                None
            }
            Err(e) => {
                warn!("识别失败, 跳过本次识别: {}", e);
                self.label = previous_label;
                None
            }
        }
    }

    /// 释放设备并关闭预览窗口, 重复调用无效果
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.device.release();
        self.display.close();
        self.state = SessionState::Closed;
        debug!("采集设备已释放, 预览窗口已关闭");
    }
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
        rc::Rc,
        time::Duration,
    };

    use anyhow::{Result, anyhow};
    use image::GrayImage;
    use ocr::{Ocr, OcrFragment};

    use super::*;
    use crate::enhance::Enhancer;

    /// 手动推进的时钟
    struct ManualClock {
        base: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }
    }

    /// 输出固定帧数的采集设备
    struct ScriptedDevice {
        frames: usize,
        fail_after: Option<usize>,
        open_fails: bool,
        read: usize,
        released: Rc<Cell<usize>>,
    }

    impl CaptureDevice for ScriptedDevice {
        fn open(&mut self) -> Result<()> {
            if self.open_fails {
                return Err(anyhow!("没有摄像头"));
            }
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<RawImage>> {
            if self.fail_after == Some(self.read) {
                return Err(anyhow!("摄像头已断开"));
            }
            if self.read >= self.frames {
                return Ok(None);
            }
            self.read += 1;
            Ok(Some(RawImage::new(16, 16, 3, vec![128; 16 * 16 * 3])?))
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    /// 按轮询次数返回按键, 每次轮询推进时钟
    struct ScriptedDisplay {
        keys: HashMap<usize, Key>,
        polls: usize,
        offset: Rc<Cell<Duration>>,
        labels: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<usize>>,
    }

    impl Display for ScriptedDisplay {
        fn show(&mut self, _frame: &RawImage, label: &str) -> Result<()> {
            self.labels.borrow_mut().push(label.to_string());
            Ok(())
        }

        fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
            self.offset.set(self.offset.get() + timeout);
            self.polls += 1;
            self.keys.get(&self.polls).copied()
        }

        fn close(&mut self) {
            self.closed.set(self.closed.get() + 1);
        }
    }

    /// 记录识别时间的 OCR 引擎
    struct TimedOcr {
        texts: RefCell<Vec<Result<&'static str, &'static str>>>,
        cost: Duration,
        offset: Rc<Cell<Duration>>,
        started: RefCell<Vec<Duration>>,
    }

    impl Ocr for TimedOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<Vec<OcrFragment>> {
            self.started.borrow_mut().push(self.offset.get());
            self.offset.set(self.offset.get() + self.cost);
            let next = {
                let mut texts = self.texts.borrow_mut();
                if texts.is_empty() { Ok("") } else { texts.remove(0) }
            };
            match next {
                Err(message) => Err(anyhow!(message)),
                Ok("") => Ok(vec![]),
                Ok(text) => Ok(vec![OcrFragment {
                    region: common::Region::from_size(common::Size {
                        width: 16,
                        height: 16,
                    }),
                    text: text.to_string(),
                    confidence: 1.0,
                }]),
            }
        }
    }

    struct Harness {
        offset: Rc<Cell<Duration>>,
        released: Rc<Cell<usize>>,
        closed: Rc<Cell<usize>>,
        labels: Rc<RefCell<Vec<String>>>,
        clock: ManualClock,
        settings: LiveSettings,
    }

    impl Harness {
        fn new() -> Self {
            let offset = Rc::new(Cell::new(Duration::ZERO));
            Self {
                clock: ManualClock {
                    base: Instant::now(),
                    offset: offset.clone(),
                },
                offset,
                released: Rc::new(Cell::new(0)),
                closed: Rc::new(Cell::new(0)),
                labels: Rc::new(RefCell::new(vec![])),
                settings: LiveSettings::default(),
            }
        }

        fn device(&self, frames: usize) -> ScriptedDevice {
            ScriptedDevice {
                frames,
                fail_after: None,
                open_fails: false,
                read: 0,
                released: self.released.clone(),
            }
        }

        fn display(&self, keys: &[(usize, Key)]) -> ScriptedDisplay {
            ScriptedDisplay {
                keys: keys.iter().copied().collect(),
                polls: 0,
                offset: self.offset.clone(),
                labels: self.labels.clone(),
                closed: self.closed.clone(),
            }
        }

        fn ocr(&self, texts: Vec<Result<&'static str, &'static str>>) -> TimedOcr {
            TimedOcr {
                texts: RefCell::new(texts),
                cost: Duration::ZERO,
                offset: self.offset.clone(),
                started: RefCell::new(vec![]),
            }
        }

        fn run(
            &self,
            device: ScriptedDevice,
            display: ScriptedDisplay,
            ocr: &TimedOcr,
        ) -> (Result<SessionReport, OcrcamError>, Vec<String>) {
            let enhancer = Enhancer::default();
            let recognizer = Recognizer::new(ocr, &enhancer);
            let mut texts = vec![];
            let mut session = CaptureSession::new(
                Box::new(device),
                Box::new(display),
                &self.settings,
                &self.clock,
            );
            let result = session.run(&recognizer, |text| texts.push(text.to_string()));
            assert_eq!(session.state(), SessionState::Closed);
            drop(session);
            (result, texts)
        }
    }

    #[test]
    fn test_end_of_stream_releases_once() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let (result, _) = harness.run(harness.device(5), harness.display(&[]), &ocr);

        let report = result.unwrap();
        assert_eq!(report.reason, CloseReason::EndOfStream);
        assert_eq!(report.frames, 5);
        assert_eq!(harness.labels.borrow().len(), 5);
        assert_eq!(harness.released.get(), 1);
        assert_eq!(harness.closed.get(), 1);
    }

    #[test]
    fn test_exit_key_releases_once() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let display = harness.display(&[(1, Key::Char('a')), (3, Key::Escape)]);
        let (result, _) = harness.run(harness.device(100), display, &ocr);

        let report = result.unwrap();
        assert_eq!(report.reason, CloseReason::ExitKey);
        assert_eq!(report.frames, 4);
        assert_eq!(harness.released.get(), 1);
        assert_eq!(harness.closed.get(), 1);
    }

    #[test]
    fn test_window_closed_exits() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let display = harness.display(&[(2, Key::WindowClosed)]);
        let (result, _) = harness.run(harness.device(100), display, &ocr);
        assert_eq!(result.unwrap().reason, CloseReason::ExitKey);
        assert_eq!(harness.released.get(), 1);
    }

    #[test]
    fn test_device_disconnect_releases_once() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let mut device = harness.device(100);
        device.fail_after = Some(4);
        let (result, _) = harness.run(device, harness.display(&[]), &ocr);

        let report = result.unwrap();
        assert_eq!(report.reason, CloseReason::DeviceError);
        assert_eq!(report.frames, 4);
        assert_eq!(harness.released.get(), 1);
        assert_eq!(harness.closed.get(), 1);
    }

    #[test]
    fn test_open_failure_is_device_unavailable() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let mut device = harness.device(10);
        device.open_fails = true;
        let (result, _) = harness.run(device, harness.display(&[]), &ocr);

        assert!(matches!(result, Err(OcrcamError::DeviceUnavailable(_))));
        assert!(harness.labels.borrow().is_empty());
        assert_eq!(harness.released.get(), 1);
        assert_eq!(harness.closed.get(), 1);
    }

    #[test]
    fn test_missing_first_frame_is_device_unavailable() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let (result, _) = harness.run(harness.device(0), harness.display(&[]), &ocr);

        assert!(matches!(result, Err(OcrcamError::DeviceUnavailable(_))));
        assert!(harness.labels.borrow().is_empty());
        assert_eq!(harness.released.get(), 1);
    }

    #[test]
    fn test_first_frame_error_is_device_unavailable() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        let mut device = harness.device(10);
        device.fail_after = Some(0);
        let (result, _) = harness.run(device, harness.display(&[]), &ocr);
        assert!(matches!(result, Err(OcrcamError::DeviceUnavailable(_))));
        assert_eq!(harness.released.get(), 1);
    }

    #[test]
    fn test_drop_without_run_releases_once() {
        let harness = Harness::new();
        let session = CaptureSession::new(
            Box::new(harness.device(3)),
            Box::new(harness.display(&[])),
            &harness.settings,
            &harness.clock,
        );
        assert_eq!(session.state(), SessionState::Opening);
        drop(session);
        assert_eq!(harness.released.get(), 1);
        assert_eq!(harness.closed.get(), 1);
    }

    #[test]
    fn test_debounce_within_interval() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        // 39 次轮询, 共 780 毫秒
        let (result, _) = harness.run(harness.device(40), harness.display(&[]), &ocr);

        assert!(result.unwrap().recognitions <= 1);
        assert!(ocr.started.borrow().len() <= 1);
    }

    #[test]
    fn test_debounce_over_two_intervals() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![]);
        // 159 次轮询, 共 3180 毫秒
        let (result, _) = harness.run(harness.device(160), harness.display(&[]), &ocr);

        let started = ocr.started.borrow();
        assert!(started.len() >= 2);
        assert_eq!(result.unwrap().recognitions as usize, started.len());
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= harness.settings.poll_interval());
        }
    }

    #[test]
    fn test_debounce_with_slow_recognition() {
        let harness = Harness::new();
        let mut ocr = harness.ocr(vec![]);
        ocr.cost = Duration::from_millis(700);
        let (_, _) = harness.run(harness.device(200), harness.display(&[]), &ocr);

        let started = ocr.started.borrow();
        assert!(started.len() >= 2);
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= harness.settings.poll_interval());
        }
    }

    #[test]
    fn test_labels_follow_recognition_results() {
        let harness = Harness::new();
        let ocr = harness.ocr(vec![Ok("STOP"), Ok(""), Err("引擎异常"), Ok("EXIT 12")]);
        let (result, texts) = harness.run(harness.device(230), harness.display(&[]), &ocr);

        let report = result.unwrap();
        assert_eq!(report.reason, CloseReason::EndOfStream);
        assert_eq!(report.recognitions, 4);
        assert_eq!(texts, vec!["STOP".to_string(), "EXIT 12".to_string()]);
        assert_eq!(report.texts, texts);

        let labels = harness.labels.borrow();
        assert_eq!(labels.first().map(String::as_str), Some("Detecting..."));
        assert!(labels.iter().any(|label| label == "Recognizing..."));
        assert_eq!(labels.last().map(String::as_str), Some("EXIT 12"));

        // 识别为空或失败时保留上一次的提示文字
        let busy_positions: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| *label == "Recognizing...")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(busy_positions.len(), 4);
        assert_eq!(labels[busy_positions[1] + 1], "STOP");
        assert_eq!(labels[busy_positions[2] + 1], "STOP");
    }
}
