use std::{cell::RefCell, fs, path::Path};

use anyhow::{Context, Result, anyhow};
use common::{Region, Size};
use image::{
    GrayImage,
    imageops::{self, FilterType},
};

use ndarray::{Array, ArrayBase, ArrayView2, Dim, OwnedRepr};
use ort::{
    session::{Session, SessionOutputs, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use tracing::debug;

use crate::ocr::{Ocr, OcrFragment};

/// 模型输入高度
const TARGET_HEIGHT: u32 = 48;

/// 基于 PaddleOCR 的 OCR 实现
pub struct PPOcr {
    session: RefCell<Session>,
    character_dict: Vec<String>,
}

impl PPOcr {
    /// 创建 PPOcr 实例
    ///
    /// # 参数
    ///
    /// * `model_path` - PP-OCR 识别模型文件 (ONNX)
    /// * `dict_path` - 字符字典文件, 每行一个字符
    /// * `intra_threads` - 推理线程数
    pub fn new(model_path: &Path, dict_path: &Path, intra_threads: usize) -> Result<PPOcr> {
        let character_dict = fs::read_to_string(dict_path)
            .with_context(|| format!("读取字符字典 {} 失败", dict_path.display()))?
            .lines()
            .map(String::from)
            .collect();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)
            .with_context(|| format!("加载 OCR 模型 {} 失败", model_path.display()))?;

        debug!("PP-OCR 模型加载成功: {}", model_path.display());

        Ok(PPOcr {
            session: RefCell::new(session),
            character_dict,
        })
    }

    /// 将图像转换为张量数组数据
    ///
    /// # 参数
    ///
    /// * `image` - 输入图像
    fn image_to_tensor_array_data(image: &GrayImage) -> ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>> {
        let (width, height) = image.dimensions();

        let target_width =
            (((width as f32 / height as f32) * TARGET_HEIGHT as f32) as u32).max(1);

        let resized_image =
            imageops::resize(image, target_width, TARGET_HEIGHT, FilterType::Triangle);
        let mut input = Array::zeros((1, 3, TARGET_HEIGHT as usize, target_width as usize));

        for (x, y, pixel) in resized_image.enumerate_pixels() {
            let value = pixel.0[0] as f32 / 255.0;
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] = value;
            }
        }
        input
    }

    /// 处理模型输出
    ///
    /// # 参数
    ///
    /// * `outputs` - 模型输出
    fn handle_session_outputs(&self, outputs: &SessionOutputs) -> Result<(String, f32)> {
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;

        if output_shape.len() != 3 {
            return Err(anyhow!("意想不到的输出形状: {:?}", output_shape));
        }

        let batch_size_out = output_shape[0] as usize;
        let seq_len = output_shape[1] as usize;
        let num_classes = output_shape[2] as usize;
        let expected_len = batch_size_out * seq_len * num_classes;

        if output_data.len() != expected_len {
            return Err(anyhow!("意想不到的输出长度: {}", output_data.len()));
        }

        let array_view =
            ndarray::ArrayView3::from_shape((batch_size_out, seq_len, num_classes), output_data)
                .map_err(|e| anyhow!("转换输出到数组视图失败: {}", e))?;

        let preds = array_view.index_axis(ndarray::Axis(0), 0);
        let (text, confidence) = ctc_decode(preds, &self.character_dict);

        debug!("识别结果: {}, 置信度: {}", text, confidence);

        Ok((text, confidence))
    }
}

/// CTC 贪心解码
///
/// 每一步取概率最大的类别, 合并连续重复项并丢弃空白类别 (下标 0)
///
/// # 参数
///
/// * `preds` - 序列概率, 形状为 (序列长度, 类别数)
/// * `character_dict` - 字符字典, 类别 `i` 对应 `character_dict[i - 1]`
fn ctc_decode(preds: ArrayView2<f32>, character_dict: &[String]) -> (String, f32) {
    let blank_index = 0;

    let mut sequence_idx = Vec::new();
    let mut sequence_prob = Vec::new();

    for row in preds.outer_iter() {
        if let Some((idx, &prob)) = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        {
            sequence_idx.push(idx);
            sequence_prob.push(prob);
        }
    }

    let mut text = String::new();
    let mut filtered_prob = Vec::new();

    for (i, &idx) in sequence_idx.iter().enumerate() {
        if (i > 0 && sequence_idx[i] == sequence_idx[i - 1]) || idx == blank_index {
            continue;
        }
        // 字典外的类别 (如 PP-OCR 末尾的空格类) 忽略
        if let Some(character) = character_dict.get(idx - 1) {
            text.push_str(character);
            filtered_prob.push(sequence_prob[i]);
        }
    }

    if filtered_prob.is_empty() {
        return ("".to_string(), 0.0);
    }

    let confidence = filtered_prob.iter().sum::<f32>() / filtered_prob.len() as f32;
    (text.trim().to_string(), confidence)
}

impl Ocr for PPOcr {
    /// 识别图像中的文本
    ///
    /// 识别模型只处理单行文本, 整张图像作为一个区域
    ///
    /// # 参数
    ///
    /// * `image` - 输入图像
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrFragment>> {
        let tensor = PPOcr::image_to_tensor_array_data(image);
        let tensor = TensorRef::from_array_view(tensor.view())?;
        let mut session = self.session.borrow_mut();
        let outputs = session.run(ort::inputs![tensor])?;
        let (text, confidence) = self.handle_session_outputs(&outputs)?;

        if text.is_empty() {
            return Ok(vec![]);
        }

        let (width, height) = image.dimensions();
        Ok(vec![OcrFragment {
            region: Region::from_size(Size {
                width: width as i32,
                height: height as i32,
            }),
            text,
            confidence,
        }])
    }
}
