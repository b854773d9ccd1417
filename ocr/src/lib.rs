mod ocr;
mod pp_ocr;

pub use ocr::{Ocr, OcrFragment};
pub use pp_ocr::PPOcr;
