use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod raw_image;

pub use raw_image::{Channels, ImageError, RawImage};

//常用结构体

/// 尺寸
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    #[schemars(title = "宽度")]
    pub width: i32,
    #[schemars(title = "高度")]
    pub height: i32,
}

/// 点坐标
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    #[schemars(title = "X 坐标")]
    pub x: i32,
    #[schemars(title = "Y 坐标")]
    pub y: i32,
}

/// 区域
///
/// 左上角坐标为 `start`，右下角坐标为 `end`
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    #[schemars(title = "区域左上角坐标")]
    pub start: Point,
    #[schemars(title = "区域右下角坐标")]
    pub end: Point,
}

impl Region {
    /// 覆盖整个尺寸的区域
    ///
    /// # 参数
    ///
    /// - `size` - 尺寸
    pub fn from_size(size: Size) -> Self {
        Region {
            start: Point { x: 0, y: 0 },
            end: Point {
                x: size.width,
                y: size.height,
            },
        }
    }
}

/// 为点增加偏移量
///
/// # 参数
///
/// - `point` - 点坐标
/// - `offset_x` - X 轴偏移量
/// - `offset_y` - Y 轴偏移量
pub fn point_offset(point: &Point, offset_x: Option<i32>, offset_y: Option<i32>) -> Point {
    let mut point = *point;
    if let Some(x) = offset_x {
        point.x += x;
    }
    if let Some(y) = offset_y {
        point.y += y;
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_size() {
        let region = Region::from_size(Size {
            width: 640,
            height: 480,
        });
        assert_eq!(region.start, Point { x: 0, y: 0 });
        assert_eq!(region.end, Point { x: 640, y: 480 });
    }

    #[test]
    fn test_point_offset() {
        let point = Point { x: 40, y: 40 };
        assert_eq!(point_offset(&point, Some(4), None), Point { x: 44, y: 40 });
        assert_eq!(point_offset(&point, None, Some(-8)), Point { x: 40, y: 32 });
    }
}
