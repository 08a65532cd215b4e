//! 逐水平切片的二维形态学操作: 4-邻域腐蚀, 皮肤层提取与背景空洞检测.

mod holes;
mod skin;

use ndarray::Array2;

use crate::{Idx2d, MaskSlice};

pub use holes::{label_background, ComponentMap, ConnectivityMode, HoleDetector, HoleReport};
pub use skin::{SkinExtractor, SkinReport};

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界.
///
/// 越过上/左边缘的索引会回绕为 `usize::MAX` 附近的值, 交给调用方的越界检查过滤.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 以十字形 (4-邻域) 结构元对二值切片做 `iterations` 次腐蚀.
///
/// 图像以外的位置视为背景, 因此贴边的前景像素在第一次腐蚀时即被去除.
/// 结果总是输入的子集; 当前景被腐蚀殆尽时提前结束.
pub fn erode_n4(slice: MaskSlice<'_>, iterations: u32) -> Array2<bool> {
    let mut cur = slice.array_view().to_owned();
    for _ in 0..iterations {
        let src = MaskSlice::new(cur.view());
        if src.is_empty() {
            break;
        }
        let next = Array2::from_shape_fn(src.shape(), |pos| src[pos] && src.is_n4_all_set(pos));
        cur = next;
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::erode_n4;
    use crate::MaskSlice;
    use ndarray::{array, Array2};

    fn square(n: usize, lo: usize, hi: usize) -> Array2<bool> {
        Array2::from_shape_fn((n, n), |(h, w)| (lo..hi).contains(&h) && (lo..hi).contains(&w))
    }

    #[test]
    fn test_erode_once() {
        let s = square(5, 1, 4);
        let e = erode_n4(MaskSlice::new(s.view()), 1);
        assert_eq!(e, square(5, 2, 3));
    }

    #[test]
    fn test_erode_zero_iterations_is_identity() {
        let s = square(6, 1, 5);
        assert_eq!(erode_n4(MaskSlice::new(s.view()), 0), s);
    }

    #[test]
    fn test_erode_border_counts_as_background() {
        let s = Array2::from_elem((3, 3), true);
        let e = erode_n4(MaskSlice::new(s.view()), 1);
        let mut expected = Array2::from_elem((3, 3), false);
        expected[(1, 1)] = true;
        assert_eq!(e, expected);
    }

    #[test]
    fn test_erode_cross_not_diagonal() {
        // 中心像素的对角为背景, 4-邻域全部为前景, 因此中心保留.
        let s = array![
            [false, true, false],
            [true, true, true],
            [false, true, false],
        ];
        let padded = Array2::from_shape_fn((5, 5), |(h, w)| {
            (1..4).contains(&h) && (1..4).contains(&w) && s[(h - 1, w - 1)]
        });
        let e = erode_n4(MaskSlice::new(padded.view()), 1);
        assert_eq!(e.iter().filter(|v| **v).count(), 1);
        assert!(e[(2, 2)]);
    }

    #[test]
    fn test_erode_until_empty() {
        let s = square(6, 1, 5);
        let e = erode_n4(MaskSlice::new(s.view()), 10);
        assert!(e.iter().all(|v| !*v));
    }
}
