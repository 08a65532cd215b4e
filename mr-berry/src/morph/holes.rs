//! 逐水平切片的背景空洞检测.
//!
//! 空洞: 在某个水平切片内, 以 4-邻接规则连通、且不接触切片四条边缘的背景区域.
//! 接触边缘的背景区域属于身体外部, 不是空洞.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::neighbour4;
use crate::{BinaryMask, LabelVolume, MaskSlice, MaskSliceMut, Volume};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 空洞封闭性的判定范围.
///
/// 目前只有逐切片判定: 在某切片内被包围、但在相邻切片中与外部相通的背景区域,
/// 仍被视为该切片上的空洞.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectivityMode {
    /// 每个水平切片独立判定.
    #[default]
    PerSlice,
}

/// 单个切片的背景连通分量标记结果.
///
/// 分量编号为 `1..=count`, `0` 表示该像素是前景.
#[derive(Clone, Debug)]
pub struct ComponentMap {
    labels: Array2<u32>,

    /// 第 `i` 个元素是编号 `i + 1` 的分量的像素数.
    sizes: Vec<usize>,
}

impl ComponentMap {
    /// 分量个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// 逐像素的分量编号.
    #[inline]
    pub fn labels(&self) -> ArrayView2<'_, u32> {
        self.labels.view()
    }

    /// 编号为 `id` 的分量的像素数. `id` 不存在时返回 `None`.
    #[inline]
    pub fn size_of(&self, id: u32) -> Option<usize> {
        (id as usize).checked_sub(1).and_then(|i| self.sizes.get(i).copied())
    }

    /// 各分量是否接触切片边缘. 返回值按编号索引, 长度为 `count() + 1`,
    /// 第 0 个元素 (前景) 恒为 `false`.
    pub fn border_touching(&self) -> Vec<bool> {
        let mut touching = vec![false; self.count() + 1];
        let (h, w) = self.labels.dim();
        if h == 0 || w == 0 {
            return touching;
        }
        let rows = [0, h - 1].map(|r| self.labels.row(r));
        let cols = [0, w - 1].map(|c| self.labels.column(c));
        for line in rows.iter().chain(cols.iter()) {
            for &id in line.iter() {
                touching[id as usize] = true;
            }
        }
        touching[0] = false;
        touching
    }
}

/// 以 4-邻接规则标记切片 `fg` 中所有背景 (`false`) 像素的连通分量.
///
/// 分量按行优先序首次出现的位置依次编号. 时间复杂度与像素数成线性.
pub fn label_background(fg: MaskSlice<'_>) -> ComponentMap {
    let mut labels = Array2::<u32>::zeros(fg.shape());
    let mut sizes = Vec::with_capacity(4);
    let mut bfs_q = VecDeque::with_capacity(16);

    for (start, &is_fg) in fg.array_view().indexed_iter() {
        if is_fg || labels[start] != 0 {
            continue;
        }
        let id = sizes.len() as u32 + 1;
        labels[start] = id;
        bfs_q.push_back(start);

        let mut size = 0usize;
        while let Some(cur) = bfs_q.pop_front() {
            size += 1;
            for next in neighbour4(cur) {
                if matches!(fg.get(next), Some(false)) && labels[next] == 0 {
                    labels[next] = id;
                    bfs_q.push_back(next);
                }
            }
        }
        sizes.push(size);
    }

    ComponentMap { labels, sizes }
}

/// 空洞检测的统计信息.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HoleReport {
    /// 空洞体素总数.
    pub hole_voxels: usize,

    /// 至少含有一个空洞体素的水平切片个数.
    pub slices_with_holes: usize,

    /// 所有切片上的空洞 (连通分量) 总数.
    pub hole_components: usize,
}

/// 单个切片的空洞统计.
#[derive(Copy, Clone, Debug, Default)]
struct SliceHoles {
    voxels: usize,
    components: usize,
}

impl HoleReport {
    fn from_slices<I: IntoIterator<Item = SliceHoles>>(it: I) -> Self {
        it.into_iter().fold(Self::default(), |mut acc, s| {
            acc.hole_voxels += s.voxels;
            acc.hole_components += s.components;
            acc.slices_with_holes += usize::from(s.voxels > 0);
            acc
        })
    }
}

/// 将切片 `fg` 的空洞写入 `out`.
fn slice_holes(fg: MaskSlice<'_>, mut out: MaskSliceMut<'_>) -> SliceHoles {
    // 全背景切片只有一个贴边的背景分量, 没有空洞.
    if fg.is_empty() {
        return SliceHoles::default();
    }

    let comps = label_background(fg);
    let touching = comps.border_touching();

    let mut stats = SliceHoles::default();
    for (i, size) in comps.sizes.iter().enumerate() {
        if !touching[i + 1] {
            stats.components += 1;
            stats.voxels += size;
        }
    }
    if stats.components == 0 {
        return stats;
    }

    Zip::from(out.array_view_mut())
        .and(&comps.labels)
        .for_each(|o, &id| *o = id != 0 && !touching[id as usize]);
    stats
}

/// 背景空洞检测器. 独立的空洞检测与基于脂肪分数的空洞填充共用同一实现.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HoleDetector {
    mode: ConnectivityMode,
}

impl HoleDetector {
    /// 以给定的连通性判定范围构建检测器.
    #[inline]
    pub fn new(mode: ConnectivityMode) -> Self {
        Self { mode }
    }

    /// 在前景掩码 `fg` 上检测空洞, 返回空洞掩码和统计信息.
    pub fn detect(&self, fg: &BinaryMask) -> (BinaryMask, HoleReport) {
        let (holes, report) = match self.mode {
            ConnectivityMode::PerSlice => {
                let mut holes = BinaryMask::empty(fg.shape());
                let report = HoleReport::from_slices(
                    fg.slice_iter()
                        .zip(holes.slice_iter_mut())
                        .map(|(src, dst)| slice_holes(src, dst)),
                );
                (holes, report)
            }
        };
        log_report(&report);
        (holes, report)
    }

    /// 借助 `rayon`, 并行地在前景掩码 `fg` 上检测空洞.
    /// 各切片互不依赖, 结果与 [`Self::detect`] 完全一致.
    #[cfg(feature = "rayon")]
    pub fn par_detect(&self, fg: &BinaryMask) -> (BinaryMask, HoleReport) {
        let (holes, report) = match self.mode {
            ConnectivityMode::PerSlice => {
                let mut holes = BinaryMask::empty(fg.shape());
                let per_slice: Vec<SliceHoles> = holes
                    .data_mut()
                    .axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .enumerate()
                    .map(|(z, v)| slice_holes(fg.slice_at(z), MaskSliceMut::new(v)))
                    .collect();
                (holes, HoleReport::from_slices(per_slice))
            }
        };
        log_report(&report);
        (holes, report)
    }

    /// 从标签体数据出发检测空洞 (前景为 `label > 0`).
    /// 启用 `rayon` 时自动并行.
    pub fn detect_labels(&self, labels: &LabelVolume) -> (BinaryMask, HoleReport) {
        let fg = BinaryMask::from_labels(labels);

        #[cfg(feature = "rayon")]
        return self.par_detect(&fg);
        #[cfg(not(feature = "rayon"))]
        return self.detect(&fg);
    }
}

fn log_report(report: &HoleReport) {
    log::info!(
        "detected {} hole voxels ({} components) in {} axial slices",
        report.hole_voxels,
        report.hole_components,
        report.slices_with_holes
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Label;
    use ndarray::{array, Array3};

    fn mask_of(rows: Array2<u8>) -> BinaryMask {
        let (h, w) = rows.dim();
        BinaryMask::from_raw(rows.mapv(|v| v > 0).into_shape((1, h, w)).unwrap())
    }

    #[test]
    fn test_label_background_numbering() {
        let fg = array![
            [0u8, 1, 0, 0],
            [1, 1, 1, 1],
            [0, 1, 0, 1],
            [1, 1, 1, 1],
        ];
        let mask = mask_of(fg);
        let comps = label_background(mask.slice_at(0));
        assert_eq!(comps.count(), 4);
        assert_eq!(comps.labels()[(0, 0)], 1);
        assert_eq!(comps.labels()[(0, 2)], 2);
        assert_eq!(comps.labels()[(0, 3)], 2);
        assert_eq!(comps.labels()[(2, 0)], 3);
        assert_eq!(comps.labels()[(2, 2)], 4);
        assert_eq!(comps.labels()[(1, 1)], 0);
        assert_eq!(comps.size_of(2), Some(2));
        assert_eq!(comps.size_of(0), None);
        assert_eq!(comps.size_of(5), None);
        assert_eq!(
            comps.border_touching(),
            vec![false, true, true, true, false]
        );
    }

    #[test]
    fn test_diagonal_is_not_connected() {
        // 两个背景像素只在对角相接, 属于不同分量.
        let fg = array![
            [1u8, 1, 1, 1, 1],
            [1, 0, 1, 1, 1],
            [1, 1, 0, 1, 1],
            [1, 1, 1, 1, 1],
        ];
        let comps = label_background(mask_of(fg).slice_at(0));
        assert_eq!(comps.count(), 2);
    }

    /// 4x4 全前景, 仅内部一个背景像素: 一个大小为 1 的空洞.
    #[test]
    fn test_single_interior_hole() {
        let fg = array![
            [1u8, 1, 1, 1],
            [1, 0, 1, 1],
            [1, 1, 1, 1],
            [1, 1, 1, 1],
        ];
        let (holes, report) = HoleDetector::default().detect(&mask_of(fg));
        assert_eq!(report.hole_voxels, 1);
        assert_eq!(report.hole_components, 1);
        assert_eq!(report.slices_with_holes, 1);
        assert!(holes[(0, 1, 1)]);
    }

    /// 4x4, 边缘一圈为背景, 内部为前景: 背景贴边, 没有空洞.
    #[test]
    fn test_border_ring_is_not_a_hole() {
        let fg = array![
            [0u8, 0, 0, 0],
            [0, 1, 1, 0],
            [0, 1, 1, 0],
            [0, 0, 0, 0],
        ];
        let (holes, report) = HoleDetector::default().detect(&mask_of(fg));
        assert_eq!(report, HoleReport::default());
        assert_eq!(holes.count(), 0);
    }

    #[test]
    fn test_empty_slice_has_no_holes() {
        let (holes, report) = HoleDetector::default().detect(&BinaryMask::empty((3, 6, 5)));
        assert_eq!(holes.count(), 0);
        assert_eq!(report.slices_with_holes, 0);
    }

    #[test]
    fn test_holes_never_on_border() {
        let xyz = Array3::from_shape_fn((13, 11, 5), |(x, y, z)| {
            ((x * 7 + y * 5 + z * 3) % 4 != 0) as Label
        });
        let (holes, _) = HoleDetector::default().detect_labels(&LabelVolume::from_xyz(xyz));
        for s in holes.slice_iter() {
            for (pos, v) in s.array_view().indexed_iter() {
                if *v {
                    assert!(!s.is_at_border(pos));
                }
            }
        }
    }

    /// 同一个背景区域, 在一个切片内被包围, 在另一切片中通向外部:
    /// 只在前者上计为空洞.
    #[test]
    fn test_enclosure_is_per_slice() {
        let closed = array![
            [0u8, 0, 0, 0, 0],
            [0, 1, 1, 1, 0],
            [0, 1, 0, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0],
        ];
        let open = array![
            [0u8, 0, 0, 0, 0],
            [0, 1, 0, 1, 0],
            [0, 1, 0, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0],
        ];
        let mut data = Array3::from_elem((2, 5, 5), false);
        data.index_axis_mut(ndarray::Axis(0), 0)
            .assign(&closed.mapv(|v| v > 0));
        data.index_axis_mut(ndarray::Axis(0), 1)
            .assign(&open.mapv(|v| v > 0));
        let (holes, report) = HoleDetector::new(ConnectivityMode::PerSlice)
            .detect(&BinaryMask::from_raw(data));
        assert_eq!(report.hole_voxels, 1);
        assert!(holes[(0, 2, 2)]);
        assert!(!holes[(1, 2, 2)]);
    }

    #[test]
    fn test_connectivity_mode_serde_name() {
        #[derive(Deserialize)]
        struct Wrap {
            mode: ConnectivityMode,
        }
        let w: Wrap = toml::from_str("mode = \"per-slice\"").unwrap();
        assert_eq!(w.mode, ConnectivityMode::PerSlice);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_detect_matches_serial() {
        let xyz = Array3::from_shape_fn((17, 15, 7), |(x, y, z)| {
            ((x * 3 + y * 11 + z) % 5 != 0) as Label
        });
        let fg = BinaryMask::from_labels(&LabelVolume::from_xyz(xyz));
        let det = HoleDetector::default();
        assert_eq!(det.detect(&fg), det.par_detect(&fg));
    }
}
