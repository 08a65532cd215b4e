//! 逐水平切片的外周皮肤层提取.

use ndarray::Array2;
use serde::Serialize;

use super::erode_n4;
use crate::consts::labels::is_background;
use crate::error::{BerryError, BerryResult};
use crate::{BinaryMask, Label, LabelVolume, MaskSlice, MaskSliceMut, Volume};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 皮肤层提取器.
///
/// 对每个水平切片, 以十字形结构元腐蚀前景 `thickness` 次,
/// 前景中被腐蚀掉的部分即为该切片的外周壳层. 对任意切片都有
/// `壳层 ∪ 腐蚀后内部 == 原前景`, 且两者不相交.
///
/// 全背景切片直接跳过, 不会产生任何壳层像素.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SkinExtractor {
    thickness: u32,
}

/// 皮肤层提取的统计信息.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkinReport {
    /// 被标记为皮肤的体素个数.
    pub skin_voxels: usize,

    /// 含有皮肤体素的水平切片个数.
    pub slices_with_skin: usize,
}

impl SkinExtractor {
    /// 构建提取器. `thickness` 为壳层厚度 (体素), 必须为正.
    pub fn new(thickness: u32) -> BerryResult<Self> {
        if thickness == 0 {
            return Err(BerryError::InvalidParameter(
                "皮肤层厚度必须为正整数".to_owned(),
            ));
        }
        Ok(Self { thickness })
    }

    /// 壳层厚度.
    #[inline]
    pub fn thickness(&self) -> u32 {
        self.thickness
    }

    /// 单个切片腐蚀后的内部区域.
    #[inline]
    pub fn interior(&self, fg: MaskSlice<'_>) -> Array2<bool> {
        erode_n4(fg, self.thickness)
    }

    /// 单个切片的壳层: `前景 AND NOT 内部`. 全背景切片返回全 `false`.
    pub fn shell_slice(&self, fg: MaskSlice<'_>) -> Array2<bool> {
        if fg.is_empty() {
            return Array2::from_elem(fg.shape(), false);
        }
        let interior = self.interior(fg.shallow_copy());
        let mut shell = fg.array_view().to_owned();
        shell.zip_mut_with(&interior, |s, i| *s &= !*i);
        shell
    }

    /// 将切片 `fg` 的壳层写入 `out`.
    fn shell_into(&self, fg: MaskSlice<'_>, mut out: MaskSliceMut<'_>) {
        if fg.is_empty() {
            return;
        }
        out.assign(&self.shell_slice(fg));
    }

    /// 计算整个体数据的皮肤层掩码 (逐切片, 串行).
    pub fn shell(&self, fg: &BinaryMask) -> BinaryMask {
        let mut out = BinaryMask::empty(fg.shape());
        for (src, dst) in fg.slice_iter().zip(out.slice_iter_mut()) {
            self.shell_into(src, dst);
        }
        out
    }

    /// 借助 `rayon`, 并行地计算整个体数据的皮肤层掩码.
    /// 各切片互不依赖, 结果与 [`Self::shell`] 完全一致.
    #[cfg(feature = "rayon")]
    pub fn par_shell(&self, fg: &BinaryMask) -> BinaryMask {
        let mut out = BinaryMask::empty(fg.shape());
        out.data_mut()
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(z, v)| {
                self.shell_into(fg.slice_at(z), MaskSliceMut::new(v));
            });
        out
    }

    /// 为标签添加皮肤层: 在输入的一份拷贝上, 将壳层体素一律覆写为 `skin_label`
    /// (无论原先是什么标签).
    ///
    /// `skin_label` 不能为背景值.
    pub fn apply(
        &self,
        labels: &LabelVolume,
        skin_label: Label,
    ) -> BerryResult<(LabelVolume, SkinReport)> {
        if is_background(skin_label) {
            return Err(BerryError::InvalidParameter(
                "皮肤标签不能为背景值 0".to_owned(),
            ));
        }
        let fg = BinaryMask::from_labels(labels);

        #[cfg(feature = "rayon")]
        let shell = self.par_shell(&fg);
        #[cfg(not(feature = "rayon"))]
        let shell = self.shell(&fg);

        let mut out = labels.clone();
        out.data_mut().zip_mut_with(&shell.data(), |p, s| {
            if *s {
                *p = skin_label;
            }
        });

        let report = SkinReport {
            skin_voxels: shell.count(),
            slices_with_skin: shell.count_slices_with_any(),
        };
        log::info!(
            "found {} skin voxels in {} axial slices (thickness {}, label {})",
            report.skin_voxels,
            report.slices_with_skin,
            self.thickness,
            skin_label
        );
        Ok((out, report))
    }
}
