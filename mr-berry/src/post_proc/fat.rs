//! 脂肪分数: 由 DIXON 脂/水图像计算脂肪分数图, 以及基于门限的高脂判定.

use itertools::{Itertools, MinMaxResult};
use ndarray::Zip;
use serde::Serialize;

use crate::data::ensure_same_shape;
use crate::error::{BerryError, BerryResult};
use crate::{BinaryMask, ScalarVolume};

/// 脂肪分数门限.
///
/// 脂肪分数 **严格大于** 门限的体素被视为高脂体素; 恰好等于门限的体素不是.
/// `NaN` 永远不被视为高脂.
///
/// # 注意
///
/// 门限通常位于 `[0, 1]` 内, 但这里不强制检查.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FatFractionGate {
    threshold: f32,
}

impl FatFractionGate {
    /// 构建门限. `threshold` 必须是有限值.
    pub fn new(threshold: f32) -> BerryResult<Self> {
        if !threshold.is_finite() {
            return Err(BerryError::InvalidParameter(format!(
                "脂肪分数门限必须是有限值, 实际为 {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    /// 门限值.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 单个体素是否为高脂?
    #[inline]
    pub fn is_high(&self, value: f32) -> bool {
        value > self.threshold
    }

    /// 逐体素判定, 得到高脂掩码.
    pub fn high_fat_mask(&self, ff: &ScalarVolume) -> BinaryMask {
        BinaryMask::from_raw(ff.data().mapv(|v| self.is_high(v)))
    }
}

/// 脂肪分数图的统计信息.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct FatFractionStats {
    /// 全体体素中的最小值.
    pub min: f32,

    /// 全体体素中的最大值.
    pub max: f32,

    /// 信号总和 (脂 + 水) 为正的体素上的均值. 没有这样的体素时为 0.
    pub mean: f32,
}

/// 由脂肪图像 `fat` 和水图像 `water` 计算脂肪分数图:
/// `ff = fat / (fat + water)`, 信号总和不为正的体素取 0.
///
/// 输出沿用 `fat` 的空间元信息. 两者形状不一致时返回 `Err`.
pub fn fat_fraction(
    fat: &ScalarVolume,
    water: &ScalarVolume,
) -> BerryResult<(ScalarVolume, FatFractionStats)> {
    ensure_same_shape("fat/water", fat, water)?;

    let ff = Zip::from(&fat.data())
        .and(&water.data())
        .map_collect(|&f, &w| {
            let total = f + w;
            if total > 0.0 {
                f / total
            } else {
                0.0
            }
        });

    let (min, max) = match ff.iter().copied().minmax_by(f32::total_cmp) {
        MinMaxResult::NoElements => (0.0, 0.0),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };

    let (sum, n) = Zip::from(&ff)
        .and(&fat.data())
        .and(&water.data())
        .fold((0f64, 0usize), |(sum, n), &v, &f, &w| {
            if f + w > 0.0 {
                (sum + v as f64, n + 1)
            } else {
                (sum, n)
            }
        });
    let mean = if n == 0 { 0.0 } else { (sum / n as f64) as f32 };

    let stats = FatFractionStats { min, max, mean };
    log::info!(
        "fat fraction range [{:.4}, {:.4}], mean {:.4} over {} voxels with signal",
        stats.min,
        stats.max,
        stats.mean,
        n
    );
    Ok((ScalarVolume::from_header_of(fat, ff), stats))
}
