//! 基于脂肪分数的空洞填充.

use ndarray::Zip;
use serde::Serialize;

use super::FatFractionGate;
use crate::config::Params;
use crate::consts::labels::is_background;
use crate::data::ensure_same_shape;
use crate::error::{BerryError, BerryResult};
use crate::morph::{HoleDetector, HoleReport};
use crate::{BinaryMask, Label, LabelVolume, ScalarVolume};

/// 空洞填充的统计信息.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// 被改写为填充标签的体素个数.
    pub filled: usize,

    /// 填充前的前景体素个数.
    pub nonzero_before: usize,

    /// 填充后的前景体素个数.
    pub nonzero_after: usize,
}

/// 在 `labels` 的一份拷贝上, 将 `holes` 与 `high_fat` 同时为 `true` 的体素
/// 改写为 `fill_label`, 其它体素保持不变.
///
/// # 注意
///
/// - 三个输入的形状必须一致, 否则在写入任何体素之前返回 `Err`;
/// - `fill_label` 不能为背景值, 否则前景体素个数可能减少.
pub fn fill_holes(
    labels: &LabelVolume,
    holes: &BinaryMask,
    high_fat: &BinaryMask,
    fill_label: Label,
) -> BerryResult<(LabelVolume, FillReport)> {
    ensure_same_shape("labels/holes", labels, holes)?;
    ensure_same_shape("labels/fat fraction", labels, high_fat)?;
    if is_background(fill_label) {
        return Err(BerryError::InvalidParameter(
            "填充标签不能为背景值 0".to_owned(),
        ));
    }

    let nonzero_before = labels.count_foreground();
    let mut out = labels.clone();
    let mut filled = 0usize;
    Zip::from(out.data_mut())
        .and(&holes.data())
        .and(&high_fat.data())
        .for_each(|p, &hole, &high| {
            if hole && high {
                *p = fill_label;
                filled += 1;
            }
        });

    let report = FillReport {
        filled,
        nonzero_before,
        nonzero_after: out.count_foreground(),
    };
    log::info!(
        "filled {} hole voxels with label {}; non-background voxels {} -> {}",
        report.filled,
        fill_label,
        report.nonzero_before,
        report.nonzero_after
    );
    Ok((out, report))
}

/// 空洞填充的完整结果.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    /// 填充后的标签.
    pub labels: LabelVolume,

    /// 空洞检测的统计信息.
    pub holes: HoleReport,

    /// 填充的统计信息.
    pub fill: FillReport,
}

/// 空洞检测 + 脂肪分数门限 + 填充的完整流程.
///
/// 空洞检测与独立的空洞检测命令共用同一个 [`HoleDetector`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoleFiller {
    detector: HoleDetector,
    gate: FatFractionGate,
    fill_label: Label,
}

impl HoleFiller {
    /// 构建填充流程. `fill_label` 不能为背景值.
    pub fn new(detector: HoleDetector, gate: FatFractionGate, fill_label: Label) -> BerryResult<Self> {
        if is_background(fill_label) {
            return Err(BerryError::InvalidParameter(
                "填充标签不能为背景值 0".to_owned(),
            ));
        }
        Ok(Self {
            detector,
            gate,
            fill_label,
        })
    }

    /// 依据参数 `params` 构建填充流程.
    pub fn from_params(params: &Params) -> BerryResult<Self> {
        Self::new(params.hole_detector(), params.fat_gate()?, params.fat_label)
    }

    /// 对 `labels` 执行空洞填充. `ff` 为与之逐体素对齐的脂肪分数图.
    ///
    /// 形状检查先于一切计算.
    pub fn run(&self, labels: &LabelVolume, ff: &ScalarVolume) -> BerryResult<FillOutcome> {
        ensure_same_shape("labels/fat fraction", labels, ff)?;

        let (holes, hole_report) = self.detector.detect_labels(labels);
        let high_fat = self.gate.high_fat_mask(ff);
        log::debug!(
            "{} voxels above fat fraction {}",
            high_fat.count(),
            self.gate.threshold()
        );
        let (labels, fill) = fill_holes(labels, &holes, &high_fat, self.fill_label)?;
        Ok(FillOutcome {
            labels,
            holes: hole_report,
            fill,
        })
    }
}
