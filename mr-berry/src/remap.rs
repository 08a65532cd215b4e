//! 标签重映射: 组织类型合并, 以及按静态表折叠标签.

use std::collections::BTreeMap;

use ndarray::Zip;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::consts::labels::{SAT, TISSUE_TYPE_VAT, VAT, VAT_STAGING};
use crate::data::ensure_same_shape;
use crate::error::{BerryError, BerryResult};
use crate::{Label, LabelVolume};

/// 默认折叠表, 按解剖学分组: `(目标标签, 被折叠的源标签)`.
/// 目标标签自身总是映射到自身.
const COLLAPSE_GROUPS: &[(Label, &[Label])] = &[
    // 肾
    (2, &[3]),
    // 肾上腺
    (9, &[8]),
    // 肺
    (10, &[11, 12, 13, 14]),
    // 血管
    (
        26,
        &[25, 27, 28, 29, 30, 31, 32, 33, 35, 36, 37, 38, 39, 40, 41, 104, 110, 111],
    ),
    // 骨
    (
        42,
        &[23, 43, 44, 45, 46, 47, 48, 49, 50, 51, 63, 69, 70, 72, 101, 102, 116],
    ),
    // 肌肉
    (66, &[53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 103, 105]),
    // 内脏脂肪
    (VAT, &[VAT_STAGING]),
    // 皮下脂肪
    (SAT, &[106, 114]),
    // 前列腺
    (22, &[107]),
    // 肠
    (18, &[108]),
    // 阴茎
    (109, &[]),
    // 胰腺
    (7, &[112]),
    // 气管
    (16, &[113]),
    // 胃
    (6, &[115]),
];

static DEFAULT_COLLAPSE: Lazy<LabelMap> = Lazy::new(|| {
    let pairs = COLLAPSE_GROUPS.iter().flat_map(|&(target, sources)| {
        std::iter::once((target, target)).chain(sources.iter().map(move |&s| (s, target)))
    });
    // 内置表满足不动点约束.
    LabelMap::new(pairs).expect("内置折叠表不一致")
});

/// 不可变的标签映射表 `源标签 -> 目标标签`. 表中未列出的标签保持不变.
///
/// 构建时检查一致性: 每个目标标签如果出现在表中, 必须映射到自身,
/// 因此映射是幂等的.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMap {
    map: BTreeMap<Label, Label>,
}

/// 一次重映射中, 某个源标签的改写情况.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemapChange {
    /// 源标签.
    pub from: Label,

    /// 目标标签.
    pub to: Label,

    /// 被改写的体素个数.
    pub voxels: usize,
}

/// 标签重映射的统计信息.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RemapReport {
    /// 被改写的体素总数.
    pub changed_voxels: usize,

    /// 实际发生改写的源标签, 按源标签升序排列.
    pub changes: Vec<RemapChange>,
}

impl LabelMap {
    /// 由 `(源, 目标)` 对构建映射表.
    ///
    /// # 注意
    ///
    /// - 同一源标签出现多次且目标不同, 返回 `Err`;
    /// - 目标标签出现在源标签中却不映射到自身, 返回 `Err`;
    /// - 源或目标为背景值 0 且不是 `0 -> 0`, 返回 `Err`.
    pub fn new<I: IntoIterator<Item = (Label, Label)>>(pairs: I) -> BerryResult<Self> {
        let mut map = BTreeMap::new();
        for (from, to) in pairs {
            if (from == 0) != (to == 0) {
                return Err(BerryError::InvalidParameter(format!(
                    "标签映射 {from} -> {to} 涉及背景值"
                )));
            }
            if let Some(prev) = map.insert(from, to) {
                if prev != to {
                    return Err(BerryError::InvalidParameter(format!(
                        "标签 {from} 同时映射到 {prev} 和 {to}"
                    )));
                }
            }
        }
        for (&from, &to) in map.iter() {
            if let Some(&next) = map.get(&to) {
                if next != to {
                    return Err(BerryError::InvalidParameter(format!(
                        "{from} -> {to} 的目标标签不是不动点 ({to} -> {next})"
                    )));
                }
            }
        }
        Ok(Self { map })
    }

    /// 内置的解剖学折叠表 (左右器官合并, 骨骼/血管/肌肉分组, VAT 临时标签还原等).
    #[inline]
    pub fn collapse_default() -> &'static LabelMap {
        &DEFAULT_COLLAPSE
    }

    /// 单个标签的映射结果.
    #[inline]
    pub fn get(&self, label: Label) -> Label {
        self.map.get(&label).copied().unwrap_or(label)
    }

    /// 表项个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 是否为空表?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 在 `labels` 的一份拷贝上执行重映射. 整个体数据只遍历一次 (查表).
    pub fn apply(&self, labels: &LabelVolume) -> (LabelVolume, RemapReport) {
        let lut_len = self.map.keys().next_back().map_or(0, |&k| k as usize + 1);
        let lut: Vec<Label> = (0..lut_len).map(|v| self.get(v as Label)).collect();
        let mut hits = vec![0usize; lut_len];
        log::debug!("applying label map with {} entries", self.len());

        let mut out = labels.clone();
        out.data_mut().map_inplace(|p| {
            let i = *p as usize;
            if i < lut_len && lut[i] != *p {
                hits[i] += 1;
                *p = lut[i];
            }
        });

        let changes: Vec<RemapChange> = hits
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(from, &voxels)| RemapChange {
                from: from as Label,
                to: lut[from],
                voxels,
            })
            .collect();
        for c in changes.iter() {
            log::debug!("{} -> {}: {} voxels", c.from, c.to, c.voxels);
        }
        let report = RemapReport {
            changed_voxels: changes.iter().map(|c| c.voxels).sum(),
            changes,
        };
        log::info!(
            "remapped {} voxels over {} source labels",
            report.changed_voxels,
            report.changes.len()
        );
        log::debug!("labels after remap: {:?}", out.unique());
        (out, report)
    }
}

/// 组织类型合并的统计信息.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// 被标记为 VAT 的体素个数.
    pub vat_voxels: usize,
}

/// 合并组织类型分割: 在 `base` 的一份拷贝上, 将 `types == vat_type`
/// 的体素改写为 `vat_label`, 其它体素保持不变. 输出沿用 `base` 的空间元信息.
///
/// 两者形状不一致时返回 `Err`; `vat_label` 为背景值时返回 `Err`.
pub fn merge_tissue_types(
    base: &LabelVolume,
    types: &LabelVolume,
    vat_type: Label,
    vat_label: Label,
) -> BerryResult<(LabelVolume, MergeReport)> {
    ensure_same_shape("labels/tissue types", base, types)?;
    if vat_label == 0 {
        return Err(BerryError::InvalidParameter(
            "VAT 标签不能为背景值 0".to_owned(),
        ));
    }

    let mut out = base.clone();
    let mut vat_voxels = 0usize;
    Zip::from(out.data_mut())
        .and(&types.data())
        .for_each(|p, &t| {
            if t == vat_type {
                *p = vat_label;
                vat_voxels += 1;
            }
        });
    log::info!("marked {} voxels as VAT (label {})", vat_voxels, vat_label);
    log::debug!("labels after merge: {:?}", out.unique());
    Ok((out, MergeReport { vat_voxels }))
}

/// 以默认组织类型值 ([`TISSUE_TYPE_VAT`]) 合并.
#[inline]
pub fn merge_vat(
    base: &LabelVolume,
    types: &LabelVolume,
    vat_label: Label,
) -> BerryResult<(LabelVolume, MergeReport)> {
    merge_tissue_types(base, types, TISSUE_TYPE_VAT, vat_label)
}
