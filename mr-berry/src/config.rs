//! 后处理参数, 可由 TOML 文件加载.
//!
//! 查找顺序: 环境变量 `MR_BERRY_CONFIG` 指向的文件, 其次是
//! `<用户配置目录>/mr-berry/config.toml`. 环境变量指向的文件必须存在;
//! 用户配置目录下没有文件时使用默认值.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::labels::{SAT, SKIN, VAT_STAGING};
use crate::consts::{CONFIG_ENV, DEFAULT_FF_THRESHOLD, DEFAULT_SKIN_THICKNESS};
use crate::error::{BerryError, BerryResult};
use crate::morph::{ConnectivityMode, HoleDetector, SkinExtractor};
use crate::post_proc::FatFractionGate;
use crate::Label;

/// 后处理流程的全部可调参数.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// 皮肤层厚度 (体素), 正整数.
    #[serde(default = "default_thickness")]
    pub thickness: u32,

    /// 皮肤层标签.
    #[serde(default = "default_skin_label")]
    pub skin_label: Label,

    /// 空洞填充标签 (皮下脂肪).
    #[serde(default = "default_fat_label")]
    pub fat_label: Label,

    /// 脂肪分数门限, 严格大于该值的空洞体素被填充.
    #[serde(default = "default_ff_threshold")]
    pub ff_threshold: f32,

    /// 组织类型合并时 VAT 的临时标签.
    #[serde(default = "default_vat_label")]
    pub vat_label: Label,

    /// 空洞封闭性的判定范围.
    #[serde(default)]
    pub connectivity: ConnectivityMode,
}

fn default_thickness() -> u32 {
    DEFAULT_SKIN_THICKNESS
}

fn default_skin_label() -> Label {
    SKIN
}

fn default_fat_label() -> Label {
    SAT
}

fn default_ff_threshold() -> f32 {
    DEFAULT_FF_THRESHOLD
}

fn default_vat_label() -> Label {
    VAT_STAGING
}

impl Default for Params {
    fn default() -> Self {
        Self {
            thickness: default_thickness(),
            skin_label: default_skin_label(),
            fat_label: default_fat_label(),
            ff_threshold: default_ff_threshold(),
            vat_label: default_vat_label(),
            connectivity: ConnectivityMode::default(),
        }
    }
}

impl Params {
    /// 从 TOML 文件加载参数. 缺省的字段取默认值.
    ///
    /// 加载后的参数未经检查, 请调用 [`Params::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> BerryResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| BerryError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 用户配置目录下的配置文件路径.
    ///
    /// 无法确定用户配置目录时返回 `None`.
    pub fn user_config_path() -> Option<PathBuf> {
        let mut ans = dirs::config_dir()?;
        ans.extend(["mr-berry", "config.toml"]);
        Some(ans)
    }

    /// 按默认查找顺序加载参数.
    ///
    /// 设置了环境变量 `MR_BERRY_CONFIG` 时, 其指向的文件无法读取则返回 `Err`.
    pub fn load_or_default() -> BerryResult<Self> {
        Self::load_with(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            Self::user_config_path(),
        )
    }

    /// `explicit` 必须可读; `implicit` 不存在时使用默认值.
    fn load_with(explicit: Option<PathBuf>, implicit: Option<PathBuf>) -> BerryResult<Self> {
        let path = match (explicit, implicit) {
            (Some(p), _) => p,
            (None, Some(p)) if p.is_file() => p,
            _ => return Ok(Self::default()),
        };
        log::debug!("loading params from {}", path.display());
        Self::from_file(path)
    }

    /// 检查参数是否合法.
    ///
    /// # 注意
    ///
    /// - 厚度必须为正;
    /// - 所有标签必须为正, 且皮肤, 填充与 VAT 标签两两不同;
    /// - 门限必须为有限值.
    pub fn validate(&self) -> BerryResult<()> {
        let invalid = |msg: String| -> BerryResult<()> { Err(BerryError::InvalidParameter(msg)) };

        if self.thickness == 0 {
            return invalid("thickness 必须为正整数".to_owned());
        }
        for (name, v) in [
            ("skin_label", self.skin_label),
            ("fat_label", self.fat_label),
            ("vat_label", self.vat_label),
        ] {
            if v == 0 {
                return invalid(format!("{name} 不能为背景值 0"));
            }
        }
        if self.skin_label == self.fat_label {
            return invalid(format!(
                "skin_label 与 fat_label 冲突 ({})",
                self.skin_label
            ));
        }
        if self.vat_label == self.skin_label || self.vat_label == self.fat_label {
            return invalid(format!(
                "vat_label ({}) 与皮肤或填充标签冲突",
                self.vat_label
            ));
        }
        if !self.ff_threshold.is_finite() {
            return invalid(format!("ff_threshold 必须是有限值, 实际为 {}", self.ff_threshold));
        }
        Ok(())
    }

    /// 依据参数构建皮肤层提取器.
    #[inline]
    pub fn skin_extractor(&self) -> BerryResult<SkinExtractor> {
        SkinExtractor::new(self.thickness)
    }

    /// 依据参数构建空洞检测器.
    #[inline]
    pub fn hole_detector(&self) -> HoleDetector {
        HoleDetector::new(self.connectivity)
    }

    /// 依据参数构建脂肪分数门限.
    #[inline]
    pub fn fat_gate(&self) -> BerryResult<FatFractionGate> {
        FatFractionGate::new(self.ff_threshold)
    }
}
