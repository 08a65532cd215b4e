//! 通用常量.

/// 标签值.
pub mod labels {
    use crate::Label;

    /// 背景 (无组织) 的体素值.
    pub const BACKGROUND: Label = 0;

    /// 皮肤层的默认体素值.
    pub const SKIN: Label = 73;

    /// 皮下脂肪 (SAT) 的体素值, 同时也是空洞填充的默认标签.
    pub const SAT: Label = 65;

    /// 内脏脂肪 (VAT) 折叠后的体素值.
    pub const VAT: Label = 67;

    /// 合并组织类型时 VAT 的临时体素值. 标签折叠时会被映射到 [`VAT`].
    pub const VAT_STAGING: Label = 200;

    /// 组织类型分割结果中代表 VAT 的类型值.
    pub const TISSUE_TYPE_VAT: Label = 2;

    /// 空洞检测结果保存为标签文件时, 空洞体素的值.
    pub const HOLE_MARKER: Label = 1;

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: Label) -> bool {
        p == BACKGROUND
    }

    /// 体素是否是前景 (任意组织)?
    #[inline]
    pub const fn is_foreground(p: Label) -> bool {
        p > BACKGROUND
    }
}

/// 默认皮肤层厚度 (体素).
pub const DEFAULT_SKIN_THICKNESS: u32 = 2;

/// 默认脂肪分数门限. 严格大于该值的体素才被视为高脂.
pub const DEFAULT_FF_THRESHOLD: f32 = 0.7;

/// 读取配置路径时优先使用的环境变量.
pub const CONFIG_ENV: &str = "MR_BERRY_CONFIG";
