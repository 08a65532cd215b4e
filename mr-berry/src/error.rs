//! 运行时错误.

use std::path::PathBuf;

use thiserror::Error;

use crate::Idx3d;

/// 后处理流程中的所有错误.
///
/// 全背景切片不属于错误, 各算法会显式地将其作为空操作处理.
#[derive(Error, Debug)]
pub enum BerryError {
    /// NIfTI 文件读写失败.
    #[error("NIfTI 读写错误: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 普通 IO 错误.
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件无法解析.
    #[error("无法从 {path} 加载配置: {source}")]
    ConfigLoad {
        /// 配置文件路径.
        path: PathBuf,

        /// 解析错误.
        source: toml::de::Error,
    },

    /// 成对输入的体数据形状不一致. 形状按 `(x, y, z)` 给出.
    ///
    /// 该错误总在任何体素被写入之前返回.
    #[error("{what} 形状不一致: 期望 {expected:?}, 实际 {found:?}")]
    ShapeMismatch {
        /// 出错的输入对.
        what: &'static str,

        /// 主输入的形状.
        expected: Idx3d,

        /// 辅助输入的形状.
        found: Idx3d,
    },

    /// NIfTI 文件的维数不受支持. 目前仅支持 3 维, 或末维为 1 的 4 维数据.
    #[error("不支持的数据维数: {0:?}")]
    UnsupportedDim(Vec<usize>),

    /// 参数非法 (厚度为零, 标签冲突等).
    #[error("参数非法: {0}")]
    InvalidParameter(String),
}

/// 后处理运行时结果.
pub type BerryResult<T> = Result<T, BerryError>;
