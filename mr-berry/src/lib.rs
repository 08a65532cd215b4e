#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对上游分割模型输出的 3D 全身 MR 标签 (NIfTI) 进行形态学后处理.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 约定
//!
//! 1. 所有体数据在内存中均按 `(z, y, x)` 组织 (nifti 文件中为 `[x, y, z]`),
//!   因此 `index_axis(Axis(0), z)` 即为第 `z` 层水平 (轴向) 切片.
//!   面向用户的形状信息 (如错误信息) 仍按 `(x, y, z)` 给出.
//! 2. 标签值 `0` 代表背景, 任何正整数代表某种组织.
//! 3. 所有算法都不修改输入, 输出总是输入的一份新拷贝.
//!
//! # 处理流程
//!
//! ### 前景掩码 ✅
//!
//! `label > 0` 的体素即前景. 实现位于 `mr-berry/src/data/mask.rs`.
//!
//! ### 皮肤层提取 ✅
//!
//! 逐水平切片做 4-邻域腐蚀, 前景减去腐蚀结果即为外周壳层.
//! 全背景切片不参与腐蚀, 也不会产生任何皮肤体素.
//!
//! 实现位于 `mr-berry/src/morph/skin.rs`.
//!
//! ### 切片空洞检测 ✅
//!
//! 逐水平切片以 4-邻接规则标记背景连通分量, 不接触切片边缘的分量即为空洞.
//! 连通性只在单个切片内判定, 不做三维封闭性检测 (见 [`morph::ConnectivityMode`]).
//!
//! 实现位于 `mr-berry/src/morph/holes.rs`.
//!
//! ### 脂肪分数门限与空洞填充 ✅
//!
//! 脂肪分数严格大于门限的空洞体素被改写为填充标签 (默认皮下脂肪 65),
//! 其它体素保持不变.
//!
//! 实现位于 `mr-berry/src/post_proc`.
//!
//! ### 外围协作模块 ✅
//!
//! 1. NIfTI 读写 (`mr-berry/src/data/mod.rs`).
//! 2. 由 DIXON 脂/水图像计算脂肪分数 (`post_proc::fat_fraction`).
//! 3. 组织类型合并 (VAT 覆盖) 与标签折叠表 (`mr-berry/src/remap.rs`).
//! 4. TOML 参数配置 (`mr-berry/src/config.rs`).

/// 二维索引 `(y, x)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引 `(z, y, x)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 标签体素类型.
pub type Label = u16;

pub mod config;
pub mod consts;
mod data;
pub mod error;
pub mod morph;
pub mod post_proc;
pub mod prelude;
pub mod remap;

pub use data::{
    BinaryMask, LabelVolume, MaskSlice, MaskSliceMut, NiftiHeaderAttr, ScalarVolume, Volume,
};

pub use config::Params;
pub use error::{BerryError, BerryResult};
