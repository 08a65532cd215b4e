//! 后处理流程集合: 脂肪分数计算与门限, 以及基于脂肪分数的空洞填充.

mod fat;
mod fill;

pub use fat::{fat_fraction, FatFractionGate, FatFractionStats};
pub use fill::{fill_holes, FillOutcome, FillReport, HoleFiller};
