//! 运行结果统计.

use std::fs;
use std::path::Path;

use anyhow::Context;
use mr_berry::morph::{HoleReport, SkinReport};
use mr_berry::post_proc::{FatFractionStats, FillReport};
use mr_berry::remap::{MergeReport, RemapReport};
use serde::Serialize;

/// 一次命令行运行中各步骤的统计信息. 未执行的步骤不出现在输出中.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_fraction: Option<FatFractionStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub holes: Option<HoleReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse: Option<RemapReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin: Option<SkinReport>,
}

impl RunReport {
    /// 以 TOML 格式写入 `path`.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let s = toml::to_string_pretty(self).context("无法序列化统计信息")?;
        fs::write(path, s).with_context(|| format!("无法写入 {}", path.display()))?;
        log::debug!("report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_executed_steps_serialised() {
        let report = RunReport {
            skin: Some(SkinReport {
                skin_voxels: 12,
                slices_with_skin: 3,
            }),
            ..Default::default()
        };
        let s = toml::to_string_pretty(&report).unwrap();
        assert!(s.contains("[skin]"));
        assert!(s.contains("skin_voxels = 12"));
        assert!(!s.contains("fill"));
    }
}
