//! 子命令的实际运行.

use std::path::Path;

use anyhow::Context;
use mr_berry::prelude::*;

use crate::cli::Command;
use crate::report::RunReport;

fn open_labels(path: &Path) -> anyhow::Result<LabelVolume> {
    LabelVolume::open(path).with_context(|| format!("无法读取标签 {}", path.display()))
}

fn open_scalar(path: &Path) -> anyhow::Result<ScalarVolume> {
    ScalarVolume::open(path).with_context(|| format!("无法读取图像 {}", path.display()))
}

fn save_labels(vol: &LabelVolume, path: &Path) -> anyhow::Result<()> {
    vol.save(path)
        .with_context(|| format!("无法保存 {}", path.display()))?;
    log::info!("saved {}", path.display());
    Ok(())
}

/// 按子命令执行. `params` 已合并命令行覆盖项并通过检查.
pub fn run(command: &Command, params: &Params) -> anyhow::Result<RunReport> {
    let mut report = RunReport::default();

    match command {
        Command::Skin { input, output, .. } => {
            let labels = open_labels(input)?;
            let (out, skin) = params.skin_extractor()?.apply(&labels, params.skin_label)?;
            save_labels(&out, output)?;
            report.skin = Some(skin);
        }
        Command::Holes { input, output } => {
            let labels = open_labels(input)?;
            let (holes, hole_report) = params.hole_detector().detect_labels(&labels);
            save_labels(&holes.to_labels(&labels, HOLE_MARKER)?, output)?;
            report.holes = Some(hole_report);
        }
        Command::Fill {
            input, ff, output, ..
        } => {
            let labels = open_labels(input)?;
            let ff = open_scalar(ff)?;
            let outcome = HoleFiller::from_params(params)?.run(&labels, &ff)?;
            save_labels(&outcome.labels, output)?;
            report.holes = Some(outcome.holes);
            report.fill = Some(outcome.fill);
        }
        Command::Ff { fat, water, output } => {
            let fat = open_scalar(fat)?;
            let water = open_scalar(water)?;
            let (ff, stats) = fat_fraction(&fat, &water)?;
            ff.save(output)
                .with_context(|| format!("无法保存 {}", output.display()))?;
            log::info!("saved {}", output.display());
            report.fat_fraction = Some(stats);
        }
        Command::Merge {
            base,
            types,
            output,
            ..
        } => {
            let base = open_labels(base)?;
            let types = open_labels(types)?;
            let (out, merge) = merge_vat(&base, &types, params.vat_label)?;
            save_labels(&out, output)?;
            report.merge = Some(merge);
        }
        Command::Collapse { input, output } => {
            let labels = open_labels(input)?;
            let (out, remap) = LabelMap::collapse_default().apply(&labels);
            save_labels(&out, output)?;
            report.collapse = Some(remap);
        }
        Command::Run {
            base,
            types,
            ff,
            output,
            ..
        } => {
            let base = open_labels(base)?;
            let types = open_labels(types)?;
            let ff = open_scalar(ff)?;

            let (merged, merge) = merge_vat(&base, &types, params.vat_label)?;
            let filled = HoleFiller::from_params(params)?.run(&merged, &ff)?;
            let (collapsed, remap) = LabelMap::collapse_default().apply(&filled.labels);
            let (out, skin) = params
                .skin_extractor()?
                .apply(&collapsed, params.skin_label)?;
            save_labels(&out, output)?;

            report.merge = Some(merge);
            report.holes = Some(filled.holes);
            report.fill = Some(filled.fill);
            report.collapse = Some(remap);
            report.skin = Some(skin);
        }
    }
    Ok(report)
}
