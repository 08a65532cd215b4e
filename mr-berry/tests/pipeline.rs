//! 以公开接口串联整个后处理流程.

use mr_berry::prelude::*;
use ndarray::{array, Array2, Array3};

/// 以单个 `(y, x)` 切片构建标签体数据.
fn single_slice(rows: Array2<Label>) -> LabelVolume {
    let (h, w) = rows.dim();
    LabelVolume::from_xyz(Array3::from_shape_fn((w, h, 1), |(x, y, _)| rows[(y, x)]))
}

fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

#[test]
fn scenario_a_single_interior_hole() {
    let labels = single_slice(array![
        [1, 1, 1, 1],
        [1, 0, 1, 1],
        [1, 1, 1, 1],
        [1, 1, 1, 1],
    ]);
    let (holes, report) = HoleDetector::default().detect_labels(&labels);
    assert_eq!(report.hole_components, 1);
    assert_eq!(report.hole_voxels, 1);
    assert_eq!(report.slices_with_holes, 1);
    assert!(holes[(0, 1, 1)]);
}

#[test]
fn scenario_b_border_background_is_exterior() {
    let labels = single_slice(array![
        [0, 0, 0, 0],
        [0, 1, 1, 0],
        [0, 1, 1, 0],
        [0, 0, 0, 0],
    ]);
    let (holes, report) = HoleDetector::default().detect_labels(&labels);
    assert_eq!(report.hole_voxels, 0);
    assert_eq!(report.hole_components, 0);
    assert_eq!(holes.count(), 0);
}

#[test]
fn scenario_c_fill_is_gated_by_fat_fraction() {
    init_logger();
    let labels = single_slice(array![
        [0, 0, 0, 0, 0, 0, 0],
        [0, 5, 5, 5, 5, 5, 0],
        [0, 5, 0, 5, 0, 5, 0],
        [0, 5, 5, 5, 5, 5, 0],
        [0, 0, 0, 0, 0, 0, 0],
    ]);
    // 左侧空洞 (y=2, x=2) 脂肪分数 0.9, 右侧空洞 (y=2, x=4) 为 0.5.
    let ff = ScalarVolume::from_xyz(Array3::from_shape_fn((7, 5, 1), |(x, _, _)| {
        if x < 3 {
            0.9
        } else {
            0.5
        }
    }));

    let filler = HoleFiller::from_params(&Params::default()).unwrap();
    let out = filler.run(&labels, &ff).unwrap();
    assert_eq!(out.holes.hole_components, 2);
    assert_eq!(out.labels[(0, 2, 2)], SAT);
    assert_eq!(out.labels[(0, 2, 4)], 0);
    assert_eq!(out.fill.filled, 1);
    assert_eq!(out.fill.nonzero_after, out.fill.nonzero_before + 1);

    // 未被填充的空洞仍可被检测到.
    let (_, left) = HoleDetector::default().detect_labels(&out.labels);
    assert_eq!(left.hole_voxels, 1);
}

#[test]
fn scenario_d_thickness_two_shell() {
    let labels = LabelVolume::from_xyz(Array3::from_shape_fn((10, 10, 1), |(x, y, _)| {
        ((2..8).contains(&x) && (2..8).contains(&y)) as Label * 7
    }));
    let (out, report) = SkinExtractor::new(2).unwrap().apply(&labels, SKIN).unwrap();
    assert_eq!(report.skin_voxels, 32);
    assert_eq!(out.count(7), 4);
    for y in 4..6 {
        for x in 4..6 {
            assert_eq!(out[(0, y, x)], 7);
        }
    }
}

#[test]
fn threshold_equality_is_not_high_fat() {
    let labels = single_slice(array![[1, 1, 1], [1, 0, 1], [1, 1, 1]]);
    let ff = ScalarVolume::from_xyz(Array3::from_elem((3, 3, 1), DEFAULT_FF_THRESHOLD));
    let out = HoleFiller::from_params(&Params::default())
        .unwrap()
        .run(&labels, &ff)
        .unwrap();
    assert_eq!(out.fill.filled, 0);
    assert_eq!(out.labels[(0, 1, 1)], 0);
}

#[test]
fn fill_is_monotone_and_local() {
    let xyz = Array3::from_shape_fn((16, 14, 6), |(x, y, z)| {
        if (x * 7 + y * 3 + z * 5) % 6 == 0 {
            0
        } else {
            ((x + y) % 4 + 1) as Label
        }
    });
    let labels = LabelVolume::from_xyz(xyz);
    let ff = ScalarVolume::from_xyz(Array3::from_shape_fn((16, 14, 6), |(x, y, z)| {
        ((x * 13 + y * 7 + z) % 10) as f32 / 10.0
    }));

    let out = HoleFiller::from_params(&Params::default())
        .unwrap()
        .run(&labels, &ff)
        .unwrap();
    assert!(out.labels.count_foreground() >= labels.count_foreground());

    let (holes, _) = HoleDetector::default().detect_labels(&labels);
    let high = FatFractionGate::new(DEFAULT_FF_THRESHOLD)
        .unwrap()
        .high_fat_mask(&ff);
    let selected = holes.and(&high).unwrap();
    assert_eq!(out.fill.filled, selected.count());
    for (pos, v) in out.labels.data().indexed_iter() {
        if selected[pos] {
            assert_eq!(*v, SAT);
        } else {
            assert_eq!(*v, labels[pos]);
        }
    }
}

#[test]
fn empty_slices_produce_nothing() {
    let mut xyz = Array3::<Label>::zeros((8, 8, 4));
    for x in 1..7 {
        for y in 1..7 {
            xyz[(x, y, 2)] = 3;
        }
    }
    xyz[(4, 4, 2)] = 0;
    let labels = LabelVolume::from_xyz(xyz);

    let (skin, skin_report) = SkinExtractor::new(1).unwrap().apply(&labels, SKIN).unwrap();
    let (holes, hole_report) = HoleDetector::default().detect_labels(&labels);
    assert_eq!(skin_report.slices_with_skin, 1);
    assert_eq!(hole_report.slices_with_holes, 1);
    for z in [0, 1, 3] {
        assert!(skin.slice_at(z).iter().all(|p| *p == 0));
        assert!(holes.slice_at(z).is_empty());
    }
}

#[test]
fn whole_chain_merge_fill_collapse_skin() {
    init_logger();
    let params = Params::default();
    params.validate().unwrap();

    // 一层 9x9: 外圈背景, 内部组织 (标签 66), 中心为空洞, 右下角一个体素被判为 VAT.
    let base = LabelVolume::from_xyz(Array3::from_shape_fn((9, 9, 1), |(x, y, _)| {
        let inside = (1..8).contains(&x) && (1..8).contains(&y);
        if inside && (x, y) != (4, 4) {
            66
        } else {
            0
        }
    }));
    let mut types_xyz = Array3::<Label>::zeros((9, 9, 1));
    types_xyz[(6, 6, 0)] = 2;
    let types = LabelVolume::from_xyz(types_xyz);
    let ff = ScalarVolume::from_xyz(Array3::from_elem((9, 9, 1), 0.95));

    let (merged, merge) = merge_vat(&base, &types, params.vat_label).unwrap();
    assert_eq!(merge.vat_voxels, 1);
    assert_eq!(merged[(0, 6, 6)], VAT_STAGING);

    let filled = HoleFiller::from_params(&params)
        .unwrap()
        .run(&merged, &ff)
        .unwrap();
    assert_eq!(filled.labels[(0, 4, 4)], SAT);

    let (collapsed, remap) = LabelMap::collapse_default().apply(&filled.labels);
    assert_eq!(collapsed[(0, 6, 6)], VAT);
    assert_eq!(remap.changed_voxels, 1);

    let (out, skin) = params
        .skin_extractor()
        .unwrap()
        .apply(&collapsed, params.skin_label)
        .unwrap();
    // 7x7 的前景块, 厚度 2: 外两圈 24 + 16 个体素.
    assert_eq!(skin.skin_voxels, 40);
    assert_eq!(out[(0, 1, 1)], SKIN);
    assert_eq!(out[(0, 4, 4)], SAT);
    assert_eq!(out.count(VAT), 0);
    assert_eq!(out.count_foreground(), 49);
}

#[test]
fn hole_mask_saves_as_labels() {
    let labels = single_slice(array![[2, 2, 2], [2, 0, 2], [2, 2, 2]]);
    let (holes, _) = HoleDetector::default().detect_labels(&labels);
    let saved = holes.to_labels(&labels, HOLE_MARKER).unwrap();
    let path = std::env::temp_dir().join(format!("mr-berry-holes-{}.nii.gz", std::process::id()));
    saved.save(&path).unwrap();
    let back = LabelVolume::open(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(back.count(HOLE_MARKER), 1);
    assert_eq!(back[(0, 1, 1)], HOLE_MARKER);
    assert_eq!(back.shape_xyz(), (3, 3, 1));
}
