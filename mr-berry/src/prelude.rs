//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d, Label};

pub use crate::{BinaryMask, LabelVolume, MaskSlice, MaskSliceMut, ScalarVolume};
pub use crate::{NiftiHeaderAttr, Volume};

pub use crate::consts::labels::{BACKGROUND, HOLE_MARKER, SAT, SKIN, VAT, VAT_STAGING};
pub use crate::consts::{DEFAULT_FF_THRESHOLD, DEFAULT_SKIN_THICKNESS};

pub use crate::config::Params;
pub use crate::error::{BerryError, BerryResult};

pub use crate::morph::{ConnectivityMode, HoleDetector, HoleReport, SkinExtractor, SkinReport};
pub use crate::post_proc::{fat_fraction, fill_holes, FatFractionGate, FillReport, HoleFiller};
pub use crate::remap::{merge_tissue_types, merge_vat, LabelMap, MergeReport, RemapReport};
