//! 三维二值掩码, 以及其二维水平切片视图.

use std::ops::{Index, IndexMut};

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis, Zip};

use super::{ensure_same_shape, LabelVolume, Volume};
use crate::consts::labels::{is_foreground, BACKGROUND};
use crate::error::BerryResult;
use crate::morph::neighbour4;
use crate::{Idx2d, Idx3d, Label};

/// 与标签体数据同形状的三维布尔掩码, 按 `(z, y, x)` 组织.
///
/// 掩码只是派生数据, 不携带 header, 也不单独持久化.
/// 需要保存时请先用 [`BinaryMask::to_labels`] 转换.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    data: Array3<bool>,
}

impl Volume for BinaryMask {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl Index<Idx3d> for BinaryMask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for BinaryMask {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl BinaryMask {
    /// 前景掩码: 当且仅当标签严格大于 0 时为 `true`.
    ///
    /// 纯函数, 对同一份标签重复调用总得到相同结果.
    pub fn from_labels(labels: &LabelVolume) -> Self {
        Self {
            data: labels.data().mapv(is_foreground),
        }
    }

    /// 直接以按 `(z, y, x)` 组织的数据创建掩码.
    #[inline]
    pub fn from_raw(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// 创建给定形状 `(z, y, x)` 的全 `false` 掩码.
    #[inline]
    pub fn empty(shape: Idx3d) -> Self {
        Self {
            data: Array3::from_elem(shape, false),
        }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[cfg(feature = "rayon")]
    #[inline]
    pub(crate) fn data_mut(&mut self) -> ndarray::ArrayViewMut3<'_, bool> {
        self.data.view_mut()
    }

    /// 为 `true` 的体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }

    /// 至少含有一个 `true` 体素的水平切片个数.
    pub fn count_slices_with_any(&self) -> usize {
        self.slice_iter().filter(|s| !s.is_empty()).count()
    }

    /// 逐体素求与. 两个掩码形状不一致时返回 `Err`.
    pub fn and(&self, other: &BinaryMask) -> BerryResult<BinaryMask> {
        ensure_same_shape("mask/mask", self, other)?;
        Ok(Self {
            data: Zip::from(&self.data)
                .and(&other.data)
                .map_collect(|a, b| *a && *b),
        })
    }

    /// 获取 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> MaskSlice<'_> {
        MaskSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = MaskSlice<'_>> {
        self.data.axis_iter(Axis(0)).map(MaskSlice::new)
    }

    /// 获取能按升序迭代水平可变切片的迭代器.
    #[inline]
    pub fn slice_iter_mut(&mut self) -> impl ExactSizeIterator<Item = MaskSliceMut<'_>> {
        self.data.axis_iter_mut(Axis(0)).map(MaskSliceMut::new)
    }

    /// 转换为可保存的标签体数据: `true` 处为 `marker`, 其余为背景.
    /// 空间元信息取自 `like`. 形状与 `like` 不一致时返回 `Err`.
    pub fn to_labels(&self, like: &LabelVolume, marker: Label) -> BerryResult<LabelVolume> {
        ensure_same_shape("labels/mask", like, self)?;
        Ok(like.with_data(self.data.mapv(|v| if v { marker } else { BACKGROUND })))
    }
}

/// 不可变、借用的二维水平掩码切片, 索引格式为 `(y, x)`.
pub struct MaskSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`BinaryMask`].
    data: ArrayView2<'a, bool>,
}

impl Index<Idx2d> for MaskSlice<'_> {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

/// 可变、借用的二维水平掩码切片, 索引格式为 `(y, x)`.
pub struct MaskSliceMut<'a> {
    /// 底层数据的轻量级视图, 借用于 [`BinaryMask`].
    data: ArrayViewMut2<'a, bool>,
}

impl Index<Idx2d> for MaskSliceMut<'_> {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for MaskSliceMut<'_> {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 可变方法集合.
impl<'a> MaskSliceMut<'a> {
    /// 获得 **底层** 数据的一份可变 shallow copy.
    #[inline]
    pub fn array_view_mut(&mut self) -> ArrayViewMut2<bool> {
        self.data.view_mut()
    }

    /// 用同形状的 `src` 覆写切片内容.
    ///
    /// 如果形状不符, 则程序 panic.
    pub fn assign(&mut self, src: &Array2<bool>) {
        self.data.assign(src);
    }
}

/// 掩码切片不可变方法集合.
macro_rules! impl_mask_slice_immut {
    ($life: lifetime, $slice: ty, $array: ty) => {
        /// 不可变方法集合.
        impl<$life> $slice {
            /// 直接初始化.
            #[inline]
            pub(crate) fn new(data: $array) -> Self {
                Self { data }
            }

            /// 获得 **底层** 数据的一份不可变 shallow copy.
            #[inline]
            pub fn array_view(&self) -> ArrayView2<bool> {
                self.data.view()
            }

            /// 获得一份不可变的 **本体** shallow copy.
            #[inline]
            pub fn shallow_copy(&self) -> MaskSlice {
                MaskSlice { data: self.array_view() }
            }

            /// 获取给定位置 `(y, x)` 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&bool> {
                self.data.get(pos)
            }

            /// 图像的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                self.data.dim()
            }

            /// 获得图像的高.
            #[inline]
            pub fn height(&self) -> usize {
                self.shape().0
            }

            /// 获得图像的宽.
            #[inline]
            pub fn width(&self) -> usize {
                self.shape().1
            }

            /// 判断一个索引是否位于图像的边缘 (首行, 末行, 首列或末列).
            #[inline]
            pub fn is_at_border(&self, (h, w): Idx2d) -> bool {
                h == 0
                    || h.saturating_add(1) == self.height()
                    || w == 0
                    || w.saturating_add(1) == self.width()
            }

            /// 该切片是否不含任何 `true` 像素?
            #[inline]
            pub fn is_empty(&self) -> bool {
                !self.data.iter().any(|v| *v)
            }

            /// 统计 `true` 像素个数.
            #[inline]
            pub fn count(&self) -> usize {
                self.data.iter().filter(|v| **v).count()
            }

            /// 判断 `pos` 的 4-邻域是否全部为 `true`. 图像以外的位置视为 `false`.
            #[inline]
            pub fn is_n4_all_set(&self, pos: Idx2d) -> bool {
                neighbour4(pos)
                    .into_iter()
                    .all(|p| matches!(self.get(p), Some(true)))
            }
        }
    };
}

impl_mask_slice_immut!('a, MaskSlice<'a>, ArrayView2<'a, bool>);
impl_mask_slice_immut!('a, MaskSliceMut<'a>, ArrayViewMut2<'a, bool>);
