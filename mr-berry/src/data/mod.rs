use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView2, ArrayView3, ArrayViewMut3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, NiftiType, ReaderOptions};

use crate::consts::labels::{is_foreground, BACKGROUND};
use crate::error::{BerryError, BerryResult};
use crate::{Idx3d, Label};

pub mod mask;

pub use mask::{BinaryMask, MaskSlice, MaskSliceMut};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 体数据的形状属性. 所有形状均按 `(z, y, x)` 给出.
pub trait Volume {
    /// 获取数据形状大小 `(z, y, x)`.
    fn shape(&self) -> Idx3d;

    /// 按 nifti 习惯 `(x, y, z)` 给出的形状.
    #[inline]
    fn shape_xyz(&self) -> Idx3d {
        let (z, y, x) = self.shape();
        (x, y, z)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }
}

/// 确保两份体数据逐体素对齐, 否则返回 [`BerryError::ShapeMismatch`].
pub(crate) fn ensure_same_shape<A, B>(what: &'static str, main: &A, aux: &B) -> BerryResult<()>
where
    A: Volume + ?Sized,
    B: Volume + ?Sized,
{
    if main.shape() == aux.shape() {
        Ok(())
    } else {
        Err(BerryError::ShapeMismatch {
            what,
            expected: main.shape_xyz(),
            found: aux.shape_xyz(),
        })
    }
}

/// 带有 nifti header 的体数据的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;
}

/// 构造与 `(x, y, z)` 形状相符的默认 header.
fn default_header((x, y, z): Idx3d) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, x as u16, y as u16, z as u16, 1, 1, 1, 1];
    header
}

/// 将 nifti 读出的 `[x, y, z]` (或末维为 1 的 `[x, y, z, 1]`) 动态数组
/// 转换为标准布局的 `(z, y, x)` 数组.
fn into_zyx<T: Clone>(data: ndarray::ArrayD<T>) -> BerryResult<Array3<T>> {
    let sh = data.shape().to_vec();
    let data = match sh.as_slice() {
        [_, _, _] => data,
        [_, _, _, 1] => data.index_axis_move(Axis(3), 0),
        _ => return Err(BerryError::UnsupportedDim(sh)),
    };
    // 上面已经检查过维数, 该操作不会生成 `Err`, 可直接 unwrap.
    let data = data.into_dimensionality::<Ix3>().unwrap();

    // [x, y, z] -> [z, y, x].
    let data = data.permuted_axes([2, 1, 0]);
    Ok(if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().into_owned()
    })
}

/// 为 `LabelVolume` 和 `ScalarVolume` 生成共用的读写与访问方法.
macro_rules! impl_volume {
    ($vol: ident, $elem: ty) => {
        impl Volume for $vol {
            #[inline]
            fn shape(&self) -> Idx3d {
                self.data.dim()
            }
        }

        impl NiftiHeaderAttr for $vol {
            #[inline]
            fn header(&self) -> &NiftiHeader {
                &self.header
            }
        }

        impl Index<Idx3d> for $vol {
            type Output = $elem;

            #[inline]
            fn index(&self, index: Idx3d) -> &Self::Output {
                &self.data[index]
            }
        }

        impl IndexMut<Idx3d> for $vol {
            #[inline]
            fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
                &mut self.data[index]
            }
        }

        impl $vol {
            /// 打开 nii / nii.gz 文件. `path` 为 nii 文件的本地路径.
            /// 体素值会被转换为目标类型 (nifti 缩放系数已被应用).
            pub fn open<P: AsRef<Path>>(path: P) -> BerryResult<Self> {
                let obj = ReaderOptions::new().read_file(path.as_ref())?;
                let header = Box::new(obj.header().clone());
                let data = into_zyx(obj.into_volume().into_ndarray::<$elem>()?)?;
                log::debug!(
                    "loaded {} with shape (x, y, z) = {:?}",
                    path.as_ref().display(),
                    header.dim
                );
                Ok(Self { header, data })
            }

            /// 写出文件时使用的 header: 空间元信息沿用 `self`,
            /// 缩放系数被重置为 `slope = 1, inter = 0`.
            fn output_header(&self) -> NiftiHeader {
                let mut header = self.header.as_ref().clone();
                header.scl_slope = 1.0;
                header.scl_inter = 0.0;
                header
            }

            /// 从按 nifti 习惯 `[x, y, z]` 组织的裸数据直接创建实体,
            /// 使用默认 header (体素分辨率 1mm).
            pub fn from_xyz(data: Array3<$elem>) -> Self {
                let header = default_header(data.dim());
                let data = data.permuted_axes([2, 1, 0]);
                let data = if data.is_standard_layout() {
                    data
                } else {
                    data.as_standard_layout().into_owned()
                };
                Self { header, data }
            }

            /// 获取 z 空间的第 `z_index` 层切片视图.
            ///
            /// 当 `z_index` 越界时 panic.
            #[inline]
            pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, $elem> {
                self.data.index_axis(Axis(0), z_index)
            }

            /// 获得数据的一份不可变 shallow copy, 按 `(z, y, x)` 组织.
            #[inline]
            pub fn data(&self) -> ArrayView3<'_, $elem> {
                self.data.view()
            }

            /// 获得数据的一份可变 shallow copy, 按 `(z, y, x)` 组织.
            #[inline]
            pub fn data_mut(&mut self) -> ArrayViewMut3<'_, $elem> {
                self.data.view_mut()
            }

            /// 按 nifti 习惯 `[x, y, z]` 组织的视图.
            #[inline]
            pub fn xyz(&self) -> ArrayView3<'_, $elem> {
                self.data.view().permuted_axes([2, 1, 0])
            }
        }
    };
}

/// nii 格式 3D 分割标签, 包括 header 和标签数据. 标签值以 [`Label`] 保存.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    header: BoxedHeader,
    data: Array3<Label>,
}

impl_volume!(LabelVolume, Label);

impl LabelVolume {
    /// 保存为 nii / nii.gz 文件 (由扩展名决定是否压缩).
    ///
    /// 空间元信息沿用 `self` 的 header. 源文件是 `int16`, `int32` 或 `uint8`
    /// 且所有标签都能被该类型表示时, 沿用源数据类型; 否则以 `uint16` 写出.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> BerryResult<()> {
        let header = self.output_header();
        let writer = WriterOptions::new(path.as_ref()).reference_header(&header);
        let max = self.data.iter().copied().max().unwrap_or(BACKGROUND);

        // [z, y, x] -> [x, y, z].
        let xyz = self.xyz();
        match header.data_type() {
            Ok(NiftiType::Int16) if max <= i16::MAX as Label => {
                writer.write_nifti(&xyz.mapv(|v| v as i16))?
            }
            Ok(NiftiType::Int32) => writer.write_nifti(&xyz.mapv(i32::from))?,
            Ok(NiftiType::Uint8) if max <= u8::MAX as Label => {
                writer.write_nifti(&xyz.mapv(|v| v as u8))?
            }
            _ => writer.write_nifti(&xyz)?,
        }
        log::debug!("saved {}", path.as_ref().display());
        Ok(())
    }

    /// 以按 `(z, y, x)` 组织的数据创建新实体, header 沿用 `self`.
    ///
    /// 如果 `data` 形状与 `self` 不一致, 则程序 panic; 调用方需先检查形状.
    pub(crate) fn with_data(&self, data: Array3<Label>) -> Self {
        assert_eq!(self.data.dim(), data.dim(), "派生数据形状不符");
        Self {
            header: self.header.clone(),
            data,
        }
    }

    /// 获取值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: Label) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取前景 (非背景) 体素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 获取出现过的所有标签值, 升序排列.
    pub fn unique(&self) -> BTreeSet<Label> {
        self.data.iter().copied().collect()
    }
}

/// nii 格式 3D 连续值体数据 (如脂肪分数图), 以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct ScalarVolume {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl_volume!(ScalarVolume, f32);

impl ScalarVolume {
    /// 保存为 nii / nii.gz 文件 (由扩展名决定是否压缩), 数据类型为 `float32`.
    ///
    /// 空间元信息沿用 `self` 的 header.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> BerryResult<()> {
        let header = self.output_header();
        WriterOptions::new(path.as_ref())
            .reference_header(&header)
            .write_nifti(&self.xyz())?;
        log::debug!("saved {}", path.as_ref().display());
        Ok(())
    }

    /// 以 `like` 的 header 和按 `(z, y, x)` 组织的数据创建实体.
    ///
    /// 如果 `data` 形状与 `like` 不一致, 则程序 panic.
    pub(crate) fn from_header_of<V: Volume + NiftiHeaderAttr>(like: &V, data: Array3<f32>) -> Self {
        assert_eq!(like.shape(), data.dim(), "派生数据形状不符");
        Self {
            header: Box::new(like.header().clone()),
            data,
        }
    }
}
