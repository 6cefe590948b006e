use std::path::Path;

use ndarray::{Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, NiftiType, ReaderOptions};

use super::{spatial_dims, VolumeBackend};
use crate::data::Volume;
use crate::error::LoadError;

/// 体素类型名, 与内置解码器的命名一致.
fn type_name(t: NiftiType) -> String {
    let name = match t {
        NiftiType::Uint8 => "uint8",
        NiftiType::Int8 => "int8",
        NiftiType::Int16 => "int16",
        NiftiType::Uint16 => "uint16",
        NiftiType::Int32 => "int32",
        NiftiType::Uint32 => "uint32",
        NiftiType::Int64 => "int64",
        NiftiType::Uint64 => "uint64",
        NiftiType::Float32 => "float32",
        NiftiType::Float64 => "float64",
        other => return format!("{other:?}").to_lowercase(),
    };
    name.to_string()
}

/// 基于 `nifti` crate 的解码后端.
#[derive(Copy, Clone, Debug, Default)]
pub struct NiftiRsBackend;

impl VolumeBackend for NiftiRsBackend {
    fn name(&self) -> &'static str {
        "nifti"
    }

    fn load(&self, path: &Path) -> Result<Volume, LoadError> {
        let nifti_err = |source| LoadError::Nifti {
            path: path.to_owned(),
            source,
        };

        let obj = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
        let header = obj.header();

        let ndim = (header.dim[0] as usize).min(7);
        let dims: Vec<usize> = header.dim[1..=ndim].iter().map(|d| *d as usize).collect();
        if spatial_dims(&dims).is_none() {
            return Err(LoadError::NotThreeDimensional {
                path: path.to_owned(),
                dim: dims,
            });
        }
        let spacing: Vec<f64> = header.pixdim[1..=3].iter().map(|p| *p as f64).collect();
        let dtype = match header.data_type() {
            Ok(t) => type_name(t),
            Err(_) => format!("datatype {}", header.datatype),
        };

        // [x, y, z, (1, ...)]. 逻辑索引与文件头一致, 内存布局为列优先.
        let mut data = obj.into_volume().into_ndarray::<f32>().map_err(nifti_err)?;
        while data.ndim() > 3 {
            let last = data.ndim() - 1;
            data = data.index_axis_move(Axis(last), 0);
        }
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|e| LoadError::Malformed {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;

        log::debug!("[nifti] loaded `{}` {:?}", path.display(), data.dim());
        Ok(Volume::new(data, spacing, dtype))
    }
}
