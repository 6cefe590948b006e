//! 体数据解码后端.
//!
//! 同一文件经由任一后端解码, 得到的形状、分辨率和强度极值必须一致.
//! 后端之间没有自动回退: 选中的后端打不开文件就直接报错.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::data::Volume;
use crate::error::LoadError;

mod nifti_rs;
mod raw;

pub use nifti_rs::NiftiRsBackend;
pub use raw::RawBackend;

/// 表明一个可以将文件解码为 [`Volume`] 的后端.
pub trait VolumeBackend: Send + Sync {
    /// 后端名, 用于日志.
    fn name(&self) -> &'static str;

    /// 打开 `path` 处的体数据. 失败时错误中总会携带 `path`.
    fn load(&self, path: &Path) -> Result<Volume, LoadError>;
}

/// 后端选择. 这是一个纯配置开关.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackendKind {
    /// 基于 `nifti` crate.
    #[default]
    NiftiRs,

    /// 本 crate 内置的 NIfTI-1 解码器.
    Raw,
}

impl BackendKind {
    /// 创建对应的后端实例.
    pub fn backend(self) -> Box<dyn VolumeBackend> {
        match self {
            Self::NiftiRs => Box::new(NiftiRsBackend),
            Self::Raw => Box::new(RawBackend),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NiftiRs => f.write_str("nifti"),
            Self::Raw => f.write_str("raw"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nifti" | "nifti-rs" | "nifti_rs" => Ok(Self::NiftiRs),
            "raw" => Ok(Self::Raw),
            other => Err(format!("unknown backend `{other}` (expected `nifti` or `raw`)")),
        }
    }
}

/// 只保留前 3 维. 多出的维度必须为 1, 否则返回 `None`.
pub(crate) fn spatial_dims(dims: &[usize]) -> Option<(usize, usize, usize)> {
    match dims {
        [x, y, z, rest @ ..] if rest.iter().all(|d| *d == 1) => Some((*x, *y, *z)),
        _ => None,
    }
}
