//! 运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// 加载 3D 体数据时的错误. 总会携带出错文件的路径.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 底层 I/O 错误 (文件不存在, 权限不足等).
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// 出错文件.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// `nifti` crate 解码失败.
    #[error("nifti backend failed to decode `{path}`: {source}")]
    Nifti {
        /// 出错文件.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 文件头或数据区不符合 NIfTI-1 格式.
    #[error("malformed volume `{path}`: {reason}")]
    Malformed {
        /// 出错文件.
        path: PathBuf,
        /// 具体原因.
        reason: String,
    },

    /// 体数据不是 3D 的.
    #[error("`{path}` is not a 3D volume (dim = {dim:?})")]
    NotThreeDimensional {
        /// 出错文件.
        path: PathBuf,
        /// 文件头中记录的各维大小.
        dim: Vec<usize>,
    },
}

impl LoadError {
    /// 出错文件的路径.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. }
            | Self::Nifti { path, .. }
            | Self::Malformed { path, .. }
            | Self::NotThreeDimensional { path, .. } => path,
        }
    }
}

/// 读取生存信息表时的错误.
#[derive(Debug, Error)]
pub enum SurvivalError {
    /// 打开文件失败.
    #[error("failed to open survival table `{path}`: {source}")]
    Io {
        /// 表格路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// CSV 格式错误.
    #[error("malformed survival table: {0}")]
    Csv(#[from] csv::Error),

    /// 缺少连接键所在的列.
    #[error("survival table is missing the key column `{0}`")]
    MissingColumn(String),
}

/// 无法从标注文件路径中解析出患者编号.
#[derive(Debug, Error)]
#[error("cannot derive a patient id from `{path}` (token `{token}`), and no override is configured")]
pub struct IdParseError {
    /// 标注文件路径.
    pub path: PathBuf,
    /// 期望为整数的路径片段.
    pub token: String,
}

/// 标注审计错误.
#[derive(Debug, Error)]
pub enum AuditError {
    /// 标注文件加载失败.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 患者编号解析失败.
    #[error(transparent)]
    Id(#[from] IdParseError),
}

/// 数据变换流水线错误.
#[derive(Debug, Error)]
pub enum TransformError {
    /// 底层加载失败.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 多个模态的形状不一致, 无法堆叠.
    #[error("cannot stack volumes of shape {expected:?} and {found:?}")]
    ShapeMismatch {
        /// 第一个模态的形状.
        expected: Vec<usize>,
        /// 不一致的形状.
        found: Vec<usize>,
    },

    /// 变换要求的字段还未生成.
    #[error("transform `{transform}` requires {missing}")]
    Missing {
        /// 变换名.
        transform: &'static str,
        /// 缺失的内容.
        missing: &'static str,
    },

    /// 数据集索引越界.
    #[error("index {index} out of range for dataset of length {len}")]
    OutOfRange {
        /// 请求的索引.
        index: usize,
        /// 数据集大小.
        len: usize,
    },
}

/// 动画构造错误.
#[derive(Debug, Error)]
pub enum AnimationError {
    /// 没有提供任何模态.
    #[error("at least one modality volume is required")]
    Empty,

    /// 模态与模态 (或标注) 的形状不一致.
    #[error("volume shapes differ: {0:?} vs {1:?}")]
    ShapeMismatch((usize, usize, usize), (usize, usize, usize)),

    /// 编码输出失败.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
