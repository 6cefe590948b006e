//! 通用患者体数据加载器.
//!
//! 提供迭代器风格的数据集获取模式. 体数据只在迭代到该患者时才解码,
//! 用完即丢弃, 不做缓存.

use crate::data::{Modality, Volume, VolumeBackend};
use crate::dataset::PatientPaths;
use crate::error::LoadError;

/// 单个患者的全部体数据.
#[derive(Debug, Clone)]
pub struct PatientVolumes {
    /// 患者 ID.
    pub id: String,

    /// 四个成像模态, 顺序同 [`Modality::IMAGING`].
    pub imaging: [Volume; 4],

    /// 分割标注.
    pub mask: Volume,
}

impl PatientVolumes {
    /// 使用 `backend` 加载 `paths` 指向的五个文件. 任一文件失败即返回.
    pub fn load(backend: &dyn VolumeBackend, paths: &PatientPaths) -> Result<Self, LoadError> {
        let [flair, t1, t1ce, t2] = paths.imaging();
        Ok(Self {
            id: paths.id.clone(),
            imaging: [
                backend.load(flair)?,
                backend.load(t1)?,
                backend.load(t1ce)?,
                backend.load(t2)?,
            ],
            mask: backend.load(paths.mask())?,
        })
    }

    /// 获取某个模态的体数据.
    #[inline]
    pub fn volume(&self, modality: Modality) -> &Volume {
        match modality {
            Modality::Mask => &self.mask,
            m => &self.imaging[m as usize],
        }
    }
}

/// 患者体数据加载器, 按给定顺序逐个加载.
pub struct PatientLoader<'a> {
    backend: &'a dyn VolumeBackend,
    data_rev: Vec<PatientPaths>,
}

impl<'a> PatientLoader<'a> {
    /// 从患者路径列表与解码后端创建加载器.
    pub fn new<I: IntoIterator<Item = PatientPaths>>(backend: &'a dyn VolumeBackend, data: I) -> Self {
        let mut data: Vec<PatientPaths> = data.into_iter().collect();
        data.reverse();

        Self {
            backend,
            data_rev: data,
        }
    }
}

impl Iterator for PatientLoader<'_> {
    type Item = (String, Result<PatientVolumes, LoadError>);

    fn next(&mut self) -> Option<Self::Item> {
        let paths = self.data_rev.pop()?;
        let data = PatientVolumes::load(self.backend, &paths);
        Some((paths.id, data))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.data_rev.len(), Some(self.data_rev.len()))
    }
}

impl ExactSizeIterator for PatientLoader<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}
