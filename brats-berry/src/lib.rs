#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 BraTS 2020 多模态脑肿瘤 MRI 数据集的结构化信息和探索性分析流程.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 目前只针对 BraTS 2020 训练集的目录组织方式
//!   (`{ID}/{ID}_flair.nii` 等五个文件) 进行适配.
//! 2. 所有阶段都显式接收 [`config::EdaConfig`], 不读取任何全局状态.
//! 3. 体数据用完即丢弃, 不做任何缓存; 也不会向数据集目录写入任何文件.
//!
//! # 开发计划
//!
//! ### 患者目录清点与完整性过滤 ✅
//!
//! 按自然序遍历患者目录, 丢弃缺少任一文件的患者, 再与生存信息表做内连接.
//!
//! 实现位于 `brats-berry/src/dataset`.
//!
//! ### 两套可互换的 nifti 解码后端 ✅
//!
//! 1. 基于 `nifti` crate 的后端. ✅
//! 2. 独立的 NIfTI-1 解码器, 支持 `.nii` 与 `.nii.gz`, 两种字节序. ✅
//! 3. 两者在同一文件上的形状与强度极值必须一致. ✅
//!
//! 实现位于 `brats-berry/src/data/backend`.
//!
//! ### 元信息表, 标注审计, 分布直方图 ✅
//!
//! 1. 每个患者 12 列元信息 (4 模态 × 极值/形状/分辨率). ✅
//! 2. 标注标签集合与 `{0, 1, 2, 4}` 比对, 统计不完整比例. ✅
//! 3. 目录名异常的患者编号通过覆盖表修正. ✅
//! 4. 长表 + 叠加阶梯直方图 + 核密度曲线. ✅
//!
//! 实现位于 `brats-berry/src/stats`.
//!
//! ### 逐层切片动画 ✅
//!
//! 以可重复遍历的帧序列组织切片, 渲染与 gif 编码独立于数据组织.
//!
//! 实现位于 `brats-berry/src/animate`.
//!
//! ### 多通道堆叠加载流水线 ✅
//!
//! 加载, 通道优先, 非零体素逐通道归一化; 影像与标注融合显示.
//!
//! 实现位于 `brats-berry/src/framework`.
//!
//! ### 标注异常根因 ⌛️
//!
//! 训练集中 `1998.09.19` 目录名与命名约定冲突的原因尚未查明, 目前仅做编号映射.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D nii 文件基础数据结构.
pub mod data;

pub use data::{
    BackendKind, Colormap, DiscreteColormap, IntensityWindow, Modality, NiftiRsBackend,
    RawBackend, Volume, VolumeBackend,
};

pub mod consts;

pub mod config;

pub mod error;

pub mod dataset;

pub mod stats;

pub mod animate;

pub mod framework;

pub mod figure;

pub mod prelude;
