//! 🧠欢迎光临🧪
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{
    BackendKind, Colormap, DiscreteColormap, IntensityWindow, Modality, Volume, VolumeBackend,
};

pub use crate::config::{AnimationConfig, EdaConfig};

pub use crate::consts::label::{BRATS_BACKGROUND, BRATS_EDEMA, BRATS_ENHANCING, BRATS_NECROTIC};
pub use crate::consts::BRATS_TRAINING_SET_LEN;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, merge_inner, Inventory, PatientLoader, PatientPaths, SurvivalTable};

pub use crate::stats::{audit_masks, HistPlot, HistStat, MetaTable, Stat};

pub use crate::animate::SliceAnimation;

pub use crate::framework::{Compose, EnsureChannelFirst, LazyDataset, LoadImage, NormalizeIntensity};
