//! 通用常量.

/// 分割标签取值.
pub mod label {
    /// BraTS 数据集中, 背景的体素值.
    pub const BRATS_BACKGROUND: i64 = 0;

    /// BraTS 数据集中, 坏死/非增强肿瘤核心 (NCR/NET) 的体素值.
    pub const BRATS_NECROTIC: i64 = 1;

    /// BraTS 数据集中, 瘤周水肿 (ED) 的体素值.
    pub const BRATS_EDEMA: i64 = 2;

    /// BraTS 数据集中, 增强肿瘤 (ET) 的体素值. 注意没有 3.
    pub const BRATS_ENHANCING: i64 = 4;

    /// 一份完整标注应当恰好包含的标签集合.
    pub const EXPECTED_LABELS: [i64; 4] = [
        BRATS_BACKGROUND,
        BRATS_NECROTIC,
        BRATS_EDEMA,
        BRATS_ENHANCING,
    ];

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: i64) -> bool {
        matches!(p, BRATS_BACKGROUND)
    }

    /// 标签对应的肿瘤区域名称. 背景及未知标签返回 `None`.
    pub const fn region_name(p: i64) -> Option<&'static str> {
        match p {
            BRATS_NECROTIC => Some("Non-Enhancing Tumor Core"),
            BRATS_EDEMA => Some("Peritumoral Edema"),
            BRATS_ENHANCING => Some("GD-Enhancing Tumor"),
            _ => None,
        }
    }
}

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 生存信息表中的患者 ID 列名.
pub const PATIENT_ID_COLUMN: &str = "Brats20ID";

/// BraTS 2020 训练集患者个数.
pub const BRATS_TRAINING_SET_LEN: u32 = 369;

/// 数据集在用户目录下的默认文件夹名.
pub const DEFAULT_DATASET_DIR_NAME: &str = "brats20-dataset-training-validation";
