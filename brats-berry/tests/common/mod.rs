//! 集成测试共用的合成数据集.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use brats_berry::data::Modality;
use byteorder::{ByteOrder, LittleEndian};

/// 打开调试日志. 多个测试重复调用时只有第一次生效.
pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

/// 合成体数据的形状.
pub const DIMS: [usize; 3] = [6, 5, 4];

/// 以字节序 `E` 编码一个 int16 NIfTI-1 单文件. `f(x, y, z)` 给出体素值.
pub fn nii_bytes<E: ByteOrder>(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> i16) -> Vec<u8> {
    let mut b = vec![0u8; 352];
    E::write_i32(&mut b[0..4], 348);
    E::write_i16(&mut b[40..42], 3);
    for (i, d) in dims.iter().enumerate() {
        E::write_i16(&mut b[42 + i * 2..44 + i * 2], *d as i16);
    }
    for i in 3..7 {
        E::write_i16(&mut b[42 + i * 2..44 + i * 2], 1);
    }
    E::write_i16(&mut b[70..72], 4);
    E::write_i16(&mut b[72..74], 16);
    E::write_f32(&mut b[76..80], 1.0);
    for i in 0..3 {
        E::write_f32(&mut b[80 + i * 4..84 + i * 4], 1.0);
    }
    E::write_f32(&mut b[108..112], 352.0);
    E::write_f32(&mut b[112..116], 1.0);
    b[344..348].copy_from_slice(b"n+1\0");

    // x 变化最快.
    let mut buf = [0u8; 2];
    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                E::write_i16(&mut buf, f(x, y, z));
                b.extend_from_slice(&buf);
            }
        }
    }
    b
}

/// 写出一个小端 int16 NIfTI-1 单文件.
pub fn write_nii<P: AsRef<Path>>(path: P, dims: [usize; 3], f: impl Fn(usize, usize, usize) -> i16) {
    fs::write(path, nii_bytes::<LittleEndian>(dims, f)).unwrap();
}

/// 成像模态的体素值, 不同模态之间有固定偏移.
pub fn imaging_value(m: Modality, x: usize, y: usize, z: usize) -> i16 {
    (m as usize * 1000 + x + 10 * y + 100 * z) as i16
}

/// 标注的体素值: 在 `labels` 中循环取值.
pub fn mask_value(labels: &[i16], x: usize, y: usize, z: usize) -> i16 {
    labels[(x + y + z) % labels.len()]
}

/// 在 `root` 下创建一个患者目录, 跳过 `missing` 中的模态. 返回目录路径.
pub fn write_patient(root: &Path, id: &str, labels: &[i16], missing: &[Modality]) -> PathBuf {
    init_logger();
    let folder = root.join(id);
    fs::create_dir_all(&folder).unwrap();
    for m in Modality::ALL {
        if missing.contains(&m) {
            continue;
        }
        let path = folder.join(format!("{id}{}", m.file_suffix()));
        match m {
            Modality::Mask => write_nii(path, DIMS, |x, y, z| mask_value(labels, x, y, z)),
            _ => write_nii(path, DIMS, |x, y, z| imaging_value(m, x, y, z)),
        }
    }
    folder
}

/// 写出生存信息表.
pub fn write_survival(path: &Path, ids: &[&str]) {
    let mut s = String::from("Brats20ID,Age,Survival_days,Extent_of_Resection\n");
    for (i, id) in ids.iter().enumerate() {
        s.push_str(&format!("{id},{}.5,{},GTR\n", 40 + i, 100 * (i + 1)));
    }
    fs::write(path, s).unwrap();
}

/// 患者目录名.
pub fn training_id(n: u32) -> String {
    format!("BraTS20_Training_{n:03}")
}
