//! 按患者加载体数据, 并生成逐层动画.

mod common;

use brats_berry::animate::SliceAnimation;
use brats_berry::config::AnimationConfig;
use brats_berry::data::{BackendKind, Modality};
use brats_berry::dataset::{Inventory, PatientLoader};
use common::{imaging_value, mask_value, training_id, write_patient, DIMS};

fn first_patient() -> (tempfile::TempDir, brats_berry::dataset::PatientVolumes) {
    let dir = tempfile::tempdir().unwrap();
    write_patient(dir.path(), &training_id(7), &[0, 1, 2, 4], &[]);
    write_patient(dir.path(), &training_id(8), &[0, 2], &[]);
    let complete = Inventory::scan(dir.path()).unwrap().complete();
    let backend = BackendKind::Raw.backend();

    let mut loader = PatientLoader::new(backend.as_ref(), complete);
    assert_eq!(loader.len(), 2);
    let (id, patient) = loader.next().unwrap();
    assert_eq!(id, training_id(7));
    assert_eq!(loader.len(), 1);
    (dir, patient.unwrap())
}

#[test]
fn test_rotated_frames_follow_last_axis() {
    let (_dir, patient) = first_patient();
    let cfg = AnimationConfig::default();
    assert!(cfg.rotate);
    let anim = SliceAnimation::from_patient(&patient, cfg, false).unwrap();

    let [x, y, z] = DIMS;
    assert_eq!(anim.len(), z);
    assert_eq!(anim.frames().len(), z);
    // 旋转后每帧为 (y, x).
    assert_eq!(anim.slice_shape(), (y, x));
    assert!(!anim.shows_mask());
    assert!(anim.legend().is_empty());
    assert_eq!(anim.frame_delay_ms(), cfg.total_ms / z as u32);

    for frame in anim.frames() {
        let k = frame.index;
        assert!(frame.mask.is_none());
        assert_eq!(frame.panels.len(), 4);
        for (m, panel) in frame.panels.iter() {
            for i in 0..y {
                for j in 0..x {
                    let expected = imaging_value(*m, x - 1 - j, i, k) as f32;
                    assert_eq!(panel[(i, j)], expected, "{m} frame {k} at ({i}, {j})");
                }
            }
        }
    }
}

#[test]
fn test_unrotated_frames_with_mask() {
    let (_dir, patient) = first_patient();
    let cfg = AnimationConfig {
        rotate: false,
        ..Default::default()
    };
    let anim = SliceAnimation::from_patient(&patient, cfg, true).unwrap();
    assert_eq!(anim.slice_shape(), (DIMS[0], DIMS[1]));

    let frame = anim.frames().nth(2).unwrap();
    let mask = frame.mask.unwrap();
    assert_eq!(mask[(3, 1)], mask_value(&[0, 1, 2, 4], 3, 1, 2) as f32);
    let (m, flair) = &frame.panels[0];
    assert_eq!(*m, Modality::Flair);
    assert_eq!(flair[(3, 1)], imaging_value(Modality::Flair, 3, 1, 2) as f32);

    let labels: Vec<_> = anim.legend().iter().map(|e| e.label).collect();
    assert_eq!(labels, [1, 2, 4]);
}

#[test]
fn test_gif_written() {
    let (dir, patient) = first_patient();
    let anim = SliceAnimation::from_patient(&patient, AnimationConfig::default(), true).unwrap();
    let path = dir.path().join("case.gif");
    anim.save_gif(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..3], b"GIF");
}
