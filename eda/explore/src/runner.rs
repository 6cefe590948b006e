//! 程序运行函数. 各阶段自上而下依次执行, 每个阶段只运行一次.

use std::path::Path;

use anyhow::{bail, Context};
use brats_berry::animate::SliceAnimation;
use brats_berry::config::EdaConfig;
use brats_berry::data::{BackendKind, Colormap, Modality, VolumeBackend};
use brats_berry::dataset::{merge_inner, Inventory, MergedPatient, PatientVolumes, SurvivalTable};
use brats_berry::framework::{
    montage, side_by_side, Compose, EnsureChannelFirst, LazyDataset, LoadImage, NormalizeIntensity,
};
use brats_berry::stats::{
    audit_masks, extract_meta, HistPlot, HistStat, MaskAudit, MetaTable, PatientMeta, Stat,
};
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};

use crate::result::EdaReport;

/// 创建统一风格的进度条.
fn progress(len: usize, msg: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{msg:>12} [{bar:40}] {pos}/{len} ({elapsed_precise})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(msg);
    bar
}

/// 阶段 4 的前置检查: 两个后端在同一文件上的结果必须一致.
fn compare_backends(path: &Path) -> anyhow::Result<()> {
    let a = extract_meta(BackendKind::NiftiRs.backend().as_ref(), path)?;
    let b = extract_meta(BackendKind::Raw.backend().as_ref(), path)?;
    println!("file name : {}", path.display());
    println!("nifti : {a}");
    println!("raw   : {b}");
    if a.shape != b.shape || (a.max - b.max).abs() >= 1e-6 || (a.min - b.min).abs() >= 1e-6 {
        log::warn!("backends disagree on `{}`", path.display());
    }
    Ok(())
}

/// 元信息表. 逐个患者顺序提取, 并显示进度.
fn build_meta(backend: &dyn VolumeBackend, merged: &[MergedPatient]) -> anyhow::Result<MetaTable> {
    let bar = progress(merged.len(), "meta");
    let mut rows = Vec::with_capacity(merged.len());
    for m in merged.iter().progress_with(bar.clone()) {
        rows.push(PatientMeta::extract(backend, &m.paths)?);
    }
    bar.finish();
    Ok(MetaTable::from_rows(rows))
}

/// 逐个标注统计标签集合.
fn audit(
    cfg: &EdaConfig,
    backend: &dyn VolumeBackend,
    merged: &[MergedPatient],
) -> anyhow::Result<MaskAudit> {
    let bar = progress(merged.len(), "masks");
    let masks = merged.iter().map(|m| m.paths.mask()).progress_with(bar.clone());
    let audit = audit_masks(backend, masks, &cfg.id_overrides, &cfg.expected_labels)?;
    bar.finish();
    Ok(audit)
}

/// 渲染 max / min 的分布直方图.
fn plot_distributions(cfg: &EdaConfig, meta: &MetaTable) -> anyhow::Result<()> {
    for (stat, hist) in [(Stat::Max, HistStat::Count), (Stat::Min, HistStat::Density)] {
        let long = meta.melt(stat);
        log::info!("melted {} rows for `{}`", long.len(), stat.name());
        let Some(img) = HistPlot::from_long(&long, hist).render() else {
            log::warn!("nothing to plot for `{}`", stat.name());
            continue;
        };
        if let Some(dir) = &cfg.export_dir {
            let path = dir.join(format!("hist_{}.png", stat.name()));
            img.save(&path)
                .with_context(|| format!("cannot save `{}`", path.display()))?;
        }
    }
    Ok(())
}

/// 第一个患者的逐层动画.
fn animate(cfg: &EdaConfig, patient: &PatientVolumes) -> anyhow::Result<()> {
    for show_mask in [false, true] {
        let anim = SliceAnimation::from_patient(patient, cfg.animation, show_mask)?;
        println!(
            "Patient ID: {}, {} frames, {} ms per frame",
            anim.case(),
            anim.frames().len(),
            anim.frame_delay_ms()
        );
        for entry in anim.legend() {
            println!("    label {} -> {:?} {}", entry.label, entry.color.0, entry.name);
        }
        if let Some(dir) = &cfg.export_dir {
            let name = if show_mask { "masked" } else { "plain" };
            let path = dir.join(format!("{}_{name}.gif", anim.case()));
            anim.save_gif(&path)
                .with_context(|| format!("cannot save `{}`", path.display()))?;
        }
    }
    Ok(())
}

/// 多通道堆叠加载, 以及融合显示.
fn framework(cfg: &EdaConfig, merged: &[MergedPatient]) -> anyhow::Result<()> {
    let patients: Vec<_> = merged.iter().take(1).map(|m| m.paths.clone()).collect();
    let transform = Compose::default()
        .then(LoadImage::new(cfg.backend.backend()))
        .then(EnsureChannelFirst)
        .then(NormalizeIntensity::default());
    let dataset = LazyDataset::from_patients(&patients, transform);
    let sample = dataset.get(0)?;

    println!("image shape: {:?}", sample.image_shape().unwrap_or_default());
    println!("label shape: {:?}", sample.label_shape().unwrap_or_default());
    println!("pixel spacing: {:?}", sample.spacing);

    let (Some(image), Some(label)) = (&sample.image, &sample.label) else {
        bail!("transform pipeline produced no data");
    };
    let Some(dir) = &cfg.export_dir else {
        return Ok(());
    };

    for (channel, m) in image.outer_iter().zip(Modality::IMAGING) {
        if let Some(img) = montage(channel, 50, 70) {
            img.save(dir.join(format!("montage_{m}.png")))?;
        }
    }
    let slice = 70.min(label.shape()[2].saturating_sub(1));
    for value in 1..=4 {
        let view = side_by_side(&sample, value, slice, 0.5, Colormap::Hsv)?;
        view.row()
            .save(dir.join(format!("blend_label{value}_slice{slice}.png")))?;
    }
    Ok(())
}

/// 实际运行.
pub fn run(cfg: &EdaConfig) -> anyhow::Result<EdaReport> {
    anyhow::ensure!(
        cfg.train_path.is_dir(),
        "training directory `{}` does not exist",
        cfg.train_path.display()
    );
    if let Some(dir) = &cfg.export_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create `{}`", dir.display()))?;
    }
    let backend = cfg.backend.backend();

    log::info!("stage 1/8: inventory");
    let inventory = Inventory::scan(&cfg.train_path)
        .with_context(|| format!("cannot list `{}`", cfg.train_path.display()))?;
    let counts = inventory.column_counts();

    log::info!("stage 2/8: completeness filter");
    let complete = inventory.complete();

    log::info!("stage 3/8: survival merge");
    let survival = SurvivalTable::from_path(&cfg.train_survival_csv)?;
    let merged = merge_inner(&complete, &survival);
    let Some(first) = merged.first() else {
        bail!("no patient survived the survival merge");
    };

    log::info!("stage 4/8: meta data ({} backend)", backend.name());
    compare_backends(first.paths.path(Modality::Flair))?;
    let meta = build_meta(backend.as_ref(), &merged)?;

    log::info!("stage 5/8: mask audit");
    let audit = audit(cfg, backend.as_ref(), &merged)?;

    log::info!("stage 6/8: distributions");
    plot_distributions(cfg, &meta)?;

    log::info!("stage 7/8: slice animation");
    let volumes = PatientVolumes::load(backend.as_ref(), &first.paths)?;
    animate(cfg, &volumes)?;
    drop(volumes);

    log::info!("stage 8/8: channel-stacked pipeline");
    framework(cfg, &merged)?;

    Ok(EdaReport {
        counts,
        complete: complete.len(),
        merged: merged.len(),
        meta,
        audit,
    })
}
