use gcmsquery::{
    build_intensity_matrix,
    BinningConfig,
    Scan,
};
use gcmsseek::area::estimate_peak_areas;
use gcmsseek::filters::{
    num_ions_threshold,
    rel_threshold,
};
use gcmsseek::{
    biller_biemann,
    AreaConfig,
    DetectionConfig,
    Result,
};

const TRIANGLE: [f64; 13] = [
    0.0, 0.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 800.0, 600.0, 400.0, 200.0, 0.0, 0.0,
];

fn triangle_run() -> Vec<Scan> {
    TRIANGLE
        .iter()
        .enumerate()
        .map(|(i, x)| Scan::new(i as f64, vec![73.0, 74.0], vec![*x, x / 2.0]).unwrap())
        .collect()
}

#[test]
fn test_triangular_pulse_is_one_peak() -> Result<()> {
    let im = build_intensity_matrix(&triangle_run(), &BinningConfig::default())?;
    let mut peaks = biller_biemann(&im, &DetectionConfig::default())?;

    assert_eq!(peaks.len(), 1);
    assert_eq!(peaks[0].retention_time(), 6.0);
    assert_eq!(peaks[0].mass_spectrum().unwrap().intensities(), &[1000.0, 500.0]);

    estimate_peak_areas(&im, &mut peaks, &AreaConfig::default())?;
    assert_eq!(peaks[0].ion_area(73.0), Some(5000.0));
    assert_eq!(peaks[0].ion_area(74.0), Some(2500.0));
    assert_eq!(peaks[0].area(), Some(7500.0));
    assert_eq!(peaks[0].ion_area(75.0), None);
    Ok(())
}

#[test]
fn test_short_run_has_no_peaks() -> Result<()> {
    let scans = triangle_run()[..2].to_vec();
    let im = build_intensity_matrix(&scans, &BinningConfig::default())?;
    assert!(biller_biemann(&im, &DetectionConfig::default())?.is_empty());
    Ok(())
}

#[test]
fn test_filters_never_add_peaks() -> Result<()> {
    let im = build_intensity_matrix(&triangle_run(), &BinningConfig::default())?;
    let mut peaks = biller_biemann(&im, &DetectionConfig::default())?;
    let n = peaks.len();
    let uid = peaks[0].uid();

    rel_threshold(&mut peaks, 60.0)?;
    assert_eq!(peaks.len(), n);
    // The second ion is at 50%, under the threshold.
    assert_eq!(peaks[0].mass_spectrum().unwrap().intensities(), &[1000.0, 0.0]);
    assert_ne!(peaks[0].uid(), uid);

    assert_eq!(num_ions_threshold(&peaks, 1, 1.0)?.len(), 1);
    assert!(num_ions_threshold(&peaks, 2, 1.0)?.is_empty());
    Ok(())
}
