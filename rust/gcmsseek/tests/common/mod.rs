use gcmsquery::Scan;

pub const SCAN_INTERVAL: f64 = 0.5;
pub const PEAK_SIGMA: f64 = 1.5;

/// A compound spectrum at its apex.
pub struct Compound {
    pub masses: [f64; 4],
    pub intensities: [f64; 4],
}

pub static COMPOUNDS: [Compound; 3] = [
    Compound {
        masses: [50.0, 51.0, 52.0, 53.0],
        intensities: [1000.0, 400.0, 200.0, 100.0],
    },
    Compound {
        masses: [60.0, 61.0, 62.0, 63.0],
        intensities: [200.0, 1000.0, 300.0, 100.0],
    },
    Compound {
        masses: [70.0, 71.0, 72.0, 73.0],
        intensities: [100.0, 200.0, 1000.0, 500.0],
    },
];

/// Gaussian elution profiles, cut to zero beyond five sigma. `elutions`
/// pairs a compound index with its apex retention time (seconds).
pub fn synthetic_run(elutions: &[(usize, f64)], end_time: f64) -> Vec<Scan> {
    let n_scans = (end_time / SCAN_INTERVAL) as usize + 1;
    (0..n_scans)
        .map(|i| {
            let rt = i as f64 * SCAN_INTERVAL;
            let mut masses = Vec::new();
            let mut intensities = Vec::new();
            for (ci, compound) in COMPOUNDS.iter().enumerate() {
                for (m, x) in compound.masses.iter().zip(compound.intensities.iter()) {
                    let mut total = 0.0;
                    for (idx, apex) in elutions {
                        if *idx != ci {
                            continue;
                        }
                        let dt = rt - apex;
                        if dt.abs() <= 5.0 * PEAK_SIGMA {
                            total += x * (-(dt / PEAK_SIGMA).powi(2) / 2.0).exp();
                        }
                    }
                    masses.push(*m);
                    intensities.push(total);
                }
            }
            Scan::new(rt, masses, intensities).unwrap()
        })
        .collect()
}
