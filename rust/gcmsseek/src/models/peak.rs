use gcmsquery::errors::{
    DataShapeError,
    ParameterError,
};
use gcmsquery::MassSpectrum;
use serde::ser::{
    SerializeMap,
    SerializeStruct,
};
use serde::{
    Deserialize,
    Serialize,
    Serializer,
};

use crate::errors::Result;

const ION_MATCH_TOLERANCE: f64 = 1e-6;

/// What a peak was detected on.
#[derive(Debug, Clone, PartialEq)]
pub enum PeakKind {
    FullSpectrum(MassSpectrum),
    SingleIon { mass: f64 },
}

/// Left and right extent of a peak, in scans relative to the apex scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakBounds {
    pub left: usize,
    pub apex: usize,
    pub right: usize,
}

/// Per-ion integrated areas, kept sorted by mass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IonAreas {
    entries: Vec<(f64, f64)>,
}

impl IonAreas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the area for `mass`.
    pub fn insert(&mut self, mass: f64, area: f64) {
        let pos = self.entries.partition_point(|(m, _)| *m < mass - ION_MATCH_TOLERANCE);
        match self.entries.get_mut(pos) {
            Some(entry) if (entry.0 - mass).abs() <= ION_MATCH_TOLERANCE => entry.1 = area,
            _ => self.entries.insert(pos, (mass, area)),
        }
    }

    pub fn get(&self, mass: f64) -> Option<f64> {
        let pos = self.entries.partition_point(|(m, _)| *m < mass - ION_MATCH_TOLERANCE);
        self.entries
            .get(pos)
            .filter(|(m, _)| (m - mass).abs() <= ION_MATCH_TOLERANCE)
            .map(|(_, a)| *a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn masses(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(m, _)| *m)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, a)| a).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(f64, f64)> for IonAreas {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut out = IonAreas::new();
        for (m, a) in iter {
            out.insert(m, a);
        }
        out
    }
}

// Json object keys have to be strings.
impl Serialize for IonAreas {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (mass, area) in &self.entries {
            map.serialize_entry(&mass.to_string(), area)?;
        }
        map.end()
    }
}

/// A chromatographic peak.
///
/// Retention time is stored in seconds. The UID is derived from the
/// current spectrum and retention time every time it is asked for, so it
/// follows any edit made through the setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    retention_time: f64,
    kind: PeakKind,
    area: Option<f64>,
    ion_areas: IonAreas,
    bounds: Option<PeakBounds>,
    is_outlier: bool,
}

impl Peak {
    pub fn new(retention_time: f64, spectrum: MassSpectrum) -> Result<Self> {
        Self::with_kind(retention_time, PeakKind::FullSpectrum(spectrum))
    }

    pub fn from_minutes(retention_time_minutes: f64, spectrum: MassSpectrum) -> Result<Self> {
        Self::new(retention_time_minutes * 60.0, spectrum)
    }

    pub fn single_ion(retention_time: f64, mass: f64) -> Result<Self> {
        if !mass.is_finite() {
            return Err(DataShapeError::ExpectedFiniteNonNanData {
                index: 0,
                context: "Peak::single_ion mass".to_string(),
            }
            .into());
        }
        Self::with_kind(retention_time, PeakKind::SingleIon { mass })
    }

    fn with_kind(retention_time: f64, kind: PeakKind) -> Result<Self> {
        if !retention_time.is_finite() {
            return Err(DataShapeError::ExpectedFiniteNonNanData {
                index: 0,
                context: "Peak retention time".to_string(),
            }
            .into());
        }
        Ok(Self {
            retention_time,
            kind,
            area: None,
            ion_areas: IonAreas::new(),
            bounds: None,
            is_outlier: false,
        })
    }

    pub fn retention_time(&self) -> f64 {
        self.retention_time
    }

    pub fn kind(&self) -> &PeakKind {
        &self.kind
    }

    pub fn mass_spectrum(&self) -> Option<&MassSpectrum> {
        match &self.kind {
            PeakKind::FullSpectrum(ms) => Some(ms),
            PeakKind::SingleIon { .. } => None,
        }
    }

    pub fn ion_mass(&self) -> Option<f64> {
        match &self.kind {
            PeakKind::SingleIon { mass } => Some(*mass),
            PeakKind::FullSpectrum(_) => None,
        }
    }

    /// Replaces the spectrum; a single-ion peak becomes a full-spectrum one.
    pub fn set_mass_spectrum(&mut self, spectrum: MassSpectrum) {
        self.kind = PeakKind::FullSpectrum(spectrum);
    }

    pub fn area(&self) -> Option<f64> {
        self.area
    }

    pub fn set_area(&mut self, area: f64) -> Result<()> {
        if !(area.is_finite() && area >= 0.0) {
            return Err(ParameterError::InvalidValue {
                parameter: "area",
                value: area.to_string(),
                context: "Peak::set_area expects a finite non negative area".to_string(),
            }
            .into());
        }
        self.area = Some(area);
        Ok(())
    }

    pub fn ion_areas(&self) -> &IonAreas {
        &self.ion_areas
    }

    pub fn ion_area(&self, mass: f64) -> Option<f64> {
        self.ion_areas.get(mass)
    }

    pub fn set_ion_areas(&mut self, ion_areas: IonAreas) {
        self.ion_areas = ion_areas;
    }

    pub fn set_ion_area(&mut self, mass: f64, area: f64) -> Result<()> {
        if !(area.is_finite() && area >= 0.0) {
            return Err(ParameterError::InvalidValue {
                parameter: "ion_area",
                value: area.to_string(),
                context: format!("Peak::set_ion_area for mass {}", mass),
            }
            .into());
        }
        self.ion_areas.insert(mass, area);
        Ok(())
    }

    pub fn bounds(&self) -> Option<PeakBounds> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: PeakBounds) {
        self.bounds = Some(bounds);
    }

    pub fn is_outlier(&self) -> bool {
        self.is_outlier
    }

    pub fn set_outlier(&mut self, is_outlier: bool) {
        self.is_outlier = is_outlier;
    }

    /// Masses of the `n` most intense ions.
    pub fn top_ions(&self, n: usize) -> Vec<f64> {
        match &self.kind {
            PeakKind::FullSpectrum(ms) => ms.top_ions(n),
            PeakKind::SingleIon { mass } => vec![*mass].into_iter().take(n).collect(),
        }
    }

    pub fn crop_mass(&mut self, low: f64, high: f64) -> Result<()> {
        match &mut self.kind {
            PeakKind::FullSpectrum(ms) => Ok(ms.crop(low, high)?),
            PeakKind::SingleIon { .. } => Err(not_a_spectrum("Peak::crop_mass")),
        }
    }

    pub fn null_mass(&mut self, mass: f64) -> Result<()> {
        match &mut self.kind {
            PeakKind::FullSpectrum(ms) => Ok(ms.null_mass(mass)?),
            PeakKind::SingleIon { .. } => Err(not_a_spectrum("Peak::null_mass")),
        }
    }

    /// Identifier built from the two most intense ions and the retention time.
    ///
    /// `"{m1}-{m2}-{ratio}-{rt}"` where `m1` and `m2` are the truncated masses
    /// of the most and second most intense ions, `ratio` is the truncated
    /// percentage of the second relative to the first and `rt` is in seconds
    /// with two decimals. A spectrum with a single ion pairs it with itself.
    /// Single-ion peaks use `"{mass}-{rt}"`, and a spectrum with no intensity
    /// falls back to `"{rt}"`.
    ///
    /// ```
    /// use gcmsquery::MassSpectrum;
    /// use gcmsseek::Peak;
    ///
    /// let ms = MassSpectrum::new(vec![73.1, 147.2, 207.0], vec![80.0, 100.0, 5.0]).unwrap();
    /// let peak = Peak::new(612.0, ms).unwrap();
    /// assert_eq!(peak.uid(), "147-73-80-612.00");
    /// ```
    pub fn uid(&self) -> String {
        let rt = self.retention_time;
        match &self.kind {
            PeakKind::SingleIon { mass } => format!("{}-{:.2}", mass.trunc() as i64, rt),
            PeakKind::FullSpectrum(ms) => {
                let ranked = ms.ranked_indices();
                let first = match ranked.first() {
                    Some(&i) if ms.intensities()[i] > 0.0 => i,
                    _ => return format!("{:.2}", rt),
                };
                // A lone ion is its own second ion.
                let second = ranked.get(1).copied().unwrap_or(first);
                let m1 = ms.masses()[first].trunc() as i64;
                let m2 = ms.masses()[second].trunc() as i64;
                let ratio = (100.0 * ms.intensities()[second] / ms.intensities()[first]) as i64;
                format!("{}-{}-{}-{:.2}", m1, m2, ratio, rt)
            }
        }
    }
}

fn not_a_spectrum(context: &str) -> crate::errors::GcmsSeekError {
    ParameterError::InvalidValue {
        parameter: "peak",
        value: "single ion".to_string(),
        context: format!("{} needs a full spectrum peak", context),
    }
    .into()
}

impl Serialize for Peak {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Peak", 7)?;
        state.serialize_field("retention_time", &self.retention_time)?;
        state.serialize_field("uid", &self.uid())?;
        state.serialize_field("mass_spectrum", &self.mass_spectrum())?;
        state.serialize_field("ion_mass", &self.ion_mass())?;
        state.serialize_field("area", &self.area)?;
        let ion_areas = (!self.ion_areas.is_empty()).then_some(&self.ion_areas);
        state.serialize_field("ion_areas", &ion_areas)?;
        state.serialize_field("bounds", &self.bounds)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(masses: Vec<f64>, intensities: Vec<f64>, rt: f64) -> Peak {
        Peak::new(rt, MassSpectrum::new(masses, intensities).unwrap()).unwrap()
    }

    #[test]
    fn test_uid_formats() {
        assert_eq!(
            peak(vec![50.0, 51.0, 52.0], vec![10.0, 100.0, 33.3], 60.0).uid(),
            "51-52-33-60.00"
        );
        // A lone non zero ion still picks a zero intensity partner.
        assert_eq!(peak(vec![50.0, 51.0, 52.0], vec![0.0, 0.0, 100.0], 1.0).uid(), "52-50-0-1.00");
        assert_eq!(peak(vec![50.0, 51.0], vec![0.0, 0.0], 1.234).uid(), "1.23");
        assert_eq!(peak(vec![88.9], vec![5.0], 2.0).uid(), "88-88-100-2.00");
        assert_ne!(
            peak(vec![88.0], vec![5.0], 2.0).uid(),
            Peak::single_ion(2.0, 88.0).unwrap().uid()
        );
        assert_eq!(Peak::single_ion(10.0, 73.7).unwrap().uid(), "73-10.00");
        assert_eq!(
            Peak::from_minutes(1.5, MassSpectrum::new(vec![], vec![]).unwrap())
                .unwrap()
                .uid(),
            "90.00"
        );
    }

    #[test]
    fn test_uid_follows_edits() {
        let mut p = peak(vec![50.0, 51.0, 52.0], vec![10.0, 100.0, 33.3], 60.0);
        let before = p.uid();
        p.null_mass(51.0).unwrap();
        assert_ne!(before, p.uid());
        assert_eq!(p.uid(), "52-50-30-60.00");
        p.crop_mass(50.5, 52.0).unwrap();
        assert_eq!(p.uid(), "52-51-0-60.00");
    }

    #[test]
    fn test_areas() {
        let mut p = peak(vec![50.0], vec![1.0], 1.0);
        assert_eq!(p.area(), None);
        assert_eq!(p.ion_area(50.0), None);
        assert!(p.set_area(-1.0).is_err());
        p.set_area(12.0).unwrap();
        p.set_ion_area(50.0, 3.0).unwrap();
        p.set_ion_area(50.0, 4.0).unwrap();
        assert_eq!(p.ion_area(50.0), Some(4.0));
        assert_eq!(p.ion_areas().len(), 1);
    }

    #[test]
    fn test_single_ion_rejects_spectrum_edits() {
        let mut p = Peak::single_ion(1.0, 73.0).unwrap();
        assert!(p.crop_mass(1.0, 2.0).is_err());
        assert_eq!(p.top_ions(5), vec![73.0]);
    }

    #[test]
    fn test_serialize_includes_uid() {
        let mut p = peak(vec![50.0, 51.0], vec![2.0, 1.0], 3.0);
        assert!(serde_json::to_value(&p).unwrap()["ion_areas"].is_null());
        p.set_ion_area(50.0, 7.5).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["uid"], "50-51-50-3.00");
        assert_eq!(json["ion_areas"]["50"], 7.5);
        assert!(json["area"].is_null());
    }
}
