//! Cleaning and canonicalization of extracted records.
//!
//! Silent defaults are deliberately loud here: a defaulted elevation or an
//! unresolved proxy variable is kept, but surfaced as a degraded diagnostic
//! for operator review.

use crate::convert::extract::RawRecord;
use crate::convert::types::{Diagnostic, ProxyRecord};

/// Clean a raw record into its canonical form, or reject it with a skip
/// reason. Degraded-but-kept fields are reported alongside the record.
pub fn normalize(raw: RawRecord) -> Result<(ProxyRecord, Vec<Diagnostic>), String> {
    if raw.time.len() != raw.value.len() {
        return Err("time/value length mismatch".to_string());
    }

    let (time, value) = drop_missing_pairs(raw.time, raw.value);
    if time.is_empty() {
        return Err("empty series after cleaning".to_string());
    }

    let mut notes = Vec::new();

    // A NaN coordinate carries no position; treat it as unset.
    let lat = raw.lat.filter(|v| !v.is_nan());
    let lon = raw.lon.filter(|v| !v.is_nan()).map(wrap_longitude);

    let elev = match raw.elev.filter(|v| !v.is_nan()) {
        Some(elev) => elev,
        None => {
            notes.push(Diagnostic::degraded(
                &raw.pid,
                "elevation missing, defaulted to 0.0",
            ));
            0.0
        }
    };

    let ptype = match &raw.variable {
        Some(variable) => format!("{}.{}", raw.archive, variable),
        None => {
            notes.push(Diagnostic::degraded(
                &raw.pid,
                format!("proxy variable unresolved, tagged '{}.unknown'", raw.archive),
            ));
            format!("{}.unknown", raw.archive)
        }
    };

    let record = ProxyRecord {
        pid: raw.pid,
        lat,
        lon,
        elev,
        ptype,
        time,
        value,
    };
    Ok((record, notes))
}

/// Map any longitude into `[0, 360)`.
pub fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Remove index positions where either series is NaN, keeping the two
/// sequences aligned.
fn drop_missing_pairs(time: Vec<f64>, value: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    time.into_iter()
        .zip(value)
        .filter(|(t, v)| !t.is_nan() && !v.is_nan())
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::types::DiagnosticKind;

    fn raw(pid: &str) -> RawRecord {
        RawRecord {
            pid: pid.to_string(),
            lat: Some(32.3),
            lon: Some(295.5),
            elev: Some(5.0),
            archive: "coral".to_string(),
            variable: Some("d18o".to_string()),
            time: vec![2000.0, 1999.0],
            value: vec![-3.2, -3.1],
        }
    }

    #[test]
    fn test_clean_record_passes_through() {
        let (record, notes) = normalize(raw("A")).unwrap();
        assert_eq!(record.pid, "A");
        assert_eq!(record.lat, Some(32.3));
        assert_eq!(record.lon, Some(295.5));
        assert_eq!(record.elev, 5.0);
        assert_eq!(record.ptype, "coral.d18o");
        assert!(notes.is_empty());
    }

    #[test]
    fn test_paired_nan_removal() {
        let mut input = raw("A");
        input.time = vec![2000.0, f64::NAN, 1998.0, 1997.0];
        input.value = vec![-3.2, -3.1, f64::NAN, -2.9];

        let (record, _) = normalize(input).unwrap();
        assert_eq!(record.time, vec![2000.0, 1997.0]);
        assert_eq!(record.value, vec![-3.2, -2.9]);
    }

    #[test]
    fn test_longitude_wraps_into_range() {
        assert_eq!(wrap_longitude(-64.5), 295.5);
        assert_eq!(wrap_longitude(370.0), 10.0);
        assert_eq!(wrap_longitude(360.0), 0.0);
        assert_eq!(wrap_longitude(0.0), 0.0);
        assert_eq!(wrap_longitude(-720.0), 0.0);

        let wrapped = wrap_longitude(-1e-15);
        assert!((0.0..360.0).contains(&wrapped));
    }

    #[test]
    fn test_negative_longitude_normalized_on_record() {
        let mut input = raw("A");
        input.lon = Some(-64.5);
        let (record, _) = normalize(input).unwrap();
        assert_eq!(record.lon, Some(295.5));
    }

    #[test]
    fn test_latitude_passed_through_unchanged() {
        let mut input = raw("A");
        input.lat = Some(-43.5);
        let (record, _) = normalize(input).unwrap();
        assert_eq!(record.lat, Some(-43.5));
    }

    #[test]
    fn test_nan_coordinates_treated_as_unset() {
        let mut input = raw("A");
        input.lat = Some(f64::NAN);
        input.lon = Some(f64::NAN);
        let (record, _) = normalize(input).unwrap();
        assert_eq!(record.lat, None);
        assert_eq!(record.lon, None);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut input = raw("A");
        input.value = vec![-3.2];
        let err = normalize(input).unwrap_err();
        assert_eq!(err, "time/value length mismatch");
    }

    #[test]
    fn test_empty_after_cleaning_rejected() {
        let mut input = raw("A");
        input.time = vec![f64::NAN, 1999.0];
        input.value = vec![-3.2, f64::NAN];
        let err = normalize(input).unwrap_err();
        assert_eq!(err, "empty series after cleaning");
    }

    #[test]
    fn test_elevation_default_is_surfaced() {
        let mut input = raw("A");
        input.elev = None;
        let (record, notes) = normalize(input).unwrap();
        assert_eq!(record.elev, 0.0);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, DiagnosticKind::Degraded);
        assert!(notes[0].reason.contains("elevation"));
    }

    #[test]
    fn test_unresolved_variable_is_surfaced() {
        let mut input = raw("A");
        input.variable = None;
        let (record, notes) = normalize(input).unwrap();
        assert_eq!(record.ptype, "coral.unknown");
        assert!(notes
            .iter()
            .any(|n| n.kind == DiagnosticKind::Degraded && n.reason.contains("unresolved")));
    }
}
