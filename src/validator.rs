//! # Flow Profile Validation
//!
//! Physical sanity rules for temperature/velocity columns:
//!
//! 1. **Temperature**: every value must be finite and `>= 0`
//! 2. **Velocity**: every value must be finite and strictly inside `(-1, 1)`
//!    (sub-luminal, natural units)
//!
//! Validation never fails. Every element of every supplied column is inspected
//! and all violations are collected into a [`ValidationReport`], so callers can
//! report the complete set at once. An absent column is vacuously valid.
//!
//! ## Usage
//!
//! ```rust
//! use flowspec::validator::validate;
//!
//! let report = validate(Some(&[0.2, -1.0]), Some(&[0.1, 1.5]));
//! assert!(!report.is_valid());
//! assert_eq!(report.error_count(), 2);
//! ```

mod report;

pub use report::{ProfileField, ValidationIssue, ValidationReport};

use crate::profile::FlowProfilePoint;

/// Validate optional temperature and velocity columns.
pub fn validate(temperatures: Option<&[f64]>, velocities: Option<&[f64]>) -> ValidationReport {
    let mut report = ValidationReport::new();

    if let Some(temperatures) = temperatures {
        check_temperatures(temperatures.iter().copied(), &mut report);
    }
    if let Some(velocities) = velocities {
        check_velocities(velocities.iter().copied(), &mut report);
    }

    report
}

/// Validate both columns of a synthesized profile.
pub fn validate_profile(points: &[FlowProfilePoint]) -> ValidationReport {
    let mut report = ValidationReport::new();
    check_temperatures(points.iter().map(|p| p.temperature), &mut report);
    check_velocities(points.iter().map(|p| p.velocity), &mut report);
    report
}

fn check_temperatures(values: impl Iterator<Item = f64>, report: &mut ValidationReport) {
    for (index, t) in values.enumerate() {
        report.temperatures_checked += 1;
        if !t.is_finite() || t < 0.0 {
            report.add_issue(ValidationIssue::temperature(index, t));
        }
    }
}

fn check_velocities(values: impl Iterator<Item = f64>, report: &mut ValidationReport) {
    for (index, v) in values.enumerate() {
        report.velocities_checked += 1;
        if !v.is_finite() || v.abs() >= 1.0 {
            report.add_issue(ValidationIssue::velocity(index, v));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_valid() {
        let report = validate(None, None);
        assert!(report.is_valid());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.temperatures_checked, 0);
    }

    #[test]
    fn test_negative_temperature_references_index() {
        let report = validate(Some(&[-1.0]), None);
        assert!(!report.is_valid());
        assert_eq!(report.issues[0].index, 0);
        assert_eq!(report.issues[0].field, ProfileField::Temperature);
        assert!(report.issues[0].message.contains("index 0"));
    }

    #[test]
    fn test_reports_every_violation() {
        let report = validate(
            Some(&[1.0, -2.0, 0.5, -0.1, f64::NAN]),
            Some(&[0.5, 1.5, -1.0, 0.999, f64::INFINITY]),
        );

        let bad_t: Vec<usize> = report
            .issues_for(ProfileField::Temperature)
            .map(|i| i.index)
            .collect();
        let bad_v: Vec<usize> = report
            .issues_for(ProfileField::Velocity)
            .map(|i| i.index)
            .collect();

        assert_eq!(bad_t, vec![1, 3, 4]);
        assert_eq!(bad_v, vec![1, 2, 4]);
        assert_eq!(report.error_count(), 6);
        assert_eq!(report.temperatures_checked, 5);
        assert_eq!(report.velocities_checked, 5);
    }

    #[test]
    fn test_velocity_at_light_speed_is_invalid() {
        let report = validate(None, Some(&[1.0]));
        assert!(!report.is_valid());
        assert!(report.errors().any(|e| e.contains("velocity")));
    }

    #[test]
    fn test_zero_temperature_is_valid() {
        assert!(validate(Some(&[0.0]), Some(&[0.0, -0.5])).is_valid());
    }

    #[test]
    fn test_validate_profile_points() {
        let points = vec![
            FlowProfilePoint {
                time: 0.0,
                temperature: 0.3,
                velocity: 0.1,
            },
            FlowProfilePoint {
                time: 1.0,
                temperature: -0.3,
                velocity: 1.1,
            },
        ];
        let report = validate_profile(&points);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.issues[0].field, ProfileField::Temperature);
        assert_eq!(report.issues[1].field, ProfileField::Velocity);
    }

    #[test]
    fn test_report_display() {
        let report = validate(Some(&[-1.0]), None);
        let text = report.to_string();
        assert!(text.contains("Profile INVALID"));
        assert!(text.contains("Invalid temperature at index 0"));

        let colored = report.format_colored();
        assert!(colored.contains("Invalid temperature at index 0"));
    }
}
