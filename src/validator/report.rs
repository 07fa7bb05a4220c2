use std::fmt;

use serde::Serialize;

#[cfg(feature = "colorized_output")]
use console::style;

/// Profile column an issue was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    /// Local temperature column
    Temperature,
    /// Flow speed column
    Velocity,
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileField::Temperature => write!(f, "temperature"),
            ProfileField::Velocity => write!(f, "velocity"),
        }
    }
}

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Column containing the offending value
    pub field: ProfileField,
    /// Index of the offending value within its column
    pub index: usize,
    /// The offending value
    pub value: f64,
    /// Human-readable description
    pub message: String,
}

impl ValidationIssue {
    pub(crate) fn temperature(index: usize, value: f64) -> Self {
        Self {
            field: ProfileField::Temperature,
            index,
            value,
            message: format!("Invalid temperature at index {index}: {value}"),
        }
    }

    pub(crate) fn velocity(index: usize, value: f64) -> Self {
        Self {
            field: ProfileField::Velocity,
            index,
            value,
            message: format!("Invalid velocity at index {index}: |v| must be < c, got {value}"),
        }
    }
}

/// Complete validation report for a temperature/velocity profile.
///
/// Holds every violation found, in column order (temperatures first).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// All violations found
    pub issues: Vec<ValidationIssue>,
    /// Number of temperatures inspected
    pub temperatures_checked: usize,
    /// Number of velocities inspected
    pub velocities_checked: usize,
}

impl ValidationReport {
    /// Create an empty (valid) report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a violation to the report
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// True when no violation was found
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of violations
    pub fn error_count(&self) -> usize {
        self.issues.len()
    }

    /// Violation messages in report order
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|issue| issue.message.as_str())
    }

    /// All violation messages joined into one line
    pub fn summary(&self) -> String {
        self.errors().collect::<Vec<_>>().join("; ")
    }

    /// Violations found in one column
    pub fn issues_for(&self, field: ProfileField) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.field == field)
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Flow Profile Validation").bold().cyan()));
            output.push_str(&format!("{}\n", style("=======================").cyan()));
            output.push_str(&format!(
                "{}: {} temperatures, {} velocities\n\n",
                style("Checked").bold(),
                self.temperatures_checked,
                self.velocities_checked
            ));

            for issue in &self.issues {
                output.push_str(&format!("[{}] {}\n", FAIL, style(&issue.message).red()));
            }

            if self.is_valid() {
                output.push_str(&format!("[{}] {}\n", OK, style("Profile VALID").green().bold()));
            } else {
                output.push_str(&format!(
                    "\n{} ({} issues)\n",
                    style("Profile INVALID").red().bold(),
                    style(self.error_count()).red()
                ));
            }

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Flow Profile Validation")?;
        writeln!(f, "=======================")?;
        writeln!(
            f,
            "Checked: {} temperatures, {} velocities",
            self.temperatures_checked, self.velocities_checked
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "[✗] {}", issue.message)?;
        }

        if self.is_valid() {
            writeln!(f, "[✓] Profile VALID")?;
        } else {
            writeln!(f)?;
            writeln!(f, "Profile INVALID ({} issues)", self.error_count())?;
        }

        Ok(())
    }
}
