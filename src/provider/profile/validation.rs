/// Validation result for provider configuration.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub provider_name: String,
    pub checks: Vec<(String, bool)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new(provider_name: String) -> Self {
        Self {
            provider_name,
            checks: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_check(&mut self, description: &str, passed: bool) {
        self.checks.push((description.to_string(), passed));
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn passed_checks(&self) -> usize {
        self.checks.iter().filter(|(_, passed)| *passed).count()
    }

    /// Plain-text report, one line per check, warning and error.
    pub fn render(&self) -> String {
        let mut lines = vec![format!(
            "Provider '{}': {}/{} checks passed",
            self.provider_name,
            self.passed_checks(),
            self.checks.len()
        )];
        for (description, passed) in &self.checks {
            lines.push(format!("  [{}] {}", if *passed { "ok" } else { "fail" }, description));
        }
        for warning in &self.warnings {
            lines.push(format!("  warning: {}", warning));
        }
        for error in &self.errors {
            lines.push(format!("  error: {}", error));
        }
        lines.join("\n")
    }
}
