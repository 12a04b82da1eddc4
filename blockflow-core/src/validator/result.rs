//! Validation findings and the aggregate result.

use serde::{Deserialize, Serialize};

use crate::domain::{BlockId, ConnectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable finding codes. The snake_case form is the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    // structural
    NoTrigger,
    NoAction,
    CircularDependency,
    UnreachableBlock,
    // connection
    UnknownSourceBlock,
    UnknownTargetBlock,
    UnknownSourcePort,
    UnknownTargetPort,
    TypeMismatch,
    MissingRequiredInput,
    // config
    MissingInterval,
    TokenNotWhitelisted,
    ProtocolNotWhitelisted,
    InvalidRiskLimit,
    InvalidOperator,
    UnknownBlockType,
    // risk
    RiskExceeded,
    NoRiskControls,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        use ValidationCode::*;
        match self {
            NoTrigger => "no_trigger",
            NoAction => "no_action",
            CircularDependency => "circular_dependency",
            UnreachableBlock => "unreachable_block",
            UnknownSourceBlock => "unknown_source_block",
            UnknownTargetBlock => "unknown_target_block",
            UnknownSourcePort => "unknown_source_port",
            UnknownTargetPort => "unknown_target_port",
            TypeMismatch => "type_mismatch",
            MissingRequiredInput => "missing_required_input",
            MissingInterval => "missing_interval",
            TokenNotWhitelisted => "token_not_whitelisted",
            ProtocolNotWhitelisted => "protocol_not_whitelisted",
            InvalidRiskLimit => "invalid_risk_limit",
            InvalidOperator => "invalid_operator",
            UnknownBlockType => "unknown_block_type",
            RiskExceeded => "risk_exceeded",
            NoRiskControls => "no_risk_controls",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding. Findings are data; no validation pass ever fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub severity: Severity,
    pub code: ValidationCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(severity: Severity, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            block_id: None,
            connection_id: None,
            field: None,
        }
    }

    pub fn error(code: ValidationCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: ValidationCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: ValidationCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn on_block(mut self, id: &BlockId) -> Self {
        self.block_id = Some(id.clone());
        self
    }

    pub fn on_connection(mut self, id: &ConnectionId) -> Self {
        self.connection_id = Some(id.clone());
        self
    }

    pub fn on_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

/// One entry of the fixed security checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
    pub info: Vec<ValidationError>,
    /// 0–100, higher is riskier.
    pub risk_score: u32,
    pub gas_estimate: u64,
    pub security_checks: Vec<SecurityCheck>,
}

impl ValidationResult {
    /// Every finding, errors first.
    pub fn findings(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.info.iter())
    }

    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.findings().any(|f| f.code == code)
    }

    pub fn count(&self, code: ValidationCode) -> usize {
        self.findings().filter(|f| f.code == code).count()
    }

    pub fn check(&self, name: &str) -> Option<&SecurityCheck> {
        self.security_checks.iter().find(|c| c.name == name)
    }
}

/// Findings accumulated across passes, split by severity on the way in.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
    pub info: Vec<ValidationError>,
}

impl Findings {
    pub fn push(&mut self, finding: ValidationError) {
        match finding.severity {
            Severity::Error => self.errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
            Severity::Info => self.info.push(finding),
        }
    }

    pub fn count(&self, code: ValidationCode) -> usize {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.info)
            .filter(|f| f.code == code)
            .count()
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_snake_case() {
        for code in [
            ValidationCode::CircularDependency,
            ValidationCode::UnreachableBlock,
            ValidationCode::TypeMismatch,
            ValidationCode::RiskExceeded,
        ] {
            let v = serde_json::to_value(code).unwrap();
            assert_eq!(v, code.as_str());
        }
    }

    #[test]
    fn findings_split_by_severity() {
        let mut f = Findings::default();
        f.push(ValidationError::error(ValidationCode::NoTrigger, "x"));
        f.push(ValidationError::warning(ValidationCode::NoAction, "y"));
        f.push(ValidationError::info(ValidationCode::NoRiskControls, "z"));
        assert_eq!((f.errors.len(), f.warnings.len(), f.info.len()), (1, 1, 1));
        assert_eq!(f.count(ValidationCode::NoAction), 1);
    }

    #[test]
    fn optional_locations_are_omitted_on_the_wire() {
        let e = ValidationError::error(ValidationCode::MissingInterval, "m")
            .on_block(&BlockId::new("b1"))
            .on_field("interval");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["blockId"], "b1");
        assert_eq!(v["field"], "interval");
        assert!(v.get("connectionId").is_none());
    }
}
