use serde::{Serialize, Serializer};

/// Report severity as stored by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
    Fatal,
    Unknown,
}

impl Severity {
    #[must_use]
    pub const fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Self::Error,
            Some(1) => Self::Warning,
            Some(2) => Self::Info,
            Some(3) => Self::Debug,
            Some(4) => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Fatal => "fatal",
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Severity;

    #[test]
    fn codes_map_to_names() {
        let names: Vec<_> = (0..5)
            .map(|code| Severity::from_code(Some(code)).as_str())
            .collect();
        assert_eq!(names, ["error", "warning", "info", "debug", "fatal"]);
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        assert_eq!(Severity::from_code(None), Severity::Unknown);
        assert_eq!(Severity::from_code(Some(9)).as_str(), "unknown");
    }
}
