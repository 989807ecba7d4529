use std::fmt;

/// Machine-readable error codes for operator-facing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingCredential,
    CatalogUnreadable,
    ArchiveParseError,
    MissingReferenceDate,
    ProviderRequestFailed,
    PersistenceFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MissingCredential => "E1002",
            Self::CatalogUnreadable => "E2001",
            Self::ArchiveParseError => "E2002",
            Self::MissingReferenceDate => "E2003",
            Self::ProviderRequestFailed => "E3001",
            Self::PersistenceFailed => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingCredential => "Required credential not set",
            Self::CatalogUnreadable => "Entity catalog missing or invalid",
            Self::ArchiveParseError => "Archive CSV parse error",
            Self::MissingReferenceDate => "Snapshot has no reference date",
            Self::ProviderRequestFailed => "Statistics provider request failed",
            Self::PersistenceFailed => "Failed to persist an artifact",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in tidemark.toml and retry."),
            Self::MissingCredential => {
                Some("Set YOUTUBE_API_KEY in the environment before running `tide update`.")
            }
            Self::CatalogUnreadable => {
                Some("Run `tide init` or check that catalog.json is valid JSON.")
            }
            Self::ArchiveParseError => {
                Some("Check the CSV header dates and per-row value columns.")
            }
            Self::MissingReferenceDate => {
                Some("Pass --as-of YYYY-MM-DD or run `tide update` first.")
            }
            Self::ProviderRequestFailed => {
                Some("Check network access and API quota, then retry.")
            }
            Self::PersistenceFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::MissingCredential,
            ErrorCode::CatalogUnreadable,
            ErrorCode::ArchiveParseError,
            ErrorCode::MissingReferenceDate,
            ErrorCode::ProviderRequestFailed,
            ErrorCode::PersistenceFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::MissingCredential.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }
}
