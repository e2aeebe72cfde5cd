// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Workspace Identifiers
//!
//! Dash-delimited tokens that correlate provisioner log streams, callbacks and
//! workflow dispatches with internal records:
//!
//! | Form | Layout |
//! |------|--------|
//! | [`UniqueName`] | `{kind}-{project_id}-{infra_id}-{suffix}` |
//! | [`WorkspaceId`] | `{kind}-{project_id}-{infra_id}-{suffix}-{operation_uid}` |
//!
//! This is a wire contract: external systems produce and consume exactly this
//! format. Decoding is strict, a token either parses completely or is rejected.
//! Kinds and suffixes never contain dashes (kinds are validated
//! alphanumeric, suffixes are minted as lowercase hex).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::infra::{InfraId, InfraKind, ProjectId};
use crate::domain::operation::{OperationUid, DEFAULT_OPERATION_UID_BYTES};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("workspace id improperly formatted: expected {expected} segments, found {found}")]
    SegmentCount { expected: usize, found: usize },

    #[error("workspace id segment {segment} is not a non-negative integer: '{value}'")]
    InvalidNumber { segment: &'static str, value: String },

    #[error("workspace id has an invalid kind segment: '{0}'")]
    InvalidKind(String),

    #[error("workspace id has an empty suffix segment")]
    EmptySuffix,

    #[error("operation uid does not have hex length {expected} (found {found})")]
    OperationUidLength { expected: usize, found: usize },

    #[error("operation uid is not lowercase hex: '{0}'")]
    InvalidOperationUid(String),
}

/// Resource-only identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueName {
    pub kind: InfraKind,
    pub project_id: ProjectId,
    pub infra_id: InfraId,
    pub suffix: String,
}

impl UniqueName {
    pub fn parse(token: &str) -> Result<Self, IdentifierError> {
        let segments: Vec<&str> = token.split('-').collect();

        if segments.len() != 4 {
            return Err(IdentifierError::SegmentCount {
                expected: 4,
                found: segments.len(),
            });
        }

        parse_name(&segments)
    }
}

impl fmt::Display for UniqueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.kind, self.project_id, self.infra_id, self.suffix)
    }
}

impl FromStr for UniqueName {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Resource plus operation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId {
    pub name: UniqueName,
    pub operation_uid: OperationUid,
}

impl WorkspaceId {
    pub fn new(name: UniqueName, operation_uid: OperationUid) -> Self {
        Self { name, operation_uid }
    }

    /// Parse with the default 10-byte (20 hex character) operation uid.
    pub fn parse(token: &str) -> Result<Self, IdentifierError> {
        Self::parse_with_uid_bytes(token, DEFAULT_OPERATION_UID_BYTES)
    }

    /// Parse requiring the uid segment to be exactly `2 * uid_bytes` hex characters.
    pub fn parse_with_uid_bytes(token: &str, uid_bytes: usize) -> Result<Self, IdentifierError> {
        let segments: Vec<&str> = token.split('-').collect();

        if segments.len() != 5 {
            return Err(IdentifierError::SegmentCount {
                expected: 5,
                found: segments.len(),
            });
        }

        let name = parse_name(&segments[..4])?;

        let uid = segments[4];
        let expected = hex_len(uid_bytes);
        if uid.len() != expected {
            return Err(IdentifierError::OperationUidLength {
                expected,
                found: uid.len(),
            });
        }

        let operation_uid =
            OperationUid::new(uid).map_err(|_| IdentifierError::InvalidOperationUid(uid.to_string()))?;

        Ok(Self { name, operation_uid })
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.operation_uid)
    }
}

impl FromStr for WorkspaceId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical hex length of an `n`-byte identifier.
pub fn hex_len(bytes: usize) -> usize {
    bytes * 2
}

fn parse_name(segments: &[&str]) -> Result<UniqueName, IdentifierError> {
    let kind = InfraKind::new(segments[0]).map_err(|_| IdentifierError::InvalidKind(segments[0].to_string()))?;
    let project_id = parse_number("project_id", segments[1])?;
    let infra_id = parse_number("infra_id", segments[2])?;

    if segments[3].is_empty() {
        return Err(IdentifierError::EmptySuffix);
    }

    Ok(UniqueName {
        kind,
        project_id: ProjectId(project_id),
        infra_id: InfraId(infra_id),
        suffix: segments[3].to_string(),
    })
}

// u64::from_str accepts a leading '+', which would break the round-trip law.
fn parse_number(segment: &'static str, value: &str) -> Result<u64, IdentifierError> {
    let invalid = || IdentifierError::InvalidNumber {
        segment,
        value: value.to_string(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    value.parse().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_parse() {
        let name = UniqueName::parse("eks-4-9-ab12cd").unwrap();
        assert_eq!(name.kind, InfraKind::EKS);
        assert_eq!(name.project_id, ProjectId(4));
        assert_eq!(name.infra_id, InfraId(9));
        assert_eq!(name.suffix, "ab12cd");
        assert_eq!(name.to_string(), "eks-4-9-ab12cd");
    }

    #[test]
    fn test_unique_name_segment_count() {
        assert_eq!(
            UniqueName::parse("eks-4-9"),
            Err(IdentifierError::SegmentCount { expected: 4, found: 3 })
        );
        assert_eq!(
            UniqueName::parse("eks-4-9-ab12cd-0123456789abcdef0123"),
            Err(IdentifierError::SegmentCount { expected: 4, found: 5 })
        );
    }

    #[test]
    fn test_numeric_segments_are_strict() {
        assert!(matches!(
            UniqueName::parse("eks-+4-9-ab12cd"),
            Err(IdentifierError::InvalidNumber { segment: "project_id", .. })
        ));
        assert!(matches!(
            UniqueName::parse("eks-4--ab12cd"),
            Err(IdentifierError::InvalidNumber { segment: "infra_id", .. })
        ));
        assert!(matches!(
            UniqueName::parse("eks-4-x9-ab12cd"),
            Err(IdentifierError::InvalidNumber { segment: "infra_id", .. })
        ));
        assert!(matches!(
            UniqueName::parse("eks-4-99999999999999999999999-ab12cd"),
            Err(IdentifierError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_empty_kind_and_suffix_rejected() {
        assert!(matches!(UniqueName::parse("-4-9-ab12cd"), Err(IdentifierError::InvalidKind(_))));
        assert_eq!(UniqueName::parse("eks-4-9-"), Err(IdentifierError::EmptySuffix));
    }

    #[test]
    fn test_workspace_id_uid_length() {
        assert!(WorkspaceId::parse("eks-4-9-ab12cd-0123456789abcdef0123").is_ok());
        assert_eq!(
            WorkspaceId::parse("eks-4-9-ab12cd-0123456789abcdef012"),
            Err(IdentifierError::OperationUidLength { expected: 20, found: 19 })
        );
        assert_eq!(
            WorkspaceId::parse("eks-4-9-ab12cd-0123456789abcdef01234"),
            Err(IdentifierError::OperationUidLength { expected: 20, found: 21 })
        );
    }

    #[test]
    fn test_workspace_id_custom_uid_bytes() {
        assert!(WorkspaceId::parse_with_uid_bytes("rds-1-2-ff-abcd", 2).is_ok());
        assert!(WorkspaceId::parse_with_uid_bytes("rds-1-2-ff-abcd", 10).is_err());
    }

    #[test]
    fn test_workspace_id_rejects_non_hex_uid() {
        assert_eq!(
            WorkspaceId::parse("eks-4-9-ab12cd-0123456789abcdefzzzz"),
            Err(IdentifierError::InvalidOperationUid("0123456789abcdefzzzz".to_string()))
        );
    }

    #[test]
    fn test_round_trip_every_kind() {
        let kinds = [
            InfraKind::ECR,
            InfraKind::EKS,
            InfraKind::GCR,
            InfraKind::GKE,
            InfraKind::DOCR,
            InfraKind::DOKS,
            InfraKind::RDS,
        ];
        let ids = [(0, 0), (4, 9), (u64::MAX, u64::MAX), (1, u64::MAX)];

        for kind in &kinds {
            for &(project, infra) in &ids {
                let name = UniqueName {
                    kind: kind.clone(),
                    project_id: ProjectId(project),
                    infra_id: InfraId(infra),
                    suffix: "ab12cd".to_string(),
                };
                let token = name.to_string();
                assert_eq!(UniqueName::parse(&token).unwrap(), name, "{token}");

                for uid_bytes in [1, 4, DEFAULT_OPERATION_UID_BYTES, 16] {
                    let uid = OperationUid::new("a1".repeat(uid_bytes)).unwrap();
                    let workspace = WorkspaceId::new(name.clone(), uid);
                    let token = workspace.to_string();
                    assert_eq!(
                        WorkspaceId::parse_with_uid_bytes(&token, uid_bytes).unwrap(),
                        workspace,
                        "{token}"
                    );
                }
            }
        }
    }
}
