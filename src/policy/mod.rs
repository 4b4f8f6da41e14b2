//! Branch and repository policy configurations.
//!
//! One generic [`PolicyResource`] drives every policy type. The envelope
//! ([`branch::BranchPolicy`] or [`repository::RepositoryPolicy`]) owns the
//! common wire layout and delegates the type-specific keys to a
//! [`settings::PolicySettings`] adapter.

pub mod branch;
pub mod driver;
pub mod repository;
pub mod settings;

pub use driver::{Envelope, PolicyBase, PolicyResource, PolicyState};

use crate::client::Clients;
use declarative::BoxedResource;
use std::fmt;
use uuid::Uuid;

/// Policy types the provider manages, keyed by their service type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyType {
    MinReviewers,
    BuildValidation,
    AutoReviewers,
    WorkItemLinking,
    CommentResolution,
    MergeTypes,
    StatusCheck,
    AuthorEmailPattern,
    FilePathPattern,
    CaseEnforcement,
    ReservedNames,
    PathLength,
    FileSize,
    CheckCredentials,
    SearchableBranches,
}

impl PolicyType {
    pub const ALL: [Self; 15] = [
        Self::MinReviewers,
        Self::BuildValidation,
        Self::AutoReviewers,
        Self::WorkItemLinking,
        Self::CommentResolution,
        Self::MergeTypes,
        Self::StatusCheck,
        Self::AuthorEmailPattern,
        Self::FilePathPattern,
        Self::CaseEnforcement,
        Self::ReservedNames,
        Self::PathLength,
        Self::FileSize,
        Self::CheckCredentials,
        Self::SearchableBranches,
    ];

    pub const fn id(self) -> Uuid {
        Uuid::from_u128(match self {
            Self::MinReviewers => 0xfa4e907d_c16b_4a4c_9dfa_4906e5d171dd,
            Self::BuildValidation => 0x0609b952_1397_4640_95ec_e00a01b2c241,
            Self::AutoReviewers => 0xfd2167ab_b0be_447a_8ec8_39368250530e,
            Self::WorkItemLinking => 0x40e92b44_2fe1_4dd6_b3d8_74a9c21d0c6e,
            Self::CommentResolution => 0xc6a1889d_b943_4856_b76f_9e46bb6b0df2,
            Self::MergeTypes => 0xfa4e907d_c16b_4a4c_9dfa_4916e5d171ab,
            Self::StatusCheck => 0xcbdc66da_9728_4af8_aada_9a5a32e4a226,
            Self::AuthorEmailPattern => 0x77ed4bd3_b063_4689_934a_175e4d0a78d7,
            Self::FilePathPattern => 0x51c78909_e838_41a2_9496_c647091e3c61,
            Self::CaseEnforcement => 0x7ed39669_655c_494e_b4a0_a08b4da0fcce,
            Self::ReservedNames => 0xdb2b9b4c_180d_4529_9701_01541d19f36b,
            Self::PathLength => 0x001a79cf_fda1_4c4e_9e7c_bac40ee5ead8,
            Self::FileSize => 0x2e26e725_8201_4edd_8bf5_978563c34a80,
            Self::CheckCredentials => 0xe67ae10f_cf9a_40bc_8e66_6b3a8216956e,
            Self::SearchableBranches => 0x0517f88d_4ec5_4343_9d26_9930ebd53069,
        })
    }

    pub fn from_id(id: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub const fn resource_type(self) -> &'static str {
        match self {
            Self::MinReviewers => "azuredevops_branch_policy_min_reviewers",
            Self::BuildValidation => "azuredevops_branch_policy_build_validation",
            Self::AutoReviewers => "azuredevops_branch_policy_auto_reviewers",
            Self::WorkItemLinking => "azuredevops_branch_policy_work_item_linking",
            Self::CommentResolution => "azuredevops_branch_policy_comment_resolution",
            Self::MergeTypes => "azuredevops_branch_policy_merge_types",
            Self::StatusCheck => "azuredevops_branch_policy_status_check",
            Self::AuthorEmailPattern => "azuredevops_repository_policy_author_email_pattern",
            Self::FilePathPattern => "azuredevops_repository_policy_file_path_pattern",
            Self::CaseEnforcement => "azuredevops_repository_policy_case_enforcement",
            Self::ReservedNames => "azuredevops_repository_policy_reserved_names",
            Self::PathLength => "azuredevops_repository_policy_max_path_length",
            Self::FileSize => "azuredevops_repository_policy_max_file_size",
            Self::CheckCredentials => "azuredevops_repository_policy_check_credentials",
            Self::SearchableBranches => "azuredevops_repository_policy_searchable_branches",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::MinReviewers => "Minimum number of reviewers on pull requests",
            Self::BuildValidation => "Successful build required before pull requests complete",
            Self::AutoReviewers => "Reviewers added automatically to pull requests",
            Self::WorkItemLinking => "Linked work items required on pull requests",
            Self::CommentResolution => "Resolved comments required on pull requests",
            Self::MergeTypes => "Merge strategies allowed when completing pull requests",
            Self::StatusCheck => "External status required on pull requests",
            Self::AuthorEmailPattern => "Allowed commit author email patterns",
            Self::FilePathPattern => "Blocked file path patterns on push",
            Self::CaseEnforcement => "Case-insensitive path conflicts blocked on push",
            Self::ReservedNames => "Platform-reserved file names blocked on push",
            Self::PathLength => "Maximum path length on push",
            Self::FileSize => "Maximum file size on push",
            Self::CheckCredentials => "Credentials and secrets blocked on push",
            Self::SearchableBranches => "Branches indexed by code search",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// Every policy resource, one per policy type.
pub fn resources(clients: &Clients) -> Vec<BoxedResource> {
    use branch::BranchPolicy;
    use repository::RepositoryPolicy;
    use settings::{
        AuthorEmailPatternSettings, AutoReviewersSettings, BuildValidationSettings, CaseEnforcementSettings,
        CheckCredentialsSettings, CommentResolutionSettings, FilePathPatternSettings, FileSizeSettings,
        MergeTypesSettings, MinReviewersSettings, PathLengthSettings, ReservedNamesSettings,
        SearchableBranchesSettings, StatusCheckSettings, WorkItemLinkingSettings,
    };

    vec![
        PolicyResource::<BranchPolicy<MinReviewersSettings>>::boxed(clients),
        PolicyResource::<BranchPolicy<BuildValidationSettings>>::boxed(clients),
        PolicyResource::<BranchPolicy<AutoReviewersSettings>>::boxed(clients),
        PolicyResource::<BranchPolicy<WorkItemLinkingSettings>>::boxed(clients),
        PolicyResource::<BranchPolicy<CommentResolutionSettings>>::boxed(clients),
        PolicyResource::<BranchPolicy<MergeTypesSettings>>::boxed(clients),
        PolicyResource::<BranchPolicy<StatusCheckSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<AuthorEmailPatternSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<FilePathPatternSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<CaseEnforcementSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<ReservedNamesSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<PathLengthSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<FileSizeSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<CheckCredentialsSettings>>::boxed(clients),
        PolicyResource::<RepositoryPolicy<SearchableBranchesSettings>>::boxed(clients),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDevOps;
    use std::collections::HashSet;

    #[test]
    fn test_type_ids_are_distinct_and_resolvable() {
        let ids: HashSet<Uuid> = PolicyType::ALL.iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), PolicyType::ALL.len());
        for policy_type in PolicyType::ALL {
            assert_eq!(PolicyType::from_id(policy_type.id()), Some(policy_type));
        }
        assert_eq!(
            PolicyType::BuildValidation.id().to_string(),
            "0609b952-1397-4640-95ec-e00a01b2c241"
        );
    }

    #[test]
    fn test_one_resource_per_type() {
        let clients = Clients::from_backend(FakeDevOps::new());
        let names: Vec<&str> = resources(&clients).iter().map(|r| r.resource_type()).collect();
        let expected: Vec<&str> = PolicyType::ALL.iter().map(|t| t.resource_type()).collect();
        assert_eq!(names, expected);
    }
}
