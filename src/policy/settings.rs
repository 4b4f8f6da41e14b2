//! Type-specific policy settings.
//!
//! Each policy type has a schema-side struct with snake_case fields and a
//! private wire struct holding the camelCase keys the service stores under
//! `settings`. Expanding merges the wire keys into the map the envelope
//! already wrote (the `scope` list); flattening reads them back.

use super::PolicyType;
use declarative::{Attribute, AttributeType, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

const BYTES_PER_MIB: i64 = 1_048_576;

/// Adapter between one policy type's schema fields and its wire keys.
pub trait PolicySettings:
    Serialize + DeserializeOwned + Clone + Default + Debug + PartialEq + Send + Sync + 'static
{
    const POLICY_TYPE: PolicyType;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        Vec::new()
    }

    fn expand(&self, _wire: &mut Map<String, Value>) -> Result<()> {
        Ok(())
    }

    fn flatten(_wire: &Map<String, Value>) -> Result<Self> {
        Ok(Self::default())
    }

    /// Value the service requires for both `enabled` and `blocking`.
    fn forced_flags() -> Option<bool> {
        None
    }
}

/// List of strings.
pub fn strings() -> AttributeType {
    AttributeType::List(Box::new(Attribute::optional(AttributeType::String)))
}

fn decode<W: DeserializeOwned>(wire: &Map<String, Value>) -> Result<W> {
    serde_json::from_value(Value::Object(wire.clone()))
        .map_err(|e| Error::internal(format!("Unable to unmarshal policy settings. Error: {e}")))
}

fn merge<W: Serialize>(wire: &mut Map<String, Value>, keys: &W) -> Result<()> {
    match serde_json::to_value(keys) {
        Ok(Value::Object(map)) => {
            wire.extend(map);
            Ok(())
        }
        Ok(other) => Err(Error::internal(format!("policy settings encoded as {other}"))),
        Err(e) => Err(Error::internal(format!("Unable to marshal policy settings into JSON: {e}"))),
    }
}

/// Integers the service sometimes stores as floats.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<i64>, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.map(|v| v as i64))
}

fn non_empty<T>(items: &[T]) -> Option<Vec<T>>
where
    T: Clone,
{
    (!items.is_empty()).then(|| items.to_vec())
}

fn non_blank(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

// ==================== Branch policies ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinReviewersSettings {
    pub reviewer_count: i64,
    pub submitter_can_vote: bool,
    pub allow_completion_with_rejects_or_waits: bool,
    pub on_push_reset_approved_votes: bool,
    pub on_last_iteration_require_vote: bool,
    pub on_push_reset_all_votes: bool,
    pub last_pusher_cannot_approve: bool,
    pub on_each_iteration_require_vote: bool,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MinReviewersWire {
    #[serde(deserialize_with = "lenient_int")]
    minimum_approver_count: Option<i64>,
    creator_vote_counts: Option<bool>,
    allow_downvotes: Option<bool>,
    reset_on_source_push: Option<bool>,
    require_vote_on_last_iteration: Option<bool>,
    reset_rejections_on_source_push: Option<bool>,
    block_last_pusher_vote: Option<bool>,
    require_vote_on_each_iteration: Option<bool>,
}

impl PolicySettings for MinReviewersSettings {
    const POLICY_TYPE: PolicyType = PolicyType::MinReviewers;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![
            (
                "reviewer_count",
                Attribute::required(AttributeType::Int).description("The minimum number of reviewers."),
            ),
            ("submitter_can_vote", Attribute::optional(AttributeType::Bool).default_value(false)),
            (
                "allow_completion_with_rejects_or_waits",
                Attribute::optional(AttributeType::Bool).default_value(false),
            ),
            ("on_push_reset_approved_votes", Attribute::optional(AttributeType::Bool).default_value(false)),
            ("on_last_iteration_require_vote", Attribute::optional(AttributeType::Bool).default_value(false)),
            (
                "on_push_reset_all_votes",
                Attribute::optional(AttributeType::Bool)
                    .default_value(false)
                    .description("Reset all votes on push. Also resets approved votes."),
            ),
            ("last_pusher_cannot_approve", Attribute::optional(AttributeType::Bool).default_value(false)),
            ("on_each_iteration_require_vote", Attribute::optional(AttributeType::Bool).default_value(false)),
        ]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &MinReviewersWire {
                minimum_approver_count: Some(self.reviewer_count),
                creator_vote_counts: Some(self.submitter_can_vote),
                allow_downvotes: Some(self.allow_completion_with_rejects_or_waits),
                reset_on_source_push: Some(self.on_push_reset_approved_votes || self.on_push_reset_all_votes),
                require_vote_on_last_iteration: Some(self.on_last_iteration_require_vote),
                reset_rejections_on_source_push: Some(self.on_push_reset_all_votes),
                block_last_pusher_vote: Some(self.last_pusher_cannot_approve),
                require_vote_on_each_iteration: Some(self.on_each_iteration_require_vote),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: MinReviewersWire = decode(wire)?;
        Ok(Self {
            reviewer_count: keys.minimum_approver_count.unwrap_or_default(),
            submitter_can_vote: keys.creator_vote_counts.unwrap_or_default(),
            allow_completion_with_rejects_or_waits: keys.allow_downvotes.unwrap_or_default(),
            on_push_reset_approved_votes: keys.reset_on_source_push.unwrap_or_default(),
            on_last_iteration_require_vote: keys.require_vote_on_last_iteration.unwrap_or_default(),
            on_push_reset_all_votes: keys.reset_rejections_on_source_push.unwrap_or_default(),
            last_pusher_cannot_approve: keys.block_last_pusher_vote.unwrap_or_default(),
            on_each_iteration_require_vote: keys.require_vote_on_each_iteration.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildValidationSettings {
    pub build_definition_id: i64,
    pub display_name: String,
    pub manual_queue_only: bool,
    pub queue_on_source_update_only: bool,
    /// Minutes a successful build stays valid; 0 never expires.
    pub valid_duration: i64,
    pub filename_patterns: Vec<String>,
}

impl Default for BuildValidationSettings {
    fn default() -> Self {
        Self {
            build_definition_id: 0,
            display_name: String::new(),
            manual_queue_only: false,
            queue_on_source_update_only: true,
            valid_duration: 720,
            filename_patterns: Vec::new(),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BuildValidationWire {
    #[serde(deserialize_with = "lenient_int")]
    build_definition_id: Option<i64>,
    display_name: Option<String>,
    manual_queue_only: Option<bool>,
    queue_on_source_update_only: Option<bool>,
    #[serde(deserialize_with = "lenient_int")]
    valid_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename_patterns: Option<Vec<String>>,
}

impl PolicySettings for BuildValidationSettings {
    const POLICY_TYPE: PolicyType = PolicyType::BuildValidation;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![
            ("build_definition_id", Attribute::required(AttributeType::Int)),
            ("display_name", Attribute::required(AttributeType::String)),
            ("manual_queue_only", Attribute::optional(AttributeType::Bool).default_value(false)),
            ("queue_on_source_update_only", Attribute::optional(AttributeType::Bool).default_value(true)),
            (
                "valid_duration",
                Attribute::optional(AttributeType::Int)
                    .default_value(720)
                    .description("Minutes a successful build stays valid. 0 never expires."),
            ),
            ("filename_patterns", Attribute::optional(strings())),
        ]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &BuildValidationWire {
                build_definition_id: Some(self.build_definition_id),
                display_name: Some(self.display_name.clone()),
                manual_queue_only: Some(self.manual_queue_only),
                queue_on_source_update_only: Some(self.queue_on_source_update_only),
                valid_duration: Some(self.valid_duration),
                filename_patterns: non_empty(&self.filename_patterns),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: BuildValidationWire = decode(wire)?;
        let defaults = Self::default();
        Ok(Self {
            build_definition_id: keys.build_definition_id.unwrap_or_default(),
            display_name: keys.display_name.unwrap_or_default(),
            manual_queue_only: keys.manual_queue_only.unwrap_or_default(),
            queue_on_source_update_only: keys
                .queue_on_source_update_only
                .unwrap_or(defaults.queue_on_source_update_only),
            valid_duration: keys.valid_duration.unwrap_or(defaults.valid_duration),
            filename_patterns: keys.filename_patterns.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoReviewersSettings {
    pub submitter_can_vote: bool,
    pub auto_reviewer_ids: Vec<String>,
    pub path_filters: Vec<String>,
    pub message: String,
    pub minimum_number_of_reviewers: i64,
}

impl Default for AutoReviewersSettings {
    fn default() -> Self {
        Self {
            submitter_can_vote: false,
            auto_reviewer_ids: Vec::new(),
            path_filters: Vec::new(),
            message: String::new(),
            minimum_number_of_reviewers: 1,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AutoReviewersWire {
    creator_vote_counts: Option<bool>,
    required_reviewer_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename_patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    minimum_approver_count: Option<i64>,
}

impl PolicySettings for AutoReviewersSettings {
    const POLICY_TYPE: PolicyType = PolicyType::AutoReviewers;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![
            ("submitter_can_vote", Attribute::optional(AttributeType::Bool).default_value(false)),
            (
                "auto_reviewer_ids",
                Attribute::required(strings())
                    .items(Some(1), None)
                    .description("Origin ids of the reviewers added to pull requests."),
            ),
            ("path_filters", Attribute::optional(strings())),
            ("message", Attribute::optional(AttributeType::String)),
            (
                "minimum_number_of_reviewers",
                Attribute::optional(AttributeType::Int).default_value(1),
            ),
        ]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &AutoReviewersWire {
                creator_vote_counts: Some(self.submitter_can_vote),
                required_reviewer_ids: Some(self.auto_reviewer_ids.clone()),
                filename_patterns: non_empty(&self.path_filters),
                message: non_blank(&self.message),
                minimum_approver_count: Some(self.minimum_number_of_reviewers),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: AutoReviewersWire = decode(wire)?;
        Ok(Self {
            submitter_can_vote: keys.creator_vote_counts.unwrap_or_default(),
            auto_reviewer_ids: keys.required_reviewer_ids.unwrap_or_default(),
            path_filters: keys.filename_patterns.unwrap_or_default(),
            message: keys.message.unwrap_or_default(),
            minimum_number_of_reviewers: keys.minimum_approver_count.unwrap_or(1),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemLinkingSettings {}

impl PolicySettings for WorkItemLinkingSettings {
    const POLICY_TYPE: PolicyType = PolicyType::WorkItemLinking;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentResolutionSettings {}

impl PolicySettings for CommentResolutionSettings {
    const POLICY_TYPE: PolicyType = PolicyType::CommentResolution;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeTypesSettings {
    pub allow_squash: bool,
    pub allow_rebase_and_fast_forward: bool,
    pub allow_basic_no_fast_forward: bool,
    pub allow_rebase_with_merge: bool,
}

/// Schema field to wire key, one row per merge strategy.
const MERGE_TYPE_KEYS: [(&str, &str); 4] = [
    ("allow_squash", "allowSquash"),
    ("allow_rebase_and_fast_forward", "allowRebase"),
    ("allow_basic_no_fast_forward", "allowNoFastForward"),
    ("allow_rebase_with_merge", "allowRebaseMerge"),
];

impl MergeTypesSettings {
    fn flag(&self, field: &str) -> bool {
        match field {
            "allow_squash" => self.allow_squash,
            "allow_rebase_and_fast_forward" => self.allow_rebase_and_fast_forward,
            "allow_basic_no_fast_forward" => self.allow_basic_no_fast_forward,
            _ => self.allow_rebase_with_merge,
        }
    }

    fn flag_mut(&mut self, field: &str) -> &mut bool {
        match field {
            "allow_squash" => &mut self.allow_squash,
            "allow_rebase_and_fast_forward" => &mut self.allow_rebase_and_fast_forward,
            "allow_basic_no_fast_forward" => &mut self.allow_basic_no_fast_forward,
            _ => &mut self.allow_rebase_with_merge,
        }
    }
}

impl PolicySettings for MergeTypesSettings {
    const POLICY_TYPE: PolicyType = PolicyType::MergeTypes;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        MERGE_TYPE_KEYS
            .iter()
            .map(|(field, _)| (*field, Attribute::optional(AttributeType::Bool).default_value(false)))
            .collect()
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        for (field, key) in MERGE_TYPE_KEYS {
            wire.insert(key.to_string(), Value::Bool(self.flag(field)));
        }
        Ok(())
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let mut settings = Self::default();
        for (field, key) in MERGE_TYPE_KEYS {
            *settings.flag_mut(field) = wire.get(key).and_then(Value::as_bool).unwrap_or_default();
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCheckSettings {
    pub name: String,
    pub genre: String,
    pub author_id: String,
    pub invalidate_on_update: bool,
    pub display_name: String,
    pub filename_patterns: Vec<String>,
    /// `default` or `conditional`.
    pub applicability: String,
}

impl Default for StatusCheckSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            genre: String::new(),
            author_id: String::new(),
            invalidate_on_update: false,
            display_name: String::new(),
            filename_patterns: Vec::new(),
            applicability: "default".to_string(),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StatusCheckWire {
    status_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_id: Option<String>,
    invalidate_on_source_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename_patterns: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_int")]
    policy_applicability: Option<i64>,
}

impl PolicySettings for StatusCheckSettings {
    const POLICY_TYPE: PolicyType = PolicyType::StatusCheck;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![
            ("name", Attribute::required(AttributeType::String).description("The status name to check.")),
            ("genre", Attribute::optional(AttributeType::String)),
            ("author_id", Attribute::optional(AttributeType::String)),
            ("invalidate_on_update", Attribute::optional(AttributeType::Bool).default_value(false)),
            ("display_name", Attribute::optional(AttributeType::String)),
            ("filename_patterns", Attribute::optional(strings())),
            (
                "applicability",
                Attribute::optional(AttributeType::String)
                    .one_of(&["default", "conditional"])
                    .default_value("default"),
            ),
        ]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        let applicability = match self.applicability.as_str() {
            "conditional" => 1,
            _ => 0,
        };
        merge(
            wire,
            &StatusCheckWire {
                status_name: Some(self.name.clone()),
                status_genre: non_blank(&self.genre),
                author_id: non_blank(&self.author_id),
                invalidate_on_source_update: Some(self.invalidate_on_update),
                default_display_name: non_blank(&self.display_name),
                filename_patterns: non_empty(&self.filename_patterns),
                policy_applicability: Some(applicability),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: StatusCheckWire = decode(wire)?;
        let applicability = match keys.policy_applicability {
            Some(1) => "conditional",
            _ => "default",
        };
        Ok(Self {
            name: keys.status_name.unwrap_or_default(),
            genre: keys.status_genre.unwrap_or_default(),
            author_id: keys.author_id.unwrap_or_default(),
            invalidate_on_update: keys.invalidate_on_source_update.unwrap_or_default(),
            display_name: keys.default_display_name.unwrap_or_default(),
            filename_patterns: keys.filename_patterns.unwrap_or_default(),
            applicability: applicability.to_string(),
        })
    }
}

// ==================== Repository policies ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorEmailPatternSettings {
    pub author_email_patterns: Vec<String>,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AuthorEmailPatternWire {
    author_email_patterns: Option<Vec<String>>,
}

impl PolicySettings for AuthorEmailPatternSettings {
    const POLICY_TYPE: PolicyType = PolicyType::AuthorEmailPattern;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![(
            "author_email_patterns",
            Attribute::required(strings())
                .items(Some(1), None)
                .description("Email patterns commit authors must match, e.g. `*@contoso.com`."),
        )]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &AuthorEmailPatternWire {
                author_email_patterns: Some(self.author_email_patterns.clone()),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: AuthorEmailPatternWire = decode(wire)?;
        Ok(Self {
            author_email_patterns: keys.author_email_patterns.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePathPatternSettings {
    pub filepath_patterns: Vec<String>,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FilePathPatternWire {
    filename_patterns: Option<Vec<String>>,
}

impl PolicySettings for FilePathPatternSettings {
    const POLICY_TYPE: PolicyType = PolicyType::FilePathPattern;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![("filepath_patterns", Attribute::required(strings()).items(Some(1), None))]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &FilePathPatternWire {
                filename_patterns: Some(self.filepath_patterns.clone()),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: FilePathPatternWire = decode(wire)?;
        Ok(Self {
            filepath_patterns: keys.filename_patterns.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseEnforcementSettings {
    pub enforce_consistent_case: bool,
}

impl Default for CaseEnforcementSettings {
    fn default() -> Self {
        Self {
            enforce_consistent_case: true,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CaseEnforcementWire {
    enforce_consistent_case: Option<bool>,
}

impl PolicySettings for CaseEnforcementSettings {
    const POLICY_TYPE: PolicyType = PolicyType::CaseEnforcement;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![(
            "enforce_consistent_case",
            Attribute::optional(AttributeType::Bool).default_value(true),
        )]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &CaseEnforcementWire {
                enforce_consistent_case: Some(self.enforce_consistent_case),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: CaseEnforcementWire = decode(wire)?;
        Ok(Self {
            enforce_consistent_case: keys.enforce_consistent_case.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedNamesSettings {}

impl PolicySettings for ReservedNamesSettings {
    const POLICY_TYPE: PolicyType = PolicyType::ReservedNames;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathLengthSettings {
    pub max_path_length: i64,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PathLengthWire {
    #[serde(deserialize_with = "lenient_int")]
    max_path_length: Option<i64>,
}

impl PolicySettings for PathLengthSettings {
    const POLICY_TYPE: PolicyType = PolicyType::PathLength;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![("max_path_length", Attribute::required(AttributeType::Int))]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &PathLengthWire {
                max_path_length: Some(self.max_path_length),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: PathLengthWire = decode(wire)?;
        Ok(Self {
            max_path_length: keys.max_path_length.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSizeSettings {
    /// Maximum blob size in MiB.
    pub max_file_size: i64,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FileSizeWire {
    #[serde(deserialize_with = "lenient_int")]
    maximum_git_blob_size_in_bytes: Option<i64>,
}

impl PolicySettings for FileSizeSettings {
    const POLICY_TYPE: PolicyType = PolicyType::FileSize;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![(
            "max_file_size",
            Attribute::required(AttributeType::Int).description("Maximum file size in MiB."),
        )]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        let bytes = self
            .max_file_size
            .checked_mul(BYTES_PER_MIB)
            .ok_or_else(|| Error::attribute("max_file_size", format!("{} MiB is too large", self.max_file_size)))?;
        merge(
            wire,
            &FileSizeWire {
                maximum_git_blob_size_in_bytes: Some(bytes),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: FileSizeWire = decode(wire)?;
        Ok(Self {
            max_file_size: keys.maximum_git_blob_size_in_bytes.unwrap_or_default() / BYTES_PER_MIB,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCredentialsSettings {}

impl PolicySettings for CheckCredentialsSettings {
    const POLICY_TYPE: PolicyType = PolicyType::CheckCredentials;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchableBranchesSettings {
    pub searchable_branches: Vec<String>,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchableBranchesWire {
    search_branches: Option<Vec<String>>,
}

impl PolicySettings for SearchableBranchesSettings {
    const POLICY_TYPE: PolicyType = PolicyType::SearchableBranches;

    fn attributes() -> Vec<(&'static str, Attribute)> {
        vec![(
            "searchable_branches",
            Attribute::optional(strings()).description("Branches indexed by code search, e.g. `refs/heads/main`."),
        )]
    }

    fn expand(&self, wire: &mut Map<String, Value>) -> Result<()> {
        merge(
            wire,
            &SearchableBranchesWire {
                search_branches: Some(self.searchable_branches.clone()),
            },
        )
    }

    fn flatten(wire: &Map<String, Value>) -> Result<Self> {
        let keys: SearchableBranchesWire = decode(wire)?;
        Ok(Self {
            searchable_branches: keys.search_branches.unwrap_or_default(),
        })
    }

    fn forced_flags() -> Option<bool> {
        Some(false)
    }
}
