use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_work_directory")]
    pub work_directory: PathBuf,
    #[serde(default = "default_storage_directory")]
    pub storage_directory: PathBuf,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub classifier: ClassifierConfig,
}

fn default_work_directory() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".paperbank").join("work"))
        .unwrap_or_else(|| PathBuf::from("work"))
}

fn default_storage_directory() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".paperbank").join("storage"))
        .unwrap_or_else(|| PathBuf::from("storage"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Documents attempted per `advance` call.
    #[serde(default = "default_slice_size")]
    pub slice_size: usize,
    /// Upper bound on a fetched archive, in bytes.
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
    /// Total timeout for a remote archive download.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_slice_size() -> usize {
    15
}

fn default_max_archive_bytes() -> u64 {
    1024 * 1024 * 1024
}

fn default_fetch_timeout_secs() -> u64 {
    300
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            slice_size: default_slice_size(),
            max_archive_bytes: default_max_archive_bytes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Classification tables. The prefix allow-list and the branch pattern
/// table are operator-supplied data; a loaded config replaces the
/// built-in tables wholesale rather than merging with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Ordered, append-only list of accepted subject-code prefixes.
    pub recognized_prefixes: Vec<String>,
    /// Per-branch pattern variants, most specific first. Branch order is
    /// the tie-break order for equal disambiguation distances.
    pub branches: Vec<BranchConfig>,
    /// Branch tag used when nothing else resolves one.
    pub fallback_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    pub tag: String,
    pub patterns: Vec<BranchPattern>,
    /// Subject-code substrings that imply this branch when no pattern matched.
    #[serde(default)]
    pub code_fragments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPattern {
    /// Case-insensitive regular expression searched anywhere in the filename.
    pub pattern: String,
    /// A candidate match is discarded when this pattern matches the text
    /// immediately following it (e.g. `ME` directly before a hyphen is a
    /// subject code, not a branch mention).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless_followed_by: Option<String>,
}

impl Config {
    /// The built-in tables, reproducing the deployment this engine was
    /// tuned against. Loading a config file replaces them entirely.
    pub fn builtin() -> Self {
        Self {
            version: "1.0".to_string(),
            work_directory: default_work_directory(),
            storage_directory: default_storage_directory(),
            ingest: IngestConfig::default(),
            classifier: ClassifierConfig::builtin(),
        }
    }
}

impl ClassifierConfig {
    pub fn builtin() -> Self {
        Self {
            recognized_prefixes: [
                "BSC", "ESC", "PCC", "HSMC", "MC", "OEC", "PEC", "ST", "SE", "TEE", "BE", "UB",
                "PS", "US", "MMCS", "STUG", "STPG", "BP", "MPG", "MPH", "MED", "IN", "ET", "PSES",
                "PEPS", "PECS", "PCSS",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            branches: vec![
                branch(
                    "CSE",
                    &[
                        (r"Computer\s+Science\s+(?:and\s+)?Engineering", None),
                        (r"\bComputer\s+Science\b", None),
                        (r"\bCSE\b", None),
                        (r"\bCS\b", None),
                    ],
                    &["CS", "IT"],
                ),
                branch(
                    "IT",
                    &[
                        (r"Information\s+Technology", None),
                        (r"\bIT\b", None),
                        (r"\bI\.T\b", None),
                    ],
                    &[],
                ),
                branch(
                    "ME",
                    &[
                        (r"Mechanical\s+Engineering", None),
                        // "Mechanical" inside "Mechanical Engineering (Model Curriculum)"
                        // is boilerplate, not a branch mention.
                        (r"\bMechanical\b", Some(r"\s*Engineering\s*\(Model")),
                        // ME directly before a hyphen is a subject code (ME-401).
                        (r"\bME\b", Some(r"\s*-")),
                    ],
                    &["ME", "MED"],
                ),
                branch(
                    "CE",
                    &[
                        (r"Civil\s+Engineering", None),
                        (r"\bCivil\b", None),
                        // CE followed by digits/hyphen is a subject code (CE-304, CE701).
                        (r"\bCE\b", Some(r"[0-9-]")),
                    ],
                    &["CE", "CIV"],
                ),
                branch(
                    "EE",
                    &[
                        (r"Electrical\s+(?:Electronics\s+and\s+Power\s+)?Engineering", None),
                        (r"Electrical\s+Engineering", None),
                        (r"\bElectrical\b", None),
                        (r"\bEE\b", None),
                        (r"Electronics\s+and\s+Power", None),
                    ],
                    &["EE", "EL", "EP"],
                ),
                branch(
                    "ECE",
                    &[
                        (r"Electronics\s+and\s+(?:Communication|Telecommunication)", None),
                        (r"Telecommunication\s+Engineering", None),
                        (r"\bElectronics\b", Some(r"\s+and\s+Power")),
                        (r"\bECE\b", None),
                        (r"Instrumentation\s+Engineering", None),
                    ],
                    &["EC", "ET", "IN"],
                ),
            ],
            fallback_branch: "CSE".to_string(),
        }
    }
}

fn branch(tag: &str, patterns: &[(&str, Option<&str>)], code_fragments: &[&str]) -> BranchConfig {
    BranchConfig {
        tag: tag.to_string(),
        patterns: patterns
            .iter()
            .map(|(pattern, unless)| BranchPattern {
                pattern: pattern.to_string(),
                unless_followed_by: unless.map(|u| u.to_string()),
            })
            .collect(),
        code_fragments: code_fragments.iter().map(|s| s.to_string()).collect(),
    }
}
