//! Branch resolution.
//!
//! Filenames routinely mention more than one discipline ("B.E. Mechanical
//! Engineering ... Subject - Irrigation Engineering"), so a bare pattern
//! hit is not enough. Every pattern match is scored by its distance to the
//! nearest *following* "Engineering" keyword, falling back to "Semester",
//! falling back to the match's own position; the smallest distance wins
//! across all branches. Branch order in the config is the tie-break.

use regex::{Regex, RegexBuilder};

use crate::config::schema::BranchConfig;
use crate::error::ConfigError;

pub(crate) struct BranchMatcher {
    pub(crate) tag: String,
    variants: Vec<CompiledVariant>,
    code_fragments: Vec<String>,
}

struct CompiledVariant {
    pattern: Regex,
    /// Anchored at the end of a candidate match; a hit discards the match.
    exclude: Option<Regex>,
}

/// Keyword anchors shared by all branches.
pub(crate) struct Anchors {
    engineering: Regex,
    semester: Regex,
}

impl Anchors {
    pub(crate) fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            engineering: case_insensitive(r"\bEngineering\b", "anchors")?,
            semester: case_insensitive(r"\bSemester\b", "anchors")?,
        })
    }
}

fn case_insensitive(pattern: &str, branch: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            branch: branch.to_string(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

impl BranchMatcher {
    pub(crate) fn compile(config: &BranchConfig) -> Result<Self, ConfigError> {
        let mut variants = Vec::with_capacity(config.patterns.len());
        for variant in &config.patterns {
            let pattern = case_insensitive(&variant.pattern, &config.tag)?;
            let exclude = match &variant.unless_followed_by {
                Some(expr) => Some(case_insensitive(&format!("^(?:{})", expr), &config.tag)?),
                None => None,
            };
            variants.push(CompiledVariant { pattern, exclude });
        }
        Ok(Self {
            tag: config.tag.clone(),
            variants,
            code_fragments: config.code_fragments.clone(),
        })
    }

    /// First match of any variant that is not vetoed by its exclusion
    /// context, reported as the variant's byte offset in `filename`.
    fn match_positions<'a>(&'a self, filename: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.variants.iter().filter_map(move |variant| {
            variant
                .pattern
                .find_iter(filename)
                .find(|m| match &variant.exclude {
                    Some(exclude) => !exclude.is_match(&filename[m.end()..]),
                    None => true,
                })
                .map(|m| m.start())
        })
    }
}

/// Selects the branch whose pattern match sits closest to a following
/// anchor keyword. Never fails: falls back to subject-code fragments,
/// then to the configured fallback tag.
pub(crate) fn resolve(
    filename: &str,
    branches: &[BranchMatcher],
    anchors: &Anchors,
    subject_code: &str,
    fallback: &str,
) -> String {
    let mut best: Option<(usize, &str)> = None;

    for branch in branches {
        for position in branch.match_positions(filename) {
            let rest = &filename[position..];
            let distance = if let Some(m) = anchors.engineering.find(rest) {
                m.start()
            } else if let Some(m) = anchors.semester.find(rest) {
                m.start()
            } else {
                position
            };

            // Strict '<' keeps the earlier-configured branch on ties.
            if best.map(|(d, _)| distance < d).unwrap_or(true) {
                best = Some((distance, &branch.tag));
            }
        }
    }

    if let Some((_, tag)) = best {
        return tag.to_string();
    }

    for branch in branches {
        if branch
            .code_fragments
            .iter()
            .any(|fragment| subject_code.contains(fragment.as_str()))
        {
            return branch.tag.clone();
        }
    }

    fallback.to_string()
}
