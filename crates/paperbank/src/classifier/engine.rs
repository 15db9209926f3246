use regex::{Regex, RegexBuilder};

use crate::classifier::branch::{self, Anchors, BranchMatcher};
use crate::classifier::{ClassifiedDocument, Rejection};
use crate::config::schema::ClassifierConfig;
use crate::error::ConfigError;

/// Name substituted when extraction yields nothing usable.
const PLACEHOLDER_SUBJECT_NAME: &str = "Engineering Subject";

/// Filename classification engine. Pure — no I/O; all patterns are
/// compiled once at construction.
pub struct Classifier {
    degree_btech: Regex,
    degree_be: Regex,
    degree_model: Regex,
    degree_disjoint: Regex,
    semester: Regex,
    code_candidate: Regex,
    paper_suffix: Regex,
    prefixes: Vec<String>,
    branches: Vec<BranchMatcher>,
    anchors: Anchors,
    fallback_branch: String,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ConfigError> {
        let branches = config
            .branches
            .iter()
            .map(BranchMatcher::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            degree_btech: fixed(r"(?i)\bB\.Tech\b")?,
            degree_be: fixed(r"(?i)\bB\.E\.?\b")?,
            degree_model: fixed(r"(?i)Model\s+Curriculum")?,
            degree_disjoint: fixed(
                r"(?i)\b(?:B\.Sc|B\.Com|BCA|B\.C\.A|B\.Pharm|M\.Tech|M\.Sc|M\.Pharm|M\.C\.A)",
            )?,
            semester: fixed(r"(?i)Semester[- ]?(VIII|VII|VI|V|IV|III|II|I)\b")?,
            // Uppercase token shaped like a subject code. Deliberately
            // case-sensitive: lowercase words must not produce candidates.
            code_candidate: fixed(r"\b[A-Z]{2,6}-?[A-Z0-9]{1,8}\b")?,
            paper_suffix: fixed(r"(?i)\bPaper[-\s]?[IVX]+\b")?,
            prefixes: config
                .recognized_prefixes
                .iter()
                .map(|p| p.to_uppercase())
                .collect(),
            branches,
            anchors: Anchors::new()?,
            fallback_branch: config.fallback_branch.clone(),
        })
    }

    /// Classifies a single filename.
    ///
    /// The degree, semester and subject-code stages are hard gates: a
    /// wrong value there corrupts the catalog key, so they reject. Branch
    /// and subject name are display metadata and always produce a value.
    pub fn classify(&self, filename: &str) -> Result<ClassifiedDocument, Rejection> {
        let degree = self.degree_gate(filename)?;
        let semester = self.semester_gate(filename)?;
        let subject_code = self.subject_code_gate(filename)?;

        let branch = branch::resolve(
            filename,
            &self.branches,
            &self.anchors,
            &subject_code,
            &self.fallback_branch,
        );
        let subject_name = self.subject_name(filename, &subject_code);

        Ok(ClassifiedDocument {
            degree,
            branch,
            semester,
            subject_code,
            subject_name,
        })
    }

    fn degree_gate(&self, filename: &str) -> Result<String, Rejection> {
        let has_btech = self.degree_btech.is_match(filename);
        let has_be = self.degree_be.is_match(filename);
        let has_model = self.degree_model.is_match(filename);

        if !(has_btech || has_be || has_model) {
            return Err(Rejection::MissingDegreeMarker);
        }

        // A disjoint degree family disqualifies the file unless the target
        // degree is independently present alongside it.
        if self.degree_disjoint.is_match(filename) && !(has_btech || has_be) {
            return Err(Rejection::MissingDegreeMarker);
        }

        if has_btech {
            Ok("B.Tech".to_string())
        } else if has_be {
            Ok("B.E".to_string())
        } else {
            // Bare "Model Curriculum" papers belong to the B.Tech stream.
            Ok("B.Tech".to_string())
        }
    }

    fn semester_gate(&self, filename: &str) -> Result<u8, Rejection> {
        let captures = self
            .semester
            .captures(filename)
            .ok_or(Rejection::MissingSemester)?;
        roman_to_semester(&captures[1].to_uppercase()).ok_or(Rejection::MissingSemester)
    }

    /// Left-to-right scan; the first candidate starting with a recognized
    /// prefix wins.
    fn subject_code_gate(&self, filename: &str) -> Result<String, Rejection> {
        for candidate in self.code_candidate.find_iter(filename) {
            let code = candidate.as_str().to_uppercase();
            if self.prefixes.iter().any(|prefix| code.starts_with(prefix)) {
                return Ok(code);
            }
        }
        Err(Rejection::MissingSubjectCode)
    }

    fn subject_name(&self, filename: &str, subject_code: &str) -> String {
        let escaped = regex::escape(subject_code);
        let patterns = [
            format!(r"Subject\s*-\s*{}\s*-\s*(.+?)\.pdf", escaped),
            format!(r"{}\s*-\s*(.+?)\.pdf", escaped),
        ];

        let mut raw = String::new();
        for pattern in &patterns {
            if let Ok(re) = RegexBuilder::new(pattern).case_insensitive(true).build() {
                if let Some(captures) = re.captures(filename) {
                    raw = captures[1].to_string();
                    break;
                }
            }
        }

        self.normalize_subject_name(&raw)
    }

    fn normalize_subject_name(&self, raw: &str) -> String {
        let spaced: String = raw
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        let collapsed = collapse_whitespace(&spaced);
        let stripped = self.paper_suffix.replace_all(&collapsed, "");
        let name = collapse_whitespace(&stripped);

        if name.chars().count() > 3 {
            title_case(&name)
        } else {
            PLACEHOLDER_SUBJECT_NAME.to_string()
        }
    }
}

fn fixed(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        branch: "classifier".to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Fixed Roman numeral lookup for semesters I..VIII.
fn roman_to_semester(roman: &str) -> Option<u8> {
    match roman {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        "VIII" => Some(8),
        _ => None,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalizes every letter that follows a non-letter, lowercases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ClassifierConfig;

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::builtin()).unwrap()
    }

    #[test]
    fn test_roman_numeral_mapping() {
        assert_eq!(roman_to_semester("I"), Some(1));
        assert_eq!(roman_to_semester("IV"), Some(4));
        assert_eq!(roman_to_semester("VIII"), Some(8));
        assert_eq!(roman_to_semester("IX"), None);
        assert_eq!(roman_to_semester(""), None);
    }

    #[test]
    fn test_title_case_matches_display_convention() {
        assert_eq!(title_case("applied mathematics iii"), "Applied Mathematics Iii");
        assert_eq!(title_case("FLUID MECHANICS"), "Fluid Mechanics");
        assert_eq!(title_case("circuits (cbcs)"), "Circuits (Cbcs)");
    }

    #[test]
    fn test_degree_gate_requires_target_family() {
        let c = classifier();
        assert!(matches!(
            c.classify("B.Sc. Chemistry Semester-II Subject - BSC201 - Organic.pdf"),
            Err(Rejection::MissingDegreeMarker)
        ));
    }

    #[test]
    fn test_degree_cooccurrence_overrides_disjoint_mention() {
        let c = classifier();
        let doc = c
            .classify("B.Sc. - B.Tech. Semester-II Subject - BSC201 - Organic Chemistry.pdf")
            .unwrap();
        assert_eq!(doc.degree, "B.Tech");
    }

    #[test]
    fn test_model_curriculum_alone_does_not_override_disjoint_degree() {
        let c = classifier();
        assert!(matches!(
            c.classify("B.Sc. (Model Curriculum) Semester-II Subject - BSC201 - Organic.pdf"),
            Err(Rejection::MissingDegreeMarker)
        ));
    }

    #[test]
    fn test_model_curriculum_defaults_to_btech() {
        let c = classifier();
        let doc = c
            .classify("(Model Curriculum) Semester-I Subject - BSC101 - Physics.pdf")
            .unwrap();
        assert_eq!(doc.degree, "B.Tech");
    }

    #[test]
    fn test_be_degree_detected() {
        let c = classifier();
        let doc = c
            .classify("B.E. Civil Engineering Semester-V Subject - PCC-CE304 - Structures.pdf")
            .unwrap();
        assert_eq!(doc.degree, "B.E");
    }

    #[test]
    fn test_missing_semester_rejects() {
        let c = classifier();
        assert!(matches!(
            c.classify("B.Tech Subject - BSC101 - Physics.pdf"),
            Err(Rejection::MissingSemester)
        ));
    }

    #[test]
    fn test_semester_token_variants() {
        let c = classifier();
        for (name, expected) in [
            ("B.Tech Semester-I Subject - BSC101 - Physics.pdf", 1),
            ("B.Tech Semester IV Subject - BSC101 - Physics.pdf", 4),
            ("B.Tech SemesterVII Subject - BSC101 - Physics.pdf", 7),
            ("B.Tech semester-viii Subject - BSC101 - Physics.pdf", 8),
        ] {
            assert_eq!(c.classify(name).unwrap().semester, expected, "{}", name);
        }
    }

    #[test]
    fn test_missing_subject_code_rejects() {
        let c = classifier();
        assert!(matches!(
            c.classify("B.Tech Semester-III Subject - Applied Mathematics.pdf"),
            Err(Rejection::MissingSubjectCode)
        ));
    }

    #[test]
    fn test_unrecognized_prefix_rejects() {
        let c = classifier();
        // ZZQ is a well-formed code shape but not an allowed prefix.
        assert!(matches!(
            c.classify("B.Tech Semester-III Subject - ZZQ101 - Mathematics.pdf"),
            Err(Rejection::MissingSubjectCode)
        ));
    }

    #[test]
    fn test_leftmost_qualifying_code_wins() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-III BSC101 and PCC205 Subject - Mathematics.pdf")
            .unwrap();
        assert_eq!(doc.subject_code, "BSC101");
    }

    #[test]
    fn test_code_with_interior_digits() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-I Subject - SE2BICS - Circuits Basics.pdf")
            .unwrap();
        assert_eq!(doc.subject_code, "SE2BICS");
    }

    #[test]
    fn test_hyphenated_code() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-V Subject - PCC-CE304 - Structural Analysis.pdf")
            .unwrap();
        assert_eq!(doc.subject_code, "PCC-CE304");
    }

    #[test]
    fn test_subject_name_from_subject_marker() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-I Subject - BSC101 - Engineering_Physics.pdf")
            .unwrap();
        assert_eq!(doc.subject_name, "Engineering Physics");
    }

    #[test]
    fn test_subject_name_fallback_without_marker() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-I BSC101 - Engineering Chemistry.pdf")
            .unwrap();
        assert_eq!(doc.subject_name, "Engineering Chemistry");
    }

    #[test]
    fn test_paper_suffix_stripped() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-II Subject - BSC102 - Applied Physics Paper-II.pdf")
            .unwrap();
        assert_eq!(doc.subject_name, "Applied Physics");
    }

    #[test]
    fn test_short_subject_name_gets_placeholder() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-II Subject - BSC102 - Lab.pdf")
            .unwrap();
        assert_eq!(doc.subject_name, PLACEHOLDER_SUBJECT_NAME);
    }

    #[test]
    fn test_missing_subject_name_gets_placeholder() {
        let c = classifier();
        let doc = c
            .classify("B.Tech Semester-II Subject BSC102.pdf")
            .unwrap();
        assert_eq!(doc.subject_name, PLACEHOLDER_SUBJECT_NAME);
    }
}
