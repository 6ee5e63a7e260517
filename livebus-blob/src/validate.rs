//! Batch validation, run before any upload is attempted.

use livebus_core::{Locale, PlannerError};

use crate::{UploadCandidate, UploadRules};

/// One violated rule, with the files that violate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedType { files: Vec<String>, allowed: Vec<String> },
    TooLarge { files: Vec<String>, max_bytes: u64 },
    TooMany { count: usize, max: usize },
}

impl Rejection {
    pub fn describe(&self, locale: Locale) -> String {
        match (self, locale) {
            (Rejection::UnsupportedType { files, allowed }, Locale::Ja) => format!(
                "無効なファイル形式です。{}のみ対応しています。（{}）",
                type_labels(allowed).join("、"),
                files.join("、")
            ),
            (Rejection::UnsupportedType { files, allowed }, Locale::En) => format!(
                "Unsupported file type: {}. Only {} are accepted.",
                files.join(", "),
                type_labels(allowed).join(", ")
            ),
            (Rejection::TooLarge { files, max_bytes }, Locale::Ja) => format!(
                "ファイルサイズが大きすぎます。{}以下のファイルを選択してください。（{}）",
                human_size(*max_bytes),
                files.join("、")
            ),
            (Rejection::TooLarge { files, max_bytes }, Locale::En) => format!(
                "File too large: {}. The limit is {}.",
                files.join(", "),
                human_size(*max_bytes)
            ),
            (Rejection::TooMany { max, .. }, Locale::Ja) => {
                format!("一度に{}枚までしかアップロードできません。", max)
            }
            (Rejection::TooMany { count, max }, Locale::En) => {
                format!("{} files selected; at most {} can be uploaded at once.", count, max)
            }
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe(Locale::En))
    }
}

/// Every rule a rejected batch broke, in check order: type, size, count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub rejections: Vec<Rejection>,
}

impl ValidationReport {
    pub fn reasons(&self, locale: Locale) -> Vec<String> {
        self.rejections.iter().map(|r| r.describe(locale)).collect()
    }

    pub fn into_error(self, locale: Locale) -> PlannerError {
        PlannerError::validation(self.reasons(locale))
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reasons(Locale::En).join("; "))
    }
}

/// Check a whole batch against `rules`.
///
/// All-or-nothing: a single bad file rejects the batch. Every rule is
/// evaluated against every candidate before reporting.
pub fn validate_batch(candidates: &[UploadCandidate], rules: &UploadRules) -> Result<(), ValidationReport> {
    let mut rejections = Vec::new();

    let bad_types: Vec<String> = candidates
        .iter()
        .filter(|c| !rules.allows_type(&c.content_type))
        .map(|c| c.file_name.clone())
        .collect();
    if !bad_types.is_empty() {
        rejections.push(Rejection::UnsupportedType {
            files: bad_types,
            allowed: rules.allowed_types.clone(),
        });
    }

    let oversized: Vec<String> = candidates
        .iter()
        .filter(|c| c.size > rules.max_file_bytes)
        .map(|c| c.file_name.clone())
        .collect();
    if !oversized.is_empty() {
        rejections.push(Rejection::TooLarge {
            files: oversized,
            max_bytes: rules.max_file_bytes,
        });
    }

    if candidates.len() > rules.max_files {
        rejections.push(Rejection::TooMany {
            count: candidates.len(),
            max: rules.max_files,
        });
    }

    if rejections.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { rejections })
    }
}

fn type_labels(allowed: &[String]) -> Vec<String> {
    allowed
        .iter()
        .map(|t| {
            let subtype = t.rsplit('/').next().unwrap_or(t);
            match subtype {
                "webp" => "WebP".to_string(),
                other => other.to_uppercase(),
            }
        })
        .collect()
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, size: u64) -> UploadCandidate {
        UploadCandidate::new(name, "image/jpeg", vec![0u8; 4]).with_size(size)
    }

    #[test]
    fn valid_batch_is_accepted() {
        let batch = vec![image("a.jpg", 10), image("b.jpg", 5 * 1024 * 1024)];
        assert!(validate_batch(&batch, &UploadRules::default()).is_ok());
    }

    #[test]
    fn empty_batch_is_accepted() {
        assert!(validate_batch(&[], &UploadRules::default()).is_ok());
    }

    #[test]
    fn one_bad_type_rejects_the_batch() {
        let batch = vec![
            image("valid.jpg", 10),
            UploadCandidate::new("bad.txt", "text/plain", "hello"),
        ];
        let report = validate_batch(&batch, &UploadRules::default()).unwrap_err();
        assert_eq!(
            report.rejections,
            vec![Rejection::UnsupportedType {
                files: vec!["bad.txt".to_string()],
                allowed: UploadRules::default().allowed_types,
            }]
        );
    }

    #[test]
    fn every_violated_rule_is_reported() {
        let mut batch: Vec<UploadCandidate> = (0..11).map(|i| image(&format!("{i}.jpg"), 1)).collect();
        batch.push(image("huge.jpg", 5 * 1024 * 1024 + 1));
        batch.push(UploadCandidate::new("notes.pdf", "application/pdf", "x"));

        let report = validate_batch(&batch, &UploadRules::default()).unwrap_err();
        assert_eq!(report.rejections.len(), 3);
        assert!(matches!(report.rejections[0], Rejection::UnsupportedType { .. }));
        assert!(matches!(report.rejections[1], Rejection::TooLarge { ref files, .. } if files == &["huge.jpg"]));
        assert!(matches!(report.rejections[2], Rejection::TooMany { count: 13, max: 10 }));
    }

    #[test]
    fn reasons_are_localized() {
        let report = ValidationReport {
            rejections: vec![Rejection::TooLarge {
                files: vec!["big.png".into()],
                max_bytes: 5 * 1024 * 1024,
            }],
        };
        assert!(report.reasons(Locale::Ja)[0].contains("5MB以下"));
        assert_eq!(report.reasons(Locale::En)[0], "File too large: big.png. The limit is 5MB.");
    }

    #[test]
    fn type_labels_read_naturally() {
        let labels = type_labels(&UploadRules::default().allowed_types);
        assert_eq!(labels, vec!["JPEG", "PNG", "GIF", "WebP"]);
    }
}
