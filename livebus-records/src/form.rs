use livebus_core::{PlannerError, PlannerResult};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("必須項目です。"),
        "length" => Some("入力してください。"),
        "range" => Some("0以上の数値を入力してください。"),
        "email" => Some("メールアドレスの形式が正しくありません。"),
        _ => None,
    }
}

fn push_reasons(out: &mut Vec<(String, String)>, prefix: &str, errs: &ValidationErrors) {
    for (field, kind) in errs.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| format!("{key}: {m}")))
                        .unwrap_or_else(|| format!("{key}: {}", e.code));
                    out.push((key.clone(), msg));
                }
            }
            ValidationErrorsKind::Struct(nested) => push_reasons(out, &key, nested),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    push_reasons(out, &format!("{key}[{idx}]"), nested);
                }
            }
        }
    }
}

/// Flatten `validator` errors into user-facing reasons, ordered by field.
pub fn reasons(errs: &ValidationErrors) -> Vec<String> {
    let mut out = Vec::new();
    push_reasons(&mut out, "", errs);
    out.sort();
    out.into_iter().map(|(_, msg)| msg).collect()
}

/// Run the form's field rules.
pub fn check<T: Validate>(form: &T) -> PlannerResult<()> {
    form.validate()
        .map_err(|errs| PlannerError::validation(reasons(&errs)))
}
