//! Placeholder rendering - `${[MODIFIER_]SCOPE_NAME}` substitution
//!
//! String parameters may reference alert labels and annotations through
//! tokens like `${LABEL_INSTANCE}` or `${URLENCODE_ANNOTATION_TITLE}`.
//! Rendering runs one pass over every annotation, then every label;
//! emitted values are not re-scanned, so there is no recursive expansion.

use reflex_executor::{ParamValue, Params};

use crate::alert::Alert;

/// Scope name for label tokens.
const SCOPE_LABEL: &str = "LABEL";
/// Scope name for annotation tokens.
const SCOPE_ANNOTATION: &str = "ANNOTATION";

/// Value modifiers, looked up by token prefix. The full token strings are
/// disjoint, so replacement order does not matter.
const MODIFIERS: [(&str, fn(&str) -> String); 4] = [
    ("", |s| s.to_owned()),
    ("URLENCODE_", urlencode),
    ("CUT_AFTER_LAST_COLON_", cut_after_last_colon),
    ("JSON_ESCAPE_", json_escape),
];

/// Classic form encoding: percent-escape, space as `+`.
fn urlencode(s: &str) -> String {
    urlencoding::encode(s).replace("%20", "+")
}

/// Truncate immediately before the last `:`; values without a colon pass
/// through unchanged. The common case is stripping `:port` from
/// `host:port` instance labels.
fn cut_after_last_colon(s: &str) -> String {
    match s.rfind(':') {
        Some(idx) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}

/// Escape backslashes and double quotes for embedding in JSON strings.
fn json_escape(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Replace all placeholder forms of one (scope, key) pair in `template`.
fn replace_placeholders(template: &str, scope: &str, key: &str, value: &str) -> String {
    let name = key.to_uppercase();
    let mut out = template.to_owned();

    for (modifier, apply) in MODIFIERS {
        let token = format!("${{{modifier}{scope}_{name}}}");
        if out.contains(&token) {
            out = out.replace(&token, &apply(value));
        }
    }

    out
}

/// Render one string against every annotation, then every label.
fn render_str(template: &str, alert: &Alert) -> String {
    let mut out = template.to_owned();

    for (key, value) in &alert.annotations {
        out = replace_placeholders(&out, SCOPE_ANNOTATION, key, value);
    }
    for (key, value) in &alert.labels {
        out = replace_placeholders(&out, SCOPE_LABEL, key, value);
    }

    out
}

/// Render all string parameters of an action against an alert.
///
/// Sequences are rendered element-wise; non-string values pass through
/// unchanged.
pub fn render_params(params: &Params, alert: &Alert) -> Params {
    params
        .iter()
        .map(|(name, value)| (name.clone(), render_value(value, alert)))
        .collect()
}

fn render_value(value: &ParamValue, alert: &Alert) -> ParamValue {
    match value {
        ParamValue::String(s) => ParamValue::String(render_str(s, alert)),
        ParamValue::Sequence(values) => {
            ParamValue::Sequence(values.iter().map(|v| render_value(v, alert)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn alert() -> Alert {
        Alert {
            status: "firing".to_owned(),
            labels: BTreeMap::from([
                ("block".to_owned(), "marshaller function".to_owned()),
                ("error".to_owned(), "unmarshal error&".to_owned()),
                ("instance".to_owned(), "server.domain.com:9090".to_owned()),
            ]),
            annotations: BTreeMap::from([("title".to_owned(), "instance down".to_owned())]),
        }
    }

    #[test]
    fn renders_all_modifiers() {
        let template = "${LABEL_BLOCK} | ${URLENCODE_LABEL_ERROR} | \
                        ${CUT_AFTER_LAST_COLON_LABEL_INSTANCE} | ${ANNOTATION_TITLE}";
        assert_eq!(
            render_str(template, &alert()),
            "marshaller function | unmarshal+error%26 | server.domain.com | instance down"
        );
    }

    #[test]
    fn urlencode_uses_form_encoding() {
        assert_eq!(urlencode("some replacement:8080"), "some+replacement%3A8080");
    }

    #[test]
    fn cut_after_last_colon_without_colon() {
        assert_eq!(cut_after_last_colon("no port here"), "no port here");
        assert_eq!(cut_after_last_colon("a:b:c"), "a:b");
    }

    #[test]
    fn json_escape_quotes_and_backslashes() {
        assert_eq!(
            json_escape(r#"some \replacement "8080"#),
            r#"some \\replacement \"8080"#
        );
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        assert_eq!(render_str("${LABEL_MISSING}", &alert()), "${LABEL_MISSING}");
    }

    #[test]
    fn no_resolvable_tokens_remain() {
        let rendered = render_str(
            "${LABEL_BLOCK} ${ANNOTATION_TITLE} ${JSON_ESCAPE_LABEL_ERROR}",
            &alert(),
        );
        assert!(!rendered.contains("${"), "left-over tokens in {rendered}");
    }

    #[test]
    fn sequences_render_element_wise() {
        let mut params = Params::new();
        params.insert(
            "args".to_owned(),
            ParamValue::Sequence(vec![
                ParamValue::String("${LABEL_INSTANCE}".to_owned()),
                ParamValue::Integer(7),
            ]),
        );
        params.insert("count".to_owned(), ParamValue::Integer(3));

        let rendered = render_params(&params, &alert());
        assert_eq!(
            rendered["args"],
            ParamValue::Sequence(vec![
                ParamValue::String("server.domain.com:9090".to_owned()),
                ParamValue::Integer(7),
            ])
        );
        assert_eq!(rendered["count"], ParamValue::Integer(3));
    }
}
