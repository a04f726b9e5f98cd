// Author: Dustin Pilgrim
// License: MIT

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::path::{quote, render_key};
use crate::source::json::escape_literal;
use crate::value::{ConfigList, ConfigObject, Number, Value, ValueKind};

const INDENT: &str = "    ";

// Strings matching this can be written without quotes outside JSON mode.
static UNQUOTED_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid regex"));

// Words that would re-parse as something other than a string.
const RESERVED_WORDS: &[&str] = &["true", "false", "null", "include", "yes", "no", "on", "off"];

/// Controls how [`render`] turns a tree into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Newlines and indentation instead of one compact line.
    pub formatted: bool,
    /// Comment lines carried by each value's origin.
    pub comments: bool,
    /// A comment naming where each value came from.
    pub origin_comments: bool,
    /// Quote every string and key.
    pub json: bool,
}

impl RenderOptions {
    /// Everything on.
    pub fn defaults() -> Self {
        Self {
            formatted: true,
            comments: true,
            origin_comments: true,
            json: true,
        }
    }

    /// Compact JSON with no comments.
    pub fn concise() -> Self {
        Self {
            formatted: false,
            comments: false,
            origin_comments: false,
            json: true,
        }
    }

    pub fn set_formatted(mut self, value: bool) -> Self {
        self.formatted = value;
        self
    }

    pub fn set_comments(mut self, value: bool) -> Self {
        self.comments = value;
        self
    }

    pub fn set_origin_comments(mut self, value: bool) -> Self {
        self.origin_comments = value;
        self
    }

    pub fn set_json(mut self, value: bool) -> Self {
        self.json = value;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Renders a value as text.
///
/// A delayed merge inside an object is written as one entry per layer under
/// the same key, lowest precedence first, which merges back together when the
/// text is parsed again.
/// In JSON mode a resolved tree renders to valid JSON.
pub fn render(value: &Value, options: &RenderOptions) -> String {
    let mut renderer = Renderer {
        options,
        out: String::new(),
    };
    renderer.value(value, 0);
    if options.formatted {
        renderer.out.push('\n');
    }
    renderer.out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, &RenderOptions::concise()))
    }
}

struct Renderer<'a> {
    options: &'a RenderOptions,
    out: String,
}

impl Renderer<'_> {
    fn value(&mut self, v: &Value, indent: usize) {
        match v.kind() {
            ValueKind::Null => self.out.push_str("null"),
            ValueKind::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            ValueKind::Number { number, literal } => match literal {
                Some(text) => self.out.push_str(text),
                None => self.number(*number),
            },
            ValueKind::String(s) => self.string(s),
            ValueKind::List(l) => self.list(l, indent),
            ValueKind::Object(o) => self.object(o, indent),
            // quoted in JSON mode so the text stays valid JSON
            ValueKind::Reference(s) if self.options.json => self.out.push_str(&quote(&s.render())),
            ValueKind::Reference(s) => self.out.push_str(&s.render()),
            ValueKind::DelayedMerge(m) => {
                // outside an object there is no key to repeat, so layers just follow each other
                for (i, layer) in m.stack().iter().enumerate() {
                    if i > 0 {
                        self.out.push(' ');
                    }
                    self.value(layer, indent);
                }
            }
        }
    }

    fn number(&mut self, number: Number) {
        match number {
            Number::Int(i) => self.out.push_str(&i.to_string()),
            Number::UInt(u) => self.out.push_str(&u.to_string()),
            // Debug keeps the trailing ".0" so whole floats stay floats
            Number::Float(f) => self.out.push_str(&format!("{:?}", f)),
        }
    }

    fn string(&mut self, s: &str) {
        let s = escape_literal(s);
        let s: &str = &s;
        if !self.options.json && UNQUOTED_STRING.is_match(s) && !RESERVED_WORDS.contains(&s) {
            self.out.push_str(s);
        } else {
            self.out.push_str(&quote(s));
        }
    }

    fn key(&mut self, key: &str) {
        if self.options.json {
            self.out.push_str(&quote(key));
        } else {
            self.out.push_str(&render_key(key));
        }
    }

    fn separator(&mut self, v: &Value) {
        let formatted = self.options.formatted;
        let sep = if self.options.json {
            if formatted { " : " } else { ":" }
        } else if v.as_object().is_some() {
            if formatted { " " } else { "" }
        } else if formatted {
            " = "
        } else {
            "="
        };
        self.out.push_str(sep);
    }

    fn newline(&mut self, indent: usize) {
        if self.options.formatted {
            self.out.push('\n');
            self.out.push_str(&INDENT.repeat(indent));
        }
    }

    fn comment_line(&mut self, text: &str, indent: usize) {
        // comments need a line of their own
        if !self.options.formatted {
            return;
        }
        self.out.push_str(if self.options.json { "//" } else { "#" });
        if !text.is_empty() {
            self.out.push(' ');
            self.out.push_str(text);
        }
        self.newline(indent);
    }

    fn comments(&mut self, v: &Value, indent: usize) {
        if self.options.origin_comments {
            self.comment_line(&v.origin().description(), indent);
        }
        if self.options.comments {
            for line in v.origin().comments() {
                self.comment_line(line.trim(), indent);
            }
        }
    }

    fn object(&mut self, o: &ConfigObject, indent: usize) {
        if o.is_empty() {
            self.out.push_str("{}");
            return;
        }

        // (key, value, first layer of an unresolved merge)
        let mut entries: Vec<(&str, &Value, bool)> = Vec::with_capacity(o.len());
        for (key, v) in o.iter() {
            match v.kind() {
                ValueKind::DelayedMerge(m) => {
                    // lowest precedence first, since a later duplicate key wins when parsed
                    for (i, layer) in m.stack().iter().rev().enumerate() {
                        entries.push((key, layer, i == 0));
                    }
                }
                _ => entries.push((key, v, false)),
            }
        }

        self.out.push('{');
        let count = entries.len();
        for (i, (key, v, merge_start)) in entries.into_iter().enumerate() {
            self.newline(indent + 1);
            if merge_start && self.options.comments {
                self.comment_line("unresolved merge", indent + 1);
            }
            self.comments(v, indent + 1);
            self.key(key);
            self.separator(v);
            self.value(v, indent + 1);
            if i + 1 < count {
                self.out.push(',');
            }
        }
        self.newline(indent);
        self.out.push('}');
    }

    fn list(&mut self, l: &ConfigList, indent: usize) {
        if l.is_empty() {
            self.out.push_str("[]");
            return;
        }

        self.out.push('[');
        for (i, item) in l.iter().enumerate() {
            self.newline(indent + 1);
            self.comments(item, indent + 1);
            self.value(item, indent + 1);
            if i + 1 < l.len() {
                self.out.push(',');
            }
        }
        self.newline(indent);
        self.out.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::Origin;
    use crate::source::json;
    use crate::test_support::{arb_resolved_value, int, list, null, obj, optional_reference, reference, str_val};
    use proptest::prelude::*;

    fn plain() -> RenderOptions {
        RenderOptions::defaults()
            .set_comments(false)
            .set_origin_comments(false)
    }

    #[test]
    fn test_concise_json() {
        let v = obj(&[
            ("a", int(1)),
            ("b", list(&[Value::bool(Origin::new("test"), true), null()])),
            ("c", str_val("x y")),
            ("d", obj(&[])),
        ]);
        assert_eq!(
            render(&v, &RenderOptions::concise()),
            r#"{"a":1,"b":[true,null],"c":"x y","d":{}}"#
        );
        assert_eq!(v.to_string(), render(&v, &RenderOptions::concise()));
    }

    #[test]
    fn test_formatted_indents_four_spaces() {
        let v = obj(&[("outer", obj(&[("inner", int(1))]))]);
        let text = render(&v, &plain());
        assert_eq!(text, "{\n    \"outer\" : {\n        \"inner\" : 1\n    }\n}\n");
    }

    #[test]
    fn test_unquoted_strings_outside_json() {
        let v = obj(&[
            ("simple", str_val("localhost")),
            ("spaced", str_val("two words")),
            ("reserved", str_val("true")),
            ("empty", str_val("")),
            ("a.b", int(1)),
        ]);
        let text = render(&v, &RenderOptions::concise().set_json(false));
        assert_eq!(
            text,
            r#"{simple=localhost,spaced="two words",reserved="true",empty="","a.b"=1}"#
        );
    }

    #[test]
    fn test_number_literals_and_floats() {
        let o = Origin::new("test");
        let v = obj(&[
            ("lit", Value::number_literal(o.clone(), Number::Float(10.0), "1e1").unwrap()),
            ("whole", Value::float(o.clone(), 2.0).unwrap()),
            ("frac", Value::float(o.clone(), 1.5).unwrap()),
            ("big", Value::number(o, Number::UInt(u64::MAX)).unwrap()),
        ]);
        assert_eq!(
            render(&v, &RenderOptions::concise()),
            format!(r#"{{"lit":1e1,"whole":2.0,"frac":1.5,"big":{}}}"#, u64::MAX)
        );
    }

    #[test]
    fn test_references_render_as_substitutions() {
        let v = obj(&[("a", reference("b.c")), ("o", optional_reference("d"))]);
        assert_eq!(
            render(&v, &RenderOptions::concise()),
            r#"{"a":"${b.c}","o":"${?d}"}"#
        );
        assert_eq!(
            render(&v, &RenderOptions::concise().set_json(false)),
            "{a=${b.c},o=${?d}}"
        );
    }

    #[test]
    fn test_substitution_shaped_strings_stay_strings() {
        let root = obj(&[
            ("a", str_val("${x}")),
            ("b", str_val("${?y}")),
            ("c", str_val("$${z}")),
            ("d", str_val("${not a path}")),
            ("e", reference("x")),
        ]);
        let text = render(&root, &RenderOptions::concise());
        assert_eq!(
            text,
            r#"{"a":"$${x}","b":"$${?y}","c":"$$${z}","d":"$${not a path}","e":"${x}"}"#
        );
        assert_eq!(json::parse_str(&text, "rendered").unwrap(), root);

        let mut native = std::collections::BTreeMap::new();
        native.insert("k", "${?y}");
        let converted = crate::convert::from_any(&native, None).unwrap();
        let parsed = json::parse_str(&converted.to_string(), "rendered").unwrap();
        assert!(parsed.is_resolved());
        assert_eq!(parsed, converted);
    }

    #[test]
    fn test_delayed_merge_renders_each_layer() {
        let merged = obj(&[("a", reference("x"))]).with_fallback(&obj(&[("a", int(1))]));
        let text = render(&merged, &RenderOptions::defaults().set_json(false).set_origin_comments(false));
        assert!(text.contains("# unresolved merge"), "{}", text);
        assert!(text.contains("a = ${x}"), "{}", text);
        assert!(text.contains("a = 1"), "{}", text);
        assert!(text.find("a = 1") < text.find("a = ${x}"), "{}", text);
    }

    #[test]
    fn test_delayed_merge_survives_json_round_trip() {
        let merged = obj(&[("a", reference("x"))]).with_fallback(&obj(&[("a", int(1))]));
        let text = render(&merged, &RenderOptions::concise());
        assert_eq!(text, r#"{"a":1,"a":"${x}"}"#);

        let parsed = json::parse_str(&text, "rendered").unwrap();
        assert_eq!(parsed, merged);
    }

    #[test]
    fn test_origin_and_source_comments() {
        let origin = Origin::new("app.conf")
            .with_line(3)
            .with_comments(vec![" the port".to_string()]);
        let v = obj(&[("port", Value::int(origin, 8080))]);

        let text = render(&v, &RenderOptions::defaults().set_json(false));
        assert!(text.contains("# app.conf: 3\n"), "{}", text);
        assert!(text.contains("# the port\n"), "{}", text);
        assert!(text.contains("port = 8080"), "{}", text);

        // no room for comments on a single line
        let compact = render(&v, &RenderOptions::defaults().set_formatted(false));
        assert_eq!(compact, r#"{"port":8080}"#);
    }

    #[test]
    fn test_options_from_json() {
        let options: RenderOptions = serde_json::from_str(r#"{"comments": false}"#).unwrap();
        assert!(options.formatted);
        assert!(!options.comments);
        assert_eq!(RenderOptions::default(), RenderOptions::defaults());
    }

    proptest! {
        #[test]
        fn prop_json_render_parses_back(v in arb_resolved_value()) {
            let root = obj(&[("root", v)]);
            for options in [RenderOptions::concise(), plain()] {
                let text = render(&root, &options);
                let parsed = json::parse_str(&text, "rendered").unwrap();
                prop_assert_eq!(&parsed, &root);
            }
        }
    }
}
