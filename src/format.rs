//! The `data.js` wire format.
//!
//! ```text
//! window.BENCHMARK_DATA = {
//!   "lastUpdate": <ms>,
//!   "repoUrl": "<url>",
//!   "entries": { "<series>": [ <entry>, ... ] }
//! }
//! ```
//!
//! The dashboard loads the file through a `<script>` tag, so the prefix is
//! part of the format. Output uses two-space indentation and no trailing
//! newline, matching what the benchmark action writes.

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::schema::{Bench, BenchmarkFile, Person, PersonLayout};

/// Literal assignment every file starts with.
pub const PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Largest magnitude at which every integer is exactly representable in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Serialize an f64 the way JavaScript prints numbers: integral values carry no
/// fraction (`0`, not `0.0`).
pub fn js_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let v = *value;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(v as i64)
    } else {
        serializer.serialize_f64(v)
    }
}

/// A bench value as stored: usually a number, but some pipelines quote it.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawValue {
    Number(#[serde(serialize_with = "js_number")] f64),
    Text(String),
}

/// On-disk shape of a [`Bench`].
#[derive(Serialize, Deserialize)]
pub(crate) struct RawBench {
    name: String,
    value: RawValue,
    unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extra: Option<String>,
}

/// Parse a quoted value. Unparseable text yields NaN; validation reports it
/// by its original text.
pub(crate) fn parse_value_text(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

impl From<RawBench> for Bench {
    fn from(raw: RawBench) -> Self {
        let (value, value_text) = match raw.value {
            RawValue::Number(v) => (v, None),
            RawValue::Text(t) => (parse_value_text(&t).unwrap_or(f64::NAN), Some(t)),
        };
        Bench {
            name: raw.name,
            value,
            unit: raw.unit,
            range: raw.range,
            extra: raw.extra,
            value_text,
        }
    }
}

impl From<Bench> for RawBench {
    fn from(b: Bench) -> Self {
        // Keep the quoted form only while it still says the same number.
        let value = match b.value_text {
            Some(t) if parse_value_text(&t) == Some(b.value) => RawValue::Text(t),
            _ => RawValue::Number(b.value),
        };
        RawBench {
            name: b.name,
            value,
            unit: b.unit,
            range: b.range,
            extra: b.extra,
        }
    }
}

impl Serialize for Person {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 2 + usize::from(self.username.is_some());
        let mut st = serializer.serialize_struct("Person", len)?;
        match self.layout {
            PersonLayout::EmailFirst => {
                st.serialize_field("email", &self.email)?;
                st.serialize_field("name", &self.name)?;
                if let Some(username) = &self.username {
                    st.serialize_field("username", username)?;
                }
            }
            PersonLayout::NameFirst => {
                st.serialize_field("name", &self.name)?;
                if let Some(username) = &self.username {
                    st.serialize_field("username", username)?;
                }
                st.serialize_field("email", &self.email)?;
            }
        }
        st.end()
    }
}

struct PersonVisitor;

impl<'de> Visitor<'de> for PersonVisitor {
    type Value = Person;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a commit author or committer object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Person, A::Error> {
        let (mut email, mut name, mut username) = (None, None, None);
        let mut layout = None;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "email" => {
                    layout.get_or_insert(PersonLayout::EmailFirst);
                    email = Some(map.next_value::<String>()?);
                }
                "name" => {
                    layout.get_or_insert(PersonLayout::NameFirst);
                    name = Some(map.next_value::<String>()?);
                }
                "username" => username = map.next_value::<Option<String>>()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(Person {
            email: email.ok_or_else(|| de::Error::missing_field("email"))?,
            name: name.ok_or_else(|| de::Error::missing_field("name"))?,
            username,
            layout: layout.unwrap_or_default(),
        })
    }
}

impl<'de> Deserialize<'de> for Person {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PersonVisitor)
    }
}

/// Strip the assignment prefix and any trailing `;`, returning the JSON payload.
pub fn payload(text: &str) -> Result<&str, ParseError> {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    let body = text.strip_prefix(PREFIX).ok_or(ParseError::MissingPrefix)?;
    let body = body.trim_end();
    Ok(body.strip_suffix(';').unwrap_or(body))
}

pub fn from_js(text: &str) -> Result<BenchmarkFile, ParseError> {
    let json = payload(text)?;
    Ok(serde_json::from_str(json)?)
}

/// [`from_js`] over raw file content, which must be UTF-8.
pub fn from_js_bytes(bytes: &[u8]) -> Result<BenchmarkFile, ParseError> {
    from_js(std::str::from_utf8(bytes)?)
}

pub fn to_js(file: &BenchmarkFile) -> serde_json::Result<String> {
    let json = serde_json::to_string_pretty(file)?;
    Ok(format!("{PREFIX}{json}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Bench, Tool, DEFAULT_SERIES};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1741632393253,
  "repoUrl": "https://github.com/Azure/azure-storage-fuse",
  "entries": {
    "Benchmark": [
      {
        "commit": {
          "author": {
            "email": "dev@example.com",
            "name": "dev",
            "username": "dev-gh"
          },
          "committer": {
            "email": "noreply@github.com",
            "name": "GitHub",
            "username": "web-flow"
          },
          "distinct": true,
          "id": "03e72e47d37985e5c28051c0ff17bdc0c7315e74",
          "message": "Correcting code for cache cleanup",
          "timestamp": "2025-03-07T23:48:22-08:00",
          "tree_id": "5b69276c81c0c728ae2dd3889b9743194fdcc990",
          "url": "https://github.com/Azure/azure-storage-fuse/commit/03e72e47d37985e5c28051c0ff17bdc0c7315e74"
        },
        "date": 1741426022487,
        "tool": "customSmallerIsBetter",
        "benches": [
          {
            "name": "sequential_read",
            "value": 0.096447993442,
            "unit": "milliseconds"
          },
          {
            "name": "random_read_direct_io",
            "value": 0,
            "unit": "milliseconds"
          }
        ]
      }
    ]
  }
}"#;

    #[test]
    fn parses_real_layout() {
        let file = from_js(SAMPLE).unwrap();
        assert_eq!(file.last_update, 1741632393253);
        let entry = &file.entries[DEFAULT_SERIES][0];
        assert_eq!(entry.tool, Tool::SmallerIsBetter);
        assert_eq!(entry.commit.distinct, Some(true));
        assert_eq!(entry.commit.author.username.as_deref(), Some("dev-gh"));
        assert_eq!(
            entry.benches[1],
            Bench::new("random_read_direct_io", 0.0, "milliseconds")
        );
    }

    #[test]
    fn output_is_byte_identical_to_input() {
        let file = from_js(SAMPLE).unwrap();
        assert_eq!(to_js(&file).unwrap(), SAMPLE);
    }

    #[test]
    fn optional_commit_fields_are_omitted_when_absent() {
        let mut file = from_js(SAMPLE).unwrap();
        let commit = &mut file.entries.get_mut(DEFAULT_SERIES).unwrap()[0].commit;
        commit.distinct = None;
        commit.tree_id = None;
        commit.author.username = None;

        let out = to_js(&file).unwrap();
        assert!(!out.contains("\"distinct\""));
        assert!(!out.contains("\"tree_id\""));
        assert_eq!(out.matches("\"username\"").count(), 1);
        assert_eq!(from_js(&out).unwrap(), file);
    }

    #[test]
    fn tolerates_bom_and_trailing_semicolon() {
        let text = format!("\u{feff}{SAMPLE};\n");
        assert_eq!(from_js(&text).unwrap(), from_js(SAMPLE).unwrap());
    }

    #[test]
    fn missing_prefix_is_a_parse_error() {
        let text = SAMPLE.trim_start_matches(PREFIX);
        assert!(matches!(from_js(text), Err(ParseError::MissingPrefix)));
    }

    #[test]
    fn missing_repo_url_is_a_parse_error() {
        let text = SAMPLE.replace(
            "  \"repoUrl\": \"https://github.com/Azure/azure-storage-fuse\",\n",
            "",
        );
        let err = from_js(&text).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
        assert!(err.to_string().contains("repoUrl"));
    }

    #[test]
    fn non_finite_literals_do_not_parse() {
        let text = SAMPLE.replace("0.096447993442", "NaN");
        assert!(matches!(from_js(&text), Err(ParseError::Json(_))));
    }

    #[test]
    fn integral_values_have_no_fraction() {
        let json = serde_json::to_string(&Bench::new("x", 2048.0, "MiB/s")).unwrap();
        assert_eq!(json, r#"{"name":"x","value":2048,"unit":"MiB/s"}"#);
        let json = serde_json::to_string(&Bench::new("x", 2.5, "MiB/s")).unwrap();
        assert_eq!(json, r#"{"name":"x","value":2.5,"unit":"MiB/s"}"#);
    }

    #[test]
    fn quoted_values_keep_their_text() {
        let text = SAMPLE.replace("0.096447993442", "\"0.00000\"");
        let file = from_js(&text).unwrap();
        let bench = &file.entries[DEFAULT_SERIES][0].benches[0];
        assert_eq!(bench.value, 0.0);
        assert_eq!(bench.value_text(), Some("0.00000"));
        assert_eq!(to_js(&file).unwrap(), text);
    }

    #[test]
    fn changed_quoted_value_is_written_as_number() {
        let text = SAMPLE.replace("0.096447993442", "\"0.00000\"");
        let mut file = from_js(&text).unwrap();
        file.entries.get_mut(DEFAULT_SERIES).unwrap()[0].benches[0].value = 1.5;
        assert_eq!(
            to_js(&file).unwrap(),
            SAMPLE.replace("0.096447993442", "1.5")
        );
    }

    #[test]
    fn unparseable_quoted_value_reads_as_nan() {
        let text = SAMPLE.replace("0.096447993442", "\"n/a\"");
        let bench = from_js(&text).unwrap().entries[DEFAULT_SERIES][0].benches[0].clone();
        assert!(bench.value.is_nan());
        assert_eq!(bench.value_text(), Some("n/a"));
    }

    #[test]
    fn person_key_order_is_preserved() {
        let name_first = SAMPLE.replace(
            r#"            "email": "dev@example.com",
            "name": "dev",
            "username": "dev-gh""#,
            r#"            "name": "dev",
            "username": "dev-gh",
            "email": "dev@example.com""#,
        );
        assert_ne!(name_first, SAMPLE);
        let file = from_js(&name_first).unwrap();
        let commit = &file.entries[DEFAULT_SERIES][0].commit;
        assert_eq!(commit.author.layout, PersonLayout::NameFirst);
        assert_eq!(commit.committer.layout, PersonLayout::EmailFirst);
        assert_eq!(to_js(&file).unwrap(), name_first);

        // Layout is presentation only.
        assert_eq!(file, from_js(SAMPLE).unwrap());
    }

    #[test]
    fn person_without_username_or_email() {
        let json = r#"{"name":"dev","email":"dev@example.com"}"#;
        let person: Person = serde_json::from_str(json).unwrap();
        assert_eq!(person.username, None);
        assert_eq!(serde_json::to_string(&person).unwrap(), json);

        let err = serde_json::from_str::<Person>(r#"{"name":"dev"}"#).unwrap_err();
        assert!(err.to_string().contains("email"), "{err}");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let bytes = b"window.BENCHMARK_DATA = {\"repoUrl\": \"\xff\"}";
        assert!(matches!(from_js_bytes(bytes), Err(ParseError::Utf8(_))));
    }
}
