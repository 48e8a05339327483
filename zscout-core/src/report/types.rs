//! Report data model shared by the generator, the store, and the gateway.
//!
//! Model output is loosely shaped: fields go missing, come back `null`, or switch
//! between strings and arrays. Every field here defaults and the `lenient`
//! helpers normalize the common variations instead of rejecting the report.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A structured research report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Report {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::list")]
    pub sections: Vec<Section>,
    #[serde(deserialize_with = "lenient::list", alias = "citations")]
    pub references: Vec<Reference>,
    #[serde(deserialize_with = "lenient::list")]
    pub suggested_pdfs: Vec<SuggestedResource>,
    #[serde(deserialize_with = "lenient::list")]
    pub suggested_images: Vec<SuggestedResource>,
    #[serde(deserialize_with = "lenient::list")]
    pub suggested_datasets: Vec<SuggestedResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "lenient::string", alias = "heading")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string", alias = "body", alias = "text")]
    pub content: String,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A cited source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    #[serde(
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u32>,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::authors")]
    pub authors: Vec<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none",
        alias = "link"
    )]
    pub url: Option<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none",
        alias = "publication",
        alias = "journal"
    )]
    pub source: Option<String>,
}

/// A suggested PDF, image, or dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedResource {
    #[serde(deserialize_with = "lenient::string", alias = "name")]
    pub title: String,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none",
        alias = "link"
    )]
    pub url: Option<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none",
        alias = "caption",
        alias = "summary"
    )]
    pub description: Option<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
}

impl Report {
    /// A report with neither a title nor any section carries nothing to render.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.sections.is_empty()
    }

    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let title = if self.title.trim().is_empty() {
            "Untitled Report"
        } else {
            self.title.trim()
        };
        let _ = writeln!(out, "# {}\n", title);

        for section in &self.sections {
            let _ = writeln!(out, "## {}\n", section.title.trim());
            let _ = writeln!(out, "{}\n", section.content.trim());
        }

        if !self.references.is_empty() {
            let _ = writeln!(out, "## References\n");
            for (i, reference) in self.references.iter().enumerate() {
                let number = reference.id.map(|id| id as usize).unwrap_or(i + 1);
                let _ = writeln!(out, "{}. {}", number, format_reference(reference));
            }
            out.push('\n');
        }

        for (heading, items) in [
            ("Suggested PDFs", &self.suggested_pdfs),
            ("Suggested Images", &self.suggested_images),
            ("Suggested Datasets", &self.suggested_datasets),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "## {}\n", heading);
            for item in items {
                let label = match &item.url {
                    Some(url) => format!("[{}]({})", item.title, url),
                    None => item.title.clone(),
                };
                match &item.description {
                    Some(desc) => {
                        let _ = writeln!(out, "- {}: {}", label, desc);
                    }
                    None => {
                        let _ = writeln!(out, "- {}", label);
                    }
                }
            }
            out.push('\n');
        }

        out.trim_end().to_string() + "\n"
    }
}

fn format_reference(reference: &Reference) -> String {
    let mut parts = Vec::new();
    if !reference.authors.is_empty() {
        parts.push(reference.authors.join(", "));
    }
    if let Some(year) = &reference.year {
        parts.push(format!("({})", year));
    }
    parts.push(match &reference.url {
        Some(url) => format!("[{}]({})", reference.title, url),
        None => reference.title.clone(),
    });
    if let Some(source) = &reference.source {
        parts.push(format!("*{}*", source));
    }
    parts.join(" ")
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(value_to_string)
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            Value::Object(_) => None,
        }
    }

    /// String, number, array of paragraphs, or null.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(value_to_string(Value::deserialize(d)?).unwrap_or_default())
    }

    /// Like [`string`], with blank values mapped to `None`.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(value_to_string(Value::deserialize(d)?)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// A number, or a string holding one (`"3"`, `"[3]"`).
    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .ok(),
            _ => None,
        })
    }

    /// An array of names or a single comma-free string.
    pub fn authors<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(value_to_string)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            other => value_to_string(other)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .into_iter()
                .collect(),
        })
    }

    /// A list, with `null` treated as empty.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_camel_case_wire_format() {
        let report = Report {
            title: "T".into(),
            suggested_pdfs: vec![SuggestedResource {
                title: "Paper".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("suggestedPdfs").is_some());
        assert!(json.get("suggestedImages").is_some());
        assert!(json.get("suggested_pdfs").is_none());
    }

    #[test]
    fn test_lenient_fields() {
        let report: Report = serde_json::from_value(serde_json::json!({
            "title": "Grid storage",
            "sections": [
                {"heading": "Intro", "content": ["Para one.", "Para two."]},
                {"title": null, "content": "Body"}
            ],
            "references": [
                {"id": "[2]", "title": "Lithium", "authors": "Jane Doe", "year": 2021, "link": "https://l.example"},
                {"title": "Sodium", "authors": ["A", " ", "B"], "year": null, "url": ""}
            ],
            "suggestedImages": null
        }))
        .unwrap();

        assert_eq!(report.sections[0].title, "Intro");
        assert_eq!(report.sections[0].content, "Para one.\n\nPara two.");
        assert_eq!(report.sections[1].title, "");
        assert_eq!(report.references[0].id, Some(2));
        assert_eq!(report.references[0].authors, vec!["Jane Doe".to_string()]);
        assert_eq!(report.references[0].year.as_deref(), Some("2021"));
        assert_eq!(report.references[0].url.as_deref(), Some("https://l.example"));
        assert_eq!(report.references[1].authors, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(report.references[1].url, None);
        assert!(report.suggested_images.is_empty());
        assert!(report.suggested_datasets.is_empty());
    }

    #[test]
    fn test_is_empty() {
        assert!(Report::default().is_empty());
        let titled = Report {
            title: "Only a title".into(),
            ..Default::default()
        };
        assert!(!titled.is_empty());
    }

    #[test]
    fn test_to_markdown() {
        let report = Report {
            title: "Solid-State Batteries".into(),
            sections: vec![Section::new("Overview", "Dense and safe.")],
            references: vec![Reference {
                title: "Review".into(),
                authors: vec!["Kim".into(), "Lee".into()],
                year: Some("2023".into()),
                url: Some("https://doi.example/1".into()),
                ..Default::default()
            }],
            suggested_datasets: vec![SuggestedResource {
                title: "Cycle data".into(),
                url: Some("https://data.example".into()),
                description: Some("Charge cycles".into()),
                source: None,
            }],
            ..Default::default()
        };
        let md = report.to_markdown();
        assert_eq!(
            md,
            "# Solid-State Batteries\n\n\
             ## Overview\n\nDense and safe.\n\n\
             ## References\n\n\
             1. Kim, Lee (2023) [Review](https://doi.example/1)\n\n\
             ## Suggested Datasets\n\n\
             - [Cycle data](https://data.example): Charge cycles\n"
        );
    }
}
