use std::collections::BTreeMap;

use askama::{Error as AskamaError, Template};
use gazette_api_types::{ReportData, ReportSection};
use serde_json::Value;
use thiserror::Error;

use crate::domain::reports::ReportTemplate;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }

    pub fn origin(&self) -> &'static str {
        self.source
    }
}

pub fn render_template<T: Template>(template: T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
    })
}

#[derive(Clone)]
pub struct SectionView {
    pub anchor: String,
    pub heading: String,
    pub body: String,
}

#[derive(Clone)]
pub struct DetailView {
    pub label: String,
    pub value: String,
}

/// Everything a report template can show.
#[derive(Clone)]
pub struct ReportView {
    pub title: String,
    pub created_at: String,
    pub tags: Vec<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub sections: Vec<SectionView>,
    pub details: Vec<DetailView>,
}

impl ReportView {
    /// Overlay the request payload with the fixed report fields.
    pub fn new(title: &str, created_at: &str, tags: &[String], data: &ReportData) -> Self {
        Self {
            title: title.to_string(),
            created_at: created_at.to_string(),
            tags: tags.to_vec(),
            subtitle: non_blank(data.subtitle.as_deref()),
            summary: non_blank(data.summary.as_deref()),
            sections: section_views(&data.sections),
            details: detail_views(&data.extra),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn section_views(sections: &[ReportSection]) -> Vec<SectionView> {
    sections
        .iter()
        .enumerate()
        .map(|(index, section)| SectionView {
            anchor: format!("section-{}", index + 1),
            heading: section.heading.clone(),
            body: section.body.clone(),
        })
        .collect()
}

// The fixed fields win over payload keys of the same name.
const RESERVED_KEYS: [&str; 3] = ["title", "created_at", "tags"];

fn detail_views(extra: &BTreeMap<String, Value>) -> Vec<DetailView> {
    extra
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| DetailView {
            label: key.replace('_', " "),
            value: match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        })
        .collect()
}

#[derive(Template)]
#[template(path = "report_v1.html")]
pub struct ReportV1Template {
    pub view: ReportView,
}

#[derive(Template)]
#[template(path = "report_v1_sections.html")]
pub struct ReportV1SectionsTemplate {
    pub view: ReportView,
}

/// Render `view` with the requested report template.
pub fn render_report(template: ReportTemplate, view: ReportView) -> Result<String, TemplateRenderError> {
    match template {
        ReportTemplate::ReportV1 => render_template(ReportV1Template { view }),
        ReportTemplate::ReportV1Sections => render_template(ReportV1SectionsTemplate { view }),
    }
}

#[derive(Clone)]
pub struct ArchiveItemView {
    pub href: String,
    pub title: String,
    pub date_badge: Option<String>,
}

#[derive(Template)]
#[template(path = "archive_index.html")]
pub struct ArchiveIndexTemplate {
    pub title: String,
    pub items: Vec<ArchiveItemView>,
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> ReportData {
        let mut data = ReportData {
            subtitle: Some("Generated automatically".to_string()),
            sections: vec![
                ReportSection {
                    heading: "Goal".to_string(),
                    body: "Refresh the index daily.".to_string(),
                },
                ReportSection {
                    heading: "Status".to_string(),
                    body: "<b>scheduled</b>".to_string(),
                },
            ],
            ..ReportData::default()
        };
        data.extra
            .insert("owner_team".to_string(), Value::from("thermal"));
        data.extra.insert("title".to_string(), Value::from("ignored"));
        data
    }

    #[test]
    fn view_overlays_fixed_fields_on_payload() {
        let view = ReportView::new("Fan curves", "2024-05-01", &[], &sample_data());

        assert_eq!(view.title, "Fan curves");
        assert_eq!(view.sections[1].anchor, "section-2");
        assert_eq!(view.details.len(), 1);
        assert_eq!(view.details[0].label, "owner team");
        assert_eq!(view.details[0].value, "thermal");
    }

    #[test]
    fn sections_template_renders_headings_and_escapes_bodies() {
        let view = ReportView::new(
            "Fan curves",
            "2024-05-01",
            &["acoustics".to_string()],
            &sample_data(),
        );
        let html = render_report(ReportTemplate::ReportV1Sections, view).expect("render");

        assert!(html.contains("Fan curves"));
        assert!(html.contains("id=\"section-1\""));
        assert!(html.contains("Goal"));
        assert!(html.contains("acoustics"));
        assert!(html.contains("&#60;b&#62;scheduled&#60;/b&#62;"));
        assert!(!html.contains("<b>scheduled</b>"));
    }

    #[test]
    fn plain_template_shows_subtitle_and_details() {
        let view = ReportView::new("Fan curves", "2024-05-01", &[], &sample_data());
        let html = render_report(ReportTemplate::ReportV1, view).expect("render");

        assert!(html.contains("Generated automatically"));
        assert!(html.contains("owner team"));
        assert!(html.contains("2024-05-01"));
    }
}
