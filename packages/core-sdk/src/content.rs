use std::{collections::BTreeMap, path::Path};

use once_cell::sync::Lazy;
use serde::Serialize;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::{
    error::GenerationError,
    models::{DocumentType, DocumentTypeSetting},
};

pub const DOCUMENT_TYPES: &[DocumentType] = &[
    DocumentType {
        id: "how-to",
        name: "How-to",
    },
    DocumentType {
        id: "concept",
        name: "Concept",
    },
];

pub const MARKDOWN_STYLE_GUIDE_CONTENT: &str = r#"
# Markdown Styling Rules

## General
- Use ATX-style headers (e.g., `# Header 1`, `## Header 2`).
- Use hyphens (`-`) for unordered lists.
- Use numbered lists for sequential items (e.g., `1. First item`).
- Emphasize text with asterisks for italics (`*italic*`) or bold (`**bold**`).
- Use backticks for inline code: `inline code`.
- Use triple backticks for code blocks, specifying the language:
  ```javascript
  console.log('Hello');
  ```
- Links should be formatted as `[Link text](URL)`.
- Images should be formatted as `![Alt text](URL)`.

## Specifics
- Maximum line length: 100 characters (where applicable, for readability).
- Ensure lists have a blank line before and after, unless they are nested.
- Code blocks should be concise and relevant.
- Avoid trailing whitespace.
- Use consistent heading levels.
"#;

pub const GENERAL_WRITING_STYLE_GUIDE_CONTENT: &str = r#"
# General Writing Style Guide

## Tone and Voice
- **Target Audience**: Software Developers.
- **Tone**: Professional, clear, concise, and helpful.
- **Voice**: Active voice is preferred over passive voice.
- **Terminology**: Use industry-standard terminology consistently. Define acronyms on first use.

## Content
- **Clarity**: Explain complex concepts simply. Avoid jargon where possible, or explain it if necessary.
- **Accuracy**: Ensure all technical information is correct and up-to-date.
- **Completeness**: Provide all necessary information for the user to achieve their goal.
- **Examples**: Use practical, runnable code examples where appropriate.

## Formatting
- Break down long topics into smaller, digestible sections.
- Use bullet points and numbered lists to improve readability.
- Ensure a logical flow of information.
"#;

const HOW_TO_TEMPLATE: &str = r#"
# How-to: {{TITLE}}

## Introduction
Briefly describe what this guide will help the user accomplish.

## Prerequisites
- List any necessary software, tools, or prior knowledge.

## Steps

1.  **Step 1**: Detailed explanation.
    ```
    // Optional code example for step 1
    ```
2.  **Step 2**: Detailed explanation.
    ```
    // Optional code example for step 2
    ```
...

## Conclusion
Summarize what was achieved.

## Next Steps
Suggest related guides or further reading.
"#;

const CONCEPT_TEMPLATE: &str = r#"
# Concept: {{CONCEPT_NAME}}

## Overview
Provide a high-level summary of the concept. What is it? Why is it important?

## Key Ideas
- **Idea 1**: Explanation.
- **Idea 2**: Explanation.
  - Sub-idea: Details.

## How it Works
Explain the mechanics or architecture of the concept. Diagrams or pseudo-code might be useful here (describe them in text for the LLM to potentially format as Markdown).

## Benefits
- Benefit 1
- Benefit 2

## Use Cases
- When to use this concept.
- Examples of scenarios where it's applicable.

## Related Concepts
- Link to other relevant concepts or documentation.
"#;

static DEFAULT_SETTINGS: Lazy<BTreeMap<&'static str, DocumentTypeSetting>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    map.insert(
        "how-to",
        DocumentTypeSetting {
            template: HOW_TO_TEMPLATE.to_string(),
            description: "A step-by-step guide that helps developers complete a specific task. Focus on clear instructions and actionable steps.".to_string(),
        },
    );
    map.insert(
        "concept",
        DocumentTypeSetting {
            template: CONCEPT_TEMPLATE.to_string(),
            description: "An explanation of a key concept, technology, or architecture. Aim for clarity and understanding of its purpose and mechanics.".to_string(),
        },
    );
    map
});

pub fn document_types() -> &'static [DocumentType] {
    DOCUMENT_TYPES
}

pub fn find_document_type(id: &str) -> Option<&'static DocumentType> {
    DOCUMENT_TYPES.iter().find(|dt| dt.id == id)
}

pub fn default_template(id: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(id).map(|s| s.template.as_str())
}

pub fn default_description(id: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(id).map(|s| s.description.as_str())
}

pub fn markdown_style_guide() -> &'static str {
    MARKDOWN_STYLE_GUIDE_CONTENT
}

pub fn general_writing_style_guide() -> &'static str {
    GENERAL_WRITING_STYLE_GUIDE_CONTENT
}

/**
 * \brief Editable guides and per-document-type settings for one session.
 *
 * Seeded from the built-in constants; nothing is written to disk.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub markdown_style_guide: String,
    pub general_writing_style_guide: String,
    pub document_types: BTreeMap<String, DocumentTypeSetting>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let document_types = DOCUMENT_TYPES
            .iter()
            .map(|dt| {
                let setting = DocumentTypeSetting {
                    template: default_template(dt.id).unwrap_or_default().to_string(),
                    description: default_description(dt.id).unwrap_or_default().to_string(),
                };
                (dt.id.to_string(), setting)
            })
            .collect();
        Self {
            markdown_style_guide: markdown_style_guide().to_string(),
            general_writing_style_guide: general_writing_style_guide().to_string(),
            document_types,
        }
    }

    pub fn setting(&self, doc_type_id: &str) -> Option<&DocumentTypeSetting> {
        self.document_types.get(doc_type_id)
    }

    pub fn set_template(
        &mut self,
        doc_type_id: &str,
        template: impl Into<String>,
    ) -> Result<(), GenerationError> {
        self.setting_mut(doc_type_id)?.template = template.into();
        Ok(())
    }

    pub fn set_description(
        &mut self,
        doc_type_id: &str,
        description: impl Into<String>,
    ) -> Result<(), GenerationError> {
        self.setting_mut(doc_type_id)?.description = description.into();
        Ok(())
    }

    pub fn set_markdown_style_guide(&mut self, guide: impl Into<String>) {
        self.markdown_style_guide = guide.into();
    }

    pub fn set_general_writing_style_guide(&mut self, guide: impl Into<String>) {
        self.general_writing_style_guide = guide.into();
    }

    /**
     * \brief Restore every guide and setting to the built-in defaults.
     */
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /**
     * \brief Replace the style guides with file contents. `None` keeps the
     * current guide.
     */
    pub fn load_style_guides(
        &mut self,
        markdown_path: Option<&Path>,
        general_path: Option<&Path>,
    ) -> Result<(), GenerationError> {
        let markdown = markdown_path.map(read_text).transpose()?;
        let general = general_path.map(read_text).transpose()?;
        if let Some(guide) = markdown {
            self.markdown_style_guide = guide;
        }
        if let Some(guide) = general {
            self.general_writing_style_guide = guide;
        }
        Ok(())
    }

    /**
     * \brief Replace a document type's template and/or description with file
     * contents. The type must exist even when both paths are `None`.
     */
    pub fn load_document_type_files(
        &mut self,
        doc_type_id: &str,
        template_path: Option<&Path>,
        description_path: Option<&Path>,
    ) -> Result<(), GenerationError> {
        self.setting_mut(doc_type_id)?;
        let template = template_path.map(read_text).transpose()?;
        let description = description_path.map(read_text).transpose()?;
        if let Some(template) = template {
            self.set_template(doc_type_id, template)?;
        }
        if let Some(description) = description {
            self.set_description(doc_type_id, description)?;
        }
        Ok(())
    }

    fn setting_mut(&mut self, doc_type_id: &str) -> Result<&mut DocumentTypeSetting, GenerationError> {
        self.document_types
            .get_mut(doc_type_id)
            .ok_or_else(|| GenerationError::UnknownDocumentType(doc_type_id.to_string()))
    }
}

fn read_text(path: &Path) -> Result<String, GenerationError> {
    std::fs::read_to_string(path).map_err(|source| GenerationError::Io {
        path: path.display().to_string(),
        source,
    })
}

/**
 * \brief File name offered when saving a generated document, e.g.
 * `how-to-2026-10-19.md`.
 */
pub fn download_file_name(doc_type_name: Option<&str>, date: Date) -> String {
    let name = doc_type_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("document")
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let day = date
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default();
    format!("{}-{}.md", name, day)
}

pub fn download_file_name_today(doc_type_name: Option<&str>) -> String {
    download_file_name(doc_type_name, OffsetDateTime::now_utc().date())
}
