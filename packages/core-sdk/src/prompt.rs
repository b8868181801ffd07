use crate::content::{self, Session};

/**
 * \brief Inputs embedded into the instruction prompt.
 */
#[derive(Debug, Clone, Copy)]
pub struct PromptParts<'a> {
    pub doc_type_name: &'a str,
    pub template: &'a str,
    pub description: &'a str,
    pub draft: &'a str,
    pub instructions: &'a str,
    pub markdown_style_guide: &'a str,
    pub general_writing_style_guide: &'a str,
}

/**
 * \brief Lay the inputs out in the fixed instructional format.
 *
 * Sections appear in this order: template, description, draft, additional
 * instructions, Markdown rules, writing style guide.
 */
pub fn compose_prompt(parts: &PromptParts<'_>) -> String {
    let name = parts.doc_type_name;
    let instructions = if parts.instructions.trim().is_empty() {
        "None given."
    } else {
        parts.instructions
    };

    format!(
        r#"
You are an expert technical writer. Your task is to create and edit usage documentation for a developer audience.

Write a complete, polished technical document in Markdown format based on the provided draft and implementing the style and format guidance.

**Key instructions:**

1.  **Adhere strictly to Markdown styling:** Follow all rules in the "MARKDOWN STYLING RULES" section below.
2.  **Follow writing style:** Adhere to the "GENERAL WRITING STYLE GUIDE" provided.
3.  **Implement document template:** Structure the document as specified in "DOCUMENT STRUCTURE TEMPLATE" for the type: "{name}".
4.  **Incorporate draft:** Integrate the "USER'S DRAFT CONTENT" into the new document as specified by the template.
5.  **Apply additional instructions:** Consider any "USER'S ADDITIONAL INSTRUCTIONS". If additional instructions were given, apply its guidance even if it conflicts with the template or other guidance.
6.  **Fill placeholders:** Replace placeholders like `{{{{TITLE}}}}`, `{{{{CONCEPT_NAME}}}}`, etc., in the template with relevant information derived from the user's draft or instructions. If information is missing, make reasonable inferences or state that information is needed.
7.  **Output format:** The entire output MUST be in valid Markdown. Do not include any conversational text before or after the Markdown document, nor enclose the output in ```markdown``` tags.

---
**DOCUMENT STRUCTURE TEMPLATE: {name}**
```markdown
{template}
```
---
**DOCUMENT TYPE DESCRIPTION: {name}**
{description}
---
**USER'S DRAFT CONTENT:**
```
{draft}
```
---
**USER'S ADDITIONAL INSTRUCTIONS (if any):**
{instructions}
---
**MARKDOWN STYLING RULES:**
{markdown}
---
**GENERAL WRITING STYLE GUIDE:**
{general}
---

Now, generate the complete Markdown document based on the above information.
"#,
        name = name,
        template = parts.template,
        description = parts.description,
        draft = parts.draft,
        instructions = instructions,
        markdown = parts.markdown_style_guide,
        general = parts.general_writing_style_guide,
    )
}

/**
 * \brief Build the prompt for the selected document type from the session.
 *
 * Returns `None` when no document type is selected or the id is unknown;
 * callers must report that instead of dispatching.
 */
pub fn build_prompt(
    session: &Session,
    doc_type_id: Option<&str>,
    draft: &str,
    instructions: &str,
) -> Option<String> {
    let doc_type = content::find_document_type(doc_type_id?.trim())?;
    let setting = session.setting(doc_type.id)?;
    Some(compose_prompt(&PromptParts {
        doc_type_name: doc_type.name,
        template: &setting.template,
        description: &setting.description,
        draft,
        instructions,
        markdown_style_guide: &session.markdown_style_guide,
        general_writing_style_guide: &session.general_writing_style_guide,
    }))
}
