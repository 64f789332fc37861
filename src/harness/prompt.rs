use crate::models::{CaseDocument, GenerateDocumentRequest, LegalCase};

pub fn intake_prompt(description: &str, document_contents: &[String]) -> String {
    let documents_clause = if document_contents.is_empty() {
        ""
    } else {
        " and the content of the provided documents"
    };
    let documents_context = if document_contents.is_empty() {
        String::new()
    } else {
        format!(
            "Content from Uploaded Documents:\n---\n{}\n---\n\n",
            document_contents.join("\n\n---\n\n")
        )
    };

    format!(
        "You are an expert legal AI assistant specializing in case intake and analysis. \
         Based on the user's description{documents_clause}, analyze the information and \
         structure it into a new legal case.\n\n\
         User's Description:\n---\n{description}\n---\n\n\
         {documents_context}\
         Your task is to analyze all this information and generate a structured JSON object \
         for the new legal case."
    )
}

pub fn chat_prompt(case: &LegalCase, documents: &[CaseDocument], user_text: &str) -> String {
    let document_context = documents
        .iter()
        .map(|document| {
            let content = if document.extracted_content.is_empty() {
                "Content not extracted"
            } else {
                document.extracted_content.as_str()
            };
            format!("Document: {}\nContent: {}", document.title, content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a versatile and professional legal AI assistant.\n\n\
         CASE INFORMATION:\n\
         Title: {title}\n\
         Type: {case_type}\n\
         Description: {description}\n\
         Jurisdiction: {jurisdiction}\n\n\
         Documents:\n{document_context}\n\n\
         User's question: {user_text}",
        title = case.title,
        case_type = case.case_type.as_str(),
        description = case.description.as_deref().unwrap_or(""),
        jurisdiction = case.jurisdiction.as_deref().unwrap_or(""),
    )
}

pub fn generator_prompt(request: &GenerateDocumentRequest) -> String {
    let document_type = request.document_type;
    format!(
        "You are a professional legal document drafting AI. Please draft a comprehensive \
         {label} with the following specifications: \n\n\
         Document Type: {label}\n\
         Description: {description}\n\
         Parties Involved: {parties}\n\
         Jurisdiction: {jurisdiction}\n\
         Details and Requirements: {details}\n\
         Special Requirements: {special_requirements}\n\n\
         Please create a professional, legally sound document that includes proper formatting \
         and placeholders.",
        label = document_type.label(),
        description = document_type.description(),
        parties = non_empty_or(request.parties.as_deref(), "Not specified"),
        jurisdiction = non_empty_or(request.jurisdiction.as_deref(), "Not specified"),
        details = request.details,
        special_requirements = non_empty_or(request.special_requirements.as_deref(), "None"),
    )
}

fn non_empty_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => fallback,
    }
}
