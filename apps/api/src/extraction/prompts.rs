// Prompt constants for placeholder enrichment.

/// System prompt for placeholder analysis. Enforces JSON-only output.
pub const DESCRIBE_SYSTEM: &str = "You are a legal document expert. \
    You analyze [bracketed placeholders] in contracts and forms and explain what belongs in each. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Placeholder analysis prompt. Replace `{exact_names_instruction}`, `{names_json}`
/// and `{document_text}` before sending.
pub const DESCRIBE_PROMPT_TEMPLATE: &str = r#"{exact_names_instruction}

PLACEHOLDERS (in document order):
{names_json}

Return a JSON object with this EXACT schema:
{
  "placeholders": [
    {
      "name": "Company Name",
      "type": "company_name",
      "description": "Legal name of the company issuing the shares",
      "inferred_name": "Issuer Legal Name",
      "inference_confidence": 0.9,
      "reasoning": "Appears after 'issued by' in the opening paragraph"
    }
  ]
}

RULES:
1. One entry per placeholder listed above, using the exact name
2. "type" is one of: text, date, currency, person_name, company_name, address, email, phone, number
3. "description" tells a non-lawyer what to provide, in one sentence
4. "inferred_name" is your best semantic name for the field; null if the name is already clear
5. "inference_confidence" is between 0 and 1

DOCUMENT TEXT:
{document_text}"#;
