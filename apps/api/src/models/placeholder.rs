use serde::{Deserialize, Serialize};

/// Semantic type of a placeholder. Drives keyword matching in the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Date,
    Currency,
    PersonName,
    CompanyName,
    Address,
    Email,
    Phone,
    Number,
    #[default]
    #[serde(other)]
    Text,
}

impl FieldType {
    /// Keywords in a user utterance that hint at a value of this type.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            FieldType::Currency => &[
                "dollar", "amount", "$", "cost", "price", "fee", "payment", "paid", "invest",
            ],
            FieldType::Date => &[
                "date", "when", "day", "month", "year", "january", "february", "march", "april",
                "june", "july", "august", "september", "october", "november", "december",
            ],
            FieldType::PersonName => &["name", "person", "mr", "ms", "founder", "investor"],
            FieldType::CompanyName => &[
                "company", "corp", "inc", "ltd", "llc", "organization", "business", "group",
            ],
            FieldType::Address => &[
                "address", "street", "city", "state", "zip", "road", "ave", "blvd",
            ],
            FieldType::Email => &["email", "@", ".com", ".org", ".net"],
            FieldType::Phone => &["phone", "call", "cell", "mobile"],
            FieldType::Number => &["number", "count", "quantity", "shares"],
            FieldType::Text => &["title", "ceo", "partner", "director", "officer"],
        }
    }

    /// Guesses the type from the placeholder's own name.
    pub fn infer(name: &str) -> Self {
        let lower = name.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(&["email", "e-mail"]) {
            FieldType::Email
        } else if has(&["phone", "fax", "mobile"]) {
            FieldType::Phone
        } else if has(&["date", "day", "year"]) {
            FieldType::Date
        } else if has(&["amount", "price", "fee", "cost", "salary", "$", "valuation", "cap"]) {
            FieldType::Currency
        } else if has(&["address", "street", "city"]) {
            FieldType::Address
        } else if has(&["company", "corporation", "entity", "employer"]) {
            FieldType::CompanyName
        } else if has(&["name", "investor", "founder", "signatory"]) {
            FieldType::PersonName
        } else if has(&["number", "quantity", "shares", "count"]) {
            FieldType::Number
        } else {
            FieldType::Text
        }
    }
}

/// A named blank in the uploaded document (`[Company Name]` -> `Company Name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub filled: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inferred_name: Option<String>,
    /// 0.0 – 1.0
    #[serde(default)]
    pub inference_confidence: Option<f32>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Placeholder {
    pub fn new(name: impl Into<String>, context: impl Into<String>) -> Self {
        let name = name.into();
        let field_type = FieldType::infer(&name);
        let description = Some(format!("Please provide: {}", name.to_lowercase()));
        Self {
            name,
            context: context.into(),
            before: None,
            after: None,
            filled: false,
            value: None,
            field_type,
            description,
            inferred_name: None,
            inference_confidence: None,
            reasoning: None,
        }
    }

    /// Commits a value. Empty values are rejected so `filled` always implies a value.
    pub fn fill(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        self.value = Some(value.to_string());
        self.filled = true;
        true
    }

    pub fn is_filled(&self) -> bool {
        self.filled && self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Looks a placeholder up by name. An exact match wins; a case-insensitive
/// match is accepted only when exactly one placeholder matches that way, so
/// `[Name]` and `[NAME]` stay distinct.
pub fn position_by_name<'a, I>(names: I, name: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let name = name.trim();
    let names: Vec<&str> = names.into_iter().collect();
    if let Some(index) = names.iter().position(|n| *n == name) {
        return Some(index);
    }
    let mut folded = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(index, _)| index);
    match (folded.next(), folded.next()) {
        (Some(index), None) => Some(index),
        _ => None,
    }
}

/// `filled/total` summary used by the status endpoint and logs.
pub fn progress(placeholders: &[Placeholder]) -> (usize, usize) {
    let filled = placeholders.iter().filter(|p| p.is_filled()).count();
    (filled, placeholders.len())
}

/// True when there is at least one placeholder and every placeholder is filled.
pub fn is_complete(placeholders: &[Placeholder]) -> bool {
    !placeholders.is_empty() && placeholders.iter().all(Placeholder::is_filled)
}
