//! Prompt templates for each extraction task.

use std::fmt;
use std::str::FromStr;

use super::ExtractError;
use crate::location::NO_LOCATIONS_SENTINEL;

/// The closed set of extraction tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    EventType,
    Entities,
    Names,
    Locations,
    PhoneNumbers,
}

impl PromptKind {
    pub const ALL: [PromptKind; 5] = [
        PromptKind::EventType,
        PromptKind::Entities,
        PromptKind::Names,
        PromptKind::Locations,
        PromptKind::PhoneNumbers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventType => "event_type",
            Self::Entities => "entities",
            Self::Names => "names",
            Self::Locations => "locations",
            Self::PhoneNumbers => "phone_numbers",
        }
    }

    /// Everything except location extraction runs on the llama model.
    pub fn uses_llama_model(self) -> bool {
        !matches!(self, Self::Locations)
    }

    pub fn render(self, text: &str) -> String {
        match self {
            Self::EventType => event_type_prompt(text),
            Self::Entities => entities_prompt(text),
            Self::Names => names_prompt(text),
            Self::Locations => event_location_prompt(text),
            Self::PhoneNumbers => phone_number_prompt(text),
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "event_type" => Ok(Self::EventType),
            "entities" => Ok(Self::Entities),
            "names" => Ok(Self::Names),
            "locations" => Ok(Self::Locations),
            "phone_numbers" => Ok(Self::PhoneNumbers),
            _ => Err(ExtractError::UnknownPromptKind(s.to_string())),
        }
    }
}

pub fn event_type_prompt(text: &str) -> String {
    format!(
        r#"You are a Risk Analyst expert in identifying and listing the event types mentioned in the provided article.

Article:
"{text}"

Instructions:
- Read the article carefully.
- Identify and list the relevant event types, focusing solely on the information provided in the article.

Task:
Event Type: Identify and list the standard event types mentioned in the article. Focus on broad, generic classifications and exclude specific event titles or descriptions. Use commas to separate multiple event types.

Example:
Event Type: Earthquake, Child Labour, Deaths, Access to Water, Land Rights

Note:
- Do not include any non-relevant details or additional commentary.
- Keep the response concise and limited to the task.

Answer:
"#
    )
}

pub fn entities_prompt(text: &str) -> String {
    format!(
        r#"You are a Risk Analyst expert in identifying and listing the entities (companies and organizations) mentioned in the provided article.

Article:
"{text}"

Task:
Entities: List all companies and organizations mentioned in the article, including for-profit companies, non-profit organizations, government agencies, international bodies, educational institutions, research institutes and industry associations.

Guidelines:
- Separate multiple entities with commas.
- Use the full, official name of each entity.
- If an acronym is used, give the full name followed by the acronym in parentheses.
- Do not include countries, cities, or other geographical entities unless they are part of an organization's name.
- List each entity once.

Example:
Entities: Apple Inc., World Health Organization (WHO), U.S. Department of Energy, Harvard University

Answer:
"#
    )
}

pub fn names_prompt(text: &str) -> String {
    format!(
        r#"You are a Risk Analyst expert in identifying and listing the persons named in the provided article.

Article:
"{text}"

Task:
Entities: List the names of all persons mentioned in the article, separated by commas.

Example:
Entities: Jane Doe, John Smith, Maria Garcia

Note:
- Provide only the requested information without commentary.

Answer:
"#
    )
}

pub fn event_location_prompt(text: &str) -> String {
    format!(
        r#"You are an expert in extracting geographical event locations from articles. Analyze the following text and extract locations:

Article:
{text}

Instructions:
1. Extract only geographical locations mentioned in the context of the event.
2. Include primary event locations and other affected locations.
3. List cities, countries, states, and regions as applicable.
4. Exclude organizations and company names.
5. Do not add any information not explicitly stated in the article.

Output Format:
Event Locations: [City1, Country1; City2, State2, Country2; Region3; Country4]

Rules:
- Separate different locations with semicolons (;)
- Within one location, separate city, state and country with commas (,)
- List only unique locations
- Do not include any explanations
- If no locations are mentioned, respond with "{NO_LOCATIONS_SENTINEL}"

Example Output:
Event Locations: [New York City, USA; Paris, France; Tokyo, Japan; California, USA; Middle East]

Your Response:
"#
    )
}

pub fn phone_number_prompt(text: &str) -> String {
    format!(
        r#"You are a data extraction expert specializing in identifying and listing phone numbers from the provided text.

Text:
"{text}"

Task:
Phone Numbers: List all phone numbers found in the text, including country codes, separated by commas.

Example:
Phone Numbers: (123) 456-7890, +1 234 567 8901, 987-654-3210

Answer:
"#
    )
}
