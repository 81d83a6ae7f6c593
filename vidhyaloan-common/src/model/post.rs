use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const TITLE_MIN_LEN: usize = 10;
pub const TITLE_MAX_LEN: usize = 200;
pub const POST_BODY_MIN_LEN: usize = 20;
pub const POST_BODY_MAX_LEN: usize = 10_000;
pub const MAX_TAGS: usize = 5;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// Crude link/markup detection shared by title and body validation.
/// Raw URLs and anything tag-shaped are rejected before a draft ever
/// reaches moderation.
fn contains_url_or_markup(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if ["http://", "https://", "www."]
        .iter()
        .any(|pattern| lowered.contains(pattern))
    {
        return true;
    }
    lowered.contains('<') && lowered.contains('>')
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Title(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidTitleError {
    #[error("The title must be at least {TITLE_MIN_LEN} characters")]
    TooShort,
    #[error("The title must be at most {TITLE_MAX_LEN} characters")]
    TooLong,
    #[error("The title may not contain links or markup")]
    ContainsUrlOrMarkup,
}

impl Title {
    pub fn new(title: String) -> Result<Self, InvalidTitleError> {
        let length = title.trim().chars().count();
        if length < TITLE_MIN_LEN {
            return Err(InvalidTitleError::TooShort);
        }
        if length > TITLE_MAX_LEN {
            return Err(InvalidTitleError::TooLong);
        }
        if contains_url_or_markup(&title) {
            return Err(InvalidTitleError::ContainsUrlOrMarkup);
        }
        Ok(Title(title))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Title {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Title::new(inner.clone()).map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"Title"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct PostBody(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostBodyError {
    #[error("The content must be at least {POST_BODY_MIN_LEN} characters")]
    TooShort,
    #[error("The content must be at most {POST_BODY_MAX_LEN} characters")]
    TooLong,
    #[error("The content may not contain links or markup")]
    ContainsUrlOrMarkup,
}

impl PostBody {
    pub fn new(content: String) -> Result<Self, InvalidPostBodyError> {
        let length = content.trim().chars().count();
        if length < POST_BODY_MIN_LEN {
            return Err(InvalidPostBodyError::TooShort);
        }
        if length > POST_BODY_MAX_LEN {
            return Err(InvalidPostBodyError::TooLong);
        }
        if contains_url_or_markup(&content) {
            return Err(InvalidPostBodyError::ContainsUrlOrMarkup);
        }
        Ok(PostBody(content))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for PostBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostBody::new(inner.clone())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"PostBody"))
    }
}

/// Fixed category set. Anything unrecognized normalizes to `General`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Loans,
    Universities,
    Visas,
    Scholarships,
    Mentorship,
}

impl Category {
    #[must_use]
    pub fn from_slug(slug: &str) -> Self {
        match slug {
            "loans" => Category::Loans,
            "universities" => Category::Universities,
            "visas" => Category::Visas,
            "scholarships" => Category::Scholarships,
            "mentorship" => Category::Mentorship,
            _ => Category::General,
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Loans => "loans",
            Category::Universities => "universities",
            Category::Visas => "visas",
            Category::Scholarships => "scholarships",
            Category::Mentorship => "mentorship",
        }
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let slug = String::deserialize(deserializer)?;
        Ok(Category::from_slug(&slug))
    }
}

/// Trimmed, lowercased, deduplicated, capped at [`MAX_TAGS`].
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        normalized.push(tag);
        if normalized.len() == MAX_TAGS {
            break;
        }
    }
    normalized
}

/// A validated draft, ready for the duplicate gate and the create call.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostDraft {
    pub title: Title,
    pub content: PostBody,
    pub category: Category,
    pub tags: Vec<String>,
}

impl PostDraft {
    #[must_use]
    pub fn new(title: Title, content: PostBody, category: Category, tags: Vec<String>) -> Self {
        Self {
            title,
            content,
            category,
            tags: normalize_tags(tags),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub title: Title,
    pub content: PostBody,
    pub category: Category,
    pub tags: Vec<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub view_count: u64,
    pub pinned: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostSummary {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub title: Title,
    pub category: Category,
    pub tags: Vec<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub pinned: bool,
}

#[cfg(test)]
mod tests {
    use crate::model::post::{
        Category, InvalidPostBodyError, InvalidTitleError, PostBody, Title, normalize_tags,
    };

    #[test]
    fn title_length_limits() {
        assert_eq!(
            Title::new("Too short".to_owned()),
            Err(InvalidTitleError::TooShort)
        );
        assert!(Title::new("How do I compare IDFC vs Auxilo for MS in USA?".to_owned()).is_ok());
        assert!(Title::new("x".repeat(201)).is_err());
    }

    #[test]
    fn title_rejects_links_and_markup() {
        assert_eq!(
            Title::new("Check out https://example.com today".to_owned()),
            Err(InvalidTitleError::ContainsUrlOrMarkup)
        );
        assert_eq!(
            Title::new("Visit www.example.com for loan offers".to_owned()),
            Err(InvalidTitleError::ContainsUrlOrMarkup)
        );
        assert_eq!(
            Title::new("Totally innocent <script>alert(1)</script>".to_owned()),
            Err(InvalidTitleError::ContainsUrlOrMarkup)
        );
        assert!(Title::new("Is 10 < 11 a valid comparison".to_owned()).is_ok());
    }

    #[test]
    fn body_length_limits() {
        assert_eq!(
            PostBody::new("Nineteen characters".to_owned()),
            Err(InvalidPostBodyError::TooShort)
        );
        assert!(
            PostBody::new(
                "I got admits from two universities and need to pick a lender. Budget is 40 lakhs."
                    .to_owned()
            )
            .is_ok()
        );
    }

    #[test]
    fn category_normalizes_unknown_slugs() {
        assert_eq!(Category::from_slug("loans"), Category::Loans);
        assert_eq!(Category::from_slug("mentorship"), Category::Mentorship);
        assert_eq!(Category::from_slug("cooking"), Category::General);
        assert_eq!(Category::from_slug(""), Category::General);

        let parsed: Category = serde_json::from_str("\"horoscopes\"").unwrap();
        assert_eq!(parsed, Category::General);
        assert_eq!(serde_json::to_string(&Category::Visas).unwrap(), "\"visas\"");
    }

    #[test]
    fn tag_normalization() {
        let tags = vec![
            " Education-Loan ".to_owned(),
            "education-loan".to_owned(),
            String::new(),
            "USA".to_owned(),
            "visa".to_owned(),
            "gre".to_owned(),
            "ielts".to_owned(),
            "overflow".to_owned(),
        ];
        assert_eq!(
            normalize_tags(tags),
            vec!["education-loan", "usa", "visa", "gre", "ielts"]
        );
    }
}
