//! Request payloads and their validation rules.
//!
//! Field length limits mirror the schema. Validation collects every
//! failing field into a [`FormErrors`] map so one round-trip surfaces
//! all problems at once, and returns a cleaned value on success.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

pub const DEFAULT_ARTICLE_AUTHOR: &str = "Unknown";
pub const DEFAULT_COMMENT_AUTHOR: &str = "anonymous";

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Default, Clone)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
        self.fields
    }
}

/// Accepts JSON booleans as well as the strings an HTML checkbox or
/// query string submits (`on`, `true`, `1`, `yes`).
fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Str(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Str(s) => Ok(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "on" | "true" | "1" | "yes"
        )),
    }
}

/// Split a free-text tag field into tag names: comma-separated, trimmed,
/// empties dropped, duplicates collapsed (first occurrence wins).
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if !seen.iter().any(|t| t == token) {
            seen.push(token.to_string());
        }
    }
    seen
}

// ============ Article form ============

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Free-text comma-separated tag names.
    #[serde(default)]
    pub tag: String,
}

/// A validated article payload ready for storage.
#[derive(Debug, Clone)]
pub struct ValidArticle {
    pub title: String,
    pub body: String,
    pub author: String,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
}

impl ArticleForm {
    pub fn validate(&self) -> Result<ValidArticle, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        } else if title.chars().count() > 200 {
            errors.add("title", "Ensure this value has at most 200 characters.");
        }

        let body = self.body.trim();
        if body.is_empty() {
            errors.add("body", "This field is required.");
        } else if body.chars().count() > 3000 {
            errors.add("body", "Ensure this value has at most 3000 characters.");
        }

        let author = match self.author.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_ARTICLE_AUTHOR.to_string(),
            Some(a) => {
                if a.chars().count() > 40 {
                    errors.add("author", "Ensure this value has at most 40 characters.");
                }
                a.to_string()
            }
        };

        if self.tag.chars().count() > 100 {
            errors.add("tag", "Ensure this value has at most 100 characters.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidArticle {
            title: title.to_string(),
            body: body.to_string(),
            author,
            category_id: self.category_id,
            tags: split_tags(&self.tag),
        })
    }
}

// ============ Comment forms ============

/// Comment payload for the nested route (article id comes from the path).
#[derive(Debug, Clone, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// Comment payload for the standalone route: the form itself names the
/// article, and only active articles are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct StandaloneCommentForm {
    pub article_id: i64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidComment {
    pub body: String,
    pub author: String,
}

fn validate_comment_fields(body: &str, author: Option<&str>) -> Result<ValidComment, FormErrors> {
    let mut errors = FormErrors::default();

    let body = body.trim();
    if body.is_empty() {
        errors.add("body", "This field is required.");
    } else if body.chars().count() > 400 {
        errors.add("body", "Ensure this value has at most 400 characters.");
    }

    let author = match author.map(str::trim) {
        None | Some("") => DEFAULT_COMMENT_AUTHOR.to_string(),
        Some(a) => {
            if a.chars().count() > 40 {
                errors.add("author", "Ensure this value has at most 40 characters.");
            }
            a.to_string()
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidComment {
        body: body.to_string(),
        author,
    })
}

impl CommentForm {
    pub fn validate(&self) -> Result<ValidComment, FormErrors> {
        validate_comment_fields(&self.body, self.author.as_deref())
    }
}

impl StandaloneCommentForm {
    pub fn validate(&self) -> Result<ValidComment, FormErrors> {
        validate_comment_fields(&self.body, self.author.as_deref())
    }
}

// ============ Category form ============

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "This field is required.");
        } else if name.chars().count() > 20 {
            errors.add("name", "Ensure this value has at most 20 characters.");
        }
        if errors.is_empty() {
            Ok(name.to_string())
        } else {
            Err(errors)
        }
    }
}

// ============ Search forms ============

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleSearchForm {
    #[serde(default)]
    pub search: String,
}

impl SimpleSearchForm {
    /// Blank terms disable the filter instead of matching everything.
    pub fn term(&self) -> Option<&str> {
        let term = self.search.trim();
        if term.is_empty() || term.chars().count() > 100 {
            None
        } else {
            Some(term)
        }
    }
}

/// The advanced search form: a text term with four destination
/// checkboxes, and an author term with two.
#[derive(Debug, Clone, Deserialize)]
pub struct FullSearchForm {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub in_title: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub in_text: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub in_tags: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub in_comment_text: bool,
    #[serde(default)]
    pub author: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub author_in_articles: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub author_in_comments: bool,
}

/// Cleaned advanced-search terms. A `None` term means that whole group
/// contributes no constraint.
#[derive(Debug, Clone)]
pub struct SearchTerms {
    pub text: Option<String>,
    pub in_title: bool,
    pub in_text: bool,
    pub in_tags: bool,
    pub in_comment_text: bool,
    pub author: Option<String>,
    pub author_in_articles: bool,
    pub author_in_comments: bool,
}

impl FullSearchForm {
    /// A filled field without a destination is unanswerable, and an
    /// entirely blank form would match everything; both are rejected.
    pub fn validate(&self) -> Result<SearchTerms, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.trim();
        let author = self.author.trim();

        if text.chars().count() > 100 {
            errors.add("text", "Ensure this value has at most 100 characters.");
        }
        if author.chars().count() > 100 {
            errors.add("author", "Ensure this value has at most 100 characters.");
        }

        if text.is_empty() && author.is_empty() {
            errors.add("__all__", "Text or author should be filled.");
        } else {
            if !text.is_empty()
                && !(self.in_title || self.in_text || self.in_tags || self.in_comment_text)
            {
                errors.add(
                    "__all__",
                    "One of the checkboxes: In Title, In Text, In Tags, In Comment text should be checked.",
                );
            }
            if !author.is_empty() && !(self.author_in_articles || self.author_in_comments) {
                errors.add(
                    "__all__",
                    "One of the checkboxes: In Articles, In Comments should be checked.",
                );
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(SearchTerms {
            text: (!text.is_empty()).then(|| text.to_string()),
            in_title: self.in_title,
            in_text: self.in_text,
            in_tags: self.in_tags,
            in_comment_text: self.in_comment_text,
            author: (!author.is_empty()).then(|| author.to_string()),
            author_in_articles: self.author_in_articles,
            author_in_comments: self.author_in_comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags_trims_and_drops_empties() {
        assert_eq!(split_tags("rust, web ,, sqlite ,"), ["rust", "web", "sqlite"]);
        assert_eq!(split_tags(""), Vec::<String>::new());
        assert_eq!(split_tags(" , ,"), Vec::<String>::new());
    }

    #[test]
    fn test_split_tags_collapses_duplicates() {
        assert_eq!(split_tags("rust,rust, rust"), ["rust"]);
        // Case differs: these are distinct names at write time.
        assert_eq!(split_tags("Rust,rust"), ["Rust", "rust"]);
    }

    #[test]
    fn test_article_form_defaults_author() {
        let form = ArticleForm {
            title: "Hello".into(),
            body: "World".into(),
            author: None,
            category_id: None,
            tag: String::new(),
        };
        let valid = form.validate().unwrap();
        assert_eq!(valid.author, DEFAULT_ARTICLE_AUTHOR);

        let form = ArticleForm {
            author: Some("   ".into()),
            ..form
        };
        assert_eq!(form.validate().unwrap().author, DEFAULT_ARTICLE_AUTHOR);
    }

    #[test]
    fn test_article_form_collects_all_errors() {
        let form = ArticleForm {
            title: String::new(),
            body: String::new(),
            author: Some("x".repeat(41)),
            category_id: None,
            tag: "y".repeat(101),
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.into_fields();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("body"));
        assert!(fields.contains_key("author"));
        assert!(fields.contains_key("tag"));
    }

    #[test]
    fn test_comment_author_defaults_to_anonymous() {
        let form = CommentForm {
            body: "nice".into(),
            author: Some("".into()),
        };
        assert_eq!(form.validate().unwrap().author, DEFAULT_COMMENT_AUTHOR);
    }

    #[test]
    fn test_full_search_requires_some_field() {
        let form = FullSearchForm {
            text: String::new(),
            in_title: true,
            in_text: true,
            in_tags: false,
            in_comment_text: false,
            author: String::new(),
            author_in_articles: true,
            author_in_comments: false,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.into_fields().contains_key("__all__"));
    }

    #[test]
    fn test_full_search_text_needs_destination() {
        let form = FullSearchForm {
            text: "rust".into(),
            in_title: false,
            in_text: false,
            in_tags: false,
            in_comment_text: false,
            author: String::new(),
            author_in_articles: false,
            author_in_comments: false,
        };
        assert!(form.validate().is_err());

        let form = FullSearchForm {
            in_tags: true,
            ..form
        };
        let terms = form.validate().unwrap();
        assert_eq!(terms.text.as_deref(), Some("rust"));
        assert!(terms.author.is_none());
    }

    #[test]
    fn test_full_search_author_needs_destination() {
        let form = FullSearchForm {
            text: String::new(),
            in_title: true,
            in_text: false,
            in_tags: false,
            in_comment_text: false,
            author: "ada".into(),
            author_in_articles: false,
            author_in_comments: false,
        };
        assert!(form.validate().is_err());

        let form = FullSearchForm {
            author_in_comments: true,
            ..form
        };
        let terms = form.validate().unwrap();
        assert_eq!(terms.author.as_deref(), Some("ada"));
    }

    #[test]
    fn test_checkbox_accepts_form_values() {
        let form: FullSearchForm =
            serde_json::from_str(r#"{"text": "x", "in_title": "on", "in_text": "0"}"#).unwrap();
        assert!(form.in_title);
        assert!(!form.in_text);

        let form: FullSearchForm =
            serde_json::from_str(r#"{"text": "x", "in_title": true}"#).unwrap();
        assert!(form.in_title);
    }

    #[test]
    fn test_simple_search_blank_term_disables_filter() {
        assert!(SimpleSearchForm { search: "  ".into() }.term().is_none());
        assert_eq!(
            SimpleSearchForm {
                search: " rust ".into()
            }
            .term(),
            Some("rust")
        );
    }
}
