//! Query-string composition.

use url::form_urlencoded;

/// Query payload for a call.
///
/// Either an already-encoded string, appended verbatim, or key/value
/// pairs that are URL-encoded on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryString {
    /// An already-encoded query string.
    Raw(String),
    /// Key/value pairs, URL-encoded on use.
    Pairs(Vec<(String, String)>),
}

impl QueryString {
    /// The encoded form of this query.
    pub fn encode(&self) -> String {
        match self {
            QueryString::Raw(raw) => raw.clone(),
            QueryString::Pairs(pairs) => {
                let mut serializer = form_urlencoded::Serializer::new(String::new());
                for (key, value) in pairs {
                    serializer.append_pair(key, value);
                }
                serializer.finish()
            }
        }
    }
}

impl From<&str> for QueryString {
    fn from(raw: &str) -> Self {
        QueryString::Raw(raw.to_owned())
    }
}

impl From<String> for QueryString {
    fn from(raw: String) -> Self {
        QueryString::Raw(raw)
    }
}

impl From<Vec<(String, String)>> for QueryString {
    fn from(pairs: Vec<(String, String)>) -> Self {
        QueryString::Pairs(pairs)
    }
}

impl From<&[(&str, &str)]> for QueryString {
    fn from(pairs: &[(&str, &str)]) -> Self {
        QueryString::Pairs(
            pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        )
    }
}

/// Append `query` to `path`.
///
/// The separator follows from the path: `?` when it carries no query yet,
/// `&` when it already carries query content, and nothing when it already
/// ends in `?`.
pub fn add_query_string(path: &str, query: Option<&QueryString>) -> String {
    let Some(query) = query else {
        return path.to_owned();
    };

    let separator = if !path.contains('?') {
        "?"
    } else if path.ends_with('?') {
        ""
    } else {
        "&"
    };
    format!("{path}{separator}{}", query.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(query: &str) -> Option<QueryString> {
        Some(QueryString::Raw(query.to_owned()))
    }

    #[test]
    fn plain_path_gets_a_question_mark() {
        assert_eq!(add_query_string("/a", raw("k=v").as_ref()), "/a?k=v");
    }

    #[test]
    fn existing_query_content_gets_an_ampersand() {
        assert_eq!(
            add_query_string("/a?x=1", raw("k=v").as_ref()),
            "/a?x=1&k=v"
        );
    }

    #[test]
    fn trailing_question_mark_appends_directly() {
        assert_eq!(add_query_string("/a?", raw("k=v").as_ref()), "/a?k=v");
    }

    #[test]
    fn absent_query_leaves_the_path_alone() {
        assert_eq!(add_query_string("/a", None), "/a");
    }

    #[test]
    fn pairs_are_url_encoded() {
        let query: QueryString = (&[("k", "v v"), ("x", "1&2")][..]).into();
        assert_eq!(query.encode(), "k=v+v&x=1%262");
        assert_eq!(
            add_query_string("/a", Some(&query)),
            "/a?k=v+v&x=1%262"
        );
    }
}
