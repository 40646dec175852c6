use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{Comment, Movie, MovieId, UserProfile};

/// Message the backend sends alongside a freshly issued access token.
pub const LOGIN_SUCCESS_MESSAGE: &str = "User logged in successfully";

pub fn login_route() -> &'static str {
    "/users/login"
}

pub fn user_details_route() -> &'static str {
    "/users/details"
}

pub fn movies_route() -> &'static str {
    "/movies/getMovies"
}

pub fn movie_route(id: &MovieId) -> String {
    format!("/movies/getMovie/{}", encode_path_segment(id.as_str()))
}

pub fn comments_route(movie_id: &MovieId) -> String {
    format!(
        "/movies/getComments/{}",
        encode_path_segment(movie_id.as_str())
    )
}

fn encode_path_segment(segment: &str) -> String {
    // form encoding turns spaces into '+' and escapes a literal '+' as %2B
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDetailsResponse {
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoviesResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub movies: Option<Vec<Movie>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentsResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub comments: Option<Vec<Comment>>,
}

/// A list field where `null` means absent and elements that are not records
/// are skipped. A non-list value is still an error.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Vec<Value>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(items) => Ok(Some(
            items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_routes_escape_the_id_segment() {
        assert_eq!(movie_route(&MovieId::from("42")), "/movies/getMovie/42");
        assert_eq!(
            comments_route(&MovieId::from("a b/c+d")),
            "/movies/getComments/a%20b%2Fc%2Bd"
        );
    }

    #[test]
    fn login_response_tolerates_missing_fields() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"message":"No Email Found"}"#).expect("response");
        assert_eq!(response.message.as_deref(), Some("No Email Found"));
        assert!(response.access.is_none());
    }

    #[test]
    fn list_payloads_treat_null_as_absent() {
        let movies: MoviesResponse = serde_json::from_str(r#"{"movies":null}"#).expect("movies");
        assert!(movies.movies.is_none());
        let comments: CommentsResponse = serde_json::from_str("{}").expect("comments");
        assert!(comments.comments.is_none());
    }

    #[test]
    fn list_payloads_skip_elements_that_are_not_records() {
        let movies: MoviesResponse = serde_json::from_value(serde_json::json!({
            "movies": [{ "id": 1, "title": "Alien" }, "junk", 7, null, { "title": null }]
        }))
        .expect("movies");
        let movies = movies.movies.expect("list present");
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title.as_deref(), Some("Alien"));
        assert_eq!(movies[1], Movie::default());

        assert!(serde_json::from_str::<MoviesResponse>(r#"{"movies":"nope"}"#).is_err());
    }
}
