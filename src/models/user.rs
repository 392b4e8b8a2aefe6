use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::RecipeSummary;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// A user as seen by a particular caller.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionCard {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn create_test_user() -> User {
        User {
            id: 1,
            email: "anna@example.com".to_string(),
            username: "anna".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Ivanova".to_string(),
            password_hash: "hashed_password".to_string(),
            created_at: datetime!(2024-01-15 10:30:00 UTC),
        }
    }

    #[test]
    fn test_user_serialization_excludes_password() {
        let user = create_test_user();
        let json = serde_json::to_string(&user).expect("serialization should succeed");

        assert!(json.contains("\"email\":\"anna@example.com\""));
        assert!(json.contains("\"username\":\"anna\""));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("hashed_password"));
    }

    #[test]
    fn test_profile_carries_subscription_flag() {
        let profile = UserProfile::from_user(create_test_user(), true);
        let json = serde_json::to_value(&profile).expect("serialization should succeed");

        assert_eq!(json["id"], 1);
        assert_eq!(json["first_name"], "Anna");
        assert_eq!(json["is_subscribed"], true);
    }

    #[test]
    fn test_subscription_card_flattens_author() {
        let card = SubscriptionCard {
            author: UserProfile::from_user(create_test_user(), true),
            recipes: vec![RecipeSummary {
                id: 7,
                name: "Борщ".to_string(),
                image: "data:image/png;base64,AAAA".to_string(),
                cooking_time: 90,
            }],
            recipes_count: 3,
        };

        let json = serde_json::to_value(&card).expect("serialization should succeed");
        assert_eq!(json["username"], "anna");
        assert_eq!(json["recipes"][0]["id"], 7);
        assert_eq!(json["recipes_count"], 3);
        assert!(json.get("author").is_none());
    }

    #[test]
    fn test_register_input_deserialization() {
        let json = r#"{
            "email": "new@example.com",
            "username": "newbie",
            "first_name": "New",
            "last_name": "User",
            "password": "secret123"
        }"#;
        let input: RegisterInput =
            serde_json::from_str(json).expect("deserialization should succeed");

        assert_eq!(input.email, "new@example.com");
        assert_eq!(input.username, "newbie");
        assert_eq!(input.last_name, "User");
    }

    #[test]
    fn test_registered_user_omits_password() {
        let registered: RegisteredUser = create_test_user().into();
        let json = serde_json::to_string(&registered).expect("serialization should succeed");

        assert!(json.contains("\"id\":1"));
        assert!(!json.contains("password"));
    }
}
