use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{
        PageQuery, Paginated, RecipeSummary, SubscriptionCard, SubscriptionsQuery, User,
        UserProfile, resolve_page,
    },
    repository::{RecipeRepository, SubscriptionRepository, UserRepository},
    telemetry::{SUBSCRIPTIONS_ADDED, SUBSCRIPTIONS_REMOVED},
};

use super::toggle::{added, removed};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    recipe_repo: RecipeRepository,
    default_page_size: i64,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        recipe_repo: RecipeRepository,
        default_page_size: i64,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
            recipe_repo,
            default_page_size,
        }
    }

    #[instrument(name = "user.list", skip(self))]
    pub async fn list(
        &self,
        query: PageQuery,
        viewer: Option<i32>,
    ) -> AppResult<Paginated<UserProfile>> {
        let page = query.resolve(self.default_page_size)?;

        let users = self.user_repo.list(page.limit, page.offset).await?;
        let count = self.user_repo.count().await?;

        Ok(Paginated {
            count,
            results: self.profiles(users, viewer).await?,
        })
    }

    #[instrument(name = "user.get", skip(self))]
    pub async fn get(&self, id: i32, viewer: Option<i32>) -> AppResult<UserProfile> {
        let user = self.find(id).await?;

        self.profiles(vec![user], viewer)
            .await?
            .pop()
            .ok_or(AppError::Internal("Failed to build profile".to_string()))
    }

    #[instrument(name = "user.me", skip(self))]
    pub async fn me(&self, user_id: i32) -> AppResult<UserProfile> {
        let user = self.find(user_id).await?;

        Ok(UserProfile::from_user(user, false))
    }

    #[instrument(name = "user.subscribe", skip(self))]
    pub async fn subscribe(
        &self,
        user_id: i32,
        author_id: i32,
        recipes_limit: Option<i64>,
    ) -> AppResult<SubscriptionCard> {
        let recipes_limit = validate_recipes_limit(recipes_limit)?;
        let author = self.find(author_id).await?;

        ensure_not_self(user_id, author.id)?;

        added(
            self.subscription_repo.create(user_id, author.id).await?,
            "Already subscribed to this author",
        )?;

        SUBSCRIPTIONS_ADDED.add(1, &[]);
        tracing::info!(user_id, author_id, "Subscribed to author");

        self.cards(vec![author], recipes_limit)
            .await?
            .pop()
            .ok_or(AppError::Internal("Failed to build subscription".to_string()))
    }

    #[instrument(name = "user.unsubscribe", skip(self))]
    pub async fn unsubscribe(&self, user_id: i32, author_id: i32) -> AppResult<()> {
        let author = self.find(author_id).await?;

        removed(
            self.subscription_repo.delete(user_id, author.id).await?,
            "Not subscribed to this author",
        )?;

        SUBSCRIPTIONS_REMOVED.add(1, &[]);
        tracing::info!(user_id, author_id, "Unsubscribed from author");

        Ok(())
    }

    #[instrument(name = "user.subscriptions", skip(self))]
    pub async fn subscriptions(
        &self,
        user_id: i32,
        query: SubscriptionsQuery,
    ) -> AppResult<Paginated<SubscriptionCard>> {
        let page = resolve_page(query.page, query.limit, self.default_page_size)?;
        let recipes_limit = validate_recipes_limit(query.recipes_limit)?;

        let authors = self
            .user_repo
            .list_followed(user_id, page.limit, page.offset)
            .await?;
        let count = self.subscription_repo.count_followed(user_id).await?;

        Ok(Paginated {
            count,
            results: self.cards(authors, recipes_limit).await?,
        })
    }

    async fn find(&self, id: i32) -> AppResult<User> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }

    async fn profiles(&self, users: Vec<User>, viewer: Option<i32>) -> AppResult<Vec<UserProfile>> {
        let followed: HashSet<i32> = match viewer {
            Some(uid) => {
                let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
                self.subscription_repo
                    .followed_among(uid, &ids)
                    .await?
                    .into_iter()
                    .collect()
            }
            None => HashSet::new(),
        };

        Ok(users
            .into_iter()
            .map(|user| {
                let is_subscribed = followed.contains(&user.id);
                UserProfile::from_user(user, is_subscribed)
            })
            .collect())
    }

    /// Subscription cards for authors the caller follows.
    async fn cards(
        &self,
        authors: Vec<User>,
        recipes_limit: Option<i64>,
    ) -> AppResult<Vec<SubscriptionCard>> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<i32> = authors.iter().map(|a| a.id).collect();

        let mut recipes: HashMap<i32, Vec<RecipeSummary>> = HashMap::new();
        for (author_id, summary) in self
            .recipe_repo
            .summaries_by_authors(&author_ids, recipes_limit)
            .await?
        {
            recipes.entry(author_id).or_default().push(summary);
        }

        let counts: HashMap<i32, i64> = self
            .recipe_repo
            .count_by_authors(&author_ids)
            .await?
            .into_iter()
            .collect();

        Ok(authors
            .into_iter()
            .map(|author| SubscriptionCard {
                recipes: recipes.remove(&author.id).unwrap_or_default(),
                recipes_count: counts.get(&author.id).copied().unwrap_or(0),
                author: UserProfile::from_user(author, true),
            })
            .collect())
    }
}

pub fn ensure_not_self(user_id: i32, author_id: i32) -> AppResult<()> {
    if user_id == author_id {
        return Err(AppError::Validation(
            "You cannot subscribe to yourself".to_string(),
        ));
    }
    Ok(())
}

fn validate_recipes_limit(limit: Option<i64>) -> AppResult<Option<i64>> {
    match limit {
        Some(n) if n < 0 => Err(AppError::Validation(
            "recipes_limit must not be negative".to_string(),
        )),
        other => Ok(other),
    }
}
